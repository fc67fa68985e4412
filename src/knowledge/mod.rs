//! Knowledge Base - 코퍼스 통계 추출
//!
//! 코퍼스 전체 텍스트를 한 번 훑어 요약을 만듭니다:
//! 주요 단어, 규정 번호, 카테고리, 운영 유형, 수치 값, 핵심 구.
//! 후속 질문 생성기가 이 요약을 소비합니다.
//!
//! 출력은 불변이며, 코퍼스가 바뀌면 전체를 함께 다시 구축해야 합니다.
//! 부분 재구축 경로는 없습니다.

use std::collections::{BTreeSet, HashMap, HashSet};

use regex::Regex;

use crate::corpus::RuleRecord;

// ============================================================================
// Constants
// ============================================================================

/// 주요 단어 최대 보존 수 (최초 등장 순서 기준)
const MAX_IMPORTANT_WORDS: usize = 200;

/// 수치 값 최대 보존 수 (최초 등장 순서 기준)
const MAX_NUMERICAL_VALUES: usize = 50;

/// 주요 단어 필터에서 제외하는 고정 불용어 집합
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "her", "was", "one", "our",
    "out", "day", "get", "has", "him", "his", "how", "its", "may", "new", "now", "old", "see",
    "two", "way", "who", "boy", "did", "let", "put", "say", "she", "too", "use",
];

/// 운영 유형 고정 어휘: (라벨, 설명에서 찾을 부분 문자열들)
const OPERATION_VOCABULARY: &[(&str, &[&str])] = &[
    ("package delivery", &["package delivery"]),
    ("agricultural", &["agricultural", "agriculture"]),
    ("aerial surveying", &["aerial surveying", "surveying"]),
    ("civic interest", &["civic interest"]),
    ("recreational", &["recreational"]),
    ("demonstration", &["demonstration"]),
    ("flight test", &["flight test"]),
];

/// 핵심 구 도메인 패턴 카탈로그
const KEY_PHRASE_PATTERNS: &[&str] = &[
    r"operating (?:permit|certificate)",
    r"airworthiness acceptance",
    r"flight coordinator",
    r"operations supervisor",
    r"strategic deconfliction",
    r"conformance monitoring",
    r"detect and avoid",
    r"remote identification",
    r"population density",
    r"category \d+",
    r"BVLOS",
    r"beyond visual line of sight",
    r"ground control station",
    r"command and control",
    r"hazardous materials?",
    r"safety management",
    r"emergency procedures?",
    r"preflight requirements?",
    r"operating restrictions?",
];

// ============================================================================
// KnowledgeBase
// ============================================================================

/// 코퍼스에서 유도된 지식베이스
///
/// 전부 코퍼스 스냅샷의 순수 함수입니다. 같은 코퍼스에서 두 번 구축하면
/// 같은 결과가 나옵니다 (결정적).
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    /// 주요 단어, 최초 등장 순서로 최대 200개
    ///
    /// 빈도순 상위가 아니라 최초 등장 순서 상위입니다. 이름이 풍기는 것과
    /// 다르지만 검증 대상 속성이므로 그대로 유지합니다.
    pub important_words: Vec<String>,
    /// 비어 있지 않은 규정 번호, 코퍼스 순서, 중복 유지
    pub rule_numbers: Vec<String>,
    /// 비어 있지 않은 고유 카테고리
    pub categories: BTreeSet<String>,
    /// 감지된 운영 유형, 최초 감지 순서
    pub operation_types: Vec<String>,
    /// "숫자 단위" 형태의 수치 값, 최초 등장 순서로 최대 50개
    pub numerical_values: Vec<String>,
    /// 핵심 구 (소문자, 중복 제거)
    pub key_phrases: BTreeSet<String>,

    /// 코퍼스 단어 빈도 (후속 질문의 희귀도 정렬용)
    word_frequency: HashMap<String, usize>,
    /// important_words의 O(1) 조회용 집합
    important_set: HashSet<String>,
}

impl KnowledgeBase {
    /// 코퍼스 전체에서 지식베이스 구축
    pub fn build(records: &[RuleRecord]) -> Self {
        let all_text: String = records
            .iter()
            .map(|r| r.searchable_text())
            .collect::<Vec<_>>()
            .join(" ");

        let (important_words, word_frequency) = extract_important_words(&all_text);
        let important_set: HashSet<String> = important_words.iter().cloned().collect();

        let rule_numbers: Vec<String> = records
            .iter()
            .filter(|r| !r.rule_number.is_empty())
            .map(|r| r.rule_number.clone())
            .collect();

        let categories: BTreeSet<String> = records
            .iter()
            .filter(|r| !r.category.is_empty())
            .map(|r| r.category.clone())
            .collect();

        let operation_types = extract_operation_types(records);
        let numerical_values = extract_numerical_values(&all_text);
        let key_phrases = extract_key_phrases(&all_text);

        tracing::info!(
            "Knowledge base built: {} words, {} rules, {} categories, {} operation types, {} numerical values, {} key phrases",
            important_words.len(),
            rule_numbers.len(),
            categories.len(),
            operation_types.len(),
            numerical_values.len(),
            key_phrases.len()
        );

        Self {
            important_words,
            rule_numbers,
            categories,
            operation_types,
            numerical_values,
            key_phrases,
            word_frequency,
            important_set,
        }
    }

    /// 주요 단어 여부
    pub fn is_important_word(&self, word: &str) -> bool {
        self.important_set.contains(word)
    }

    /// 코퍼스 단어 빈도 (없으면 0)
    pub fn word_frequency(&self, word: &str) -> usize {
        self.word_frequency.get(word).copied().unwrap_or(0)
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// 주요 단어 + 단어 빈도 추출
///
/// 알파벳 3자 이상 토큰의 빈도를 센 뒤, 불용어가 아니고 빈도 2 이상이며
/// 4자 이상인 단어를 **최초 등장 순서**로 최대 200개 보존합니다.
fn extract_important_words(all_text: &str) -> (Vec<String>, HashMap<String, usize>) {
    let word_re = Regex::new(r"\b[a-zA-Z]{3,}\b").unwrap();
    let lowered = all_text.to_lowercase();

    let tokens: Vec<&str> = word_re.find_iter(&lowered).map(|m| m.as_str()).collect();

    let mut frequency: HashMap<String, usize> = HashMap::new();
    for token in &tokens {
        *frequency.entry((*token).to_string()).or_insert(0) += 1;
    }

    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut important = Vec::new();

    for token in &tokens {
        if important.len() >= MAX_IMPORTANT_WORDS {
            break;
        }
        if !seen.insert(token) {
            continue;
        }

        if token.len() >= 4
            && !stop_words.contains(token)
            && frequency.get(*token).copied().unwrap_or(0) >= 2
        {
            important.push((*token).to_string());
        }
    }

    (important, frequency)
}

/// 운영 유형 추출 (레코드별 설명을 부분 문자열로 스캔)
fn extract_operation_types(records: &[RuleRecord]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();

    for record in records {
        let desc = record.description.to_lowercase();
        for (label, needles) in OPERATION_VOCABULARY {
            if needles.iter().any(|n| desc.contains(n)) && !found.iter().any(|f| f == label) {
                found.push((*label).to_string());
            }
        }
    }

    found
}

/// 수치 값 추출
///
/// `<숫자>[,<3자리>]* <단위>` 패턴을 대소문자 무시로 매칭합니다.
/// 중복 제거 후 최초 등장 순서로 최대 50개.
fn extract_numerical_values(all_text: &str) -> Vec<String> {
    let number_re = Regex::new(
        r"(?i)\b(\d{1,4}(?:,\d{3})*)\s*(pounds?|lbs?|feet|foot|ft|mph|knots?|miles?|nautical|hours?|days?|months?|years?)\b",
    )
    .unwrap();

    let mut seen: HashSet<String> = HashSet::new();
    let mut values = Vec::new();

    for caps in number_re.captures_iter(all_text) {
        if values.len() >= MAX_NUMERICAL_VALUES {
            break;
        }
        let value = format!("{} {}", &caps[1], &caps[2]);
        if seen.insert(value.clone()) {
            values.push(value);
        }
    }

    values
}

/// 핵심 구 추출 (도메인 패턴 카탈로그, 소문자화 + 중복 제거)
fn extract_key_phrases(all_text: &str) -> BTreeSet<String> {
    let mut phrases = BTreeSet::new();

    for pattern in KEY_PHRASE_PATTERNS {
        let re = Regex::new(&format!("(?i){}", pattern)).unwrap();
        for m in re.find_iter(all_text) {
            phrases.insert(m.as_str().to_lowercase());
        }
    }

    phrases
}

// ============================================================================
// Tests
// ============================================================================

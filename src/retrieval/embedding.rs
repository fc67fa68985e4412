//! Term-Frequency Embedding - 희소 단어빈도 벡터
//!
//! 외부 임베딩 API 없이 동작하는 경량 벡터화입니다.
//! 소문자화 → `\w+` 토큰화 → 빈도 카운트. 정규화나 IDF 가중치는 없습니다.
//!
//! 레코드당 한 번 구축되어 코사인 재랭킹에 쓰입니다.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::corpus::RuleRecord;

// ============================================================================
// Tokenization
// ============================================================================

/// 소문자화 후 `\w+` 경계로 토큰화
pub fn tokenize(text: &str) -> Vec<String> {
    static WORD_RE: OnceLock<Regex> = OnceLock::new();
    let re = WORD_RE.get_or_init(|| Regex::new(r"\w+").unwrap());

    re.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// 토큰화 후 중복 제거 (집합)
pub fn tokenize_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

// ============================================================================
// TermVector
// ============================================================================

/// 희소 단어빈도 벡터 (토큰 → 출현 횟수)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    counts: HashMap<String, u32>,
}

impl TermVector {
    /// 텍스트에서 벡터 생성
    pub fn embed(text: &str) -> Self {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in tokenize(text) {
            *counts.entry(token).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// 레코드 전체 필드에서 벡터 생성
    ///
    /// 규정 번호/카테고리를 포함한 필드 라벨 형식을 그대로 임베딩합니다.
    /// 라벨 토큰("rule", "category" 등)도 벡터에 들어가지만
    /// 모든 레코드에 공통이므로 순위에는 영향이 없습니다.
    pub fn embed_record(record: &RuleRecord) -> Self {
        let text = format!(
            "Rule {}: {} Category: {} Definition: {} Description: {}",
            record.rule_number, record.title, record.category, record.definition, record.description
        );
        Self::embed(&text)
    }

    /// 토큰 수 (고유 토큰 기준)
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// 빈 벡터 여부
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    fn get(&self, token: &str) -> u32 {
        self.counts.get(token).copied().unwrap_or(0)
    }

    fn norm(&self) -> f32 {
        self.counts
            .values()
            .map(|&c| (c as f32) * (c as f32))
            .sum::<f32>()
            .sqrt()
    }
}

// ============================================================================
// Cosine Similarity
// ============================================================================

/// 두 단어빈도 벡터의 코사인 유사도
///
/// 양쪽 키의 합집합 위에서 내적 / (노름 곱)을 계산합니다.
/// 어느 한쪽의 노름이 0이면 0.0을 반환합니다 (0으로 나누지 않음).
pub fn cosine_similarity(a: &TermVector, b: &TermVector) -> f32 {
    let norm_a = a.norm();
    let norm_b = b.norm();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    // 합집합 순회는 짧은 쪽만 돌아도 내적이 같지만,
    // 원 사양대로 합집합을 유지한다 (겹치지 않는 키의 기여는 0).
    let mut keys: HashSet<&str> = a.counts.keys().map(String::as_str).collect();
    keys.extend(b.counts.keys().map(String::as_str));

    let dot: f32 = keys
        .into_iter()
        .map(|k| (a.get(k) as f32) * (b.get(k) as f32))
        .sum();

    dot / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================

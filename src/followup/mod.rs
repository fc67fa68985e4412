//! Follow-up 모듈 - 지식베이스 기반 후속 질문 생성기
//!
//! 질의 + 검색 상위 레코드 + 지식베이스에서 후보 질문을 만들고,
//! 점수화 → 중복 제거 → 의문사 다양화 선택을 거쳐 정확히 3개를 냅니다.
//!
//! 템플릿 순서 셔플이 유일한 비결정 요소입니다. RNG를 파라미터로 받으므로
//! 테스트는 고정 시드를 주입해 구조적 속성을 검증합니다.

mod templates;

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::corpus::ScoredRule;
use crate::knowledge::KnowledgeBase;
use crate::retrieval::tokenize_set;

pub use templates::{
    ACTIONS, DEFAULT_FOLLOWUPS, GREETINGS, GREETING_FOLLOWUPS, QUESTION_TEMPLATES,
};

use templates::template_family;

// ============================================================================
// Constants
// ============================================================================

/// 키 용어 최대 수
const MAX_KEY_TERMS: usize = 20;

/// 레코드 단어 출처에서 멈추는 키 용어 수
const RULE_WORD_TERM_CUTOFF: usize = 15;

/// 템플릿 치환에 쓰는 키 용어 수
const TERMS_PER_TEMPLATE: usize = 8;

/// 패밀리당 템플릿 인스턴스 상한
const MAX_PER_FAMILY: usize = 3;

/// 후보로 인정하는 최소 질문 길이 (문자)
const MIN_QUESTION_LEN: usize = 15;

/// 후속 질문 출력 개수
const FOLLOWUP_COUNT: usize = 3;

// ============================================================================
// Greeting Detection
// ============================================================================

/// 인사말 여부
///
/// 트림 + 소문자화한 질의가 인사말 목록의 항목과 정확히 일치하거나
/// 그 항목으로 시작하면 참입니다.
pub fn is_greeting(query: &str) -> bool {
    let q = query.trim().to_lowercase();
    GREETINGS.iter().any(|g| q == *g || q.starts_with(g))
}

/// 인사말 응답 본문
pub fn greeting_message() -> String {
    "Hello! I'm your FAA drone regulation assistant. I can help you with questions about \
     Part 108 BVLOS (Beyond Visual Line of Sight) operations, including:\n\n\
     - Weight and size restrictions\n\
     - Speed and altitude limits\n\
     - Permit and certificate requirements\n\
     - Safety regulations and compliance\n\
     - Operational requirements\n\n\
     What would you like to know about drone regulations?"
        .to_string()
}

/// 인사말용 고정 후속 질문 3종
pub fn greeting_followups() -> Vec<String> {
    GREETING_FOLLOWUPS.iter().map(|s| s.to_string()).collect()
}

/// 기본 후속 질문 3종
pub fn default_followups() -> Vec<String> {
    DEFAULT_FOLLOWUPS.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// FollowupGenerator
// ============================================================================

/// 후속 질문 생성기
///
/// 지식베이스를 빌려 쓰는 상태 없는 값입니다. 질의마다 독립 계산이므로
/// 병렬 호출이 안전합니다.
pub struct FollowupGenerator<'a> {
    kb: &'a KnowledgeBase,
}

impl<'a> FollowupGenerator<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb }
    }

    /// 후속 질문 3개 생성 (스레드 RNG)
    pub fn generate(&self, query: &str, rules: &[ScoredRule]) -> Vec<String> {
        self.generate_with_rng(query, rules, &mut rand::thread_rng())
    }

    /// 후속 질문 3개 생성 (주입 RNG)
    ///
    /// RNG는 템플릿 순회 순서에만 영향을 줍니다. 반환은 항상
    /// 비어 있지 않고 대소문자 무시 기준 서로 다른 3개입니다.
    pub fn generate_with_rng<R: Rng>(
        &self,
        query: &str,
        rules: &[ScoredRule],
        rng: &mut R,
    ) -> Vec<String> {
        let query_lower = query.to_lowercase();
        let query_words = tokenize_set(&query_lower);

        // 검색 상위 5건의 문맥 텍스트
        let rule_texts = rules
            .iter()
            .take(5)
            .map(|r| format!("{} {}", r.record.title, r.record.description))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let rule_words = tokenize_set(&rule_texts);

        let top_categories = top_categories(rules);
        let context_ops = self.operation_types_in_context(rules);

        let key_terms = self.extract_key_terms(
            &query_words,
            &rule_words,
            &rule_texts,
            rules,
            &context_ops,
            &top_categories,
        );

        // 후보 생성: 템플릿 + 문맥 질문
        let mut candidates =
            self.generate_template_candidates(&key_terms, &top_categories, rng);
        candidates.extend(self.context_specific_questions(
            &query_lower,
            &top_categories,
            &context_ops,
        ));

        // 점수화 후 내림차순 안정 정렬
        let mut scored: Vec<(f32, String)> = candidates
            .into_iter()
            .map(|q| {
                let score = self.score_question(&q, &query_words, &rule_texts, &key_terms);
                (score, q)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut selected = select_with_variety(&scored);

        // 부족하면 기본 질문으로 패딩
        if selected.len() < FOLLOWUP_COUNT {
            let seen: HashSet<String> = selected.iter().map(|q| q.to_lowercase()).collect();
            for default in DEFAULT_FOLLOWUPS {
                if selected.len() >= FOLLOWUP_COUNT {
                    break;
                }
                if !seen.contains(&default.to_lowercase()) {
                    selected.push((*default).to_string());
                }
            }
        }

        selected.truncate(FOLLOWUP_COUNT);
        selected
    }

    // ------------------------------------------------------------------
    // Key-term extraction
    // ------------------------------------------------------------------

    /// 키 용어 추출 (상한 20, 대소문자 무시 중복 제거, 최초 등장 순서)
    fn extract_key_terms(
        &self,
        query_words: &HashSet<String>,
        rule_words: &HashSet<String>,
        rule_texts: &str,
        rules: &[ScoredRule],
        context_ops: &[String],
        top_categories: &[String],
    ) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();

        // 1. 상위 5건 제목의 내용어 (제목당 2개까지)
        for rule in rules.iter().take(5) {
            let title = rule.record.title.to_lowercase();
            let title = title.trim_matches('.');
            let picked: Vec<String> = tokenize_ordered(title)
                .into_iter()
                .filter(|w| w.len() >= 4 && !matches!(w.as_str(), "this" | "that" | "with" | "from"))
                .take(2)
                .collect();
            terms.extend(picked);
        }

        // 2. 질의 단어 중 주요 단어 (긴 것 우선)
        let mut query_terms: Vec<&String> = query_words
            .iter()
            .filter(|w| w.len() >= 4 && self.kb.is_important_word(w))
            .collect();
        query_terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms.extend(query_terms.into_iter().cloned());

        // 3. 레코드 단어 중 주요 단어 (코퍼스 빈도 오름차순 = 희귀한 것 우선)
        let mut rare_words: Vec<&String> = rule_words
            .iter()
            .filter(|w| w.len() >= 4 && self.kb.is_important_word(w))
            .collect();
        rare_words.sort_by(|a, b| {
            self.kb
                .word_frequency(a)
                .cmp(&self.kb.word_frequency(b))
                .then_with(|| a.cmp(b))
        });
        for word in rare_words {
            if terms.len() >= RULE_WORD_TERM_CUTOFF {
                break;
            }
            if !terms.contains(word) {
                terms.push(word.clone());
            }
        }

        // 4. 질의와 단어를 공유하거나 검색 텍스트에 나오는 핵심 구
        for phrase in &self.kb.key_phrases {
            let shares_query_word = query_words.iter().any(|w| phrase.contains(w.as_str()));
            if shares_query_word || rule_texts.contains(phrase.as_str()) {
                terms.push(phrase.clone());
            }
        }

        // 5. 문맥에서 감지된 운영 유형 (2개까지)
        terms.extend(context_ops.iter().take(2).cloned());

        // 6. 상위 카테고리 (2개까지, 사람이 읽는 형태)
        terms.extend(
            top_categories
                .iter()
                .take(2)
                .map(|c| c.replace('_', " ")),
        );

        // 7. 질의 단어를 담은 수치 값 (5개까지)
        let mut value_terms = 0;
        for value in &self.kb.numerical_values {
            if value_terms >= 5 {
                break;
            }
            let value_lower = value.to_lowercase();
            if query_words.iter().any(|w| value_lower.contains(w.as_str())) {
                terms.push(value.clone());
                value_terms += 1;
            }
        }

        // 대소문자 무시 중복 제거, 최초 등장 순서, 상한 20
        let mut seen: HashSet<String> = HashSet::new();
        let mut unique = Vec::new();
        for term in terms {
            let key = term.to_lowercase();
            if seen.insert(key) {
                unique.push(term);
                if unique.len() >= MAX_KEY_TERMS {
                    break;
                }
            }
        }
        unique
    }

    // ------------------------------------------------------------------
    // Template candidates
    // ------------------------------------------------------------------

    /// 템플릿 치환 후보 생성
    ///
    /// 템플릿은 셔플 순서로 순회하고, 패밀리당 3개까지만 만듭니다.
    /// 기존 후보와 겹치거나 15자 이하인 치환 결과는 버립니다.
    fn generate_template_candidates<R: Rng>(
        &self,
        key_terms: &[String],
        top_categories: &[String],
        rng: &mut R,
    ) -> Vec<String> {
        let mut shuffled: Vec<&str> = QUESTION_TEMPLATES.to_vec();
        shuffled.shuffle(rng);

        let mut family_usage: HashMap<&str, usize> = HashMap::new();
        let mut candidates: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let mut push_candidate =
            |q: String,
             family: &'static str,
             usage: &mut HashMap<&str, usize>,
             out: &mut Vec<String>,
             seen: &mut HashSet<String>| {
                if q.len() > MIN_QUESTION_LEN && !seen.contains(&q) {
                    seen.insert(q.clone());
                    out.push(q);
                    *usage.entry(family).or_insert(0) += 1;
                }
            };

        for template in shuffled {
            let family = template_family(template);
            if family_usage.get(family).copied().unwrap_or(0) >= MAX_PER_FAMILY {
                continue;
            }

            for term in key_terms.iter().take(TERMS_PER_TEMPLATE) {
                if template.contains("{action}") {
                    // 행동 어휘 샘플 2개로 치환
                    let picks: Vec<&&str> = ACTIONS.choose_multiple(rng, 2).collect();
                    for action in picks {
                        let q = template.replace("{action}", action).replace("{term}", term);
                        push_candidate(q, family, &mut family_usage, &mut candidates, &mut seen);
                    }
                } else if template.contains("{category}") {
                    if let Some(cat) = top_categories.first() {
                        let q = template
                            .replace("{term}", term)
                            .replace("{category}", &cat.replace('_', " "));
                        push_candidate(q, family, &mut family_usage, &mut candidates, &mut seen);
                    }
                } else if template.contains("{value}") {
                    for value in self.kb.numerical_values.iter().take(2) {
                        let q = template.replace("{term}", term).replace("{value}", value);
                        push_candidate(q, family, &mut family_usage, &mut candidates, &mut seen);
                    }
                } else {
                    let q = template.replace("{term}", term);
                    push_candidate(q, family, &mut family_usage, &mut candidates, &mut seen);
                }
            }
        }

        candidates
    }

    // ------------------------------------------------------------------
    // Context-specific questions
    // ------------------------------------------------------------------

    /// 질의 키워드 그룹별 수작성 질문
    fn context_specific_questions(
        &self,
        query_lower: &str,
        top_categories: &[String],
        context_ops: &[String],
    ) -> Vec<String> {
        let mut questions = Vec::new();
        let contains_any =
            |needles: &[&str]| needles.iter().any(|n| query_lower.contains(n));

        // 무게
        if contains_any(&["weight", "pound", "lb", "mass"]) {
            for op in context_ops.iter().take(2) {
                questions.push(format!("What are weight limits for {} operations?", op));
            }
            questions.push("Are there different weight limits by permit type?".to_string());
            questions.push("What happens if I exceed weight restrictions?".to_string());
        }

        // 속도
        if contains_any(&["speed", "mph", "velocity", "knot"]) {
            questions.push("What are speed restrictions for BVLOS operations?".to_string());
            questions.push("Are there speed limits by operation type?".to_string());
            questions.push("What happens if I exceed speed limits?".to_string());
        }

        // 고도
        if contains_any(&["altitude", "height", "feet", "agl", "ceiling"]) {
            questions.push("What are altitude restrictions for BVLOS flights?".to_string());
            questions.push("Are there exceptions for altitude limits?".to_string());
            questions.push("How is altitude measured and monitored?".to_string());
        }

        // 허가/인증
        if contains_any(&["permit", "certificate", "license", "authorization"]) {
            questions.push("How do I apply for a BVLOS permit?".to_string());
            questions.push("What are the requirements for permit approval?".to_string());
            questions.push("How long does permit processing take?".to_string());
            for op in context_ops.iter().take(2) {
                questions.push(format!("What are the requirements for {} permits?", op));
            }
        }

        // 안전
        if contains_any(&["safety", "risk", "hazard", "emergency"]) {
            questions.push("What safety requirements must be met?".to_string());
            questions.push("How are safety risks assessed?".to_string());
            questions.push("What emergency procedures are required?".to_string());
        }

        // 카테고리별 일반 질문 2종
        for category in top_categories.iter().take(2) {
            let display = title_case(&category.replace('_', " "));
            questions.push(format!("What are the regulations for {}?", display));
            questions.push(format!("Are there specific requirements for {}?", display));
        }

        // 운영 유형별 질문 2종
        for op in context_ops.iter().take(2) {
            questions.push(format!("What are the requirements for {} operations?", op));
            questions.push(format!("Are there restrictions for {}?", op));
        }

        questions
    }

    // ------------------------------------------------------------------
    // Scoring
    // ------------------------------------------------------------------

    /// 후보 질문 점수화
    fn score_question(
        &self,
        question: &str,
        query_words: &HashSet<String>,
        rule_texts: &str,
        key_terms: &[String],
    ) -> f32 {
        let q_lower = question.to_lowercase();
        let q_words = tokenize_set(&q_lower);
        let mut score = 0.0_f32;

        // "requirements"로 끝나는 반복 패턴 감점
        if q_lower.ends_with("requirements") {
            score -= 1.0;
        }

        // 상위 5개 키 용어 포함 가산
        for term in key_terms.iter().take(5) {
            if q_lower.contains(&term.to_lowercase()) {
                score += 2.0;
            }
        }

        // 질의와 공유하는 단어 수
        let common = q_words.intersection(query_words).count();
        score += common as f32 * 1.5;

        // 검색 텍스트와의 연결 (4자 초과 단어 기준)
        if q_words
            .iter()
            .any(|w| w.len() > 4 && rule_texts.contains(w.as_str()))
        {
            score += 1.0;
        }

        // 의문사 보너스 (how 선호, what은 흔해서 낮음)
        score += if q_lower.starts_with("how") {
            1.0
        } else if q_lower.starts_with("are") || q_lower.starts_with("is") {
            0.8
        } else if q_lower.starts_with("can") {
            0.7
        } else if q_lower.starts_with("when")
            || q_lower.starts_with("where")
            || q_lower.starts_with("who")
        {
            0.6
        } else if q_lower.starts_with("which") || q_lower.starts_with("why") {
            0.5
        } else if q_lower.starts_with("what") {
            0.3
        } else {
            0.0
        };

        // 일반적 어미 감점
        for ending in ["requirements", "regulations", "rules", "standards"] {
            if q_lower.ends_with(ending) {
                score -= 0.5;
            }
        }

        // 길고 구체적인 용어 보너스
        if key_terms
            .iter()
            .any(|t| t.len() > 8 && q_lower.contains(&t.to_lowercase()))
        {
            score += 1.5;
        }

        // 운영 유형 언급 보너스
        if self
            .kb
            .operation_types
            .iter()
            .any(|op| q_lower.contains(op.as_str()))
        {
            score += 1.0;
        }

        score
    }

    /// 검색 레코드의 설명에서 감지된 운영 유형 (지식베이스 순서)
    fn operation_types_in_context(&self, rules: &[ScoredRule]) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for rule in rules {
            let desc = rule.record.description.to_lowercase();
            for op in &self.kb.operation_types {
                if desc.contains(op.as_str()) && !found.contains(op) {
                    found.push(op.clone());
                }
            }
        }
        found
    }
}

// ============================================================================
// Selection
// ============================================================================

/// 점수순 목록에서 의문사 다양성을 고려해 최대 3개 선택
///
/// 대소문자 무시 중복과 15자 이하를 건너뛰고, 처음 두 자리는 아직 안 쓴
/// 의문사를 우선합니다. 3개가 찬 뒤에는 안 쓴 의문사의 더 높은 점수
/// 후보가 반복 의문사 자리를 대체할 수 있습니다. 교체는 전체 순회에서
/// 최대 한 번입니다.
fn select_with_variety(scored: &[(f32, String)]) -> Vec<String> {
    let mut selected: Vec<(f32, String, String)> = Vec::new(); // (score, question, opener)
    let mut seen: HashSet<String> = HashSet::new();
    let mut openers_used: HashSet<String> = HashSet::new();
    let mut swapped = false;

    for (score, question) in scored {
        let q_lower = question.to_lowercase();
        let opener = q_lower.split_whitespace().next().unwrap_or("").to_string();

        if question.len() <= MIN_QUESTION_LEN || seen.contains(&q_lower) {
            continue;
        }

        if selected.len() < FOLLOWUP_COUNT {
            // 처음 두 자리는 새 의문사 우선, 세 번째부터는 반복 허용
            if !openers_used.contains(&opener) || selected.len() >= 2 {
                seen.insert(q_lower);
                openers_used.insert(opener.clone());
                selected.push((*score, question.clone(), opener));
            }
        } else if !swapped && !openers_used.contains(&opener) {
            // 기회적 교체: 반복된 의문사 자리 중 점수가 더 낮은 것을 대체
            let mut opener_counts: HashMap<&str, usize> = HashMap::new();
            for (_, _, o) in &selected {
                *opener_counts.entry(o.as_str()).or_insert(0) += 1;
            }

            let swap_target = selected
                .iter()
                .enumerate()
                .filter(|(_, (s, _, o))| {
                    opener_counts.get(o.as_str()).copied().unwrap_or(0) > 1 && *s < *score
                })
                .map(|(i, _)| i)
                .next();

            if let Some(i) = swap_target {
                let (_, old_q, old_opener) = selected[i].clone();
                seen.remove(&old_q.to_lowercase());
                selected[i] = (*score, question.clone(), opener.clone());
                // 교체로 비워진 의문사만 집합에서 내린다
                if !selected.iter().any(|(_, _, o)| *o == old_opener) {
                    openers_used.remove(&old_opener);
                }
                seen.insert(q_lower);
                openers_used.insert(opener);
                swapped = true;
            }
        }
    }

    selected.into_iter().map(|(_, q, _)| q).collect()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 검색 레코드의 카테고리를 빈도순 상위 3개로 (동률은 최초 등장 순서)
fn top_categories(rules: &[ScoredRule]) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();

    for rule in rules {
        let category = if rule.record.category.is_empty() {
            "unknown".to_string()
        } else {
            rule.record.category.clone()
        };

        match counts.iter_mut().find(|(c, _)| *c == category) {
            Some((_, n)) => *n += 1,
            None => counts.push((category, 1)),
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(3).map(|(c, _)| c).collect()
}

/// 토큰화하되 등장 순서 유지 (제목 내용어 추출용)
fn tokenize_ordered(text: &str) -> Vec<String> {
    crate::retrieval::tokenize(text)
}

/// 각 단어의 첫 글자를 대문자로
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Tests
// ============================================================================

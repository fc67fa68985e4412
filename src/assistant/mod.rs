//! Assistant 모듈 - 코퍼스 스냅샷 + 질의별 진입점
//!
//! 레코드 목록에서 역색인, 임베딩, 지식베이스를 한 번에 구축하는
//! 불변 스냅샷입니다. 구축 후에는 내부 가변성이 없으므로 참조 공유만으로
//! 잠금 없는 병렬 질의가 가능합니다.
//!
//! 질의 처리는 절대 실패하지 않습니다. 빈 코퍼스에서도 빈 결과와
//! 기본 후속 질문 3종으로 응답합니다.

use rand::Rng;

use crate::corpus::{load_rules, RuleRecord, ScoredRule};
use crate::followup::{
    default_followups, greeting_followups, greeting_message, is_greeting, FollowupGenerator,
};
use crate::knowledge::KnowledgeBase;
use crate::retrieval::{RetrievalEngine, SynonymTable};

// ============================================================================
// Types
// ============================================================================

/// 질의 처리 결과
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// 인사말 응답
    Greeting {
        message: String,
        follow_ups: Vec<String>,
    },
    /// 검색 결과 + 후속 질문 3종
    Answers {
        rules: Vec<ScoredRule>,
        follow_ups: Vec<String>,
    },
}

/// 규정 QA 어시스턴트
///
/// 코퍼스 스냅샷에서 구축되는 값입니다. 전역 싱글턴이 아니므로
/// 테스트마다 독립 인스턴스를 만들 수 있습니다.
pub struct RuleAssistant {
    engine: RetrievalEngine,
    kb: KnowledgeBase,
}

impl RuleAssistant {
    /// 레코드 목록에서 어시스턴트 구축
    pub fn new(records: Vec<RuleRecord>) -> Self {
        let kb = KnowledgeBase::build(&records);
        let engine = RetrievalEngine::build(records, SynonymTable::builtin());

        tracing::info!(
            "Assistant ready: {} rules, {} indexed terms, {} important words",
            engine.len(),
            engine.term_count(),
            kb.important_words.len()
        );

        Self { engine, kb }
    }

    /// JSON 파일에서 어시스턴트 구축
    ///
    /// 로드 실패 시 빈 코퍼스로 내려갑니다 (경고 로그 후 계속).
    pub fn from_file(path: &std::path::Path) -> Self {
        Self::new(load_rules(path))
    }

    /// 질의 처리 (스레드 RNG)
    pub fn respond(&self, query: &str, top_k: usize) -> QueryOutcome {
        self.respond_with_rng(query, top_k, &mut rand::thread_rng())
    }

    /// 질의 처리 (주입 RNG)
    ///
    /// 인사말이면 고정 응답, 아니면 검색 + 후속 질문 생성.
    /// 빈 코퍼스는 빈 결과 + 기본 후속 질문으로 단락합니다.
    pub fn respond_with_rng<R: Rng>(&self, query: &str, top_k: usize, rng: &mut R) -> QueryOutcome {
        if is_greeting(query) {
            return QueryOutcome::Greeting {
                message: greeting_message(),
                follow_ups: greeting_followups(),
            };
        }

        if self.engine.is_empty() {
            tracing::debug!("Empty corpus, returning default follow-ups");
            return QueryOutcome::Answers {
                rules: Vec::new(),
                follow_ups: default_followups(),
            };
        }

        let rules = self.engine.find_relevant(query, top_k);
        let follow_ups = FollowupGenerator::new(&self.kb).generate_with_rng(query, &rules, rng);

        QueryOutcome::Answers { rules, follow_ups }
    }

    /// 검색만 수행 (후속 질문 없이)
    pub fn find_relevant(&self, query: &str, top_k: usize) -> Vec<ScoredRule> {
        self.engine.find_relevant(query, top_k)
    }

    /// 코퍼스 레코드 접근
    pub fn records(&self) -> &[RuleRecord] {
        self.engine.records()
    }

    /// 지식베이스 접근
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// 코퍼스 크기
    pub fn len(&self) -> usize {
        self.engine.len()
    }

    /// 빈 코퍼스 여부
    pub fn is_empty(&self) -> bool {
        self.engine.is_empty()
    }

    /// 색인된 고유 토큰 수
    pub fn term_count(&self) -> usize {
        self.engine.term_count()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn sample_records() -> Vec<RuleRecord> {
        vec![
            RuleRecord {
                rule_number: "108.1".into(),
                title: "Weight Limits".into(),
                category: "operating_rules".into(),
                definition: "Maximum takeoff weight restrictions".into(),
                description: "Drones exceeding 55 pounds are prohibited for BVLOS operations.".into(),
            },
            RuleRecord {
                rule_number: "108.2".into(),
                title: "Operating Permit".into(),
                category: "certification".into(),
                definition: "An operating permit is required for BVLOS flight".into(),
                description: "Package delivery operations require an operating permit.".into(),
            },
        ]
    }

    #[test]
    fn test_greeting_outcome() {
        let assistant = RuleAssistant::new(sample_records());
        let mut rng = StdRng::seed_from_u64(1);

        match assistant.respond_with_rng("hello there", 5, &mut rng) {
            QueryOutcome::Greeting { message, follow_ups } => {
                assert!(message.contains("drone regulation assistant"));
                assert_eq!(follow_ups.len(), 3);
            }
            other => panic!("expected greeting, got {:?}", other),
        }
    }

    #[test]
    fn test_answers_outcome_has_three_followups() {
        let assistant = RuleAssistant::new(sample_records());
        let mut rng = StdRng::seed_from_u64(2);

        match assistant.respond_with_rng("what is the weight limit", 5, &mut rng) {
            QueryOutcome::Answers { rules, follow_ups } => {
                assert!(!rules.is_empty());
                assert!(rules.len() <= 5);
                assert_eq!(follow_ups.len(), 3);

                let lowered: HashSet<String> =
                    follow_ups.iter().map(|q| q.to_lowercase()).collect();
                assert_eq!(lowered.len(), 3);

                for rule in &rules {
                    assert!(rule.similarity >= 0.0 && rule.similarity <= 1.0);
                }
            }
            other => panic!("expected answers, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_corpus_short_circuits_to_defaults() {
        let assistant = RuleAssistant::new(Vec::new());
        let mut rng = StdRng::seed_from_u64(3);

        match assistant.respond_with_rng("weight limit", 5, &mut rng) {
            QueryOutcome::Answers { rules, follow_ups } => {
                assert!(rules.is_empty());
                assert_eq!(follow_ups, default_followups());
            }
            other => panic!("expected answers, got {:?}", other),
        }
    }

    #[test]
    fn test_from_missing_file_degrades_to_empty() {
        let assistant = RuleAssistant::from_file(std::path::Path::new("no_such_rules.json"));
        assert!(assistant.is_empty());
    }

    #[test]
    fn test_synonym_query_reaches_weight_rule() {
        let assistant = RuleAssistant::new(sample_records());
        let results = assistant.find_relevant("mass", 5);
        assert!(results.iter().any(|r| r.record.rule_number == "108.1"));
    }
}

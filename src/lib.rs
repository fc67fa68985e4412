//! part108-rag - FAA Part 108 드론 규정 QA 엔진
//!
//! 동의어 인지 역색인 + 단어빈도 코사인 재랭킹의 하이브리드 검색과
//! 코퍼스 지식베이스 기반 후속 질문 생성을 결합한 QA 시스템입니다.
//!
//! 코퍼스 스냅샷에서 한 번 구축되는 불변 값들로 구성되며,
//! 질의 처리는 절대 실패하지 않습니다.

pub mod assistant;
pub mod cli;
pub mod corpus;
pub mod followup;
pub mod generation;
pub mod knowledge;
pub mod retrieval;

// Re-exports
pub use assistant::{QueryOutcome, RuleAssistant};
pub use corpus::{load_rules, try_load_rules, CorpusError, RuleRecord, ScoredRule};
pub use followup::{is_greeting, FollowupGenerator};
pub use generation::{
    answer_or_fallback, fallback_answer, get_api_key, has_api_key, AnswerProvider, GeminiAnswer,
    SummaryPreference,
};
pub use knowledge::KnowledgeBase;
pub use retrieval::{cosine_similarity, InvertedIndex, RetrievalEngine, SynonymTable, TermVector};

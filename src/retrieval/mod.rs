//! Retrieval 모듈 - 동의어 인지 역색인 + TF 코사인 재랭킹
//!
//! - Synonyms: 대표어 → 동의어 구의 정적 확장 맵 (비대칭 확장)
//! - Index: 토큰 → 레코드 역색인, 어휘 검색
//! - Embedding: 희소 단어빈도 벡터 + 코사인 유사도
//! - Engine: 어휘 검색 + 재랭킹 + 전체 스캔 폴백의 조합

mod embedding;
mod engine;
mod index;
mod synonyms;

// Re-exports
pub use embedding::{cosine_similarity, tokenize, tokenize_set, TermVector};
pub use engine::RetrievalEngine;
pub use index::InvertedIndex;
pub use synonyms::{normalize_phrase, SynonymTable};

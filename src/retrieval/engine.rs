//! Retrieval Engine - 역색인 조회 + 코사인 재랭킹
//!
//! 질의당 처리: 어휘 검색으로 후보를 넓게 모은 뒤(top_k*2),
//! 질의 TF 벡터와의 코사인 유사도로 재정렬해 top_k로 자릅니다.
//!
//! 어휘 검색이 비면 코퍼스 전체를 코사인으로 스캔하는 폴백을 탑니다.
//! 코퍼스가 비어 있지 않은 한 결과가 비지 않는 것이 보장되지만,
//! 가중치 없는 단어빈도 특성상 길고 일반적인 텍스트가 유리해집니다.

use crate::corpus::{RuleRecord, ScoredRule};

use super::embedding::{cosine_similarity, TermVector};
use super::index::InvertedIndex;
use super::synonyms::SynonymTable;

// ============================================================================
// RetrievalEngine
// ============================================================================

/// 검색 엔진
///
/// 코퍼스 스냅샷에서 한 번 구축되는 불변 값입니다.
/// 구축 후에는 아무것도 변하지 않으므로 잠금 없이 병렬 읽기가 안전합니다.
pub struct RetrievalEngine {
    records: Vec<RuleRecord>,
    index: InvertedIndex,
    embeddings: Vec<TermVector>,
}

impl RetrievalEngine {
    /// 코퍼스에서 엔진 구축 (색인 + 레코드별 임베딩)
    pub fn build(records: Vec<RuleRecord>, synonyms: SynonymTable) -> Self {
        let index = InvertedIndex::build(&records, synonyms);
        let embeddings: Vec<TermVector> = records.iter().map(TermVector::embed_record).collect();

        tracing::info!("Created {} record embeddings", embeddings.len());

        Self {
            records,
            index,
            embeddings,
        }
    }

    /// 질의와 관련된 규정 검색
    ///
    /// 어휘 검색(top_k*2) → 코사인 재랭킹 → top_k.
    /// 어휘 결과가 없으면 전체 코퍼스 코사인 스캔으로 폴백합니다.
    /// 빈 코퍼스에서는 빈 목록을 반환하며 절대 실패하지 않습니다.
    pub fn find_relevant(&self, query: &str, top_k: usize) -> Vec<ScoredRule> {
        if self.records.is_empty() {
            return Vec::new();
        }

        let candidates = self.index.search(query, top_k * 2);

        if !candidates.is_empty() {
            let query_embedding = TermVector::embed(query);

            let mut scored: Vec<ScoredRule> = candidates
                .into_iter()
                .map(|(idx, _)| ScoredRule {
                    record: self.records[idx].clone(),
                    similarity: cosine_similarity(&query_embedding, &self.embeddings[idx]),
                })
                .collect();

            scored.sort_by(|a, b| {
                b.similarity
                    .partial_cmp(&a.similarity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            scored.truncate(top_k);
            return scored;
        }

        // 폴백: 전체 코퍼스 시맨틱 스캔
        tracing::debug!("Lexical search empty, falling back to full-corpus scan");
        self.scan_all(query, top_k)
    }

    /// 전체 코퍼스 코사인 스캔
    fn scan_all(&self, query: &str, top_k: usize) -> Vec<ScoredRule> {
        let query_embedding = TermVector::embed(query);

        let mut scored: Vec<ScoredRule> = self
            .records
            .iter()
            .zip(self.embeddings.iter())
            .map(|(record, embedding)| ScoredRule {
                record: record.clone(),
                similarity: cosine_similarity(&query_embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }

    /// 코퍼스 레코드 접근
    pub fn records(&self) -> &[RuleRecord] {
        &self.records
    }

    /// 코퍼스 크기
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 빈 코퍼스 여부
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 색인된 고유 토큰 수
    pub fn term_count(&self) -> usize {
        self.index.term_count()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(number: &str, title: &str, description: &str) -> RuleRecord {
        RuleRecord {
            rule_number: number.into(),
            title: title.into(),
            category: "operating_rules".into(),
            definition: "N/A".into(),
            description: description.into(),
        }
    }

    fn sample_engine() -> RetrievalEngine {
        RetrievalEngine::build(
            vec![
                rule("108.1", "Weight Limits", "drones exceeding 55 pounds"),
                rule("108.2", "Speed Limits", "maximum speed of 100 mph"),
                rule("108.3", "Altitude Limits", "must not exceed 400 feet AGL"),
            ],
            SynonymTable::builtin(),
        )
    }

    #[test]
    fn test_empty_corpus_returns_empty() {
        let engine = RetrievalEngine::build(Vec::new(), SynonymTable::builtin());
        assert!(engine.find_relevant("weight limit", 5).is_empty());
    }

    #[test]
    fn test_relevant_rule_ranks_first() {
        let engine = sample_engine();
        let results = engine.find_relevant("what is the maximum speed in mph", 5);

        assert!(!results.is_empty());
        assert_eq!(results[0].record.rule_number, "108.2");
    }

    #[test]
    fn test_synonym_query_finds_weight_rule() {
        let engine = sample_engine();
        let results = engine.find_relevant("mass", 5);

        assert!(results
            .iter()
            .any(|r| r.record.rule_number == "108.1"));
    }

    #[test]
    fn test_scores_are_in_unit_range() {
        let engine = sample_engine();
        for result in engine.find_relevant("drone weight pounds", 5) {
            assert!(result.similarity >= 0.0);
            assert!(result.similarity <= 1.0);
        }
    }

    #[test]
    fn test_fallback_scan_when_no_lexical_match() {
        // 색인에 없는 토큰만으로 질의해도 폴백 스캔이 결과를 채운다
        let engine = sample_engine();
        let results = engine.find_relevant("qqqq zzzz", 2);

        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.similarity >= 0.0);
        }
    }

    #[test]
    fn test_top_k_is_respected() {
        let engine = sample_engine();
        let results = engine.find_relevant("limits", 2);
        assert!(results.len() <= 2);
    }

    #[test]
    fn test_stored_records_never_carry_scores() {
        // 반환되는 것은 사본이며 엔진 내부 레코드는 그대로다
        let engine = sample_engine();
        let before = engine.records().to_vec();
        let _ = engine.find_relevant("weight", 5);
        assert_eq!(engine.records(), &before[..]);
    }
}

//! Inverted Index - 동의어 인지 역색인
//!
//! 포스팅을 두 계층으로 나눠 들고 있습니다:
//! - `postings`: 레코드 자신의 토큰 아래 등록 (리터럴 계층)
//! - `synonym_postings`: 레코드 토큰이 동의어 테이블의 **대표어**일 때
//!   그 동의어 구들의 정규화 형태 아래 등록 (확장 계층)
//!
//! 두 계층을 분리해야 확장의 비대칭 계약이 지켜집니다. "weight" 레코드는
//! 질의 "mass"로 도달하지만 ("mass"가 대표어 "weight"의 동의어이므로),
//! "mass"만 담은 레코드는 질의 "weight"로 도달하지 않습니다 ("mass"는
//! 대표어가 아니므로). 한 계층에 합치면 대표어 질의가 동의어와 철자가 같은
//! 리터럴 토큰의 포스팅까지 끌어와 이 계약이 깨집니다.
//!
//! 코퍼스에서 한 번 구축되며 이후 절대 변경되지 않습니다 (증분 갱신 없음).

use std::collections::HashMap;

use crate::corpus::RuleRecord;

use super::embedding::tokenize_set;
use super::synonyms::{normalize_phrase, SynonymTable};

// ============================================================================
// InvertedIndex
// ============================================================================

/// 동의어 인지 역색인
#[derive(Debug)]
pub struct InvertedIndex {
    /// 리터럴 토큰 → 레코드 인덱스 목록 (중복 없음, 등록 순서)
    postings: HashMap<String, Vec<usize>>,
    /// 동의어 정규화 형태 → 대표어를 담은 레코드 인덱스 목록
    synonym_postings: HashMap<String, Vec<usize>>,
    synonyms: SynonymTable,
}

impl InvertedIndex {
    /// 코퍼스와 동의어 테이블에서 색인 구축
    pub fn build(records: &[RuleRecord], synonyms: SynonymTable) -> Self {
        let mut postings: HashMap<String, Vec<usize>> = HashMap::new();
        let mut synonym_postings: HashMap<String, Vec<usize>> = HashMap::new();

        for (idx, record) in records.iter().enumerate() {
            let tokens = tokenize_set(&record.searchable_text());

            for token in &tokens {
                push_unique(postings.entry(token.clone()).or_default(), idx);

                // 대표어 토큰이면 동의어 구의 정규화 형태 아래에도 등록
                if let Some(phrases) = synonyms.synonyms_of(token) {
                    for phrase in phrases {
                        let normalized = normalize_phrase(phrase);
                        push_unique(synonym_postings.entry(normalized).or_default(), idx);
                    }
                }
            }
        }

        tracing::info!(
            "Built inverted index: {} literal terms, {} synonym forms over {} records",
            postings.len(),
            synonym_postings.len(),
            records.len()
        );

        Self {
            postings,
            synonym_postings,
            synonyms,
        }
    }

    /// 어휘 검색
    ///
    /// 질의를 같은 방식으로 토큰화한 뒤, 토큰별로
    /// 1) 리터럴 토큰 경로: 리터럴/확장 계층을 합쳐 그 토큰 아래의 레코드,
    /// 2) 토큰이 대표어라면 동의어 형태별 경로: 확장 계층의 각 형태 아래의
    ///    레코드를 누적합니다. 경로 하나당 레코드별 1 증가이며,
    ///    한 경로 안의 중복은 합쳐집니다.
    ///
    /// 매치 수 내림차순으로 안정 정렬하며, 동률은 코퍼스 순서를 유지합니다
    /// (그 이상의 2차 기준은 정의하지 않음).
    ///
    /// # Returns
    /// `(레코드 인덱스, 매치 수)` 최대 `top_k` 건
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(usize, usize)> {
        let query_tokens = tokenize_set(query);
        let mut match_counts: HashMap<usize, usize> = HashMap::new();

        for token in &query_tokens {
            // 리터럴 토큰 경로 (두 계층 합집합, 경로 내 중복 1회 처리)
            let mut path_hits: Vec<usize> = Vec::new();
            if let Some(ids) = self.postings.get(token) {
                for &id in ids {
                    push_unique(&mut path_hits, id);
                }
            }
            if let Some(ids) = self.synonym_postings.get(token) {
                for &id in ids {
                    push_unique(&mut path_hits, id);
                }
            }
            for id in path_hits {
                *match_counts.entry(id).or_insert(0) += 1;
            }

            // 질의 토큰이 대표어이면 동의어 형태별 경로 (확장 계층만)
            if let Some(phrases) = self.synonyms.synonyms_of(token) {
                for phrase in phrases {
                    let normalized = normalize_phrase(phrase);
                    if let Some(ids) = self.synonym_postings.get(&normalized) {
                        for &id in ids {
                            *match_counts.entry(id).or_insert(0) += 1;
                        }
                    }
                }
            }
        }

        // 코퍼스 순서로 깔아둔 뒤 매치 수 내림차순 안정 정렬
        let mut ranked: Vec<(usize, usize)> = match_counts.into_iter().collect();
        ranked.sort_by_key(|&(idx, _)| idx);
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(top_k);
        ranked
    }

    /// 색인된 고유 토큰 수 (리터럴 계층 기준)
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }
}

/// 포스팅 목록에 중복 없이 추가
fn push_unique(list: &mut Vec<usize>, idx: usize) {
    if !list.contains(&idx) {
        list.push(idx);
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

    fn sample_index() -> (Vec<RuleRecord>, InvertedIndex) {
        let records = vec![
            rule("108.1", "Weight Limits", "drones exceeding 55 pounds"),
            rule("108.2", "Speed Limits", "maximum speed of 100 mph"),
            rule("108.3", "Mass Properties", "mass distribution of the aircraft"),
        ];
        let index = InvertedIndex::build(&records, SynonymTable::builtin());
        (records, index)
    }

    #[test]
    fn test_literal_token_match() {
        let (_, index) = sample_index();
        let hits = index.search("mph", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 1);
    }

    #[test]
    fn test_synonym_expansion_reaches_weight_record() {
        // "weight"를 담은 레코드는 동의어 "mass"로 도달 가능
        let (_, index) = sample_index();
        let hits = index.search("mass", 5);
        let ids: Vec<usize> = hits.iter().map(|&(id, _)| id).collect();
        assert!(ids.contains(&0), "weight record should be reachable via mass");
        // 리터럴 "mass" 레코드도 같이 나온다
        assert!(ids.contains(&2));
    }

    #[test]
    fn test_synonym_expansion_is_asymmetric() {
        // "mass"만 담은 레코드는 질의 "weight"로 도달하지 못한다
        let (_, index) = sample_index();
        let hits = index.search("weight", 5);
        let ids: Vec<usize> = hits.iter().map(|&(id, _)| id).collect();
        assert!(ids.contains(&0));
        assert!(!ids.contains(&2), "mass-only record must not match weight");
    }

    #[test]
    fn test_tie_break_preserves_corpus_order() {
        let records = vec![
            rule("108.1", "Alpha", "shared token"),
            rule("108.2", "Beta", "shared token"),
            rule("108.3", "Gamma", "shared token"),
        ];
        let index = InvertedIndex::build(&records, SynonymTable::builtin());

        let hits = index.search("shared", 5);
        let ids: Vec<usize> = hits.iter().map(|&(id, _)| id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_more_matching_tokens_rank_higher() {
        let (_, index) = sample_index();
        let hits = index.search("maximum speed mph", 5);
        assert_eq!(hits[0].0, 1);
        assert!(hits[0].1 >= 2);
    }

    #[test]
    fn test_canonical_query_reaches_multiword_synonym_form() {
        // 레코드의 "altitude"는 대표어이므로 "height_limit" 형태 아래에 등록되고,
        // 질의 "altitude"는 리터럴 + 형태별 경로로 매치 수가 커진다
        let records = vec![rule("108.4", "Altitude Rules", "altitude must not exceed 400 feet")];
        let index = InvertedIndex::build(&records, SynonymTable::builtin());

        let hits = index.search("altitude", 5);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].1 >= 2);
    }

    #[test]
    fn test_top_k_truncation() {
        let (_, index) = sample_index();
        let hits = index.search("limits", 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_empty_corpus_returns_nothing() {
        let index = InvertedIndex::build(&[], SynonymTable::builtin());
        assert!(index.search("weight", 5).is_empty());
    }

    #[test]
    fn test_no_match_returns_empty() {
        let (_, index) = sample_index();
        assert!(index.search("zzzzz", 5).is_empty());
    }
}

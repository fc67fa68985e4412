//! Corpus 모듈 - Part 108 규정 레코드 데이터 모델 및 로더
//!
//! 파서 파이프라인이 생성한 JSON 파일(`parsed_rules.json`)을 읽어
//! 규정 레코드 목록을 만듭니다. 로드 후에는 프로세스 종료까지 불변입니다.
//!
//! 로드 실패는 프로세스를 죽이지 않고 빈 코퍼스로 강등됩니다.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 누락된 필드에 들어가는 플레이스홀더 값
pub const FIELD_PLACEHOLDER: &str = "N/A";

// ============================================================================
// Types
// ============================================================================

/// 규정 레코드
///
/// 코퍼스의 단위입니다. 모든 필드는 자유 텍스트이며,
/// JSON에 없는 필드는 플레이스홀더로 채워집니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    #[serde(default = "placeholder")]
    pub rule_number: String,
    #[serde(default = "placeholder")]
    pub title: String,
    #[serde(default = "placeholder")]
    pub category: String,
    #[serde(default = "placeholder")]
    pub definition: String,
    #[serde(default = "placeholder")]
    pub description: String,
}

impl RuleRecord {
    /// 색인/지식베이스 구축에 쓰이는 검색 대상 텍스트
    ///
    /// title + description + definition 순서로 연결합니다.
    pub fn searchable_text(&self) -> String {
        format!("{} {} {}", self.title, self.description, self.definition)
    }
}

/// 검색 결과로 반환되는 레코드 사본
///
/// `similarity`는 검색 시점에만 붙는 일시적 값입니다.
/// 저장된 레코드는 절대 점수를 갖지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRule {
    #[serde(flatten)]
    pub record: RuleRecord,
    #[serde(rename = "similarity_score")]
    pub similarity: f32,
}

/// 코퍼스 로드 에러
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse rules file: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// Loader
// ============================================================================

/// 규정 파일 로드 (실패 시 빈 코퍼스)
///
/// I/O 또는 파싱 실패는 경고 로그 후 빈 목록을 반환합니다.
/// 이후의 모든 질의는 빈 검색 결과와 기본 후속 질문을 받게 됩니다.
pub fn load_rules(path: &Path) -> Vec<RuleRecord> {
    match try_load_rules(path) {
        Ok(rules) => {
            tracing::info!("Loaded {} rule records from {:?}", rules.len(), path);
            rules
        }
        Err(e) => {
            tracing::warn!("Failed to load rules from {:?}: {} (using empty corpus)", path, e);
            Vec::new()
        }
    }
}

/// 규정 파일 로드 (에러 전파 버전)
pub fn try_load_rules(path: &Path) -> Result<Vec<RuleRecord>, CorpusError> {
    let raw = std::fs::read_to_string(path)?;
    let rules: Vec<RuleRecord> = serde_json::from_str(&raw)?;
    Ok(rules)
}

fn placeholder() -> String {
    FIELD_PLACEHOLDER.to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_fields_get_placeholder() {
        let record: RuleRecord =
            serde_json::from_str(r#"{"rule_number": "108.1", "title": "Applicability"}"#).unwrap();

        assert_eq!(record.rule_number, "108.1");
        assert_eq!(record.title, "Applicability");
        assert_eq!(record.category, FIELD_PLACEHOLDER);
        assert_eq!(record.definition, FIELD_PLACEHOLDER);
        assert_eq!(record.description, FIELD_PLACEHOLDER);
    }

    #[test]
    fn test_load_rules_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"[
                {"rule_number": "108.1", "title": "Weight Limits",
                 "category": "operating_rules",
                 "description": "drones exceeding 55 pounds"},
                {"rule_number": "108.2", "title": "Speed Limits"}
            ]"#,
        )
        .unwrap();

        let rules = load_rules(&path);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].title, "Weight Limits");
        assert_eq!(rules[1].definition, FIELD_PLACEHOLDER);
    }

    #[test]
    fn test_load_missing_file_degrades_to_empty() {
        let rules = load_rules(Path::new("/nonexistent/rules.json"));
        assert!(rules.is_empty());
    }

    #[test]
    fn test_load_malformed_json_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not valid json").unwrap();

        let rules = load_rules(&path);
        assert!(rules.is_empty());
    }

    #[test]
    fn test_searchable_text_field_order() {
        let record = RuleRecord {
            rule_number: "108.1".into(),
            title: "Title".into(),
            category: "cat".into(),
            definition: "Def".into(),
            description: "Desc".into(),
        };
        assert_eq!(record.searchable_text(), "Title Desc Def");
    }
}

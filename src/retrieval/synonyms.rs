//! Synonym Table - 정적 용어 확장 맵
//!
//! 대표어(canonical term) → 동의어 구(phrase) 목록의 고정 매핑입니다.
//! 프로세스 전체에서 불변이며, 색인 구축과 질의 확장 양쪽에서 쓰입니다.
//!
//! 확장은 **비대칭**입니다: "mass"는 대표어 "weight"의 동의어이므로
//! "weight"를 담은 레코드는 질의 "mass"로 도달할 수 있지만,
//! "mass"만 담은 레코드는 질의 "weight"로 도달하지 못합니다.
//! 이 비대칭은 버그가 아니라 계약입니다.

use std::collections::HashMap;

// ============================================================================
// SynonymTable
// ============================================================================

/// 동의어 테이블
///
/// 대표어 → 동의어 구 목록. 구축 후 불변입니다.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    entries: HashMap<&'static str, &'static [&'static str]>,
}

impl SynonymTable {
    /// 내장 드론 규정 도메인 테이블
    pub fn builtin() -> Self {
        let mut entries: HashMap<&'static str, &'static [&'static str]> = HashMap::new();

        entries.insert(
            "weight",
            &[
                "mass",
                "pound",
                "lb",
                "lbs",
                "weight limit",
                "maximum weight",
                "weight restriction",
                "weight requirement",
                "weight capacity",
                "pound limit",
                "mass limit",
            ][..],
        );
        entries.insert(
            "speed",
            &[
                "velocity",
                "mph",
                "knots",
                "knot",
                "speed limit",
                "maximum speed",
                "speed restriction",
                "velocity limit",
                "mph limit",
                "airspeed",
            ],
        );
        entries.insert(
            "altitude",
            &[
                "height",
                "feet",
                "ft",
                "AGL",
                "altitude limit",
                "maximum altitude",
                "height limit",
                "ceiling",
                "AGL limit",
                "above ground level",
            ],
        );
        entries.insert(
            "drone",
            &[
                "UAS",
                "UA",
                "unmanned aircraft",
                "unmanned aircraft system",
                "quadcopter",
                "multirotor",
            ],
        );
        entries.insert(
            "limit",
            &["maximum", "restriction", "requirement", "cap", "ceiling", "threshold"],
        );
        entries.insert(
            "permit",
            &["certificate", "license", "authorization", "approval", "clearance"],
        );
        entries.insert(
            "operation",
            &["flight", "mission", "operation", "flying", "piloting"],
        );
        entries.insert(
            "distance",
            &["range", "radius", "proximity", "separation", "away"],
        );
        entries.insert(
            "safety",
            &["security", "protection", "precaution", "safeguard"],
        );
        entries.insert(
            "regulation",
            &["rule", "law", "requirement", "standard", "guideline"],
        );
        entries.insert(
            "beyond",
            &["BVLOS", "beyond visual line of sight", "out of sight"],
        );
        entries.insert(
            "visual",
            &["sight", "view", "line of sight", "LOS", "VLOS"],
        );

        Self { entries }
    }

    /// 대표어의 동의어 구 목록 조회
    pub fn synonyms_of(&self, term: &str) -> Option<&'static [&'static str]> {
        self.entries.get(term).copied()
    }

    /// 대표어 여부
    pub fn is_canonical(&self, term: &str) -> bool {
        self.entries.contains_key(term)
    }

    /// 테이블 크기 (대표어 수)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 빈 테이블 여부
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 동의어 구를 색인 토큰 형태로 정규화
///
/// 소문자화 후 공백을 언더스코어로 치환합니다.
/// 예: "beyond visual line of sight" → "beyond_visual_line_of_sight"
pub fn normalize_phrase(phrase: &str) -> String {
    phrase.to_lowercase().replace(' ', "_")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_weight_synonyms() {
        let table = SynonymTable::builtin();
        let syns = table.synonyms_of("weight").unwrap();
        assert!(syns.contains(&"mass"));
        assert!(syns.contains(&"lbs"));
    }

    #[test]
    fn test_asymmetry_mass_is_not_canonical() {
        let table = SynonymTable::builtin();
        assert!(table.is_canonical("weight"));
        assert!(!table.is_canonical("mass"));
    }

    #[test]
    fn test_normalize_phrase() {
        assert_eq!(normalize_phrase("weight limit"), "weight_limit");
        assert_eq!(
            normalize_phrase("beyond visual line of sight"),
            "beyond_visual_line_of_sight"
        );
        assert_eq!(normalize_phrase("BVLOS"), "bvlos");
    }
}

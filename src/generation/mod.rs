//! Generation 모듈 - Gemini API를 통한 답변 생성 + 추출식 폴백
//!
//! 검색된 규정을 컨텍스트로 묶어 Gemini generateContent를 호출합니다.
//! API 키가 없거나 호출이 실패하면 규정 상위 2~3건을 그대로 발췌하는
//! 폴백 답변으로 내려갑니다. 폴백 분기는 명시적 Result 매칭이며,
//! 질의 처리 자체는 절대 실패하지 않습니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let provider = GeminiAnswer::from_env()?;
//! let answer = answer_or_fallback(Some(&provider), query, &rules, None).await;
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::corpus::{ScoredRule, FIELD_PLACEHOLDER};

// ============================================================================
// Constants
// ============================================================================

/// Gemini 텍스트 생성 API 엔드포인트
/// source: https://ai.google.dev/gemini-api/docs/text-generation
const GEMINI_GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

/// HTTP 요청 타임아웃
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 짧은 폴백 답변에서 definition 발췌 길이 (문자)
const SHORT_EXCERPT_CHARS: usize = 150;

/// 상세 폴백 답변에서 definition 발췌 길이 (문자)
const DETAILED_EXCERPT_CHARS: usize = 300;

// ============================================================================
// Types
// ============================================================================

/// 답변 길이 선호
///
/// 지정하지 않으면 상세 답변 지침을 씁니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryPreference {
    /// 2~3문장 요약
    Short,
    /// 규칙 번호/예외/실무 함의를 포함한 상세 답변
    Detailed,
}

impl SummaryPreference {
    /// CLI 인자 파싱 ("short" / "detailed", 대소문자 무시)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "short" => Some(Self::Short),
            "detailed" => Some(Self::Detailed),
            _ => None,
        }
    }
}

// ============================================================================
// AnswerProvider Trait
// ============================================================================

/// 답변 프로바이더 트레이트
///
/// 질의 + 검색 규정 컨텍스트를 받아 자연어 답변을 생성하는 인터페이스입니다.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// 답변 생성
    async fn generate(
        &self,
        query: &str,
        rules: &[ScoredRule],
        preference: Option<SummaryPreference>,
    ) -> Result<String>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Google Gemini Answer
// ============================================================================

/// Google Gemini 답변 구현체
#[derive(Debug)]
pub struct GeminiAnswer {
    api_key: String,
    client: reqwest::Client,
}

impl GeminiAnswer {
    /// 새 Gemini 답변 인스턴스 생성
    ///
    /// # Arguments
    /// * `api_key` - Google AI API 키
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { api_key, client })
    }

    /// 환경변수에서 API 키를 읽어 생성
    ///
    /// 우선순위: GEMINI_API_KEY > GOOGLE_AI_API_KEY
    pub fn from_env() -> Result<Self> {
        let api_key = get_api_key()?;
        Self::new(api_key)
    }

    /// 프롬프트 구성 (규정 컨텍스트 + 질의 + 길이 지침)
    fn build_prompt(
        query: &str,
        rules: &[ScoredRule],
        preference: Option<SummaryPreference>,
    ) -> String {
        let context = rules
            .iter()
            .map(|r| {
                format!(
                    "Rule {}: {}\nCategory: {}\nDefinition: {}\nDescription: {}",
                    r.record.rule_number,
                    r.record.title,
                    r.record.category,
                    r.record.definition,
                    r.record.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let length_instruction = match preference {
            Some(SummaryPreference::Short) => {
                "Please provide a CONCISE answer (2-3 sentences maximum). Focus on the key \
                 facts and specific rule numbers. Be brief and to the point."
            }
            Some(SummaryPreference::Detailed) => {
                "Please provide a COMPREHENSIVE and DETAILED answer. Include all relevant \
                 information, specific rule numbers, examples, exceptions, and practical \
                 implications. Be thorough and complete."
            }
            None => {
                "Please provide a clear, detailed answer based on the regulations above. \
                 Include specific rule numbers when applicable."
            }
        };

        format!(
            "You are an expert drone regulation assistant. Based on the following FAA drone \
             regulations, answer the user's question accurately and comprehensively.\n\n\
             RELEVANT REGULATIONS:\n{}\n\n\
             USER QUESTION: {}\n\n\
             {}\n\
             If the regulations don't contain enough information to fully answer the question, \
             acknowledge this and provide what information is available.",
            context, query, length_instruction
        )
    }
}

/// Gemini API 요청 본문
/// source: https://ai.google.dev/gemini-api/docs/text-generation
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<GenerateContent>,
}

#[derive(Debug, Serialize)]
struct GenerateContent {
    parts: Vec<GeneratePart>,
}

#[derive(Debug, Serialize)]
struct GeneratePart {
    text: String,
}

/// Gemini API 응답
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<GenerateCandidate>,
}

#[derive(Debug, Deserialize)]
struct GenerateCandidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

/// Gemini API 에러 응답
#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[serde(default)]
    status: String,
}

#[async_trait]
impl AnswerProvider for GeminiAnswer {
    async fn generate(
        &self,
        query: &str,
        rules: &[ScoredRule],
        preference: Option<SummaryPreference>,
    ) -> Result<String> {
        let prompt = Self::build_prompt(query, rules, preference);

        let request = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![GeneratePart { text: prompt }],
            }],
        };

        // API 키는 URL이 아닌 헤더로 전송
        let response = self
            .client
            .post(GEMINI_GENERATE_URL)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send generation request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<GeminiError>(&body) {
                anyhow::bail!(
                    "Gemini API error ({}): {}",
                    error.error.status,
                    error.error.message
                );
            }
            anyhow::bail!("Gemini API error ({}): {}", status, body);
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).context("Failed to parse generation response")?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .context("Gemini response contained no candidates")?;

        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini-2.5-flash"
    }
}

// ============================================================================
// Extractive Fallback
// ============================================================================

/// 추출식 폴백 답변
///
/// API 없이 검색 규정에서 직접 구성합니다. 짧은 선호는 상위 2건의
/// definition 150자, 그 외에는 상위 3건의 300자를 발췌합니다.
pub fn fallback_answer(rules: &[ScoredRule], preference: Option<SummaryPreference>) -> String {
    if rules.is_empty() {
        return "I couldn't find any relevant drone regulations for your query. \
                Please try rephrasing your question."
            .to_string();
    }

    let mut response = String::new();

    if preference == Some(SummaryPreference::Short) {
        response.push_str("Based on the regulations:\n\n");
        for rule in rules.iter().take(2) {
            response.push_str(&format!(
                "**Rule {}**: {}\n{}...\n\n",
                rule.record.rule_number,
                rule.record.title,
                truncate_chars(&rule.record.definition, SHORT_EXCERPT_CHARS)
            ));
        }
    } else {
        response.push_str("Based on the drone regulations, here's what I found:\n\n");
        for (i, rule) in rules.iter().take(3).enumerate() {
            response.push_str(&format!(
                "{}. **Rule {} - {}**\n   Category: {}\n   {}...\n\n",
                i + 1,
                rule.record.rule_number,
                rule.record.title,
                rule.record.category,
                truncate_chars(&rule.record.definition, DETAILED_EXCERPT_CHARS)
            ));
        }
    }

    response.push_str(
        "\n*Note: Gemini API key not configured. Set GEMINI_API_KEY environment variable \
         for enhanced AI responses.*",
    );
    response
}

/// 답변 생성 또는 폴백
///
/// 프로바이더가 없으면 즉시 폴백, 있으면 호출 결과를 매칭해
/// Err일 때만 경고 로그 후 폴백합니다. 이 함수는 실패하지 않습니다.
pub async fn answer_or_fallback(
    provider: Option<&dyn AnswerProvider>,
    query: &str,
    rules: &[ScoredRule],
    preference: Option<SummaryPreference>,
) -> String {
    match provider {
        Some(provider) => match provider.generate(query, rules, preference).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Answer generation failed, using fallback: {:#}", e);
                fallback_answer(rules, preference)
            }
        },
        None => fallback_answer(rules, preference),
    }
}

/// 문자 경계 안전 발췌
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text == FIELD_PLACEHOLDER {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (환경변수에서)
///
/// 우선순위:
/// 1. `GEMINI_API_KEY` 환경변수
/// 2. `GOOGLE_AI_API_KEY` 환경변수
pub fn get_api_key() -> Result<String> {
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            tracing::debug!("Using API key from GEMINI_API_KEY");
            return Ok(key);
        }
    }

    if let Ok(key) = std::env::var("GOOGLE_AI_API_KEY") {
        if !key.is_empty() {
            tracing::debug!("Using API key from GOOGLE_AI_API_KEY");
            return Ok(key);
        }
    }

    anyhow::bail!(
        "API key not found. Set GEMINI_API_KEY or GOOGLE_AI_API_KEY environment variable.\n\
         Get your API key at: https://aistudio.google.com/app/apikey"
    )
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    for var in ["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"] {
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() {
                return true;
            }
        }
    }
    false
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::RuleRecord;

    fn scored(number: &str, title: &str, definition: &str) -> ScoredRule {
        ScoredRule {
            record: RuleRecord {
                rule_number: number.into(),
                title: title.into(),
                category: "operating_rules".into(),
                definition: definition.into(),
                description: "Description text".into(),
            },
            similarity: 0.9,
        }
    }

    #[test]
    fn test_preference_parse() {
        assert_eq!(SummaryPreference::parse("short"), Some(SummaryPreference::Short));
        assert_eq!(
            SummaryPreference::parse(" Detailed "),
            Some(SummaryPreference::Detailed)
        );
        assert_eq!(SummaryPreference::parse("medium"), None);
    }

    #[test]
    fn test_fallback_empty_rules() {
        let answer = fallback_answer(&[], None);
        assert!(answer.contains("couldn't find any relevant"));
    }

    #[test]
    fn test_fallback_short_uses_top_two() {
        let rules = vec![
            scored("108.1", "Weight Limits", "Maximum weight restrictions"),
            scored("108.2", "Speed Limits", "Maximum speed restrictions"),
            scored("108.3", "Altitude Limits", "Maximum altitude restrictions"),
        ];

        let answer = fallback_answer(&rules, Some(SummaryPreference::Short));
        assert!(answer.contains("108.1"));
        assert!(answer.contains("108.2"));
        assert!(!answer.contains("108.3"));
    }

    #[test]
    fn test_fallback_detailed_uses_top_three() {
        let rules = vec![
            scored("108.1", "Weight Limits", "Maximum weight restrictions"),
            scored("108.2", "Speed Limits", "Maximum speed restrictions"),
            scored("108.3", "Altitude Limits", "Maximum altitude restrictions"),
            scored("108.4", "Night Operations", "Night flight rules"),
        ];

        let answer = fallback_answer(&rules, None);
        assert!(answer.contains("108.3"));
        assert!(!answer.contains("108.4"));
        assert!(answer.contains("Category: operating_rules"));
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        // 멀티바이트 문자에서 패닉하지 않는다
        let text = "규정 텍스트가 길어질 때의 발췌 동작";
        let truncated = truncate_chars(text, 5);
        assert_eq!(truncated.chars().count(), 5);
    }

    #[test]
    fn test_build_prompt_contains_context_and_query() {
        let rules = vec![scored("108.1", "Weight Limits", "Maximum weight")];
        let prompt =
            GeminiAnswer::build_prompt("what is the weight limit", &rules, None);

        assert!(prompt.contains("Rule 108.1: Weight Limits"));
        assert!(prompt.contains("USER QUESTION: what is the weight limit"));
    }

    #[test]
    fn test_build_prompt_length_instruction_varies() {
        let rules = vec![scored("108.1", "Weight Limits", "Maximum weight")];
        let short =
            GeminiAnswer::build_prompt("q", &rules, Some(SummaryPreference::Short));
        let detailed =
            GeminiAnswer::build_prompt("q", &rules, Some(SummaryPreference::Detailed));

        assert!(short.contains("CONCISE"));
        assert!(detailed.contains("COMPREHENSIVE"));
    }

    #[tokio::test]
    async fn test_answer_or_fallback_without_provider() {
        let rules = vec![scored("108.1", "Weight Limits", "Maximum weight")];
        let answer = answer_or_fallback(None, "weight limit", &rules, None).await;
        assert!(answer.contains("108.1"));
    }
}

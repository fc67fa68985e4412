//! CLI 모듈
//!
//! part108-rag CLI 명령어 정의 및 구현

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::assistant::{QueryOutcome, RuleAssistant};
use crate::generation::{
    answer_or_fallback, has_api_key, AnswerProvider, GeminiAnswer, SummaryPreference,
};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "part108-rag")]
#[command(version, about = "FAA Part 108 드론 규정 QA 엔진", long_about = None)]
pub struct Cli {
    /// 규정 JSON 파일 경로
    #[arg(long = "rules", global = true, default_value = "parsed_rules.json")]
    pub rules_path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 규정에 대해 질문
    Ask {
        /// 질문
        query: String,

        /// 검색 결과 개수 제한
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// 짧은 요약 답변 (2~3문장)
        #[arg(long, conflicts_with = "detailed")]
        short: bool,

        /// 상세 답변
        #[arg(long)]
        detailed: bool,
    },

    /// 저장된 규정 목록
    Rules {
        /// 카테고리 필터
        #[arg(short, long)]
        category: Option<String>,

        /// 결과 개수 제한
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// 규정 카테고리 목록
    Categories,

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let assistant = RuleAssistant::from_file(&cli.rules_path);

    match cli.command {
        Commands::Ask {
            query,
            limit,
            short,
            detailed,
        } => {
            let preference = if short {
                Some(SummaryPreference::Short)
            } else if detailed {
                Some(SummaryPreference::Detailed)
            } else {
                None
            };
            cmd_ask(&assistant, &query, limit, preference).await
        }
        Commands::Rules { category, limit } => cmd_rules(&assistant, category, limit),
        Commands::Categories => cmd_categories(&assistant),
        Commands::Status => cmd_status(&assistant, &cli.rules_path),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 질문 명령어 (ask)
///
/// 검색 + 답변 생성 + 후속 질문 출력. API 키가 없거나 호출이 실패하면
/// 추출식 폴백 답변으로 내려가며, 명령 자체는 실패하지 않습니다.
async fn cmd_ask(
    assistant: &RuleAssistant,
    query: &str,
    limit: usize,
    preference: Option<SummaryPreference>,
) -> Result<()> {
    println!("[*] 검색 중: \"{}\"", query);

    match assistant.respond(query, limit) {
        QueryOutcome::Greeting {
            message,
            follow_ups,
        } => {
            println!("\n{}", message);
            print_followups(&follow_ups);
        }
        QueryOutcome::Answers { rules, follow_ups } => {
            if rules.is_empty() {
                println!("\n[!] 관련 규정을 찾지 못했습니다.");
            } else {
                println!("\n[OK] 관련 규정 ({} 건):\n", rules.len());
                for (i, rule) in rules.iter().enumerate() {
                    println!(
                        "{}. [점수: {:.4}] Rule {} - {}",
                        i + 1,
                        rule.similarity,
                        rule.record.rule_number,
                        rule.record.title
                    );
                    println!("   카테고리: {}", rule.record.category);
                    println!("   {}", truncate_text(&rule.record.definition, 200));
                    println!();
                }
            }

            // 답변 생성 (키가 없으면 프로바이더 없이 바로 폴백)
            let provider: Option<GeminiAnswer> = if has_api_key() {
                match GeminiAnswer::from_env() {
                    Ok(p) => Some(p),
                    Err(e) => {
                        tracing::warn!("Failed to create answer provider: {:#}", e);
                        None
                    }
                }
            } else {
                None
            };

            let answer = answer_or_fallback(
                provider.as_ref().map(|p| p as &dyn AnswerProvider),
                query,
                &rules,
                preference,
            )
            .await;

            println!("--- 답변 ---\n{}\n", answer);
            print_followups(&follow_ups);
        }
    }

    Ok(())
}

/// 규정 목록 명령어 (rules)
fn cmd_rules(assistant: &RuleAssistant, category: Option<String>, limit: usize) -> Result<()> {
    let records: Vec<_> = assistant
        .records()
        .iter()
        .filter(|r| {
            category
                .as_deref()
                .map(|c| r.category.eq_ignore_ascii_case(c))
                .unwrap_or(true)
        })
        .take(limit)
        .collect();

    if records.is_empty() {
        println!("[!] 표시할 규정이 없습니다.");
        return Ok(());
    }

    println!("[OK] 규정 목록 ({} 건):\n", records.len());

    for record in records {
        println!("  Rule {:<8} [{}] {}", record.rule_number, record.category, record.title);
        println!("        {}", truncate_text(&record.definition, 120));
        println!();
    }

    Ok(())
}

/// 카테고리 목록 명령어 (categories)
fn cmd_categories(assistant: &RuleAssistant) -> Result<()> {
    let categories = &assistant.knowledge().categories;

    if categories.is_empty() {
        println!("[!] 카테고리가 없습니다.");
        return Ok(());
    }

    println!("[OK] 카테고리 ({} 개):\n", categories.len());
    for category in categories {
        println!("  - {}", category);
    }

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(assistant: &RuleAssistant, rules_path: &std::path::Path) -> Result<()> {
    println!("part108-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 규정 파일: {}", rules_path.display());

    if assistant.is_empty() {
        println!("[!] 로드된 규정: 0 건 (파일 누락 또는 파싱 실패)");
    } else {
        println!("[OK] 로드된 규정: {} 건", assistant.len());
        println!("     색인 토큰: {} 개", assistant.term_count());

        let kb = assistant.knowledge();
        println!("     주요 단어: {} 개", kb.important_words.len());
        println!("     카테고리: {} 개", kb.categories.len());
        println!("     수치 값: {} 개", kb.numerical_values.len());
        println!("     핵심 구: {} 개", kb.key_phrases.len());
    }

    // API 키 상태
    if has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정 (추출식 폴백 답변 사용)");
        println!("    설정: export GEMINI_API_KEY=your-key");
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 후속 질문 출력
fn print_followups(follow_ups: &[String]) {
    if follow_ups.is_empty() {
        return;
    }

    println!("--- 후속 질문 ---");
    for (i, q) in follow_ups.iter().enumerate() {
        println!("  {}. {}", i + 1, q);
    }
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Job description analysis and ad generation through the LLM.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::jobs::prompts::{AD_PROMPT_TEMPLATE, AD_SYSTEM, ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM};
use crate::llm_client::prompts::{fill_template, INCLUSIVE_LANGUAGE_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{complete_json, TextGenerator};
use crate::models::job::JobPositionRow;
use crate::payroll::calc::format_cents;

/// Descriptions longer than this are cut before prompting.
pub const MAX_DESCRIPTION_CHARS: usize = 20_000;
pub const DEFAULT_AD_LANGUAGE: &str = "Spanish";
pub const DEFAULT_AD_TONE: &str = "warm and professional";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAnalysis {
    pub hard_requirements: Vec<String>,
    #[serde(default)]
    pub soft_signals: Vec<String>,
    #[serde(default = "unknown_seniority")]
    pub seniority: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

fn unknown_seniority() -> String {
    "unknown".to_string()
}

/// Trims and truncates a description on a char boundary. Empty input is rejected.
pub fn prepare_description(text: &str) -> Result<&str, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation(
            "Job description text is empty".to_string(),
        ));
    }
    Ok(match text.char_indices().nth(MAX_DESCRIPTION_CHARS) {
        Some((cut, _)) => &text[..cut],
        None => text,
    })
}

pub async fn analyze_description(
    llm: &dyn TextGenerator,
    description: &str,
) -> Result<JobAnalysis, AppError> {
    let description = prepare_description(description)?;
    let prompt = fill_template(ANALYSIS_PROMPT_TEMPLATE, &[("description", description)]);
    let system = format!("{ANALYSIS_SYSTEM} {JSON_ONLY_SYSTEM}");
    complete_json::<JobAnalysis>(llm, &prompt, &system)
        .await
        .map_err(|e| AppError::Llm(format!("Job analysis failed: {e}")))
}

#[derive(Debug, Default, Deserialize)]
pub struct AdOptions {
    pub tone: Option<String>,
    pub language: Option<String>,
}

fn salary_range(position: &JobPositionRow) -> String {
    match (position.salary_min_cents, position.salary_max_cents) {
        (Some(min), Some(max)) => format!("{} - {}", format_cents(min), format_cents(max)),
        (Some(min), None) => format!("from {}", format_cents(min)),
        (None, Some(max)) => format!("up to {}", format_cents(max)),
        (None, None) => "not disclosed".to_string(),
    }
}

pub fn build_ad_prompt(company_name: &str, position: &JobPositionRow, options: &AdOptions) -> String {
    let non_blank = |value: &Option<String>, default: &'static str| -> String {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
            .to_string()
    };
    let requirements = if position.requirements.0.is_empty() {
        "- (none listed)".to_string()
    } else {
        position
            .requirements
            .0
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let language = non_blank(&options.language, DEFAULT_AD_LANGUAGE);
    let tone = non_blank(&options.tone, DEFAULT_AD_TONE);
    let salary = salary_range(position);

    fill_template(
        AD_PROMPT_TEMPLATE,
        &[
            ("language", language.as_str()),
            ("tone", tone.as_str()),
            ("company", company_name),
            ("title", position.title.as_str()),
            ("department", position.department.as_str()),
            ("salary", salary.as_str()),
            ("description", position.description.as_str()),
            ("requirements", requirements.as_str()),
        ],
    )
}

pub async fn generate_ad(
    llm: &dyn TextGenerator,
    company_name: &str,
    position: &JobPositionRow,
    options: &AdOptions,
) -> Result<String, AppError> {
    let prompt = build_ad_prompt(company_name, position, options);
    let system = format!("{AD_SYSTEM} {INCLUSIVE_LANGUAGE_INSTRUCTION}");
    llm.complete(&prompt, &system)
        .await
        .map_err(|e| AppError::Llm(format!("Ad generation failed: {e}")))
}

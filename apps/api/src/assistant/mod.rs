//! HR assistant: answers questions from the company manual.

pub mod handlers;
pub mod prompts;

use serde::{Deserialize, Serialize};

use crate::assistant::prompts::{ASSISTANT_PROMPT_TEMPLATE, ASSISTANT_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::prompts::{fill_template, JSON_ONLY_SYSTEM};
use crate::llm_client::{complete_json, TextGenerator};
use crate::models::manual::ManualSectionRow;

pub const MAX_QUESTION_CHARS: usize = 2000;
/// Character budget for the manual inside the prompt.
pub const MANUAL_CHAR_BUDGET: usize = 12_000;
const EMPTY_MANUAL_MARKER: &str = "(The manual has no sections yet.)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantAnswer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

pub fn validate_question(question: &str) -> Result<&str, AppError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("Question cannot be empty".to_string()));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(AppError::Validation(format!(
            "Question cannot exceed {MAX_QUESTION_CHARS} characters"
        )));
    }
    Ok(question)
}

/// Renders sections in order until the budget is spent. The section that
/// crosses the budget is cut; later ones are left out. Returns the text and
/// the titles that made it in.
pub fn manual_excerpt(sections: &[ManualSectionRow], budget: usize) -> (String, Vec<String>) {
    let mut text = String::new();
    let mut titles = Vec::new();
    let mut used = 0;
    for section in sections {
        if used >= budget {
            break;
        }
        let block = format!("## {}\n{}\n\n", section.title.trim(), section.body.trim());
        let len = block.chars().count();
        if used + len <= budget {
            text.push_str(&block);
            used += len;
        } else {
            text.extend(block.chars().take(budget - used));
            text.push_str("\n[...]\n");
            used = budget;
        }
        titles.push(section.title.trim().to_string());
    }
    (text, titles)
}

pub async fn ask(
    llm: &dyn TextGenerator,
    company_name: &str,
    sections: &[ManualSectionRow],
    question: &str,
) -> Result<AssistantAnswer, AppError> {
    let question = validate_question(question)?;
    let (mut manual, titles) = manual_excerpt(sections, MANUAL_CHAR_BUDGET);
    // The model still answers, so the refusal comes back in the question's language.
    if titles.is_empty() {
        manual = EMPTY_MANUAL_MARKER.to_string();
    }

    let prompt = fill_template(
        ASSISTANT_PROMPT_TEMPLATE,
        &[
            ("company", company_name),
            ("manual", manual.as_str()),
            ("question", question),
        ],
    );
    let system = format!("{ASSISTANT_SYSTEM} {JSON_ONLY_SYSTEM}");
    let mut reply = complete_json::<AssistantAnswer>(llm, &prompt, &system)
        .await
        .map_err(|e| AppError::Llm(format!("Assistant failed: {e}")))?;

    // Only cite sections the model was actually shown, under their real titles.
    let mut sources: Vec<String> = Vec::new();
    for cited in &reply.sources {
        if let Some(title) = titles.iter().find(|t| t.eq_ignore_ascii_case(cited.trim())) {
            if !sources.contains(title) {
                sources.push(title.clone());
            }
        }
    }
    reply.sources = sources;
    Ok(reply)
}

/// System prompt for the HR assistant. Append `JSON_ONLY_SYSTEM`.
pub const ASSISTANT_SYSTEM: &str = "You are the HR assistant of a company. You answer \
    employees' questions using ONLY the company manual you are given. If the manual does \
    not cover the question, say so plainly and suggest asking HR. Never invent policies, \
    figures or dates. Answer in the same language as the question.";

/// Assistant prompt template. Replace: {company}, {manual}, {question}
pub const ASSISTANT_PROMPT_TEMPLATE: &str = r#"Company: {company}

COMPANY MANUAL (each section starts with a level-2 Markdown heading):
{manual}

QUESTION:
{question}

Return a JSON object with this EXACT schema:
{
  "answer": "Your answer for the employee.",
  "sources": ["Exact title of each manual section you relied on"]
}
If the manual does not answer the question, return an empty "sources" list."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_template_has_every_placeholder() {
        for placeholder in ["{company}", "{manual}", "{question}"] {
            assert!(
                ASSISTANT_PROMPT_TEMPLATE.contains(placeholder),
                "missing {placeholder}"
            );
        }
        assert!(ASSISTANT_PROMPT_TEMPLATE.ends_with("empty \"sources\" list."));
    }
}

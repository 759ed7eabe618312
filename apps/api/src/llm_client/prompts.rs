// Shared prompt fragments. Each module that needs LLM calls defines its own
// prompts.rs alongside it; this file holds the cross-cutting pieces.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps generated HR text free of discriminatory wording.
pub const INCLUSIVE_LANGUAGE_INSTRUCTION: &str = "\
    Use inclusive, gender-neutral language. Never mention or imply preferences \
    about age, gender, nationality, religion, disability, family status or any \
    other protected characteristic.";

/// Fills `{name}` placeholders in a template in a single pass.
/// Substituted values are copied verbatim, so braces inside them are never
/// expanded. Unknown placeholders and other braces are kept as written.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substitution = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match substitution {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

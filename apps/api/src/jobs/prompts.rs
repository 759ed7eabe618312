// Prompt constants for job analysis and ad generation.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for job description analysis. Append `JSON_ONLY_SYSTEM`.
pub const ANALYSIS_SYSTEM: &str = "You are an experienced HR analyst who reads job \
    descriptions for small and medium companies and extracts what the role actually needs.";

/// Analysis prompt template. Replace `{description}` before sending.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the following job description.

Return a JSON object with this EXACT schema (no extra fields):
{
  "hard_requirements": ["3+ years of payroll administration"],
  "soft_signals": ["Comfortable presenting to management"],
  "seniority": "mid",
  "keywords": ["payroll", "Excel", "labor law"],
  "summary": "One or two sentences describing the role."
}

Rules:
- HARD REQUIREMENTS are explicit must-haves: "required", "must have", minimum years, mandatory certifications.
- SOFT SIGNALS are nice-to-haves and behavioural traits: "preferred", "a plus", "team player".
- SENIORITY is one of "junior", "mid", "senior", "lead", "executive" or "unknown".
- KEYWORDS are skills, tools and domain terms, most important first, at most 15.
- Write the summary in the same language as the description.

JOB DESCRIPTION:
{description}"#;

/// System prompt for job ad generation. Append `INCLUSIVE_LANGUAGE_INSTRUCTION`.
pub const AD_SYSTEM: &str = "You are a recruitment copywriter for a company that cares \
    about sustainable, long-term talent. You write honest, concrete job ads.";

/// Ad prompt template.
/// Replace: {language}, {tone}, {company}, {title}, {department},
///          {description}, {requirements}, {salary}
pub const AD_PROMPT_TEMPLATE: &str = r#"Write a job advertisement in {language} with a {tone} tone.

Company: {company}
Position: {title}
Department: {department}
Salary range: {salary}

Role description:
{description}

Requirements:
{requirements}

Structure the ad with a short hook, what the person will do, what we ask for,
what we offer, and a closing call to apply. Use Markdown headings.
Do not invent benefits or figures that are not listed above.
Return only the ad text."#;

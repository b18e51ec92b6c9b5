// Prompt templates for the wizard's AI collaborators.
// Placeholders in braces are filled with `str::replace` before sending.

pub const SKILL_BULLET_PROMPT_TEMPLATE: &str = r#"{truthfulness_instruction}

{bullet_style_instruction}

The candidate's resume is missing evidence of the skill "{skill_name}".
Advice from the gap analysis: {recommendation}

Write resume bullets for this position that credibly demonstrate the skill:
Company: {company}
Position: {position}
Period: {time_period}
Existing bullets for this position:
{achievements}

Return a JSON object with this EXACT schema:
{
  "bullet": "the single best bullet",
  "multipleBullets": ["the best bullet", "an alternative phrasing", "a third phrasing"]
}

Rules:
1. `multipleBullets` holds 2 to 3 distinct phrasings; the first equals `bullet`
2. Mention "{skill_name}" by name in every bullet
3. Do not repeat an existing bullet"#;

pub const IMPROVE_BULLET_PROMPT_TEMPLATE: &str = r#"{truthfulness_instruction}

{bullet_style_instruction}

Rewrite this resume bullet so it is more specific, more impactful and easier to scan.
Company: {company}
Position: {position}
Original bullet: {bullet}

Return a JSON object with this EXACT schema:
{
  "bullet": "the single best rewrite",
  "multipleBullets": ["the best rewrite", "an alternative rewrite", "a third rewrite"]
}

Keep every fact from the original bullet. Do not add numbers that are not implied by it."#;

pub const PARSE_RESUME_PROMPT_TEMPLATE: &str = r#"Extract the work experience from the resume below.

Return a JSON object with this EXACT schema:
{
  "bullet_points": [
    {
      "company": "Acme Corp",
      "position": "Software Engineer",
      "time_period": "Jan 2020 - Present",
      "achievements": ["Built the billing service", "Mentored two interns"]
    }
  ]
}

Rules:
1. One entry per position, most recent first, in the order they appear
2. `achievements` are the position's bullet points, copied verbatim without bullet characters
3. Use null for `time_period` when no dates are given
4. Ignore education, skills lists, summaries and contact details

RESUME:
{resume_text}"#;

pub const GAP_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Review the work experience below and identify skills that are missing or under-evidenced{target_clause}.

Return a JSON object with this EXACT schema:
{
  "missingConcepts": [
    {
      "category": "Cloud Platforms",
      "skills": [
        {"name": "AWS", "recommendation": "Describe any deployment or infrastructure work on AWS"}
      ]
    }
  ]
}

Rules:
1. Group skills into 2 to 5 short categories
2. At most 4 skills per category, each with a one-sentence recommendation
3. Skip skills the experience already demonstrates clearly

EXPERIENCE:
{resume_json}"#;

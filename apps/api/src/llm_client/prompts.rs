// Prompt fragments shared by every AI collaborator.
// Task-specific templates live in generation/prompts.rs.

/// System prompt that pins the model to JSON-only replies.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise resume-writing assistant. \
    Reply with a single valid JSON value and nothing else. \
    No markdown fences, no commentary, no apologies.";

/// Appended to every prompt that writes resume text.
pub const TRUTHFULNESS_INSTRUCTION: &str = "\
    Only describe work that is plausible for the given job title and company. \
    Do not invent employers, dates, certifications or numbers that contradict \
    the supplied resume text. Prefer concrete, quantified outcomes when the \
    input supports them.";

/// Keeps bullets resume-shaped.
pub const BULLET_STYLE_INSTRUCTION: &str = "\
    Each bullet is one sentence, starts with a strong past-tense action verb, \
    has no leading bullet character, and is at most 30 words.";

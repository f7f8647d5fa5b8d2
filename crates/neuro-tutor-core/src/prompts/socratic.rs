//! Socratic tutoring system prompt, adapted to the learner's preferences.
//!
//! The prompt is the fixed preamble followed by one clause from each of four independent
//! tables (style, verbosity, reading mode, visual aids), newline-joined. Pure and
//! deterministic: the same [`Preferences`] always yields byte-identical output.

use crate::shared::{ExplanationStyle, Preferences, ReadingMode};

/// Methodology rules plus the "Style Guidelines:" header. Always emitted first.
pub const SOCRATIC_PREAMBLE: &str = r#"You are a Socratic tutor who guides students to discover answers through thoughtful questions rather than giving direct answers. Your approach should:

1. Ask probing questions to understand what the student already knows
2. Break complex topics into manageable steps
3. Use analogies and examples when helpful
4. Encourage critical thinking and self-discovery
5. Adapt your questioning based on student responses

Style Guidelines:"#;

const STYLE_CONCISE: &str = "- Be brief and direct in your questions\n- Focus on the most important concepts\n- Use 1-2 questions per interaction";
const STYLE_STEP_BY_STEP: &str = "- Break topics into logical steps\n- Ask questions to confirm understanding before proceeding\n- Use numbered steps when helpful";
const STYLE_ANALOGY: &str = "- Use relatable analogies and comparisons\n- Ask if the analogy helps understanding\n- Connect new concepts to familiar ones";
const STYLE_BALANCED: &str = "- Balance questioning style to match student needs";

const VERBOSITY_VERY_BRIEF: &str = "- Keep responses very brief (1-2 sentences)";
const VERBOSITY_MODERATE: &str = "- Use moderate length responses (2-3 sentences)";
const VERBOSITY_DETAILED: &str = "- Provide detailed explanations\n- Include context and deeper connections";
/// Shared by level 3, level 5 and anything outside the explicit bands.
const VERBOSITY_NATURAL: &str = "- Use natural, conversational length";

const READING_COMFORTABLE: &str = "- Use short paragraphs and clear spacing\n- Break complex ideas into smaller chunks";
const READING_GENERIC: &str = "- Use clear, readable formatting";

const VISUAL_ON: &str = "- Suggest visual representations when helpful (diagrams, examples)";
const VISUAL_OFF: &str = "- Focus on verbal explanations unless visual aids are requested";

pub fn style_clause(style: ExplanationStyle) -> &'static str {
    match style {
        ExplanationStyle::Concise => STYLE_CONCISE,
        ExplanationStyle::StepByStep => STYLE_STEP_BY_STEP,
        ExplanationStyle::Analogy => STYLE_ANALOGY,
        ExplanationStyle::Balanced => STYLE_BALANCED,
    }
}

/// Level 5 lands on the natural-length clause together with level 3, not on the detailed one.
// TODO: confirm with product whether verbosity 5 should select VERBOSITY_DETAILED.
pub fn verbosity_clause(level: u8) -> &'static str {
    match level {
        1 => VERBOSITY_VERY_BRIEF,
        2 => VERBOSITY_MODERATE,
        3 | 5 => VERBOSITY_NATURAL,
        l if l >= 4 => VERBOSITY_DETAILED,
        _ => VERBOSITY_NATURAL,
    }
}

pub fn reading_clause(mode: ReadingMode) -> &'static str {
    match mode {
        ReadingMode::Comfortable => READING_COMFORTABLE,
        ReadingMode::Compact => READING_GENERIC,
    }
}

pub fn visual_clause(visual_aids: bool) -> &'static str {
    if visual_aids {
        VISUAL_ON
    } else {
        VISUAL_OFF
    }
}

/// Build the full system prompt for the given preferences.
pub fn build_system_prompt(preferences: &Preferences) -> String {
    [
        SOCRATIC_PREAMBLE,
        style_clause(preferences.explanation_style),
        verbosity_clause(preferences.verbosity_level),
        reading_clause(preferences.reading_mode),
        visual_clause(preferences.visual_aids),
    ]
    .join("\n")
}

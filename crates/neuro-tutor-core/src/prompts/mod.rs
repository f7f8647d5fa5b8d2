//! Prompt templates for the tutor.

pub mod socratic;

pub use socratic::{
    build_system_prompt, reading_clause, style_clause, verbosity_clause, visual_clause,
    SOCRATIC_PREAMBLE,
};

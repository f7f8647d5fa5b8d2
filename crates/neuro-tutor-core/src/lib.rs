//! neuro-tutor-core: Socratic tutoring core (prompt builder, OpenRouter completion client,
//! fallback policy, response orchestrator) plus the shared types and configuration used by
//! the gateway.

mod config;
mod error;
pub mod fallback;
mod openrouter_service;
mod orchestrator;
pub mod prompts;
mod shared;

pub use config::{
    is_configured_key, TutorConfig, DEFAULT_CONFIG_PATH, DEFAULT_MODEL, ENV_PREFIX,
    OPENROUTER_API_BASE, PLACEHOLDER_API_KEY,
};
pub use error::{CompletionError, ConfigError, PreferencesError};
pub use openrouter_service::{ChatMessage, CompletionClient};
pub use orchestrator::ResponseOrchestrator;
pub use prompts::build_system_prompt;
pub use shared::{
    ConversationContext, ExplanationStyle, Message, Preferences, ReadingMode, ReplyEnvelope, Role,
    MAX_VERBOSITY, MIN_VERBOSITY,
};

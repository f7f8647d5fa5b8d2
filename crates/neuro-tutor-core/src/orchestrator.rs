//! Response orchestrator: preferences → Socratic prompt → one completion → reply envelope.
//!
//! Stateless between calls. Every path, including every failure, yields exactly one
//! assistant [`Message`] inside a [`ReplyEnvelope`]; completion errors are logged and
//! replaced by the matching [`fallback`] text instead of propagating.

use crate::config::TutorConfig;
use crate::error::CompletionError;
use crate::fallback;
use crate::openrouter_service::CompletionClient;
use crate::prompts::build_system_prompt;
use crate::shared::{Message, Preferences, ReplyEnvelope};

pub struct ResponseOrchestrator {
    client: CompletionClient,
    default_model: String,
    default_temperature: f32,
    default_max_tokens: u32,
}

impl ResponseOrchestrator {
    pub fn new(config: &TutorConfig) -> Self {
        Self::with_client(CompletionClient::new(config), config)
    }

    /// Use a pre-built client (e.g. one with a sub-second timeout).
    pub fn with_client(client: CompletionClient, config: &TutorConfig) -> Self {
        Self {
            client,
            default_model: config.default_model.clone(),
            default_temperature: config.default_temperature,
            default_max_tokens: config.default_max_tokens,
        }
    }

    /// Generate the tutor's next reply for `history` (oldest first).
    ///
    /// `session_id` is echoed back when supplied; otherwise a fresh UUIDv4 is returned and the
    /// caller decides whether to persist it.
    pub async fn generate_response(
        &self,
        history: &[Message],
        preferences: Option<&Preferences>,
        session_id: Option<&str>,
    ) -> ReplyEnvelope {
        let defaults = Preferences::default();
        let preferences = preferences.unwrap_or(&defaults);
        let system_prompt = build_system_prompt(preferences);

        let content = match self.complete(history, preferences, &system_prompt).await {
            Ok(content) => {
                tracing::info!(session_id = session_id.unwrap_or("<new>"), "generated tutor response");
                content
            }
            Err(e) => {
                match &e {
                    CompletionError::UnconfiguredCredential => {
                        tracing::warn!("OpenRouter API key not configured, using fallback")
                    }
                    CompletionError::Timeout => tracing::error!("completion API timeout"),
                    other => tracing::error!(kind = other.kind(), error = %other, "completion failed"),
                }
                fallback::on_failure(&e).to_string()
            }
        };

        envelope(content, session_id)
    }

    async fn complete(
        &self,
        history: &[Message],
        preferences: &Preferences,
        system_prompt: &str,
    ) -> Result<String, CompletionError> {
        if !self.client.validate_api_key() {
            return Err(CompletionError::UnconfiguredCredential);
        }

        let messages = CompletionClient::format_messages(history, system_prompt);
        let model = preferences
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str());
        let temperature = preferences.temperature.unwrap_or(self.default_temperature);

        self.client
            .call(&messages, model, temperature, self.default_max_tokens)
            .await
    }
}

fn envelope(content: String, session_id: Option<&str>) -> ReplyEnvelope {
    ReplyEnvelope {
        reply_message: Message::assistant(content),
        session_id: session_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
    }
}

//! Error taxonomy for the tutor core.

use thiserror::Error;

/// Every way a remote completion can fail. Closed set: the orchestrator maps each
/// variant to a fallback message, so adding one means touching [`crate::fallback`].
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion API key is not configured")]
    UnconfiguredCredential,

    #[error("completion API returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("completion request timed out")]
    Timeout,

    /// Wildcard: connection failures, undecodable bodies, responses without a first choice.
    #[error("completion request failed: {reason}")]
    Transport { reason: String },
}

impl CompletionError {
    pub fn transport(reason: impl Into<String>) -> Self {
        CompletionError::Transport {
            reason: reason.into(),
        }
    }

    /// Short stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::UnconfiguredCredential => "unconfigured_credential",
            CompletionError::HttpStatus { .. } => "http_status",
            CompletionError::Timeout => "timeout",
            CompletionError::Transport { .. } => "transport",
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout
        } else {
            CompletionError::transport(e.to_string())
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PreferencesError {
    #[error("verbosity_level must be between 1 and 5, got {value}")]
    VerbosityOutOfRange { value: u8 },

    #[error("temperature must be between 0.0 and 2.0, got {value}")]
    TemperatureOutOfRange { value: f32 },

    #[error("model override must not be empty")]
    EmptyModel,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

//! Fallback policy: the apology shown to the learner when a completion cannot be produced.
//!
//! Total over [`CompletionError`]; never fails.

use crate::error::CompletionError;

pub const UNCONFIGURED_CREDENTIAL_MESSAGE: &str =
    "Please configure your OpenRouter API key to use AI tutoring.";
pub const HTTP_ERROR_MESSAGE: &str =
    "I'm having trouble connecting to the AI service. Let me help you with a different approach.";
pub const TIMEOUT_MESSAGE: &str = "The connection timed out. Let's try a more focused question.";
pub const TECHNICAL_DIFFICULTIES_MESSAGE: &str =
    "I'm experiencing technical difficulties. How can I help you with a simpler question?";

pub fn on_failure(error: &CompletionError) -> &'static str {
    match error {
        CompletionError::UnconfiguredCredential => UNCONFIGURED_CREDENTIAL_MESSAGE,
        CompletionError::HttpStatus { .. } => HTTP_ERROR_MESSAGE,
        CompletionError::Timeout => TIMEOUT_MESSAGE,
        CompletionError::Transport { .. } => TECHNICAL_DIFFICULTIES_MESSAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_failure_kind_has_its_own_message() {
        let cases = [
            (CompletionError::UnconfiguredCredential, UNCONFIGURED_CREDENTIAL_MESSAGE),
            (
                CompletionError::HttpStatus {
                    status: 502,
                    body: "bad gateway".into(),
                },
                HTTP_ERROR_MESSAGE,
            ),
            (CompletionError::Timeout, TIMEOUT_MESSAGE),
            (CompletionError::transport("connection reset"), TECHNICAL_DIFFICULTIES_MESSAGE),
        ];
        for (err, expected) in &cases {
            assert_eq!(on_failure(err), *expected, "{}", err.kind());
        }
    }

    #[test]
    fn http_status_message_ignores_status_and_body() {
        let a = CompletionError::HttpStatus {
            status: 401,
            body: String::new(),
        };
        let b = CompletionError::HttpStatus {
            status: 500,
            body: "x".repeat(10_000),
        };
        assert_eq!(on_failure(&a), on_failure(&b));
    }

    #[test]
    fn messages_mention_their_theme() {
        assert!(UNCONFIGURED_CREDENTIAL_MESSAGE.contains("API key"));
        assert!(HTTP_ERROR_MESSAGE.contains("trouble connecting"));
        assert!(TIMEOUT_MESSAGE.contains("timed out"));
        assert!(TECHNICAL_DIFFICULTIES_MESSAGE.contains("technical difficulties"));
    }
}

//! OpenRouter completion client: one `POST /chat/completions` round trip per call.
//!
//! The client is constructed from [`TutorConfig`] and holds no mutable state, so one
//! instance is shared by every concurrent request. Before any network traffic the
//! credential is checked ([`CompletionClient::validate_api_key`]); afterwards every
//! outcome is classified into [`CompletionError`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{is_configured_key, TutorConfig};
use crate::error::CompletionError;
use crate::shared::Message;

/// Characters of the reply echoed into the log.
const LOG_PREVIEW_CHARS: usize = 100;

/// Outbound OpenAI-compatible message (`system` / `user` / `assistant`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

pub struct CompletionClient {
    api_key: String,
    endpoint: String,
    http_referer: String,
    app_title: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl CompletionClient {
    pub fn new(config: &TutorConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: config.api_key.trim().to_string(),
            endpoint: format!("{}/chat/completions", config.api_base_url.trim_end_matches('/')),
            http_referer: config.http_referer.clone(),
            app_title: config.app_title.clone(),
            timeout: config.request_timeout(),
            client,
        }
    }

    /// Override the per-request timeout (the configured value is whole seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// False when the key is empty or one of the shipped placeholders.
    pub fn validate_api_key(&self) -> bool {
        is_configured_key(&self.api_key)
    }

    /// Prepend the system prompt, then replay `history` in order as `{role, content}` pairs.
    pub fn format_messages(history: &[Message], system_prompt: &str) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(history.len() + 1);
        out.push(ChatMessage::new("system", system_prompt));
        out.extend(
            history
                .iter()
                .map(|m| ChatMessage::new(m.role.as_str(), &m.content)),
        );
        out
    }

    /// Issue a single completion request and return the first choice's content verbatim.
    pub async fn call(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        if !self.validate_api_key() {
            return Err(CompletionError::UnconfiguredCredential);
        }

        tracing::info!(model, messages = messages.len(), "calling completion API");

        let body = ChatRequest {
            model,
            messages,
            temperature,
            max_tokens,
        };

        let res = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.http_referer)
            .header("X-Title", &self.app_title)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %body, "completion API returned an error status");
            return Err(CompletionError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let text = res.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| CompletionError::transport(format!("response parse failed: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CompletionError::transport("response contained no choices"))?;

        tracing::info!(preview = %preview(&content), "completion API responded");
        Ok(content)
    }
}

fn preview(content: &str) -> String {
    let mut p: String = content.chars().take(LOG_PREVIEW_CHARS).collect();
    if content.chars().count() > LOG_PREVIEW_CHARS {
        p.push_str("...");
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Role;
    use wiremock::matchers::{bearer_token, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, key: &str) -> TutorConfig {
        TutorConfig {
            api_base_url: server.uri(),
            api_key: key.to_string(),
            ..TutorConfig::defaults()
        }
    }

    fn msg(role: Role, content: &str) -> Message {
        Message {
            id: format!("{}-{}", role, content),
            role,
            content: content.to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn format_messages_prepends_exactly_one_system_entry() {
        let history = vec![
            msg(Role::User, "a"),
            msg(Role::Assistant, "b"),
            msg(Role::User, "c"),
        ];
        let formatted = CompletionClient::format_messages(&history, "P");
        assert_eq!(
            formatted,
            vec![
                ChatMessage::new("system", "P"),
                ChatMessage::new("user", "a"),
                ChatMessage::new("assistant", "b"),
                ChatMessage::new("user", "c"),
            ]
        );
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "a");
    }

    #[test]
    fn format_messages_with_empty_history() {
        let formatted = CompletionClient::format_messages(&[], "only system");
        assert_eq!(formatted, vec![ChatMessage::new("system", "only system")]);
    }

    #[test]
    fn endpoint_joins_base_url_without_double_slash() {
        let cfg = TutorConfig {
            api_base_url: "http://localhost:9/api/v1/".to_string(),
            ..TutorConfig::defaults()
        };
        let client = CompletionClient::new(&cfg);
        assert_eq!(client.endpoint(), "http://localhost:9/api/v1/chat/completions");
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let long = "é".repeat(150);
        let p = preview(&long);
        assert_eq!(p.chars().count(), LOG_PREVIEW_CHARS + 3);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn call_sends_bearer_and_body_and_returns_content_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(header("X-Title", "NeuroTutor-Dev"))
            .and(body_partial_json(serde_json::json!({
                "model": "test/model",
                "max_tokens": 42,
                "messages": [{"role": "system", "content": "S"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "  What do you already know?\n"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CompletionClient::new(&config_for(&server, "sk-test"));
        let out = client
            .call(&[ChatMessage::new("system", "S")], "test/model", 0.5, 42)
            .await
            .unwrap();
        assert_eq!(out, "  What do you already know?\n");
    }

    #[tokio::test]
    async fn non_success_status_is_http_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let client = CompletionClient::new(&config_for(&server, "sk-test"));
        let err = client
            .call(&[ChatMessage::new("system", "S")], "m", 0.7, 10)
            .await
            .unwrap_err();
        match err {
            CompletionError::HttpStatus { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected HttpStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn stalled_endpoint_is_timeout_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": [{"message": {"content": "late"}}]}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = CompletionClient::new(&config_for(&server, "sk-test"))
            .with_timeout(Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = client
            .call(&[ChatMessage::new("system", "S")], "m", 0.7, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Timeout), "got {:?}", err);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn empty_choices_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let client = CompletionClient::new(&config_for(&server, "sk-test"));
        let err = client
            .call(&[ChatMessage::new("system", "S")], "m", 0.7, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Transport { .. }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let cfg = TutorConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            api_key: "sk-test".to_string(),
            ..TutorConfig::defaults()
        };
        let client = CompletionClient::new(&cfg).with_timeout(Duration::from_secs(2));
        let err = client
            .call(&[ChatMessage::new("system", "S")], "m", 0.7, 10)
            .await
            .unwrap_err();
        assert!(
            matches!(err, CompletionError::Transport { .. } | CompletionError::Timeout),
            "got {:?}",
            err
        );
    }

    #[tokio::test]
    async fn placeholder_key_never_reaches_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = CompletionClient::new(&config_for(&server, crate::config::PLACEHOLDER_API_KEY));
        assert!(!client.validate_api_key());
        let err = client
            .call(&[ChatMessage::new("system", "S")], "m", 0.7, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::UnconfiguredCredential));
    }
}

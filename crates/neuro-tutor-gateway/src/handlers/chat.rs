//! Chat routes: one tutoring turn, session listing, session history and deletion.
//!
//! The gateway owns persistence: it resolves or creates the session, stores the learner's
//! message, hands the full stored history to `ResponseOrchestrator`, then stores the reply.
//! The orchestrator never fails outward, so the only error a learner sees from a chat turn
//! is an unknown session (404) or a storage fault (500).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use neuro_tutor_core::{Message, Preferences, Role};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::session_store::{ms_to_utc, truncate_with_ellipsis, MessageRow, SessionRow};
use crate::AppState;

/// Session id the UI ships pre-seeded; it can never be deleted.
pub const WELCOME_SESSION_ID: &str = "welcome";
const DEFAULT_SESSION_TITLE: &str = "New Chat";
const TITLE_MAX_CHARS: usize = 50;
const PREVIEW_MAX_CHARS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply_message: Message,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub message_count: usize,
    pub last_message_preview: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionMessagesResponse {
    pub session_id: String,
    pub messages: Vec<Message>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/", post(chat))
        .route("/chat/sessions", get(list_sessions))
        .route("/chat/sessions/:session_id", delete(delete_session))
        .route("/chat/sessions/:session_id/messages", get(session_messages))
}

/// Run a store call on the blocking pool and fold both failure layers into `ApiError`.
async fn blocking<T, F>(context: &'static str, f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, rusqlite::Error> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(context, e))?
        .map_err(|e| ApiError::internal(context, e))
}

/// Title for a new session: the last request message when the learner wrote it.
fn session_title(last: Option<&Message>) -> String {
    match last {
        Some(m) if m.role == Role::User => truncate_with_ellipsis(&m.content, TITLE_MAX_CHARS),
        _ => DEFAULT_SESSION_TITLE.to_string(),
    }
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    const CTX: &str = "Error processing chat request";

    if let Some(prefs) = &request.preferences {
        prefs
            .validate()
            .map_err(|e| ApiError::Unprocessable(e.to_string()))?;
    }

    let requested_id = request
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let last = request.messages.last().cloned();

    let session: SessionRow = match requested_id {
        Some(id) => {
            let store = state.store.clone();
            let lookup = id.clone();
            blocking(CTX, move || store.get(&lookup))
                .await?
                .ok_or_else(|| ApiError::session_not_found(&id))?
        }
        None => {
            let store = state.store.clone();
            let title = session_title(last.as_ref());
            let created = blocking(CTX, move || store.create(Some(title.as_str()))).await?;
            tracing::info!(session_id = %created.id, title = %created.title, "created chat session");
            created
        }
    };

    let store = state.store.clone();
    let session_id = session.id.clone();
    let history: Vec<Message> = blocking(CTX, move || {
        if let Some(m) = last.filter(|m| m.role == Role::User) {
            store.append_message(&session_id, Role::User, &m.content)?;
        }
        store.messages_of(&session_id)
    })
    .await?
    .into_iter()
    .map(MessageRow::into_message)
    .collect();

    let envelope = state
        .orchestrator
        .generate_response(&history, request.preferences.as_ref(), Some(&session.id))
        .await;

    let store = state.store.clone();
    let session_id = session.id.clone();
    let reply = envelope.reply_message.content;
    let saved = blocking(CTX, move || {
        store.append_message(&session_id, Role::Assistant, &reply)
    })
    .await?;

    Ok(Json(ChatResponse {
        session_id: session.id,
        reply_message: saved.into_message(),
    }))
}

async fn list_sessions(State(state): State<AppState>) -> Result<Json<SessionListResponse>, ApiError> {
    let store = state.store.clone();
    let sessions = blocking("Error retrieving sessions", move || {
        store
            .list()?
            .into_iter()
            .map(|s| -> Result<SessionSummary, rusqlite::Error> {
                Ok(SessionSummary {
                    message_count: store.message_count(&s.id)?,
                    last_message_preview: store.last_message_preview(&s.id, PREVIEW_MAX_CHARS)?,
                    created_at: ms_to_utc(s.created_at_ms),
                    last_updated_at: ms_to_utc(s.updated_at_ms),
                    id: s.id,
                    title: s.title,
                })
            })
            .collect::<Result<Vec<_>, rusqlite::Error>>()
    })
    .await?;
    Ok(Json(SessionListResponse { sessions }))
}

async fn session_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionMessagesResponse>, ApiError> {
    let store = state.store.clone();
    let id = session_id.clone();
    let rows = blocking("Error retrieving session messages", move || {
        match store.get(&id)? {
            Some(_) => store.messages_of(&id).map(Some),
            None => Ok(None),
        }
    })
    .await?
    .ok_or_else(|| ApiError::session_not_found(&session_id))?;

    Ok(Json(SessionMessagesResponse {
        session_id,
        messages: rows.into_iter().map(MessageRow::into_message).collect(),
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if session_id == WELCOME_SESSION_ID {
        return Err(ApiError::BadRequest("Cannot delete welcome session".to_string()));
    }
    let store = state.store.clone();
    let id = session_id.clone();
    let deleted = blocking("Error deleting session", move || store.delete(&id)).await?;
    if !deleted {
        return Err(ApiError::session_not_found(&session_id));
    }
    tracing::info!(session_id = %session_id, "deleted chat session");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: Role, content: &str) -> Message {
        Message {
            id: "m".to_string(),
            role,
            content: content.to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn title_comes_from_last_user_message() {
        assert_eq!(session_title(Some(&msg(Role::User, "Help with fractions"))), "Help with fractions");
        let long = "a".repeat(60);
        assert_eq!(session_title(Some(&msg(Role::User, &long))), format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn title_defaults_when_last_message_is_not_from_the_learner() {
        assert_eq!(session_title(Some(&msg(Role::Assistant, "hi"))), DEFAULT_SESSION_TITLE);
        assert_eq!(session_title(None), DEFAULT_SESSION_TITLE);
    }
}

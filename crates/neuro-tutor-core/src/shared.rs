//! Shared types: chat messages, tutoring preferences and the reply envelope.
//!
//! These are the values that cross every seam of the tutor (gateway ⇄ orchestrator ⇄
//! completion client), so they carry serde derives matching the HTTP wire shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PreferencesError;

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a persisted role string. Returns `None` for anything but `user` / `assistant`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// New message with a fresh UUIDv4 id, stamped with the current instant.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered conversation history, oldest first. Replayed verbatim to the model.
pub type ConversationContext = Vec<Message>;

/// How the tutor should phrase its guidance.
///
/// Unknown values deserialize to [`ExplanationStyle::Balanced`], which selects the
/// generic style clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationStyle {
    Concise,
    StepByStep,
    Analogy,
    #[serde(other)]
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingMode {
    Compact,
    Comfortable,
}

pub const MIN_VERBOSITY: u8 = 1;
pub const MAX_VERBOSITY: u8 = 5;

fn default_verbosity() -> u8 {
    3
}

fn default_style() -> ExplanationStyle {
    ExplanationStyle::StepByStep
}

fn default_reading_mode() -> ReadingMode {
    ReadingMode::Comfortable
}

fn default_true() -> bool {
    true
}

/// User preferences for neurodivergent-friendly responses.
///
/// | Field | Default |
/// |-------|---------|
/// | verbosity_level | 3 (range 1–5) |
/// | explanation_style | step_by_step |
/// | reading_mode | comfortable |
/// | visual_aids | true |
/// | model | none (config default) |
/// | temperature | none (config default) |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_verbosity")]
    pub verbosity_level: u8,
    #[serde(default = "default_style")]
    pub explanation_style: ExplanationStyle,
    #[serde(default = "default_reading_mode")]
    pub reading_mode: ReadingMode,
    #[serde(default = "default_true")]
    pub visual_aids: bool,
    /// Per-request model override; falls back to `TutorConfig::default_model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Per-request temperature override; falls back to `TutorConfig::default_temperature`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            verbosity_level: default_verbosity(),
            explanation_style: default_style(),
            reading_mode: default_reading_mode(),
            visual_aids: true,
            model: None,
            temperature: None,
        }
    }
}

impl Preferences {
    /// Range checks that serde cannot express.
    pub fn validate(&self) -> Result<(), PreferencesError> {
        if !(MIN_VERBOSITY..=MAX_VERBOSITY).contains(&self.verbosity_level) {
            return Err(PreferencesError::VerbosityOutOfRange {
                value: self.verbosity_level,
            });
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(PreferencesError::TemperatureOutOfRange { value: t });
            }
        }
        if let Some(m) = &self.model {
            if m.trim().is_empty() {
                return Err(PreferencesError::EmptyModel);
            }
        }
        Ok(())
    }
}

/// Uniform reply shape for both successful and fallback outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub reply_message: Message,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_default_when_fields_missing() {
        let p: Preferences = serde_json::from_str("{}").unwrap();
        assert_eq!(p, Preferences::default());
        assert_eq!(p.verbosity_level, 3);
        assert_eq!(p.explanation_style, ExplanationStyle::StepByStep);
        assert_eq!(p.reading_mode, ReadingMode::Comfortable);
        assert!(p.visual_aids);
    }

    #[test]
    fn unknown_style_maps_to_balanced() {
        let p: Preferences =
            serde_json::from_str(r#"{"explanation_style": "socratic_dialogue"}"#).unwrap();
        assert_eq!(p.explanation_style, ExplanationStyle::Balanced);
    }

    #[test]
    fn validate_rejects_out_of_range_verbosity() {
        let p = Preferences {
            verbosity_level: 6,
            ..Default::default()
        };
        assert!(matches!(
            p.validate(),
            Err(PreferencesError::VerbosityOutOfRange { value: 6 })
        ));
        let p = Preferences {
            verbosity_level: 0,
            ..Default::default()
        };
        assert!(p.validate().is_err());
        assert!(Preferences::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_overrides() {
        let p = Preferences {
            temperature: Some(3.5),
            ..Default::default()
        };
        assert!(p.validate().is_err());
        let p = Preferences {
            model: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(PreferencesError::EmptyModel)));
    }

    #[test]
    fn message_timestamp_is_optional_on_the_wire() {
        let m: Message =
            serde_json::from_str(r#"{"id": "msg1", "role": "user", "content": "hi"}"#).unwrap();
        assert_eq!(m.role, Role::User);
        assert!(m.timestamp.is_none());
    }

    #[test]
    fn new_messages_get_distinct_ids() {
        let a = Message::assistant("x");
        let b = Message::assistant("x");
        assert_ne!(a.id, b.id);
        assert!(a.timestamp.is_some());
    }

    #[test]
    fn role_parse_round_trips_known_roles_only() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse(Role::Assistant.as_str()), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), None);
    }
}

//! Chat session history (SQLite).
//!
//! Two tables: `chat_sessions` and `messages`, messages cascading with their session.
//! Every call opens its own connection, so the store is `Clone + Send + Sync` and callers
//! run it on the blocking pool (`tokio::task::spawn_blocking`).

use chrono::{DateTime, TimeZone, Utc};
use neuro_tutor_core::{Message, Role};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::PathBuf;

/// Preview shown when a session has no messages yet.
pub const EMPTY_PREVIEW: &str = "No messages";

#[derive(Clone)]
pub struct SessionStore {
    db_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SessionRow {
    pub id: String,
    pub title: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MessageRow {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub created_at_ms: i64,
}

impl MessageRow {
    pub fn into_message(self) -> Message {
        Message {
            id: self.id,
            role: self.role,
            content: self.content,
            timestamp: Some(ms_to_utc(self.created_at_ms)),
        }
    }
}

pub fn ms_to_utc(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn default_title() -> String {
    format!("Chat {}", chrono::Local::now().format("%Y-%m-%d %H:%M"))
}

fn session_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: r.get(0)?,
        title: r.get(1)?,
        created_at_ms: r.get(2)?,
        updated_at_ms: r.get(3)?,
    })
}

fn message_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    let role: String = r.get(2)?;
    let role = Role::parse(&role).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown message role '{}'", role).into(),
        )
    })?;
    Ok(MessageRow {
        id: r.get(0)?,
        session_id: r.get(1)?,
        role,
        content: r.get(3)?,
        created_at_ms: r.get(4)?,
    })
}

impl SessionStore {
    pub fn new(db_path: PathBuf) -> Result<Self, rusqlite::Error> {
        let this = Self { db_path };
        this.init()?;
        Ok(this)
    }

    fn open(&self) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        // SQLite leaves foreign keys OFF per connection unless asked; cascade depends on it.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    fn init(&self) -> Result<(), rusqlite::Error> {
        if let Some(parent) = self.db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = self.open()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chat_sessions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL,
                updated_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chat_sessions_updated ON chat_sessions(updated_at_ms);

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL,
                FOREIGN KEY(session_id) REFERENCES chat_sessions(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_messages_session_id ON messages(session_id);
            "#,
        )?;
        Ok(())
    }

    /// Create a session; blank or missing titles become "Chat YYYY-MM-DD HH:MM".
    pub fn create(&self, title: Option<&str>) -> Result<SessionRow, rusqlite::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default_title);
        let ts = now_ms();
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO chat_sessions (id, title, created_at_ms, updated_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![id, title, ts, ts],
        )?;
        Ok(SessionRow {
            id,
            title,
            created_at_ms: ts,
            updated_at_ms: ts,
        })
    }

    pub fn get(&self, session_id: &str) -> Result<Option<SessionRow>, rusqlite::Error> {
        let conn = self.open()?;
        conn.query_row(
            "SELECT id, title, created_at_ms, updated_at_ms FROM chat_sessions WHERE id = ?1",
            params![session_id],
            session_from_row,
        )
        .optional()
    }

    /// All sessions, most recently updated first.
    pub fn list(&self) -> Result<Vec<SessionRow>, rusqlite::Error> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, created_at_ms, updated_at_ms FROM chat_sessions ORDER BY updated_at_ms DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map([], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Append a message and bump the session's `updated_at`. Fails if the session is unknown.
    pub fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<MessageRow, rusqlite::Error> {
        let mut conn = self.open()?;
        let msg_id = uuid::Uuid::new_v4().to_string();
        let ts = now_ms();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO messages (id, session_id, role, content, created_at_ms) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![msg_id, session_id, role.as_str(), content, ts],
        )?;
        tx.execute(
            "UPDATE chat_sessions SET updated_at_ms = ?1 WHERE id = ?2",
            params![ts, session_id],
        )?;
        tx.commit()?;

        Ok(MessageRow {
            id: msg_id,
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            created_at_ms: ts,
        })
    }

    /// Messages of a session, oldest first (insertion order breaks timestamp ties).
    pub fn messages_of(&self, session_id: &str) -> Result<Vec<MessageRow>, rusqlite::Error> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, created_at_ms FROM messages WHERE session_id = ?1 ORDER BY created_at_ms ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn message_count(&self, session_id: &str) -> Result<usize, rusqlite::Error> {
        let conn = self.open()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
            params![session_id],
            |r| r.get(0),
        )?;
        Ok(n.max(0) as usize)
    }

    /// Latest message content truncated to `max_len` chars ("..." appended when cut).
    pub fn last_message_preview(&self, session_id: &str, max_len: usize) -> Result<String, rusqlite::Error> {
        let conn = self.open()?;
        let last: Option<String> = conn
            .query_row(
                "SELECT content FROM messages WHERE session_id = ?1 ORDER BY created_at_ms DESC, rowid DESC LIMIT 1",
                params![session_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(match last {
            None => EMPTY_PREVIEW.to_string(),
            Some(content) => truncate_with_ellipsis(&content, max_len),
        })
    }

    /// Delete a session and (by cascade) its messages. `false` when nothing matched.
    pub fn delete(&self, session_id: &str) -> Result<bool, rusqlite::Error> {
        let conn = self.open()?;
        let n = conn.execute("DELETE FROM chat_sessions WHERE id = ?1", params![session_id])?;
        Ok(n > 0)
    }
}

pub fn truncate_with_ellipsis(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let mut out: String = s.chars().take(max_len).collect();
        out.push_str("...");
        out
    } else {
        s.to_string()
    }
}

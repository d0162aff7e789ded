//! SQLite-backed store.
//!
//! # Schema
//! ```sql
//! CREATE TABLE accounts (
//!     user_id TEXT NOT NULL,
//!     provider TEXT NOT NULL,
//!     access_token TEXT,
//!     refresh_token TEXT,
//!     expires_at INTEGER,         -- epoch seconds
//!     scope TEXT,
//!     token_type TEXT,
//!     id_token TEXT,
//!     PRIMARY KEY (user_id, provider)
//! );
//! CREATE TABLE notes (...);       -- PRIMARY KEY (user_id, video_id)
//! CREATE TABLE event_logs (...);  -- append-only
//! ```

use super::{
    AuditEvent, AuditLog, CredentialRecord, CredentialStore, Note, NoteStore, TokenUpdate,
};
use eyre::Context;
use jiff::Timestamp;
use oauth2::{AccessToken, RefreshToken};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    user_id TEXT NOT NULL,
    provider TEXT NOT NULL,
    access_token TEXT,
    refresh_token TEXT,
    expires_at INTEGER,
    scope TEXT,
    token_type TEXT,
    id_token TEXT,
    PRIMARY KEY (user_id, provider)
);

CREATE TABLE IF NOT EXISTS notes (
    user_id TEXT NOT NULL,
    video_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, video_id)
);

CREATE TABLE IF NOT EXISTS event_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at INTEGER NOT NULL,
    user_id TEXT,
    action TEXT NOT NULL,
    video_id TEXT,
    target_type TEXT,
    target_id TEXT,
    status TEXT NOT NULL,
    message TEXT,
    metadata TEXT
);

CREATE INDEX IF NOT EXISTS idx_event_logs_user ON event_logs(user_id, created_at);
"#;

/// Stores credentials, notes and audit events in one SQLite database.
///
/// The connection sits behind a mutex, so every statement runs on its own; a token update is
/// a single `UPDATE` and can never leave a half-written row behind.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and makes sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        Self::init(conn)
    }

    /// A throwaway database that lives only as long as the store.
    pub fn in_memory() -> eyre::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> eyre::Result<Self> {
        conn.execute_batch(SCHEMA).context("create schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> eyre::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| eyre::eyre!("database connection lock poisoned"))
    }
}

fn timestamp(seconds: i64) -> eyre::Result<Timestamp> {
    Timestamp::from_second(seconds).with_context(|| format!("invalid timestamp {seconds}"))
}

impl CredentialStore for SqliteStore {
    async fn find(&self, user_id: &str, provider: &str) -> eyre::Result<Option<CredentialRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT access_token, refresh_token, expires_at, scope, token_type, id_token
                FROM accounts
                WHERE user_id = ?1 AND provider = ?2
                "#,
                params![user_id, provider],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()
            .context("query credential")?;

        let Some((access_token, refresh_token, expires_at, scope, token_type, id_token)) = row
        else {
            return Ok(None);
        };

        Ok(Some(CredentialRecord {
            user_id: user_id.to_string(),
            provider: provider.to_string(),
            access_token: access_token.map(AccessToken::new),
            refresh_token: refresh_token.map(RefreshToken::new),
            expires_at: expires_at.map(timestamp).transpose()?,
            scope,
            token_type,
            id_token,
        }))
    }

    async fn update(&self, user_id: &str, provider: &str, update: &TokenUpdate) -> eyre::Result<()> {
        let changed = self
            .conn()?
            .execute(
                r#"
                UPDATE accounts SET
                    access_token = ?3,
                    expires_at = ?4,
                    scope = ?5,
                    token_type = ?6,
                    id_token = ?7,
                    refresh_token = COALESCE(?8, refresh_token)
                WHERE user_id = ?1 AND provider = ?2
                "#,
                params![
                    user_id,
                    provider,
                    update.access_token.secret(),
                    update.expires_at.as_second(),
                    update.scope,
                    update.token_type,
                    update.id_token,
                    update.refresh_token.as_ref().map(|t| t.secret()),
                ],
            )
            .context("update credential")?;
        if changed == 0 {
            eyre::bail!("no {provider} credential to update for user {user_id}");
        }
        Ok(())
    }

    async fn link(&self, record: &CredentialRecord) -> eyre::Result<()> {
        self.conn()?
            .execute(
                r#"
                INSERT INTO accounts (
                    user_id, provider, access_token, refresh_token,
                    expires_at, scope, token_type, id_token
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(user_id, provider) DO UPDATE SET
                    access_token = excluded.access_token,
                    refresh_token = excluded.refresh_token,
                    expires_at = excluded.expires_at,
                    scope = excluded.scope,
                    token_type = excluded.token_type,
                    id_token = excluded.id_token
                "#,
                params![
                    record.user_id,
                    record.provider,
                    record.access_token.as_ref().map(|t| t.secret()),
                    record.refresh_token.as_ref().map(|t| t.secret()),
                    record.expires_at.map(|t| t.as_second()),
                    record.scope,
                    record.token_type,
                    record.id_token,
                ],
            )
            .context("store credential")?;
        Ok(())
    }
}

impl NoteStore for SqliteStore {
    async fn note(&self, user_id: &str, video_id: &str) -> eyre::Result<Option<Note>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT content, created_at, updated_at FROM notes WHERE user_id = ?1 AND video_id = ?2",
                params![user_id, video_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()
            .context("query note")?;
        let Some((content, created_at, updated_at)) = row else {
            return Ok(None);
        };
        Ok(Some(Note {
            user_id: user_id.to_string(),
            video_id: video_id.to_string(),
            content,
            created_at: timestamp(created_at)?,
            updated_at: timestamp(updated_at)?,
        }))
    }

    async fn upsert_note(&self, user_id: &str, video_id: &str, content: &str) -> eyre::Result<()> {
        let now = Timestamp::now().as_second();
        self.conn()?
            .execute(
                r#"
                INSERT INTO notes (user_id, video_id, content, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?4)
                ON CONFLICT(user_id, video_id) DO UPDATE SET
                    content = excluded.content,
                    updated_at = excluded.updated_at
                "#,
                params![user_id, video_id, content, now],
            )
            .context("store note")?;
        Ok(())
    }

    async fn delete_note(&self, user_id: &str, video_id: &str) -> eyre::Result<()> {
        self.conn()?
            .execute(
                "DELETE FROM notes WHERE user_id = ?1 AND video_id = ?2",
                params![user_id, video_id],
            )
            .context("delete note")?;
        Ok(())
    }
}

impl AuditLog for SqliteStore {
    async fn record(&self, event: &AuditEvent) -> eyre::Result<()> {
        let metadata = event
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("serialize event metadata")?;
        self.conn()?
            .execute(
                r#"
                INSERT INTO event_logs (
                    created_at, user_id, action, video_id,
                    target_type, target_id, status, message, metadata
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    Timestamp::now().as_second(),
                    event.user_id,
                    event.action,
                    event.video_id,
                    event.target_type,
                    event.target_id,
                    event.status.as_str(),
                    event.message,
                    metadata,
                ],
            )
            .context("insert audit event")?;
        Ok(())
    }
}

//! Durable state behind the dashboard: linked Google credentials, private notes, and the audit
//! event log.
//!
//! The token lifecycle manager only ever talks to a [`CredentialStore`], which is passed in
//! explicitly. [`MemoryStore`] is the in-process implementation used by tests;
//! [`SqliteStore`] keeps everything in a single SQLite file.

use jiff::Timestamp;
use oauth2::{AccessToken, RefreshToken};
use serde::Serialize;
use std::future::Future;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// The stored OAuth credential for one `(user, provider)` pair.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub user_id: String,
    pub provider: String,
    /// Short-lived bearer token for API calls.
    pub access_token: Option<AccessToken>,
    /// Long-lived token used to obtain new access tokens. Without it the user has to consent
    /// again once the access token goes stale.
    pub refresh_token: Option<RefreshToken>,
    /// When `access_token` stops being valid.
    pub expires_at: Option<Timestamp>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
    pub id_token: Option<String>,
}

impl CredentialRecord {
    /// A freshly consented credential, as handed over by the identity provider.
    pub fn linked(
        user_id: impl Into<String>,
        provider: impl Into<String>,
        access_token: AccessToken,
        refresh_token: Option<RefreshToken>,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            provider: provider.into(),
            access_token: Some(access_token),
            refresh_token,
            expires_at: Some(expires_at),
            scope: None,
            token_type: None,
            id_token: None,
        }
    }

    /// Applies a refresh result in one go.
    pub(crate) fn apply(&mut self, update: &TokenUpdate) {
        self.access_token = Some(update.access_token.clone());
        self.expires_at = Some(update.expires_at);
        self.scope.clone_from(&update.scope);
        self.token_type.clone_from(&update.token_type);
        self.id_token.clone_from(&update.id_token);
        if let Some(refresh_token) = &update.refresh_token {
            self.refresh_token = Some(refresh_token.clone());
        }
    }
}

/// The token fields written back after a successful refresh.
///
/// All fields replace the stored ones together, except `refresh_token`, which only replaces
/// the stored value when the provider issued a new one.
#[derive(Debug, Clone)]
pub struct TokenUpdate {
    pub access_token: AccessToken,
    pub expires_at: Timestamp,
    pub scope: Option<String>,
    pub token_type: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<RefreshToken>,
}

/// Key-value access to credential records, keyed by `(user_id, provider)`.
pub trait CredentialStore: Send + Sync {
    fn find(
        &self,
        user_id: &str,
        provider: &str,
    ) -> impl Future<Output = eyre::Result<Option<CredentialRecord>>> + Send;

    /// Replaces the token fields of an existing record.
    ///
    /// Fails if there is no record for the key; the write is never dropped silently.
    fn update(
        &self,
        user_id: &str,
        provider: &str,
        update: &TokenUpdate,
    ) -> impl Future<Output = eyre::Result<()>> + Send;

    /// Inserts a record, replacing any existing one for the same key.
    fn link(&self, record: &CredentialRecord) -> impl Future<Output = eyre::Result<()>> + Send;
}

/// A private free-form note one user keeps about one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub user_id: String,
    pub video_id: String,
    pub content: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

pub trait NoteStore: Send + Sync {
    fn note(
        &self,
        user_id: &str,
        video_id: &str,
    ) -> impl Future<Output = eyre::Result<Option<Note>>> + Send;

    /// Creates the note or replaces its content.
    fn upsert_note(
        &self,
        user_id: &str,
        video_id: &str,
        content: &str,
    ) -> impl Future<Output = eyre::Result<()>> + Send;

    /// Deleting a note that does not exist is not an error.
    fn delete_note(
        &self,
        user_id: &str,
        video_id: &str,
    ) -> impl Future<Output = eyre::Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Success,
    Error,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Success => "success",
            EventStatus::Error => "error",
        }
    }
}

/// One entry in the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub user_id: Option<String>,
    /// What happened, e.g. `comment.add`.
    pub action: String,
    pub video_id: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub status: EventStatus,
    pub message: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(user_id: &str, action: &str, status: EventStatus) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            action: action.to_string(),
            video_id: None,
            target_type: None,
            target_id: None,
            status,
            message: None,
            metadata: None,
        }
    }

    pub fn with_video(mut self, video_id: &str) -> Self {
        self.video_id = Some(video_id.to_string());
        self
    }

    pub fn with_target(mut self, target_type: &str, target_id: Option<&str>) -> Self {
        self.target_type = Some(target_type.to_string());
        self.target_id = target_id.map(str::to_string);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Turns the event into the record of a failed attempt.
    ///
    /// Metadata is only kept for successful actions.
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = EventStatus::Error;
        self.message = Some(message.into());
        self.metadata = None;
        self
    }
}

/// Append-only record of dashboard actions.
pub trait AuditLog: Send + Sync {
    fn record(&self, event: &AuditEvent) -> impl Future<Output = eyre::Result<()>> + Send;
}

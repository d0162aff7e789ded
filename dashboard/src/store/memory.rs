use super::{
    AuditEvent, AuditLog, CredentialRecord, CredentialStore, Note, NoteStore, TokenUpdate,
};
use jiff::Timestamp;
use std::collections::HashMap;
use tokio::sync::Mutex;

type Key = (String, String);

fn key(a: &str, b: &str) -> Key {
    (a.to_string(), b.to_string())
}

/// Keeps everything in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: Mutex<HashMap<Key, CredentialRecord>>,
    notes: Mutex<HashMap<Key, Note>>,
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds the given credential.
    pub fn with_credential(record: CredentialRecord) -> Self {
        let mut store = Self::default();
        store
            .credentials
            .get_mut()
            .insert(key(&record.user_id, &record.provider), record);
        store
    }

    /// Every audit event recorded so far, oldest first.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.clone()
    }
}

impl CredentialStore for MemoryStore {
    async fn find(&self, user_id: &str, provider: &str) -> eyre::Result<Option<CredentialRecord>> {
        Ok(self
            .credentials
            .lock()
            .await
            .get(&key(user_id, provider))
            .cloned())
    }

    async fn update(&self, user_id: &str, provider: &str, update: &TokenUpdate) -> eyre::Result<()> {
        let mut credentials = self.credentials.lock().await;
        let Some(record) = credentials.get_mut(&key(user_id, provider)) else {
            eyre::bail!("no {provider} credential to update for user {user_id}");
        };
        record.apply(update);
        Ok(())
    }

    async fn link(&self, record: &CredentialRecord) -> eyre::Result<()> {
        self.credentials
            .lock()
            .await
            .insert(key(&record.user_id, &record.provider), record.clone());
        Ok(())
    }
}

impl NoteStore for MemoryStore {
    async fn note(&self, user_id: &str, video_id: &str) -> eyre::Result<Option<Note>> {
        Ok(self.notes.lock().await.get(&key(user_id, video_id)).cloned())
    }

    async fn upsert_note(&self, user_id: &str, video_id: &str, content: &str) -> eyre::Result<()> {
        let now = Timestamp::now();
        self.notes
            .lock()
            .await
            .entry(key(user_id, video_id))
            .and_modify(|note| {
                note.content = content.to_string();
                note.updated_at = now;
            })
            .or_insert_with(|| Note {
                user_id: user_id.to_string(),
                video_id: video_id.to_string(),
                content: content.to_string(),
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn delete_note(&self, user_id: &str, video_id: &str) -> eyre::Result<()> {
        self.notes.lock().await.remove(&key(user_id, video_id));
        Ok(())
    }
}

impl AuditLog for MemoryStore {
    async fn record(&self, event: &AuditEvent) -> eyre::Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventStatus;
    use oauth2::{AccessToken, RefreshToken};
    use pretty_assertions::assert_eq;

    fn record() -> CredentialRecord {
        CredentialRecord::linked(
            "u1",
            "google",
            AccessToken::new("old-access".to_string()),
            Some(RefreshToken::new("refresh".to_string())),
            Timestamp::from_second(1_000).unwrap(),
        )
    }

    #[tokio::test]
    async fn find_is_keyed_by_user_and_provider() {
        let store = MemoryStore::with_credential(record());
        assert!(store.find("u1", "google").await.unwrap().is_some());
        assert!(store.find("u1", "github").await.unwrap().is_none());
        assert!(store.find("u2", "google").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_replaces_token_fields_and_keeps_refresh_token() {
        let store = MemoryStore::with_credential(record());
        let update = TokenUpdate {
            access_token: AccessToken::new("new-access".to_string()),
            expires_at: Timestamp::from_second(5_000).unwrap(),
            scope: Some("youtube".to_string()),
            token_type: Some("Bearer".to_string()),
            id_token: None,
            refresh_token: None,
        };
        store.update("u1", "google", &update).await.unwrap();

        let stored = store.find("u1", "google").await.unwrap().unwrap();
        assert_eq!(stored.access_token.unwrap().secret(), "new-access");
        assert_eq!(stored.expires_at.unwrap().as_second(), 5_000);
        assert_eq!(stored.scope.as_deref(), Some("youtube"));
        assert_eq!(stored.token_type.as_deref(), Some("Bearer"));
        assert_eq!(stored.refresh_token.unwrap().secret(), "refresh");
    }

    #[tokio::test]
    async fn update_without_record_fails() {
        let store = MemoryStore::new();
        let update = TokenUpdate {
            access_token: AccessToken::new("a".to_string()),
            expires_at: Timestamp::from_second(5_000).unwrap(),
            scope: None,
            token_type: None,
            id_token: None,
            refresh_token: None,
        };
        assert!(store.update("u1", "google", &update).await.is_err());
    }

    #[tokio::test]
    async fn notes_upsert_and_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.note("u1", "vid").await.unwrap(), None);

        store.upsert_note("u1", "vid", "first").await.unwrap();
        store.upsert_note("u1", "vid", "second").await.unwrap();
        let note = store.note("u1", "vid").await.unwrap().unwrap();
        assert_eq!(note.content, "second");
        assert!(store.note("u2", "vid").await.unwrap().is_none());

        store.delete_note("u1", "vid").await.unwrap();
        store.delete_note("u1", "vid").await.unwrap();
        assert_eq!(store.note("u1", "vid").await.unwrap(), None);
    }

    #[tokio::test]
    async fn events_are_appended_in_order() {
        let store = MemoryStore::new();
        store
            .record(&AuditEvent::new("u1", "video.fetch", EventStatus::Success))
            .await
            .unwrap();
        store
            .record(&AuditEvent::new("u1", "comment.add", EventStatus::Error))
            .await
            .unwrap();
        let actions: Vec<_> = store
            .events()
            .await
            .into_iter()
            .map(|e| (e.action, e.status))
            .collect();
        assert_eq!(
            actions,
            vec![
                ("video.fetch".to_string(), EventStatus::Success),
                ("comment.add".to_string(), EventStatus::Error),
            ]
        );
    }
}

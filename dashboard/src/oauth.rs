//! OAuth 2.0 access-token lifecycle for YouTube API calls.
//!
//! The initial Google consent happens elsewhere and leaves a [`CredentialRecord`] in the
//! store. From then on, [`TokenManager::access_token`] hands out a usable access token,
//! refreshing it through Google's token endpoint and persisting the result whenever the
//! stored one is about to expire.
//!
//! The read-refresh-write sequence is not locked. Two requests that both see a stale token
//! each refresh and each persist, and the last write wins.
//!
//! [`CredentialRecord`]: crate::store::CredentialRecord

use crate::config::{GoogleConfig, PROVIDER};
use crate::error::{Error, Result};
use crate::store::{CredentialRecord, CredentialStore, TokenUpdate};
use eyre::Context;
use jiff::{SignedDuration, Timestamp};
use oauth2::{AccessToken, ClientId, ClientSecret, RefreshToken, TokenUrl};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

/// A stored access token is only handed out if it stays valid for at least this long.
///
/// This turns "the token expired while the request was in flight" into an early refresh.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The subset of Google's token endpoint response that we read.
///
/// Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: AccessToken,
    /// Lifetime of `access_token` in seconds.
    #[serde(default)]
    expires_in: u64,
    scope: Option<String>,
    token_type: Option<String>,
    id_token: Option<String>,
    /// Google does not normally rotate refresh tokens, but if it hands out a new one we keep it.
    refresh_token: Option<RefreshToken>,
}

impl CredentialRecord {
    /// The stored access token, if it is still good for at least [`EXPIRY_MARGIN_SECS`].
    fn usable_access_token(&self, now: Timestamp) -> Option<&AccessToken> {
        let expires_at = self.expires_at?;
        if expires_at.as_second() > now.as_second() + EXPIRY_MARGIN_SECS {
            self.access_token.as_ref()
        } else {
            None
        }
    }
}

/// Hands out valid access tokens for users, refreshing them when needed.
#[derive(Debug)]
pub struct TokenManager<S> {
    store: Arc<S>,
    client_id: ClientId,
    client_secret: ClientSecret,
    token_url: TokenUrl,
    http_client: reqwest::Client,
}

impl<S> Clone for TokenManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            token_url: self.token_url.clone(),
            http_client: self.http_client.clone(),
        }
    }
}

impl<S> TokenManager<S>
where
    S: CredentialStore,
{
    pub fn new(store: Arc<S>, config: &GoogleConfig, http_client: reqwest::Client) -> Self {
        Self {
            store,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
            http_client,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns an access token for `user_id` that is valid for at least another minute.
    ///
    /// If the stored token is fresh enough it is returned without any network traffic.
    /// Otherwise the stored refresh token is exchanged for a new access token, which is
    /// written back to the store *before* it is returned.
    ///
    /// # Errors
    ///
    /// * [`Error::AccountNotLinked`] if there is no stored credential for the user
    /// * [`Error::MissingRefreshToken`] if the token is stale and cannot be refreshed
    /// * [`Error::TokenRefreshFailed`] if Google rejects the refresh; this is not retried
    /// * [`Error::Unknown`] if the store or the network fail
    #[instrument(skip(self))]
    pub async fn access_token(&self, user_id: &str) -> Result<AccessToken> {
        let Some(record) = self
            .store
            .find(user_id, PROVIDER)
            .await
            .context("look up stored credential")?
        else {
            tracing::debug!("no linked account");
            return Err(Error::AccountNotLinked);
        };

        if let Some(access_token) = record.usable_access_token(Timestamp::now()) {
            tracing::trace!("using stored access token");
            return Ok(access_token.clone());
        }

        let Some(refresh_token) = record.refresh_token.as_ref() else {
            tracing::warn!("access token expired and no refresh token available");
            return Err(Error::MissingRefreshToken);
        };

        tracing::debug!("access token expired, refreshing");
        let update = self.refresh(refresh_token).await?;
        self.store
            .update(user_id, PROVIDER, &update)
            .await
            .context("persist refreshed token")?;
        tracing::debug!(expires_at = %update.expires_at, "access token refreshed");

        Ok(update.access_token)
    }

    /// Exchanges a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenUpdate> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.secret().as_str()),
            ("refresh_token", refresh_token.secret().as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(self.token_url.as_str())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            tracing::warn!(%status, "token endpoint rejected refresh");
            return Err(Error::TokenRefreshFailed { status, body });
        }

        let token: RefreshResponse = response.json().await?;
        let lifetime =
            SignedDuration::from_secs(i64::try_from(token.expires_in).unwrap_or(i64::MAX));
        let expires_at = Timestamp::now()
            .checked_add(lifetime)
            .context("compute access token expiry")?;

        Ok(TokenUpdate {
            access_token: token.access_token,
            expires_at,
            scope: token.scope,
            token_type: token.token_type,
            id_token: token.id_token,
            refresh_token: token.refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> GoogleConfig {
        GoogleConfig::new("client-id", "client-secret")
            .with_token_url(&format!("{}/token", server.uri()))
            .unwrap()
    }

    fn record(access: Option<&str>, refresh: Option<&str>, expires_in: i64) -> CredentialRecord {
        let mut record = CredentialRecord::linked(
            "u1",
            PROVIDER,
            AccessToken::new(String::new()),
            refresh.map(|r| RefreshToken::new(r.to_string())),
            Timestamp::now() + SignedDuration::from_secs(expires_in),
        );
        record.access_token = access.map(|a| AccessToken::new(a.to_string()));
        record
    }

    fn manager(server: &MockServer, store: MemoryStore) -> TokenManager<MemoryStore> {
        TokenManager::new(Arc::new(store), &config(server), reqwest::Client::new())
    }

    fn refreshed() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/youtube.force-ssl",
            "token_type": "Bearer",
            "id_token": "id-token",
        }))
    }

    #[tokio::test]
    async fn fresh_token_is_returned_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(refreshed())
            .expect(0)
            .mount(&server)
            .await;

        let tokens = manager(
            &server,
            MemoryStore::with_credential(record(Some("cached"), Some("refresh"), 3600)),
        );
        let token = tokens.access_token("u1").await.unwrap();
        assert_eq!(token.secret(), "cached");
    }

    #[tokio::test]
    async fn stale_token_is_refreshed_once_and_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .and(body_string_contains("client_id=client-id"))
            .and(body_string_contains("client_secret=client-secret"))
            .respond_with(refreshed())
            .expect(1)
            .mount(&server)
            .await;

        let tokens = manager(
            &server,
            MemoryStore::with_credential(record(Some("stale"), Some("refresh-1"), -10)),
        );
        let before = Timestamp::now().as_second();
        let token = tokens.access_token("u1").await.unwrap();
        assert_eq!(token.secret(), "fresh-access");

        let stored = tokens.store().find("u1", PROVIDER).await.unwrap().unwrap();
        assert_eq!(stored.access_token.unwrap().secret(), "fresh-access");
        let expires_at = stored.expires_at.unwrap().as_second();
        assert!(expires_at >= before + 3599 && expires_at <= before + 3601);
        assert_eq!(
            stored.scope.as_deref(),
            Some("https://www.googleapis.com/auth/youtube.force-ssl")
        );
        assert_eq!(stored.token_type.as_deref(), Some("Bearer"));
        assert_eq!(stored.id_token.as_deref(), Some("id-token"));
        assert_eq!(stored.refresh_token.unwrap().secret(), "refresh-1");

        // now fresh, so no second refresh
        let again = tokens.access_token("u1").await.unwrap();
        assert_eq!(again.secret(), "fresh-access");
    }

    #[tokio::test]
    async fn token_inside_safety_margin_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(refreshed())
            .expect(1)
            .mount(&server)
            .await;

        let tokens = manager(
            &server,
            MemoryStore::with_credential(record(Some("nearly"), Some("refresh"), 30)),
        );
        assert_eq!(tokens.access_token("u1").await.unwrap().secret(), "fresh-access");
    }

    #[tokio::test]
    async fn missing_access_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(refreshed())
            .expect(1)
            .mount(&server)
            .await;

        let tokens = manager(
            &server,
            MemoryStore::with_credential(record(None, Some("refresh"), 3600)),
        );
        assert_eq!(tokens.access_token("u1").await.unwrap().secret(), "fresh-access");
    }

    #[tokio::test]
    async fn rotated_refresh_token_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh-access",
                "expires_in": 3599,
                "refresh_token": "refresh-2",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = manager(
            &server,
            MemoryStore::with_credential(record(Some("stale"), Some("refresh-1"), 0)),
        );
        tokens.access_token("u1").await.unwrap();
        let stored = tokens.store().find("u1", PROVIDER).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.unwrap().secret(), "refresh-2");
        assert_eq!(stored.scope, None);
    }

    #[tokio::test]
    async fn stale_token_without_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(refreshed())
            .expect(0)
            .mount(&server)
            .await;

        let tokens = manager(
            &server,
            MemoryStore::with_credential(record(Some("stale"), None, -10)),
        );
        let err = tokens.access_token("u1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRefreshToken);
    }

    #[tokio::test]
    async fn unlinked_account() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(refreshed())
            .expect(0)
            .mount(&server)
            .await;

        let tokens = manager(&server, MemoryStore::new());
        let err = tokens.access_token("nobody").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountNotLinked);
    }

    #[tokio::test]
    async fn rejected_refresh_leaves_store_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let original = record(Some("stale"), Some("revoked"), -10);
        let original_expiry = original.expires_at;
        let tokens = manager(&server, MemoryStore::with_credential(original));

        match tokens.access_token("u1").await.unwrap_err() {
            Error::TokenRefreshFailed { status, body } => {
                assert_eq!(status.as_u16(), 400);
                assert_eq!(body, r#"{"error":"invalid_grant"}"#);
            }
            other => panic!("expected refresh failure, got {other:?}"),
        }

        let stored = tokens.store().find("u1", PROVIDER).await.unwrap().unwrap();
        assert_eq!(stored.access_token.unwrap().secret(), "stale");
        assert_eq!(stored.expires_at, original_expiry);
        assert_eq!(stored.refresh_token.unwrap().secret(), "revoked");
    }

    /// Delegates to a [`MemoryStore`], except for the operation that is set to fail.
    #[derive(Debug)]
    struct FailingStore {
        inner: MemoryStore,
        fail_find: bool,
        fail_update: bool,
    }

    impl CredentialStore for FailingStore {
        async fn find(
            &self,
            user_id: &str,
            provider: &str,
        ) -> eyre::Result<Option<CredentialRecord>> {
            if self.fail_find {
                eyre::bail!("accounts table is unreadable");
            }
            self.inner.find(user_id, provider).await
        }

        async fn update(
            &self,
            user_id: &str,
            provider: &str,
            update: &TokenUpdate,
        ) -> eyre::Result<()> {
            if self.fail_update {
                eyre::bail!("disk full");
            }
            self.inner.update(user_id, provider, update).await
        }

        async fn link(&self, record: &CredentialRecord) -> eyre::Result<()> {
            self.inner.link(record).await
        }
    }

    #[tokio::test]
    async fn failed_persist_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(refreshed())
            .expect(1)
            .mount(&server)
            .await;

        let store = FailingStore {
            inner: MemoryStore::with_credential(record(Some("stale"), Some("refresh"), -10)),
            fail_find: false,
            fail_update: true,
        };
        let tokens = TokenManager::new(Arc::new(store), &config(&server), reqwest::Client::new());

        let err = tokens.access_token("u1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(!err.to_string().contains("fresh-access"));

        let stored = tokens.store().inner.find("u1", PROVIDER).await.unwrap().unwrap();
        assert_eq!(stored.access_token.unwrap().secret(), "stale");
    }

    #[tokio::test]
    async fn failed_lookup_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(refreshed())
            .expect(0)
            .mount(&server)
            .await;

        let store = FailingStore {
            inner: MemoryStore::with_credential(record(Some("cached"), Some("refresh"), 3600)),
            fail_find: true,
            fail_update: false,
        };
        let tokens = TokenManager::new(Arc::new(store), &config(&server), reqwest::Client::new());

        let err = tokens.access_token("u1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[tokio::test]
    async fn unparseable_refresh_response_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let tokens = manager(
            &server,
            MemoryStore::with_credential(record(Some("stale"), Some("refresh"), -10)),
        );
        let err = tokens.access_token("u1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }
}

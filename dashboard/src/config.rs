//! Google OAuth client and endpoint configuration.

use eyre::Context;
use oauth2::{ClientId, ClientSecret, TokenUrl};
use reqwest::Url;

/// Google OAuth2 token endpoint, used to exchange a refresh token for a fresh access token.
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Base of every YouTube Data API v3 resource path.
pub const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// The identity provider every stored credential belongs to.
pub const PROVIDER: &str = "google";

/// Everything needed to refresh Google tokens and call the YouTube API.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub token_url: TokenUrl,
    pub api_base: Url,
}

impl GoogleConfig {
    /// Configuration for the production Google endpoints.
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded endpoint URLs do not parse.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: ClientId::new(client_id.into()),
            client_secret: ClientSecret::new(client_secret.into()),
            token_url: TokenUrl::new(TOKEN_URL.to_string()).expect("Invalid token endpoint URL"),
            api_base: Url::parse(API_BASE).expect("Invalid YouTube API base URL"),
        }
    }

    /// Reads `AUTH_GOOGLE_ID` and `AUTH_GOOGLE_SECRET`, plus the optional `GOOGLE_TOKEN_URL` and
    /// `YOUTUBE_API_BASE` endpoint overrides.
    pub fn from_env() -> eyre::Result<Self> {
        let client_id = std::env::var("AUTH_GOOGLE_ID").context("read AUTH_GOOGLE_ID")?;
        let client_secret =
            std::env::var("AUTH_GOOGLE_SECRET").context("read AUTH_GOOGLE_SECRET")?;
        let mut config = Self::new(client_id, client_secret);
        if let Ok(token_url) = std::env::var("GOOGLE_TOKEN_URL") {
            config = config.with_token_url(&token_url)?;
        }
        if let Ok(api_base) = std::env::var("YOUTUBE_API_BASE") {
            config = config.with_api_base(&api_base)?;
        }
        Ok(config)
    }

    pub fn with_token_url(mut self, token_url: &str) -> eyre::Result<Self> {
        self.token_url = TokenUrl::new(token_url.to_string())
            .with_context(|| format!("parse token endpoint URL {token_url}"))?;
        Ok(self)
    }

    pub fn with_api_base(mut self, api_base: &str) -> eyre::Result<Self> {
        self.api_base =
            Url::parse(api_base).with_context(|| format!("parse API base URL {api_base}"))?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_point_at_google() {
        let config = GoogleConfig::new("id", "secret");
        assert_eq!(config.token_url.as_str(), TOKEN_URL);
        assert_eq!(config.api_base.as_str(), API_BASE);
        assert_eq!(config.client_id.as_str(), "id");
        assert_eq!(config.client_secret.secret(), "secret");
    }

    #[test]
    fn overrides() {
        let config = GoogleConfig::new("id", "secret")
            .with_token_url("http://127.0.0.1:9000/token")
            .unwrap()
            .with_api_base("http://127.0.0.1:9000/youtube/v3")
            .unwrap();
        assert_eq!(config.token_url.as_str(), "http://127.0.0.1:9000/token");
        assert_eq!(config.api_base.path(), "/youtube/v3");
    }

    #[test]
    fn bad_override_is_an_error() {
        assert!(
            GoogleConfig::new("id", "secret")
                .with_api_base("not a url")
                .is_err()
        );
    }
}

//! YouTube Data API v3 client library.
//!
//! [`YouTubeClient`] is the single gateway through which the dashboard talks to YouTube. It
//! is generic over the [`CredentialStore`] holding the users' Google tokens, and every call
//! is made on behalf of one user id:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_stream::StreamExt;
//! use youtube_dashboard::config::GoogleConfig;
//! use youtube_dashboard::store::SqliteStore;
//! use youtube_dashboard::youtube_api::YouTubeClient;
//!
//! # async fn example() -> eyre::Result<()> {
//! let store = Arc::new(SqliteStore::open("dashboard.db")?);
//! let client = YouTubeClient::new(store, &GoogleConfig::from_env()?)?;
//!
//! let mut threads = std::pin::pin!(client.comment_threads("user-1", "dQw4w9WgXcQ"));
//! while let Some(thread) = threads.next().await {
//!     let thread = thread?;
//!     println!("{}: {:?}", thread.id, thread.snippet.top_level_comment.snippet.text_display);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`CredentialStore`]: crate::store::CredentialStore

pub mod channels;
pub mod client;
pub mod comments;
pub mod query;
pub mod types;
pub mod videos;

pub use client::{ApiRequest, YouTubeClient};
pub use query::{Query, QueryValue};
pub use types::{Page, PageInfo, PagedStream};

pub use channels::Channel;
pub use comments::{Comment, CommentSnippet, CommentThread, CommentThreadListResponse};
pub use videos::{Video, VideoSnippet, VideoStatistics};

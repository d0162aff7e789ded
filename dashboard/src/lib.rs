//! Backend of a YouTube comment-management dashboard.
//!
//! Users link their Google account once; from then on the [`Dashboard`] acts on their behalf:
//! it keeps their access token fresh ([`oauth`]), talks to the YouTube Data API
//! ([`youtube_api`]), maps failures onto a small set of [`Error`] kinds, and keeps private
//! notes and an audit log in a [`store`].

pub mod config;
pub mod dashboard;
pub mod error;
pub mod oauth;
pub mod store;
pub mod video_id;
pub mod youtube_api;

pub use config::GoogleConfig;
pub use dashboard::Dashboard;
pub use error::{Error, ErrorKind, Result};
pub use oauth::TokenManager;
pub use video_id::{extract_video_id, resolve_video_id};
pub use youtube_api::YouTubeClient;

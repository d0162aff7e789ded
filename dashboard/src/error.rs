//! The closed set of failures the dashboard can surface.
//!
//! Everything that leaves the token lifecycle manager or the API gateway is one of the
//! [`Error`] variants below. Raw HTTP failures from the YouTube API are first captured as an
//! [`ApiFailure`] and then run through [`classify`], so callers never see an unclassified
//! transport error.

use http::StatusCode;
use std::fmt;

/// Marker YouTube puts in the error body when a video has comments turned off.
const COMMENTS_DISABLED_MARKER: &str = "commentsDisabled";

/// Marker YouTube puts in the error body once the project's daily quota is used up.
const QUOTA_EXCEEDED_MARKER: &str = "quotaExceeded";

/// A non-success response (or a failure to get one) from the YouTube Data API.
///
/// This is the input to [`classify`], not something to show to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// HTTP status of the response, if a response was received at all.
    pub status: Option<StatusCode>,
    /// Raw response body.
    pub body: String,
}

impl ApiFailure {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
        }
    }

    fn mentions(&self, marker: &str) -> bool {
        self.body.contains(marker)
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "YouTube API error {}: {}", status.as_u16(), self.body),
            None => write!(f, "YouTube API error: {}", self.body),
        }
    }
}

/// Discriminant of [`Error`], for logs and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AccountNotLinked,
    MissingRefreshToken,
    TokenRefreshFailed,
    CommentsDisabled,
    Forbidden,
    NotFound,
    QuotaExceeded,
    InvalidInput,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AccountNotLinked => "account_not_linked",
            ErrorKind::MissingRefreshToken => "missing_refresh_token",
            ErrorKind::TokenRefreshFailed => "token_refresh_failed",
            ErrorKind::CommentsDisabled => "comments_disabled",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::QuotaExceeded => "quota_exceeded",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified dashboard failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// There is no stored Google credential for the user.
    #[error("Google account not linked")]
    AccountNotLinked,

    /// The access token is stale and there is no refresh token to renew it with.
    #[error("missing refresh token")]
    MissingRefreshToken,

    /// The token endpoint rejected the refresh request.
    #[error("failed to refresh token: {} {body}", .status.as_u16())]
    TokenRefreshFailed { status: StatusCode, body: String },

    #[error("comments disabled ({0})")]
    CommentsDisabled(ApiFailure),

    #[error("forbidden ({0})")]
    Forbidden(ApiFailure),

    #[error("not found ({0})")]
    NotFound(ApiFailure),

    #[error("quota exceeded ({0})")]
    QuotaExceeded(ApiFailure),

    /// Caller input rejected before any request was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Anything else. Carries the original message.
    #[error("{0}")]
    Unknown(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AccountNotLinked => ErrorKind::AccountNotLinked,
            Error::MissingRefreshToken => ErrorKind::MissingRefreshToken,
            Error::TokenRefreshFailed { .. } => ErrorKind::TokenRefreshFailed,
            Error::CommentsDisabled(_) => ErrorKind::CommentsDisabled,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Whether the user has to go through Google consent again before anything can work.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Error::AccountNotLinked | Error::MissingRefreshToken)
    }

    /// The text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Error::AccountNotLinked => {
                "Google account not linked. Please sign in with Google.".to_string()
            }
            Error::MissingRefreshToken => {
                "Missing refresh token. Re-connect Google with consent.".to_string()
            }
            Error::TokenRefreshFailed { .. } => {
                "Could not refresh your Google session. Please try again later.".to_string()
            }
            Error::CommentsDisabled(_) => "Comments are disabled for this video".to_string(),
            Error::Forbidden(_) => {
                "Access denied. Please check your permissions or try signing in again."
                    .to_string()
            }
            Error::NotFound(_) => "Video not found or is private".to_string(),
            Error::QuotaExceeded(_) => {
                "YouTube API quota exceeded. Please try again later.".to_string()
            }
            Error::InvalidInput(reason) => reason.clone(),
            Error::Unknown(_) => {
                "An error occurred while communicating with YouTube API".to_string()
            }
        }
    }

    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInput(reason.into())
    }
}

/// Maps a raw API failure onto the error taxonomy.
///
/// The comments-disabled check must run before the generic 403 case since both are 403s.
/// Quota exhaustion is recognised by its marker whatever the status (YouTube reports it as a
/// 403 too).
pub fn classify(failure: ApiFailure) -> Error {
    match failure.status.map(|s| s.as_u16()) {
        Some(403) if failure.mentions(COMMENTS_DISABLED_MARKER) => {
            Error::CommentsDisabled(failure)
        }
        _ if failure.mentions(QUOTA_EXCEEDED_MARKER) => Error::QuotaExceeded(failure),
        Some(403) => Error::Forbidden(failure),
        Some(404) => Error::NotFound(failure),
        _ => Error::Unknown(failure.to_string()),
    }
}

impl From<ApiFailure> for Error {
    fn from(failure: ApiFailure) -> Self {
        classify(failure)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let mut message = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Error::Unknown(message)
    }
}

impl From<eyre::Report> for Error {
    fn from(e: eyre::Report) -> Self {
        Error::Unknown(format!("{e:#}"))
    }
}

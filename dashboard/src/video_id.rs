//! Turning user input into YouTube video ids, and the URLs derived from an id.

use crate::error::{Error, Result};
use reqwest::Url;

/// Bare ids are 11 characters of `[A-Za-z0-9_-]` today; accept a little variance either way.
fn looks_like_id(s: &str) -> bool {
    (6..=15).contains(&s.len())
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Extracts a video id from a bare id or any of the common YouTube URL forms:
///
/// - `https://www.youtube.com/watch?v=<id>`
/// - `https://youtu.be/<id>`
/// - `https://www.youtube.com/shorts/<id>`
/// - `https://www.youtube.com/embed/<id>`
/// - `https://www.youtube.com/live/<id>`
///
/// Returns `None` for anything else, including URLs on other hosts.
pub fn extract_video_id(input: &str) -> Option<String> {
    let raw = input.trim();
    if raw.is_empty() {
        return None;
    }
    if looks_like_id(raw) {
        return Some(raw.to_string());
    }

    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if host == "youtu.be" {
        return url
            .path_segments()?
            .find(|segment| !segment.is_empty())
            .map(str::to_string);
    }

    if host.ends_with("youtube.com") {
        if url.path().trim_end_matches('/') == "/watch" {
            return url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty());
        }
        let mut parts = url.path_segments()?.filter(|segment| !segment.is_empty());
        if let (Some("shorts" | "embed" | "live"), Some(id)) = (parts.next(), parts.next()) {
            return Some(id.to_string());
        }
    }

    None
}

/// Resolves dashboard input to the id to send to the API.
///
/// Input that is neither a recognised id/URL nor an `http(s)` URL is passed through
/// unchanged; an unrecognised `http(s)` URL is rejected.
pub fn resolve_video_id(input: &str) -> Result<String> {
    if input.trim().len() < 3 {
        return Err(Error::invalid_input("Video id must be at least 3 characters"));
    }
    if let Some(id) = extract_video_id(input) {
        return Ok(id);
    }
    let lower = input.trim_start().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Err(Error::invalid_input("Invalid YouTube URL"));
    }
    Ok(input.to_string())
}

/// Sizes of the thumbnails YouTube generates for every video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailQuality {
    /// 120x90
    Default,
    /// 320x180
    Medium,
    /// 480x360
    #[default]
    High,
    /// 640x480
    Standard,
    /// Original resolution; not generated for every video.
    Max,
}

impl ThumbnailQuality {
    fn file_name(&self) -> &'static str {
        match self {
            ThumbnailQuality::Default => "default",
            ThumbnailQuality::Medium => "mqdefault",
            ThumbnailQuality::High => "hqdefault",
            ThumbnailQuality::Standard => "sddefault",
            ThumbnailQuality::Max => "maxresdefault",
        }
    }
}

pub fn thumbnail_url(video_id: &str, quality: ThumbnailQuality) -> String {
    format!("https://i.ytimg.com/vi/{video_id}/{}.jpg", quality.file_name())
}

pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{video_id}")
}

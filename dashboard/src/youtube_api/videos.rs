//! YouTube Videos API types.

use crate::youtube_api::types::PageInfo;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Response structure for the `videos.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/list>
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListResponse {
    /// A list of videos that match the request criteria.
    ///
    /// Empty (or missing) when the id is unknown or the video is private.
    #[serde(default)]
    pub items: VecDeque<Video>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
}

/// A `video` resource represents a YouTube video.
///
/// Each part is only present if it was requested through the `part` parameter.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    /// The ID that YouTube uses to uniquely identify the video.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<VideoSnippet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<VideoStatistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_details: Option<VideoContentDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatus>,
}

/// Basic details about a video.
///
/// `videos.update` replaces the whole snippet, so every field YouTube sends is kept around,
/// including the ones not modelled here (`categoryId`, `thumbnails`, `defaultLanguage`, ...),
/// and written back unchanged.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#snippet>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Statistics about the video.
///
/// YouTube reports all counts as decimal strings.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#statistics>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    /// The number of times the video has been viewed.
    pub view_count: Option<String>,
    /// The number of users who have indicated that they liked the video.
    pub like_count: Option<String>,
    /// Only visible to the video owner.
    pub dislike_count: Option<String>,
    /// Deprecated; always 0.
    pub favorite_count: Option<String>,
    /// Absent when comments are disabled.
    pub comment_count: Option<String>,
}

/// See: <https://developers.google.com/youtube/v3/docs/videos#contentDetails>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContentDetails {
    /// ISO 8601 duration, e.g. `PT4M13S`.
    pub duration: Option<String>,
    /// `hd` or `sd`.
    pub definition: Option<String>,
    /// `"true"` or `"false"`, as a string.
    pub caption: Option<String>,
}

/// See: <https://developers.google.com/youtube/v3/docs/videos#status>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub upload_status: Option<String>,
    /// `public`, `unlisted` or `private`.
    pub privacy_status: Option<String>,
    pub embeddable: Option<bool>,
    pub made_for_kids: Option<bool>,
}

/// Request body for `videos.update` with `part=snippet`.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/update>
#[derive(Debug, Serialize)]
pub struct VideoUpdateRequest<'a> {
    pub id: &'a str,
    pub snippet: &'a VideoSnippet,
}

impl VideoSnippet {
    /// Overwrites title and/or description, leaving every other field as it was.
    pub fn merge(&mut self, title: Option<&str>, description: Option<&str>) {
        if let Some(title) = title {
            self.title = Some(title.to_string());
        }
        if let Some(description) = description {
            self.description = Some(description.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn snippet_keeps_unmodelled_fields() {
        let mut snippet: VideoSnippet = serde_json::from_value(json!({
            "title": "old title",
            "description": "old description",
            "categoryId": "22",
            "tags": ["a", "b"],
            "publishedAt": "2024-03-01T12:00:00Z",
        }))
        .unwrap();
        snippet.merge(Some("new title"), None);

        assert_eq!(
            serde_json::to_value(&snippet).unwrap(),
            json!({
                "title": "new title",
                "description": "old description",
                "categoryId": "22",
                "tags": ["a", "b"],
                "publishedAt": "2024-03-01T12:00:00Z",
            })
        );
    }

    #[test]
    fn empty_description_is_a_value() {
        let mut snippet = VideoSnippet::default();
        snippet.merge(None, Some(""));
        assert_eq!(snippet.description.as_deref(), Some(""));
        assert_eq!(snippet.title, None);
    }

    #[test]
    fn missing_items() {
        let response: VideoListResponse = serde_json::from_value(json!({
            "kind": "youtube#videoListResponse",
            "pageInfo": {"totalResults": 0, "resultsPerPage": 0},
        }))
        .unwrap();
        assert!(response.items.is_empty());
    }

    #[test]
    fn partial_video() {
        let video: Video = serde_json::from_value(json!({
            "id": "dQw4w9WgXcQ",
            "statistics": {"viewCount": "10", "likeCount": "2"},
        }))
        .unwrap();
        assert_eq!(video.snippet, None);
        let statistics = video.statistics.unwrap();
        assert_eq!(statistics.view_count.as_deref(), Some("10"));
        assert_eq!(statistics.comment_count, None);
    }
}

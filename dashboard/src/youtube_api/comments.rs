//! YouTube CommentThreads and Comments API types.

use crate::youtube_api::types::PageInfo;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Response structure for the `commentThreads.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/commentThreads/list>
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadListResponse {
    #[serde(default)]
    pub items: VecDeque<CommentThread>,
    /// Pass as `pageToken` to get the next page. Absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
}

/// A top-level comment and, if requested, some of its replies.
///
/// See: <https://developers.google.com/youtube/v3/docs/commentThreads#resource>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    pub id: String,
    pub snippet: CommentThreadSnippet,
    /// Only a subset of the replies; use `comments.list` with `parentId` for all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<CommentThreadReplies>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadSnippet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    pub top_level_comment: Comment,
    #[serde(default)]
    pub can_reply: bool,
    #[serde(default)]
    pub total_reply_count: u32,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentThreadReplies {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// A single comment, either top-level or a reply.
///
/// See: <https://developers.google.com/youtube/v3/docs/comments#resource>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub snippet: CommentSnippet,
}

/// See: <https://developers.google.com/youtube/v3/docs/comments#snippet>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnippet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_profile_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_channel_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_channel_id: Option<AuthorChannelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// The comment as YouTube renders it. With `textFormat=plainText` this is plain text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_display: Option<String>,
    /// Only returned to the comment's author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_original: Option<String>,
    /// Set on replies only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorChannelId {
    pub value: String,
}

/// Request body for `commentThreads.insert`.
///
/// See: <https://developers.google.com/youtube/v3/docs/commentThreads/insert>
#[derive(Debug, Serialize)]
pub struct CommentThreadInsertRequest<'a> {
    pub snippet: NewThreadSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewThreadSnippet<'a> {
    pub video_id: &'a str,
    pub top_level_comment: NewComment<'a>,
}

#[derive(Debug, Serialize)]
pub struct NewComment<'a> {
    pub snippet: CommentText<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentText<'a> {
    pub text_original: &'a str,
}

/// Request body for `comments.insert`, which only creates replies.
///
/// See: <https://developers.google.com/youtube/v3/docs/comments/insert>
#[derive(Debug, Serialize)]
pub struct ReplyInsertRequest<'a> {
    pub snippet: ReplySnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplySnippet<'a> {
    pub parent_id: &'a str,
    pub text_original: &'a str,
}

/// Request body for `comments.update`.
///
/// See: <https://developers.google.com/youtube/v3/docs/comments/update>
#[derive(Debug, Serialize)]
pub struct CommentUpdateRequest<'a> {
    pub id: &'a str,
    pub snippet: CommentText<'a>,
}

impl<'a> CommentThreadInsertRequest<'a> {
    pub fn new(video_id: &'a str, text: &'a str) -> Self {
        Self {
            snippet: NewThreadSnippet {
                video_id,
                top_level_comment: NewComment {
                    snippet: CommentText {
                        text_original: text,
                    },
                },
            },
        }
    }
}

impl<'a> ReplyInsertRequest<'a> {
    pub fn new(parent_id: &'a str, text: &'a str) -> Self {
        Self {
            snippet: ReplySnippet {
                parent_id,
                text_original: text,
            },
        }
    }
}

impl<'a> CommentUpdateRequest<'a> {
    pub fn new(comment_id: &'a str, text: &'a str) -> Self {
        Self {
            id: comment_id,
            snippet: CommentText {
                text_original: text,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_bodies() {
        assert_eq!(
            serde_json::to_value(CommentThreadInsertRequest::new("vid", "hello")).unwrap(),
            json!({
                "snippet": {
                    "videoId": "vid",
                    "topLevelComment": {"snippet": {"textOriginal": "hello"}},
                }
            })
        );
        assert_eq!(
            serde_json::to_value(ReplyInsertRequest::new("parent", "hi")).unwrap(),
            json!({"snippet": {"parentId": "parent", "textOriginal": "hi"}})
        );
        assert_eq!(
            serde_json::to_value(CommentUpdateRequest::new("c1", "edited")).unwrap(),
            json!({"id": "c1", "snippet": {"textOriginal": "edited"}})
        );
    }

    #[test]
    fn thread_with_replies() {
        let page: CommentThreadListResponse = serde_json::from_value(json!({
            "kind": "youtube#commentThreadListResponse",
            "nextPageToken": "next",
            "pageInfo": {"totalResults": 1, "resultsPerPage": 50},
            "items": [{
                "kind": "youtube#commentThread",
                "id": "t1",
                "snippet": {
                    "videoId": "vid",
                    "canReply": true,
                    "totalReplyCount": 1,
                    "isPublic": true,
                    "topLevelComment": {
                        "id": "t1",
                        "snippet": {
                            "authorDisplayName": "someone",
                            "authorChannelId": {"value": "UC1"},
                            "textDisplay": "first",
                            "likeCount": 3,
                            "publishedAt": "2024-05-01T10:00:00Z",
                        }
                    }
                },
                "replies": {"comments": [{
                    "id": "t1.r1",
                    "snippet": {"parentId": "t1", "textDisplay": "second"}
                }]}
            }]
        }))
        .unwrap();

        assert_eq!(page.next_page_token.as_deref(), Some("next"));
        let thread = &page.items[0];
        assert_eq!(thread.snippet.total_reply_count, 1);
        assert_eq!(thread.snippet.top_level_comment.snippet.like_count, 3);
        assert_eq!(
            thread.snippet.top_level_comment.snippet.author_channel_id,
            Some(AuthorChannelId {
                value: "UC1".to_string()
            })
        );
        let replies = &thread.replies.as_ref().unwrap().comments;
        assert_eq!(replies[0].snippet.parent_id.as_deref(), Some("t1"));
    }

    #[test]
    fn last_page() {
        let page: CommentThreadListResponse =
            serde_json::from_value(json!({"items": []})).unwrap();
        assert_eq!(page.next_page_token, None);
    }
}

//! The actions the dashboard offers a signed-in user.
//!
//! Each action validates its input, goes through the [`YouTubeClient`] and writes an entry to
//! the [`AuditLog`], whether it succeeded or not. Writing the audit entry never changes the
//! outcome of the action: if the log cannot be written, that is logged and otherwise ignored.

use crate::config::GoogleConfig;
use crate::error::{Error, Result};
use crate::store::{AuditEvent, AuditLog, CredentialStore, EventStatus, Note, NoteStore};
use crate::video_id::resolve_video_id;
use crate::youtube_api::{
    Comment, CommentThread, CommentThreadListResponse, PagedStream, Video, YouTubeClient,
};
use serde_json::json;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::instrument;

/// Ids (video, comment) are never shorter than this.
const MIN_ID_LEN: usize = 3;

fn require_id(what: &str, id: &str) -> Result<()> {
    if id.trim().len() < MIN_ID_LEN {
        return Err(Error::invalid_input(format!(
            "{what} must be at least {MIN_ID_LEN} characters"
        )));
    }
    Ok(())
}

fn require_text(what: &str, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::invalid_input(format!("{what} must not be empty")));
    }
    Ok(())
}

#[derive(Debug)]
pub struct Dashboard<S> {
    client: YouTubeClient<S>,
    store: Arc<S>,
}

impl<S> Clone for Dashboard<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> Dashboard<S>
where
    S: CredentialStore + NoteStore + AuditLog,
{
    pub fn new(store: Arc<S>, config: &GoogleConfig) -> eyre::Result<Self> {
        let client = YouTubeClient::new(Arc::clone(&store), config)?;
        Ok(Self { client, store })
    }

    pub fn client(&self) -> &YouTubeClient<S> {
        &self.client
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Best-effort audit write.
    async fn audit(&self, event: &AuditEvent) {
        if let Err(e) = self.store.record(event).await {
            tracing::warn!(
                action = event.action,
                error = %format!("{e:#}"),
                "failed to write audit event"
            );
        }
    }

    /// Records how an action went, then hands back its result untouched.
    async fn settle<T>(&self, event: AuditEvent, result: Result<T>) -> Result<T> {
        let event = match &result {
            Ok(_) => event,
            Err(e) => event.failed(e.to_string()),
        };
        self.audit(&event).await;
        result
    }

    /// Resolves user input to a video id, recording a failed `action` if it is not one.
    async fn resolve(&self, event: &AuditEvent, input: &str) -> Result<String> {
        match resolve_video_id(input) {
            Ok(video_id) => Ok(video_id),
            Err(e) => self.settle(event.clone().with_video(input), Err(e)).await,
        }
    }

    /// Fetches a video by id or URL. `None` if YouTube does not know it or it is private.
    #[instrument(skip(self))]
    pub async fn fetch_video(&self, user_id: &str, input: &str) -> Result<Option<Video>> {
        require_id("Video id", input)?;
        let event = AuditEvent::new(user_id, "video.fetch", EventStatus::Success);
        let video_id = self.resolve(&event, input).await?;
        let result = self.client.video(user_id, &video_id).await;
        self.settle(event.with_video(&video_id), result).await
    }

    /// One page of the video's comment threads, newest first.
    #[instrument(skip(self))]
    pub async fn list_comments(
        &self,
        user_id: &str,
        input: &str,
        page_token: Option<&str>,
    ) -> Result<CommentThreadListResponse> {
        require_id("Video id", input)?;
        let event = AuditEvent::new(user_id, "comments.list", EventStatus::Success);
        let video_id = self.resolve(&event, input).await?;
        let result = self
            .client
            .list_comment_threads(user_id, &video_id, page_token)
            .await;
        self.settle(event.with_video(&video_id), result).await
    }

    /// Every comment thread of the video, fetching pages as the stream is consumed.
    ///
    /// Each page is fetched (and audited) like a call to [`Dashboard::list_comments`].
    pub fn comment_threads<'a>(
        &'a self,
        user_id: &'a str,
        input: &'a str,
    ) -> impl Stream<Item = Result<CommentThread>> + Send + 'a {
        PagedStream::new(move |page_token: Option<String>| async move {
            let page = self
                .list_comments(user_id, input, page_token.as_deref())
                .await?;
            Ok((page.items, page.next_page_token))
        })
    }

    /// Posts a new top-level comment.
    #[instrument(skip(self, text))]
    pub async fn add_comment(
        &self,
        user_id: &str,
        input: &str,
        text: &str,
    ) -> Result<CommentThread> {
        require_id("Video id", input)?;
        require_text("Comment text", text)?;
        let event = AuditEvent::new(user_id, "comment.add", EventStatus::Success)
            .with_target("comment", None);
        let video_id = self.resolve(&event, input).await?;
        let result = self
            .client
            .insert_comment_thread(user_id, &video_id, text)
            .await;
        let event = event
            .with_video(&video_id)
            .with_metadata(json!({ "text": text }));
        self.settle(event, result).await
    }

    #[instrument(skip(self, text))]
    pub async fn reply_to_comment(
        &self,
        user_id: &str,
        parent_id: &str,
        text: &str,
    ) -> Result<Comment> {
        require_id("Parent comment id", parent_id)?;
        require_text("Reply text", text)?;
        let result = self.client.insert_reply(user_id, parent_id, text).await;
        let event = AuditEvent::new(user_id, "comment.reply", EventStatus::Success)
            .with_target("comment", Some(parent_id))
            .with_metadata(json!({ "text": text }));
        self.settle(event, result).await
    }

    #[instrument(skip(self, text))]
    pub async fn update_comment(
        &self,
        user_id: &str,
        comment_id: &str,
        text: &str,
    ) -> Result<Comment> {
        require_id("Comment id", comment_id)?;
        require_text("Comment text", text)?;
        let result = self.client.update_comment(user_id, comment_id, text).await;
        let event = AuditEvent::new(user_id, "comment.update", EventStatus::Success)
            .with_target("comment", Some(comment_id))
            .with_metadata(json!({ "text": text }));
        self.settle(event, result).await
    }

    #[instrument(skip(self))]
    pub async fn delete_comment(&self, user_id: &str, comment_id: &str) -> Result<()> {
        require_id("Comment id", comment_id)?;
        let result = self.client.delete_comment(user_id, comment_id).await;
        let event = AuditEvent::new(user_id, "comment.delete", EventStatus::Success)
            .with_target("comment", Some(comment_id));
        self.settle(event, result).await
    }

    /// The user's own channel id, used to tell their comments apart from everyone else's.
    #[instrument(skip(self))]
    pub async fn my_channel_id(&self, user_id: &str) -> Result<Option<String>> {
        let result = self.client.my_channel_id(user_id).await;
        let event = AuditEvent::new(user_id, "me.channelId", EventStatus::Success);
        self.settle(event, result).await
    }

    /// Changes a video's title and/or description.
    ///
    /// The current snippet is fetched first and written back with only those two fields
    /// replaced, since YouTube requires fields like `categoryId` on every update.
    #[instrument(skip(self, description))]
    pub async fn update_video(
        &self,
        user_id: &str,
        input: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Video> {
        require_id("Video id", input)?;
        if let Some(title) = title {
            require_text("Title", title)?;
        }
        let event = AuditEvent::new(user_id, "video.update", EventStatus::Success);
        let video_id = self.resolve(&event, input).await?;

        let result = async {
            let current = self
                .client
                .video_parts(user_id, &video_id, "snippet")
                .await?;
            let mut snippet = current.and_then(|video| video.snippet).unwrap_or_default();
            snippet.merge(title, description);
            self.client
                .update_video_snippet(user_id, &video_id, &snippet)
                .await
        }
        .await;

        let event = event
            .with_video(&video_id)
            .with_metadata(json!({ "title": title, "description": description }));
        self.settle(event, result).await
    }

    /// The user's note on a video, if they wrote one.
    #[instrument(skip(self))]
    pub async fn note(&self, user_id: &str, video_id: &str) -> Result<Option<Note>> {
        require_id("Video id", video_id)?;
        Ok(self.store.note(user_id, video_id).await?)
    }

    #[instrument(skip(self, content))]
    pub async fn save_note(&self, user_id: &str, video_id: &str, content: &str) -> Result<()> {
        require_id("Video id", video_id)?;
        require_text("Note", content)?;
        let result = self
            .store
            .upsert_note(user_id, video_id, content)
            .await
            .map_err(Error::from);
        let event =
            AuditEvent::new(user_id, "note.upsert", EventStatus::Success).with_video(video_id);
        self.settle(event, result).await
    }

    #[instrument(skip(self))]
    pub async fn delete_note(&self, user_id: &str, video_id: &str) -> Result<()> {
        require_id("Video id", video_id)?;
        let result = self
            .store
            .delete_note(user_id, video_id)
            .await
            .map_err(Error::from);
        let event =
            AuditEvent::new(user_id, "note.delete", EventStatus::Success).with_video(video_id);
        self.settle(event, result).await
    }
}

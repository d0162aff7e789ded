//! Authorized calls to the YouTube Data API.

use crate::config::GoogleConfig;
use crate::error::{ApiFailure, Error, Result, classify};
use crate::oauth::TokenManager;
use crate::store::CredentialStore;
use crate::youtube_api::{
    channels::ChannelListResponse,
    comments::{
        Comment, CommentThread, CommentThreadInsertRequest, CommentThreadListResponse,
        CommentUpdateRequest, ReplyInsertRequest,
    },
    query::Query,
    types::PagedStream,
    videos::{Video, VideoListResponse, VideoSnippet, VideoUpdateRequest},
};
use eyre::Context;
use http::Method;
use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::instrument;

/// Parts requested when showing a single video.
const VIDEO_PARTS: &str = "snippet,statistics,contentDetails,status";

/// Page size for `commentThreads.list`; 100 is the API maximum.
const COMMENT_PAGE_SIZE: u32 = 50;

/// One request to the API, minus the path and the user it is made for.
///
/// The body type defaults to `()` for requests that do not carry one.
#[derive(Debug)]
pub struct ApiRequest<'a, B: ?Sized = ()> {
    method: Method,
    query: Query,
    body: Option<&'a B>,
}

impl Default for ApiRequest<'_> {
    fn default() -> Self {
        Self {
            method: Method::GET,
            query: Query::new(),
            body: None,
        }
    }
}

impl ApiRequest<'static> {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn delete() -> Self {
        Self {
            method: Method::DELETE,
            ..Self::default()
        }
    }
}

impl<'a, B: ?Sized> ApiRequest<'a, B> {
    pub fn post(body: &'a B) -> Self {
        Self::with_body(Method::POST, body)
    }

    pub fn put(body: &'a B) -> Self {
        Self::with_body(Method::PUT, body)
    }

    fn with_body(method: Method, body: &'a B) -> Self {
        Self {
            method,
            query: Query::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }
}

/// Client for the YouTube Data API v3, acting on behalf of users whose credentials live in `S`.
///
/// Every call first gets an access token for the user from the [`TokenManager`], which may
/// refresh (and persist) it. Non-success responses are classified into [`Error`] before they
/// are returned, so no raw transport error escapes this type.
#[derive(Debug)]
pub struct YouTubeClient<S> {
    tokens: TokenManager<S>,
    client: reqwest::Client,
    api_base: Url,
}

impl<S> Clone for YouTubeClient<S> {
    fn clone(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            client: self.client.clone(),
            api_base: self.api_base.clone(),
        }
    }
}

impl<S> YouTubeClient<S>
where
    S: CredentialStore,
{
    pub fn new(store: Arc<S>, config: &GoogleConfig) -> eyre::Result<Self> {
        let client = reqwest::ClientBuilder::new()
            // Following redirects opens the client to SSRF vulnerabilities.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build HTTP client")?;
        Ok(Self::with_http_client(store, config, client))
    }

    /// Like [`YouTubeClient::new`], but shares an existing HTTP client.
    pub fn with_http_client(store: Arc<S>, config: &GoogleConfig, client: reqwest::Client) -> Self {
        Self {
            tokens: TokenManager::new(store, config, client.clone()),
            client,
            api_base: config.api_base.clone(),
        }
    }

    pub fn tokens(&self) -> &TokenManager<S> {
        &self.tokens
    }

    /// `<api base><path>?<query>`, with the query left off entirely when it is empty.
    fn url(&self, path: &str, query: &Query) -> Result<Url> {
        let base = self.api_base.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{path}"))
            .map_err(|e| Error::Unknown(format!("build YouTube API URL for {path}: {e}")))?;
        if !query.is_empty() {
            url.set_query(Some(&query.encode()));
        }
        Ok(url)
    }

    /// Makes an authenticated request and returns the raw response.
    ///
    /// Use this over [`YouTubeClient::call`] for endpoints that answer with an empty body.
    ///
    /// # Errors
    ///
    /// Token lifecycle errors are passed through unchanged. A non-success status is read
    /// into an [`ApiFailure`] and [`classify`]d. Anything else is [`Error::Unknown`].
    #[instrument(skip(self, request), fields(method = %request.method), level = tracing::Level::DEBUG)]
    pub async fn send<B>(
        &self,
        user_id: &str,
        path: &str,
        request: ApiRequest<'_, B>,
    ) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let access_token = self.tokens.access_token(user_id).await?;
        let url = self.url(path, &request.query)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header("Authorization", format!("Bearer {}", access_token.secret()));

        if let Some(body) = request.body {
            builder = builder
                .header("Content-Type", "application/json")
                .json(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            let error = classify(ApiFailure::new(status, body));
            tracing::debug!(%status, kind = %error.kind(), "YouTube API request failed");
            return Err(error);
        }

        Ok(response)
    }

    /// Makes an authenticated request and parses the JSON response.
    pub async fn call<T, B>(&self, user_id: &str, path: &str, request: ApiRequest<'_, B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(user_id, path, request).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Unknown(format!("parse YouTube API response as JSON: {e}")))
    }

    /// Fetches one video with the given comma-separated `parts`.
    ///
    /// Returns `Ok(None)` if YouTube does not return it, which is what happens for unknown and
    /// private videos.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/list>
    #[instrument(skip(self))]
    pub async fn video_parts(
        &self,
        user_id: &str,
        video_id: &str,
        parts: &str,
    ) -> Result<Option<Video>> {
        let query = Query::new().param("part", parts).param("id", video_id);
        let mut response: VideoListResponse = self
            .call(user_id, "/videos", ApiRequest::get().query(query))
            .await?;
        let video = response.items.pop_front();
        tracing::debug!(found = video.is_some(), "fetched video");
        Ok(video)
    }

    /// Fetches snippet, statistics, content details and status of a video.
    pub async fn video(&self, user_id: &str, video_id: &str) -> Result<Option<Video>> {
        self.video_parts(user_id, video_id, VIDEO_PARTS).await
    }

    /// Fetches one page of comment threads, newest first, as plain text.
    ///
    /// `page_token` is the `nextPageToken` of the previous page, or `None` for the first.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/commentThreads/list>
    #[instrument(skip(self))]
    pub async fn list_comment_threads(
        &self,
        user_id: &str,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentThreadListResponse> {
        let query = Query::new()
            .param("part", "snippet,replies")
            .param("videoId", video_id)
            .param("maxResults", COMMENT_PAGE_SIZE)
            .param("textFormat", "plainText")
            .param("order", "time")
            .maybe("pageToken", page_token);
        let response: CommentThreadListResponse = self
            .call(user_id, "/commentThreads", ApiRequest::get().query(query))
            .await?;
        tracing::debug!(
            count = response.items.len(),
            more = response.next_page_token.is_some(),
            "listed comment threads"
        );
        Ok(response)
    }

    /// Returns a stream over every comment thread of a video, across all pages.
    pub fn comment_threads(
        &self,
        user_id: &str,
        video_id: &str,
    ) -> impl Stream<Item = Result<CommentThread>> + Send + use<'_, S> {
        let user_id = user_id.to_string();
        let video_id = video_id.to_string();
        PagedStream::new(move |page_token: Option<String>| {
            let user_id = user_id.clone();
            let video_id = video_id.clone();
            async move {
                let response = self
                    .list_comment_threads(&user_id, &video_id, page_token.as_deref())
                    .await?;
                Ok((response.items, response.next_page_token))
            }
        })
    }

    /// Posts a new top-level comment on a video.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/commentThreads/insert>
    #[instrument(skip(self, text))]
    pub async fn insert_comment_thread(
        &self,
        user_id: &str,
        video_id: &str,
        text: &str,
    ) -> Result<CommentThread> {
        let body = CommentThreadInsertRequest::new(video_id, text);
        let request = ApiRequest::post(&body).query(Query::new().param("part", "snippet"));
        let thread: CommentThread = self.call(user_id, "/commentThreads", request).await?;
        tracing::debug!(thread_id = thread.id, "posted comment");
        Ok(thread)
    }

    /// Replies to an existing top-level comment.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/comments/insert>
    #[instrument(skip(self, text))]
    pub async fn insert_reply(&self, user_id: &str, parent_id: &str, text: &str) -> Result<Comment> {
        let body = ReplyInsertRequest::new(parent_id, text);
        let request = ApiRequest::post(&body).query(Query::new().param("part", "snippet"));
        let comment: Comment = self.call(user_id, "/comments", request).await?;
        tracing::debug!(comment_id = comment.id, "posted reply");
        Ok(comment)
    }

    /// Replaces the text of a comment the user wrote.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/comments/update>
    #[instrument(skip(self, text))]
    pub async fn update_comment(
        &self,
        user_id: &str,
        comment_id: &str,
        text: &str,
    ) -> Result<Comment> {
        let body = CommentUpdateRequest::new(comment_id, text);
        let request = ApiRequest::put(&body).query(Query::new().param("part", "snippet"));
        let comment: Comment = self.call(user_id, "/comments", request).await?;
        tracing::debug!("updated comment");
        Ok(comment)
    }

    /// Deletes a comment. YouTube answers with `204 No Content`.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/comments/delete>
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, user_id: &str, comment_id: &str) -> Result<()> {
        let request = ApiRequest::delete().query(Query::new().param("id", comment_id));
        self.send(user_id, "/comments", request).await?;
        tracing::debug!("deleted comment");
        Ok(())
    }

    /// The id of the channel that belongs to the user's Google account, if there is one.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/channels/list>
    #[instrument(skip(self))]
    pub async fn my_channel_id(&self, user_id: &str) -> Result<Option<String>> {
        let query = Query::new().param("part", "id").param("mine", true);
        let mut response: ChannelListResponse = self
            .call(user_id, "/channels", ApiRequest::get().query(query))
            .await?;
        Ok(response.items.pop_front().map(|channel| channel.id))
    }

    /// Replaces the snippet of a video.
    ///
    /// The API overwrites the whole snippet, so `snippet` should start out as the video's
    /// current one (see [`VideoSnippet::merge`]).
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/update>
    #[instrument(skip(self, snippet))]
    pub async fn update_video_snippet(
        &self,
        user_id: &str,
        video_id: &str,
        snippet: &VideoSnippet,
    ) -> Result<Video> {
        let body = VideoUpdateRequest {
            id: video_id,
            snippet,
        };
        let request = ApiRequest::put(&body).query(Query::new().param("part", "snippet"));
        let video: Video = self.call(user_id, "/videos", request).await?;
        tracing::debug!("updated video snippet");
        Ok(video)
    }
}

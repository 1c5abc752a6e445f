use std::fmt;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;
use yt_oauth::{AuthorizedClient, OAuthError};

/// Production endpoint of the YouTube Data API.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// Largest page size `videos.list` accepts.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Opaque YouTube video identifier.
pub type VideoId = String;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("YouTube API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Auth(#[from] OAuthError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Rating a user can give a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Like,
    Dislike,
    None,
}

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Like => "like",
            Rating::Dislike => "dislike",
            Rating::None => "none",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub results_per_page: Option<u64>,
}

/// One page of a `videos.list` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<Video>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub page_info: Option<PageInfo>,
}

impl VideoListResponse {
    /// Continuation token, treating an empty string as the end of results.
    pub fn continuation(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// The rating operations the like transfer needs from an account.
#[async_trait]
pub trait VideoRatings: Send + Sync {
    /// One page of videos the authorized user has rated `rating`.
    async fn list_rated_videos(
        &self,
        rating: Rating,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<VideoListResponse, ApiError>;

    /// Set the authorized user's rating for `video_id`.
    async fn rate_video(&self, video_id: &str, rating: Rating) -> Result<(), ApiError>;
}

/// YouTube Data API v3 client bound to one authorized account.
pub struct YouTubeClient {
    base_url: Url,
    auth: AuthorizedClient,
}

impl YouTubeClient {
    pub fn new(base_url: &str, auth: AuthorizedClient) -> Result<Self, ApiError> {
        let mut base =
            Url::parse(base_url).map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        // Keep any path prefix when joining endpoint paths.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base_url: base,
            auth,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl VideoRatings for YouTubeClient {
    async fn list_rated_videos(
        &self,
        rating: Rating,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<VideoListResponse, ApiError> {
        let mut url = self.endpoint("youtube/v3/videos")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("part", "id")
                .append_pair("myRating", rating.as_str())
                .append_pair("maxResults", &max_results.min(MAX_PAGE_SIZE).to_string());
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        tracing::debug!(%rating, ?page_token, "Listing rated videos");
        let request = self.auth.request(Method::GET, url).await?;
        Ok(self.send(request).await?.json().await?)
    }

    async fn rate_video(&self, video_id: &str, rating: Rating) -> Result<(), ApiError> {
        let mut url = self.endpoint("youtube/v3/videos/rate")?;
        url.query_pairs_mut()
            .append_pair("id", video_id)
            .append_pair("rating", rating.as_str());

        tracing::debug!(video_id, %rating, "Rating video");
        let request = self.auth.request(Method::POST, url).await?;
        self.send(request.body("")).await?;
        Ok(())
    }
}

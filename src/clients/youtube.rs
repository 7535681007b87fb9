use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::VideoSource;
use crate::config::YoutubeConfig;
use crate::constants::youtube::{RESULT_TYPE_VIDEO, SEARCH_PARTS};
use crate::domain::Keyword;
use crate::models::Video;

#[derive(Debug, Deserialize)]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub id: ResourceId,
    pub snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub kind: Option<String>,
    pub video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub published_at: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Thumbnails {
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

/// One search call: a single page of videos matching `keyword`.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub keyword: &'a Keyword,
    /// `None` lets the API return its default backlog.
    pub published_after: Option<DateTime<Utc>>,
    pub max_results: u32,
}

impl SearchResult {
    /// Results without a video id (channels, playlists) yield `None`.
    #[must_use]
    pub fn into_video(self) -> Option<Video> {
        let Some(video_id) = self.id.video_id else {
            debug!(kind = ?self.id.kind, "Search result without videoId, skipping");
            return None;
        };
        let snippet = self.snippet.unwrap_or_default();

        let published_at = match snippet.published_at.as_deref() {
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(dt) => dt.with_timezone(&Utc),
                Err(e) => {
                    warn!(video_id = %video_id, value = raw, error = %e, "Unable to parse publishedAt");
                    DateTime::<Utc>::UNIX_EPOCH
                }
            },
            None => {
                warn!(video_id = %video_id, "Search result has no publishedAt");
                DateTime::<Utc>::UNIX_EPOCH
            }
        };

        let thumbnail_url = snippet
            .thumbnails
            .and_then(|t| t.default)
            .map(|t| t.url)
            .unwrap_or_default();

        Some(
            Video::new(video_id, published_at)
                .with_title(snippet.title)
                .with_description(snippet.description)
                .with_thumbnail(thumbnail_url),
        )
    }
}

#[derive(Clone)]
pub struct YoutubeClient {
    client: Client,
    base_url: String,
    api_key: String,
    max_results: u32,
}

impl YoutubeClient {
    /// Creates a client with the configured timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &YoutubeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.into()))
            .user_agent(concat!("tubewatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_results: config.max_results,
        })
    }

    pub fn search_url(&self, request: &SearchRequest<'_>) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/search", self.base_url))
            .with_context(|| format!("Invalid YouTube base URL: {}", self.base_url))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("part", SEARCH_PARTS)
                .append_pair("q", request.keyword.as_str())
                .append_pair("type", RESULT_TYPE_VIDEO)
                .append_pair("maxResults", &request.max_results.to_string());

            if let Some(since) = request.published_after {
                pairs.append_pair(
                    "publishedAfter",
                    &since.to_rfc3339_opts(SecondsFormat::Secs, true),
                );
            }

            pairs.append_pair("key", &self.api_key);
        }

        Ok(url)
    }

    pub async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<Video>> {
        let url = self.search_url(request)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body).map_or(body, |e| {
                format!("{} ({})", e.error.message, e.error.code)
            });
            return Err(anyhow::anyhow!("YouTube API error: {status} - {message}"));
        }

        let response: SearchListResponse = response.json().await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(SearchResult::into_video)
            .collect())
    }
}

#[async_trait::async_trait]
impl VideoSource for YoutubeClient {
    async fn fetch_since(
        &self,
        keyword: &Keyword,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Video>> {
        let request = SearchRequest {
            keyword,
            published_after: since,
            max_results: self.max_results,
        };
        self.search(&request).await
    }
}

//! Read side: keyword validation and paginated, searchable listing.

use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::config::ServerConfig;
use crate::db::{KnownCollections, StoreError, VideoQuery, VideoStore};
use crate::domain::{Keyword, KeywordError, PageRequest};
use crate::models::Video;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Videos for {0} are not being collected")]
    UnknownKeyword(String),

    #[error("Videos for {keyword} are not being collected: {source}")]
    InvalidKeyword {
        keyword: String,
        #[source]
        source: KeywordError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 50,
        }
    }
}

impl From<&ServerConfig> for PageLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }
}

impl PageLimits {
    /// Builds a request from raw query values.
    ///
    /// Missing or unparsable `page` means 0. Missing, unparsable or zero `limit`
    /// means the default; anything above the maximum is clamped to it.
    #[must_use]
    pub fn request(&self, page: Option<&str>, limit: Option<&str>, search: Option<&str>) -> PageRequest {
        let page = page.and_then(|p| p.trim().parse::<u64>().ok()).unwrap_or(0);

        let mut limit = limit
            .and_then(|l| l.trim().parse::<u64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(self.default_limit);
        if limit > self.max_limit {
            warn!(
                requested = limit,
                max = self.max_limit,
                "Limit exceeded, clamping"
            );
            limit = self.max_limit;
        }

        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        PageRequest {
            page,
            limit,
            search,
        }
    }
}

/// One rendered page, before links are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPage {
    pub page: u64,
    pub limit: u64,
    pub videos: Vec<Video>,
    pub has_next: bool,
}

impl VideoPage {
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page != 0
    }
}

pub struct VideoQueryService {
    store: Arc<dyn VideoStore>,
    known: Arc<KnownCollections>,
    limits: PageLimits,
}

impl VideoQueryService {
    #[must_use]
    pub const fn new(
        store: Arc<dyn VideoStore>,
        known: Arc<KnownCollections>,
        limits: PageLimits,
    ) -> Self {
        Self {
            store,
            known,
            limits,
        }
    }

    #[must_use]
    pub const fn limits(&self) -> &PageLimits {
        &self.limits
    }

    /// Resolves a path segment to a keyword whose collection exists.
    pub async fn validate_keyword(&self, raw: &str) -> Result<Keyword, QueryError> {
        let keyword = Keyword::parse(raw).map_err(|source| QueryError::InvalidKeyword {
            keyword: raw.to_string(),
            source,
        })?;

        if self.known.exists(self.store.as_ref(), &keyword).await? {
            Ok(keyword)
        } else {
            Err(QueryError::UnknownKeyword(keyword.to_string()))
        }
    }

    /// Newest first. Reads one extra document to find out whether another page exists.
    pub async fn page(
        &self,
        keyword: &Keyword,
        request: &PageRequest,
    ) -> Result<VideoPage, QueryError> {
        let query = VideoQuery {
            search: request.search.clone(),
            skip: request.skip(),
            limit: request.probe_limit(),
        };

        let mut videos = self.store.find_videos(keyword, &query).await?;

        let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);
        let has_next = videos.len() > limit;
        videos.truncate(limit);

        Ok(VideoPage {
            page: request.page,
            limit: request.limit,
            videos,
            has_next,
        })
    }
}

pub mod youtube;

use chrono::{DateTime, Utc};

use crate::domain::Keyword;
use crate::models::Video;

/// Where the ingestor gets new videos from.
#[async_trait::async_trait]
pub trait VideoSource: Send + Sync {
    /// One page of videos for `keyword` published after `since`.
    /// `None` asks for whatever backlog the provider returns by default.
    async fn fetch_since(
        &self,
        keyword: &Keyword,
        since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<Video>>;
}

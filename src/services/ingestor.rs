//! The ingestor poll loop.
//!
//! Each cycle fetches one page of videos published since the previous cycle and
//! hands the batch to a background persist task. The loop never waits for a
//! write; persist tasks are tracked in [`PersistTasks`] so they stay observable.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::clients::VideoSource;
use crate::domain::Keyword;
use crate::models::Video;
use crate::services::persist::VideoPersister;

/// Background persist operations launched by the poll loop.
///
/// There is no bound: if writes are slower than the poll interval, tasks pile up.
#[derive(Default)]
pub struct PersistTasks {
    tasks: JoinSet<()>,
}

impl PersistTasks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, persister: VideoPersister, keyword: Keyword, videos: Vec<Video>) {
        self.tasks.spawn(async move {
            if let Err(e) = persister.save(&keyword, videos).await {
                error!(event = "persist_failed", keyword = %keyword, error = %e, "DB update failed");
            }
        });
        metrics::gauge!("persist_tasks_in_flight").set(self.tasks.len() as f64);
    }

    /// Collects finished tasks without waiting. Returns how many were collected.
    pub fn reap(&mut self) -> usize {
        let mut reaped = 0;
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                error!(error = %e, "Persist task panicked");
            }
            reaped += 1;
        }
        metrics::gauge!("persist_tasks_in_flight").set(self.tasks.len() as f64);
        reaped
    }

    /// Waits for every in-flight task.
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Persist task panicked");
            }
        }
        metrics::gauge!("persist_tasks_in_flight").set(0.0);
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }
}

pub struct Ingestor {
    source: Arc<dyn VideoSource>,
    persister: VideoPersister,
    keyword: Keyword,
    poll_interval: Duration,
    last_fetched: Option<DateTime<Utc>>,
    tasks: PersistTasks,
}

impl Ingestor {
    #[must_use]
    pub fn new(
        source: Arc<dyn VideoSource>,
        persister: VideoPersister,
        keyword: Keyword,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            persister,
            keyword,
            poll_interval,
            last_fetched: None,
            tasks: PersistTasks::new(),
        }
    }

    #[must_use]
    pub const fn last_fetched(&self) -> Option<DateTime<Utc>> {
        self.last_fetched
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.in_flight()
    }

    /// Runs one fetch and launches its persist task. Returns the number of videos fetched.
    ///
    /// A failed fetch counts as an empty page; the cycle still advances `last_fetched`.
    pub async fn poll_once(&mut self) -> usize {
        self.tasks.reap();

        let videos = match self
            .source
            .fetch_since(&self.keyword, self.last_fetched)
            .await
        {
            Ok(videos) => videos,
            Err(e) => {
                warn!(event = "fetch_failed", keyword = %self.keyword, error = %e, "Unable to get search results");
                metrics::counter!("youtube_fetch_failures_total").increment(1);
                Vec::new()
            }
        };

        let fetched = videos.len();
        metrics::counter!("videos_fetched_total").increment(fetched as u64);
        info!(
            event = "videos_fetched",
            keyword = %self.keyword,
            since = ?self.last_fetched,
            fetched,
            "Fetched {} videos",
            fetched
        );

        if !videos.is_empty() {
            self.tasks
                .spawn(self.persister.clone(), self.keyword.clone(), videos);
        }

        self.last_fetched = Some(Utc::now());
        fetched
    }

    /// Polls forever, sleeping the full interval after every cycle.
    pub async fn run(mut self) {
        info!(
            keyword = %self.keyword,
            interval_secs = self.poll_interval.as_secs(),
            "Ingestor polling"
        );

        loop {
            self.poll_once().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One cycle, then waits for its write to finish.
    pub async fn run_once(mut self) -> usize {
        let fetched = self.poll_once().await;
        self.tasks.drain().await;
        fetched
    }
}

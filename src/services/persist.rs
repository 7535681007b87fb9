//! Writes fetched batches into their keyword collection.

use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::db::{InsertReport, KnownCollections, StoreError, VideoStore};
use crate::domain::Keyword;
use crate::models::Video;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Insert failed: {0}")]
    Insert(#[from] StoreError),
}

#[derive(Clone)]
pub struct VideoPersister {
    store: Arc<dyn VideoStore>,
    known: Arc<KnownCollections>,
    /// Keywords whose index build failed. The insert that follows creates the
    /// collection, so existence alone no longer implies indexes.
    unindexed: Arc<RwLock<HashSet<String>>>,
}

impl VideoPersister {
    #[must_use]
    pub fn new(store: Arc<dyn VideoStore>, known: Arc<KnownCollections>) -> Self {
        Self {
            store,
            known,
            unindexed: Arc::default(),
        }
    }

    /// Makes sure the collection and its indexes exist, then inserts the batch unordered.
    ///
    /// Index creation runs when the collection was not known before this write, and
    /// again on every batch after a failed build until one succeeds.
    /// A failed existence check or index build is logged and the insert is still attempted.
    pub async fn save(
        &self,
        keyword: &Keyword,
        videos: Vec<Video>,
    ) -> Result<InsertReport, PersistError> {
        let retry = self.unindexed.read().await.contains(keyword.as_str());

        let existed = if retry {
            false
        } else {
            match self.known.exists(self.store.as_ref(), keyword).await {
                Ok(existed) => existed,
                Err(e) => {
                    warn!(keyword = %keyword, error = %e, "Unable to list collections, assuming new");
                    false
                }
            }
        };

        if !existed {
            self.ensure_indexes(keyword).await;
        }

        let report = self.store.insert_unordered(keyword, videos).await?;

        metrics::counter!("videos_inserted_total").increment(report.inserted as u64);
        metrics::counter!("videos_duplicate_total").increment(report.duplicates as u64);

        if report.duplicates > 0 {
            debug!(
                keyword = %keyword,
                duplicates = report.duplicates,
                "Skipped videos that were already stored"
            );
        }
        info!(
            event = "videos_saved",
            keyword = %keyword,
            inserted = report.inserted,
            attempted = report.attempted,
            "Inserted {} documents to db",
            report.inserted
        );

        Ok(report)
    }

    async fn ensure_indexes(&self, keyword: &Keyword) {
        match self.store.create_indexes(keyword).await {
            Ok(names) => {
                info!(keyword = %keyword, indexes = ?names, "Successfully created indexes");
                self.unindexed.write().await.remove(keyword.as_str());
                self.known.record(keyword).await;
            }
            Err(e) => {
                error!(keyword = %keyword, error = %e, "Failed to create indexes, retrying on next batch");
                self.unindexed.write().await.insert(keyword.to_string());
            }
        }
    }
}

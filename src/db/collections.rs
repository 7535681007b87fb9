use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::debug;

use super::{StoreError, VideoStore};
use crate::domain::Keyword;

/// Process-local set of collection names known to exist.
///
/// Refreshed from the store only on a miss and never invalidated. A refresh
/// merges into the set, so a keyword seen once stays known even if a later
/// listing races with its creation. Concurrent misses may each refresh.
#[derive(Debug, Default)]
pub struct KnownCollections {
    names: RwLock<HashSet<String>>,
}

impl KnownCollections {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, keyword: &Keyword) -> bool {
        self.names.read().await.contains(keyword.as_str())
    }

    /// Marks a collection as existing, e.g. right after creating its indexes.
    pub async fn record(&self, keyword: &Keyword) {
        self.names.write().await.insert(keyword.to_string());
    }

    /// Pulls the authoritative listing and merges it in.
    pub async fn refresh(&self, store: &dyn VideoStore) -> Result<usize, StoreError> {
        let listed = store.collection_names().await?;
        metrics::counter!("collection_cache_refreshes_total").increment(1);

        let mut names = self.names.write().await;
        names.extend(listed);
        debug!(known = names.len(), "Refreshed known collections");
        Ok(names.len())
    }

    /// Cache hit, or refresh once and check again.
    pub async fn exists(&self, store: &dyn VideoStore, keyword: &Keyword) -> Result<bool, StoreError> {
        if self.contains(keyword).await {
            return Ok(true);
        }

        self.refresh(store).await?;
        Ok(self.contains(keyword).await)
    }

    pub async fn len(&self) -> usize {
        self.names.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.names.read().await.is_empty()
    }
}

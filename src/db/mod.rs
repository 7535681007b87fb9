//! Document store access shared by the ingestor and the query service.
//!
//! Every keyword owns one collection. [`VideoStore`] is the seam between the
//! services and the concrete backend: [`MongoStore`] in production and
//! [`MemoryStore`] for tests and local runs.

use bson::Document;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{DatabaseConfig, StoreBackend};
use crate::domain::Keyword;
use crate::models::Video;

pub mod collections;
pub mod memory;
pub mod mongo;

pub use collections::KnownCollections;
pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Index creation failed on '{collection}': {message}")]
    Index { collection: String, message: String },

    #[error("Write failed on '{collection}' ({inserted} inserted): {message}")]
    Write {
        collection: String,
        inserted: usize,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Outcome of one unordered batch insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub attempted: usize,
    pub inserted: usize,
    /// Documents skipped because their `youtubeId` was already stored.
    pub duplicates: usize,
}

/// A filtered, sorted window over one keyword collection.
///
/// Results are always ordered by `publishedAt`, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoQuery {
    pub search: Option<String>,
    pub skip: u64,
    pub limit: u64,
}

#[async_trait::async_trait]
pub trait VideoStore: Send + Sync {
    /// Authoritative list of collection names in the database.
    async fn collection_names(&self) -> Result<Vec<String>, StoreError>;

    /// Creates the `publishedAt` descending, title/description text and unique
    /// `youtubeId` indexes, returning their names.
    async fn create_indexes(&self, keyword: &Keyword) -> Result<Vec<String>, StoreError>;

    /// Inserts the whole batch in one unordered write. Duplicate `youtubeId`s are
    /// counted, not treated as failures, and never stop the rest of the batch.
    async fn insert_unordered(
        &self,
        keyword: &Keyword,
        videos: Vec<Video>,
    ) -> Result<InsertReport, StoreError>;

    /// Reads one window. Rows that cannot be decoded are skipped.
    async fn find_videos(
        &self,
        keyword: &Keyword,
        query: &VideoQuery,
    ) -> Result<Vec<Video>, StoreError>;
}

/// Decodes raw rows, logging and dropping the ones that do not fit the model.
pub(crate) fn decode_documents<I>(keyword: &Keyword, documents: I) -> Vec<Video>
where
    I: IntoIterator<Item = Document>,
{
    documents
        .into_iter()
        .filter_map(|doc| match bson::from_document::<Video>(doc) {
            Ok(video) => Some(video),
            Err(e) => {
                warn!(keyword = %keyword, error = %e, "Failed to decode stored video, skipping");
                metrics::counter!("videos_decode_failures_total").increment(1);
                None
            }
        })
        .collect()
}

/// Opens the configured backend.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn VideoStore>> {
    match config.backend {
        StoreBackend::Mongodb => {
            let store = MongoStore::connect(
                &config.uri,
                &config.name,
                Duration::from_secs(config.connect_timeout_seconds),
            )
            .await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("Using in-memory video store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

//! In-memory [`VideoStore`] with the same observable semantics as the `MongoDB`
//! backend: collections appear on first write, `youtubeId` is only enforced
//! unique once its index exists, and `$text`-style search requires the text index.

use bson::oid::ObjectId;
use bson::{Bson, Document};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use super::{InsertReport, StoreError, VideoQuery, VideoStore, decode_documents};
use crate::constants::{fields, indexes};
use crate::domain::Keyword;
use crate::models::Video;

#[derive(Debug, Default)]
struct MemoryCollection {
    documents: Vec<Document>,
    indexes: Vec<String>,
    index_builds: usize,
}

impl MemoryCollection {
    fn has_index(&self, name: &str) -> bool {
        self.indexes.iter().any(|i| i == name)
    }

    fn contains_youtube_id(&self, youtube_id: &str) -> bool {
        self.documents
            .iter()
            .any(|d| d.get_str(fields::YOUTUBE_ID).ok() == Some(youtube_id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times index creation ran for a collection.
    pub async fn index_builds(&self, name: &str) -> usize {
        self.collections
            .read()
            .await
            .get(name)
            .map_or(0, |c| c.index_builds)
    }

    pub async fn index_names(&self, name: &str) -> Vec<String> {
        self.collections
            .read()
            .await
            .get(name)
            .map(|c| c.indexes.clone())
            .unwrap_or_default()
    }

    pub async fn document_count(&self, name: &str) -> usize {
        self.collections
            .read()
            .await
            .get(name)
            .map_or(0, |c| c.documents.len())
    }

    /// Stores a document as-is, bypassing the model. Creates the collection if needed.
    pub async fn insert_raw(&self, name: &str, mut document: Document) {
        if !document.contains_key(fields::ID) {
            document.insert(fields::ID, ObjectId::new());
        }
        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .documents
            .push(document);
    }
}

/// Lowercase alphanumeric terms, the unit of text matching.
fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn matches_text(document: &Document, wanted: &HashSet<String>) -> bool {
    [fields::TITLE, fields::DESCRIPTION]
        .iter()
        .filter_map(|field| document.get_str(field).ok())
        .any(|text| terms(text).any(|t| wanted.contains(&t)))
}

fn published_at(document: &Document) -> Option<bson::DateTime> {
    match document.get(fields::PUBLISHED_AT) {
        Some(Bson::DateTime(dt)) => Some(*dt),
        _ => None,
    }
}

#[async_trait::async_trait]
impl VideoStore for MemoryStore {
    async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }

    async fn create_indexes(&self, keyword: &Keyword) -> Result<Vec<String>, StoreError> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(keyword.to_string()).or_default();

        let names = [
            indexes::PUBLISHED_AT_DESC,
            indexes::TITLE_DESCRIPTION_TEXT,
            indexes::YOUTUBE_ID_UNIQUE,
        ];

        if !collection.has_index(indexes::YOUTUBE_ID_UNIQUE) {
            let mut seen = HashSet::new();
            let duplicated = collection.documents.iter().any(|d| {
                d.get_str(fields::YOUTUBE_ID)
                    .is_ok_and(|id| !seen.insert(id.to_string()))
            });
            if duplicated {
                return Err(StoreError::Index {
                    collection: keyword.to_string(),
                    message: "duplicate youtubeId values prevent unique index".to_string(),
                });
            }
        }

        for name in names {
            if !collection.has_index(name) {
                collection.indexes.push(name.to_string());
            }
        }
        collection.index_builds += 1;

        Ok(names.iter().map(ToString::to_string).collect())
    }

    async fn insert_unordered(
        &self,
        keyword: &Keyword,
        videos: Vec<Video>,
    ) -> Result<InsertReport, StoreError> {
        let mut report = InsertReport {
            attempted: videos.len(),
            ..InsertReport::default()
        };
        if videos.is_empty() {
            return Ok(report);
        }

        let mut collections = self.collections.write().await;
        let collection = collections.entry(keyword.to_string()).or_default();
        let unique = collection.has_index(indexes::YOUTUBE_ID_UNIQUE);

        for mut video in videos {
            if unique && collection.contains_youtube_id(&video.youtube_id) {
                report.duplicates += 1;
                continue;
            }

            video.id.get_or_insert_with(ObjectId::new);
            let document = bson::to_document(&video).map_err(|e| StoreError::Write {
                collection: keyword.to_string(),
                inserted: report.inserted,
                message: e.to_string(),
            })?;
            collection.documents.push(document);
            report.inserted += 1;
        }

        Ok(report)
    }

    async fn find_videos(
        &self,
        keyword: &Keyword,
        query: &VideoQuery,
    ) -> Result<Vec<Video>, StoreError> {
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(keyword.as_str()) else {
            return Ok(Vec::new());
        };

        let wanted: Option<HashSet<String>> = match query.search.as_deref() {
            Some(search) => {
                if !collection.has_index(indexes::TITLE_DESCRIPTION_TEXT) {
                    return Err(StoreError::Database(
                        "text index required for $text query".to_string(),
                    ));
                }
                Some(terms(search).collect())
            }
            None => None,
        };

        let mut rows: Vec<&Document> = collection
            .documents
            .iter()
            .filter(|d| wanted.as_ref().is_none_or(|w| matches_text(d, w)))
            .collect();
        rows.sort_by_key(|d| Reverse(published_at(d)));

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);

        let window = rows.into_iter().skip(skip).take(limit).cloned();
        Ok(decode_documents(keyword, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn keyword() -> Keyword {
        Keyword::parse("music").unwrap()
    }

    fn video(id: &str, hours: i64, title: &str) -> Video {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Video::new(id, base + Duration::hours(hours)).with_title(title)
    }

    #[tokio::test]
    async fn test_collection_created_on_first_write() {
        let store = MemoryStore::new();
        assert!(store.collection_names().await.unwrap().is_empty());

        store
            .insert_unordered(&keyword(), vec![video("a", 1, "first")])
            .await
            .unwrap();

        assert_eq!(store.collection_names().await.unwrap(), vec!["music"]);
    }

    #[tokio::test]
    async fn test_unique_index_skips_duplicates_without_aborting() {
        let store = MemoryStore::new();
        store.create_indexes(&keyword()).await.unwrap();
        store
            .insert_unordered(&keyword(), vec![video("a", 1, "first")])
            .await
            .unwrap();

        let report = store
            .insert_unordered(
                &keyword(),
                vec![video("a", 1, "again"), video("b", 2, "second")],
            )
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(store.document_count("music").await, 2);
    }

    #[tokio::test]
    async fn test_find_sorts_newest_first_and_windows() {
        let store = MemoryStore::new();
        store.create_indexes(&keyword()).await.unwrap();
        let batch = (0..5).map(|i| video(&format!("v{i}"), i, "t")).collect();
        store.insert_unordered(&keyword(), batch).await.unwrap();

        let query = VideoQuery {
            search: None,
            skip: 1,
            limit: 2,
        };
        let found = store.find_videos(&keyword(), &query).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|v| v.youtube_id.as_str()).collect();
        assert_eq!(ids, vec!["v3", "v2"]);
    }

    #[tokio::test]
    async fn test_text_search_matches_any_term() {
        let store = MemoryStore::new();
        store.create_indexes(&keyword()).await.unwrap();
        store
            .insert_unordered(
                &keyword(),
                vec![
                    video("a", 1, "Jazz Piano Live"),
                    video("b", 2, "Rock concert"),
                    video("c", 3, "Classical guitar").with_description("smooth JAZZ vibes"),
                ],
            )
            .await
            .unwrap();

        let query = VideoQuery {
            search: Some("jazz".to_string()),
            skip: 0,
            limit: 10,
        };
        let found = store.find_videos(&keyword(), &query).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|v| v.youtube_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_text_search_without_index_fails() {
        let store = MemoryStore::new();
        store
            .insert_unordered(&keyword(), vec![video("a", 1, "x")])
            .await
            .unwrap();

        let query = VideoQuery {
            search: Some("x".to_string()),
            skip: 0,
            limit: 10,
        };
        assert!(store.find_videos(&keyword(), &query).await.is_err());
    }

    #[tokio::test]
    async fn test_index_creation_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.create_indexes(&keyword()).await.unwrap();
        store.create_indexes(&keyword()).await.unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(store.index_names("music").await.len(), 3);
        assert_eq!(store.index_builds("music").await, 2);
    }
}

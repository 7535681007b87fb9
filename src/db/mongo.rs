use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use std::time::Duration;
use tracing::{debug, info};

use super::{InsertReport, StoreError, VideoQuery, VideoStore, decode_documents};
use crate::constants::errors::DUPLICATE_KEY;
use crate::domain::Keyword;
use crate::models::Video;

#[derive(Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Connects and pings the server.
    pub async fn connect(uri: &str, db_name: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        options.app_name = Some("tubewatch".to_string());
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client =
            Client::with_options(options).map_err(|e| StoreError::Connection(e.to_string()))?;
        let database = client.database(db_name);

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(format!("ping failed: {e}")))?;

        info!(database = db_name, "MongoDB connection successful");

        Ok(Self { database })
    }

    fn videos(&self, keyword: &Keyword) -> Collection<Video> {
        self.database.collection(keyword.as_str())
    }

    fn raw(&self, keyword: &Keyword) -> Collection<Document> {
        self.database.collection(keyword.as_str())
    }
}

fn index_models() -> Vec<IndexModel> {
    vec![
        IndexModel::builder().keys(doc! { "publishedAt": -1 }).build(),
        IndexModel::builder()
            .keys(doc! { "title": "text", "description": "text" })
            .build(),
        IndexModel::builder()
            .keys(doc! { "youtubeId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build(),
    ]
}

/// Sorts the per-document errors of an unordered insert.
///
/// Duplicate-key errors only count as skipped documents. Any other write error, or a
/// write concern error, fails the batch.
pub(crate) fn classify_insert_failure<'a, I>(
    collection: &str,
    attempted: usize,
    write_errors: I,
    write_concern: Option<&str>,
) -> Result<InsertReport, StoreError>
where
    I: IntoIterator<Item = (i32, &'a str)>,
{
    let mut failed = 0;
    let mut duplicates = 0;
    let mut first_other = None;

    for (code, message) in write_errors {
        failed += 1;
        if code == DUPLICATE_KEY {
            duplicates += 1;
        } else if first_other.is_none() {
            first_other = Some(message);
        }
    }

    let inserted = attempted.saturating_sub(failed);

    if let Some(message) = first_other.or(write_concern) {
        return Err(StoreError::Write {
            collection: collection.to_string(),
            inserted,
            message: message.to_string(),
        });
    }

    Ok(InsertReport {
        attempted,
        inserted,
        duplicates,
    })
}

#[async_trait::async_trait]
impl VideoStore for MongoStore {
    async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.database.list_collection_names().await?)
    }

    async fn create_indexes(&self, keyword: &Keyword) -> Result<Vec<String>, StoreError> {
        let result = self
            .videos(keyword)
            .create_indexes(index_models())
            .await
            .map_err(|e| StoreError::Index {
                collection: keyword.to_string(),
                message: e.to_string(),
            })?;

        Ok(result.index_names)
    }

    async fn insert_unordered(
        &self,
        keyword: &Keyword,
        videos: Vec<Video>,
    ) -> Result<InsertReport, StoreError> {
        let attempted = videos.len();
        if attempted == 0 {
            return Ok(InsertReport::default());
        }

        let err = match self.videos(keyword).insert_many(videos).ordered(false).await {
            Ok(result) => {
                return Ok(InsertReport {
                    attempted,
                    inserted: result.inserted_ids.len(),
                    duplicates: 0,
                });
            }
            Err(err) => err,
        };

        let ErrorKind::InsertMany(failure) = err.kind.as_ref() else {
            return Err(err.into());
        };

        let write_errors = failure
            .write_errors
            .iter()
            .flatten()
            .map(|e| (e.code, e.message.as_str()));
        let write_concern = failure
            .write_concern_error
            .as_ref()
            .map(|e| e.message.as_str());

        let report = classify_insert_failure(keyword.as_str(), attempted, write_errors, write_concern)?;
        debug!(keyword = %keyword, duplicates = report.duplicates, "Skipped already stored videos");
        Ok(report)
    }

    async fn find_videos(
        &self,
        keyword: &Keyword,
        query: &VideoQuery,
    ) -> Result<Vec<Video>, StoreError> {
        let filter = match query.search.as_deref() {
            Some(search) => doc! { "$text": { "$search": search } },
            None => doc! {},
        };

        let mut cursor = self
            .raw(keyword)
            .find(filter)
            .sort(doc! { "publishedAt": -1 })
            .skip(query.skip)
            .limit(i64::try_from(query.limit).unwrap_or(i64::MAX))
            .await?;

        let mut rows = Vec::new();
        while let Some(row) = cursor.try_next().await? {
            rows.push(row);
        }

        Ok(decode_documents(keyword, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_duplicates_is_success() {
        let errors = [(DUPLICATE_KEY, "E11000 dup a"), (DUPLICATE_KEY, "E11000 dup b")];

        let report = classify_insert_failure("music", 5, errors, None).unwrap();

        assert_eq!(
            report,
            InsertReport {
                attempted: 5,
                inserted: 3,
                duplicates: 2,
            }
        );
    }

    #[test]
    fn test_other_write_error_fails_batch() {
        let errors = [
            (DUPLICATE_KEY, "E11000 dup"),
            (121, "Document failed validation"),
            (2, "bad value"),
        ];

        let err = classify_insert_failure("music", 4, errors, None).unwrap_err();

        match err {
            StoreError::Write {
                collection,
                inserted,
                message,
            } => {
                assert_eq!(collection, "music");
                assert_eq!(inserted, 1);
                assert_eq!(message, "Document failed validation");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_write_concern_error_fails_batch() {
        let err = classify_insert_failure(
            "music",
            2,
            [(DUPLICATE_KEY, "E11000 dup")],
            Some("waiting for replication timed out"),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Write { inserted: 1, ref message, .. } if message == "waiting for replication timed out"
        ));
    }

    #[test]
    fn test_more_errors_than_attempted_does_not_underflow() {
        let errors = [(DUPLICATE_KEY, "a"), (DUPLICATE_KEY, "b")];

        let report = classify_insert_failure("music", 1, errors, None).unwrap();

        assert_eq!(report.inserted, 0);
        assert_eq!(report.duplicates, 2);
    }
}

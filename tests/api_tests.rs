use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;
use tubewatch::config::Config;
use tubewatch::db::{
    InsertReport, KnownCollections, MemoryStore, StoreError, VideoQuery, VideoStore,
};
use tubewatch::domain::Keyword;
use tubewatch::models::Video;
use tubewatch::services::VideoPersister;

fn videos(count: usize) -> Vec<Video> {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            Video::new(format!("vid{i:02}"), base + Duration::minutes(i as i64))
                .with_title(format!("Track {i}"))
                .with_description("background music")
                .with_thumbnail(format!("https://i.ytimg.com/vi/vid{i:02}/default.jpg"))
        })
        .collect()
}

async fn seeded_store(keyword: &str, batch: Vec<Video>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let persister = VideoPersister::new(store.clone(), Arc::new(KnownCollections::new()));
    persister
        .save(&Keyword::parse(keyword).unwrap(), batch)
        .await
        .unwrap();
    store
}

fn spawn_app(store: Arc<dyn VideoStore>) -> Router {
    let mut config = Config::default();
    config.database.name = "test".to_string();

    let state = tubewatch::api::create_app_state(config, store, None);
    tubewatch::api::router(state)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("host", "localhost:8080")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> serde_json::Value {
    let (status, body) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
    serde_json::from_slice(&body).unwrap()
}

fn youtube_ids(json: &serde_json::Value) -> Vec<String> {
    json["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["youtubeId"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_first_page_is_newest_first_with_next_link() {
    let app = spawn_app(seeded_store("music", videos(12)).await);

    let json = get_json(&app, "/videos/music?limit=5&page=0").await;

    assert_eq!(json["page"], 0);
    assert_eq!(json["limit"], 5);
    assert_eq!(
        youtube_ids(&json),
        vec!["vid11", "vid10", "vid09", "vid08", "vid07"]
    );
    assert_eq!(json["next"], "localhost:8080/videos/music?limit=5&page=1");
    assert!(json.get("prev").is_none());

    let first = &json["result"][0];
    assert_eq!(first["title"], "Track 11");
    assert_eq!(first["publishedAt"], "2024-03-01T12:11:00Z");
    assert!(first["_id"].as_str().is_some_and(|id| id.len() == 24));
}

#[tokio::test]
async fn test_last_page_has_prev_but_no_next() {
    let app = spawn_app(seeded_store("music", videos(12)).await);

    let json = get_json(&app, "/videos/music?limit=5&page=2").await;

    assert_eq!(youtube_ids(&json), vec!["vid01", "vid00"]);
    assert_eq!(json["prev"], "localhost:8080/videos/music?limit=5&page=1");
    assert!(json.get("next").is_none());
}

#[tokio::test]
async fn test_exact_page_boundary_has_no_next() {
    let app = spawn_app(seeded_store("music", videos(10)).await);

    let json = get_json(&app, "/videos/music?page=1&limit=5").await;

    assert_eq!(youtube_ids(&json).len(), 5);
    assert!(json.get("next").is_none());
    assert_eq!(json["prev"], "localhost:8080/videos/music?page=0&limit=5");
}

#[tokio::test]
async fn test_defaults_and_page_appended_when_absent() {
    let app = spawn_app(seeded_store("music", videos(12)).await);

    let json = get_json(&app, "/videos/music").await;

    assert_eq!(json["page"], 0);
    assert_eq!(json["limit"], 10);
    assert_eq!(youtube_ids(&json).len(), 10);
    assert_eq!(json["next"], "localhost:8080/videos/music?page=1");
}

#[tokio::test]
async fn test_limit_above_max_is_clamped() {
    let app = spawn_app(seeded_store("music", videos(3)).await);

    let json = get_json(&app, "/videos/music?limit=500").await;

    assert_eq!(json["limit"], 50);
    assert_eq!(youtube_ids(&json).len(), 3);
}

#[tokio::test]
async fn test_page_past_the_end_is_empty() {
    let app = spawn_app(seeded_store("music", videos(3)).await);

    let json = get_json(&app, "/videos/music?page=7").await;

    assert!(youtube_ids(&json).is_empty());
    assert!(json.get("next").is_none());
    assert_eq!(json["prev"], "localhost:8080/videos/music?page=6");
}

#[tokio::test]
async fn test_search_filters_and_keeps_query_in_links() {
    let mut batch = videos(4);
    batch[1].title = "Lofi beats to study".to_string();
    batch[3].description = "chill fi session".to_string();
    let app = spawn_app(seeded_store("music", batch).await);

    let json = get_json(&app, "/videos/music?search=lofi&limit=1").await;
    assert_eq!(youtube_ids(&json), vec!["vid01"]);
    assert!(json.get("next").is_none());

    let json = get_json(&app, "/videos/music?limit=1&page=0&search=lofi+fi").await;
    assert_eq!(youtube_ids(&json), vec!["vid03"]);
    assert_eq!(
        json["next"],
        "localhost:8080/videos/music?limit=1&page=1&search=lofi+fi"
    );
}

#[tokio::test]
async fn test_unknown_keyword_is_bad_request() {
    let app = spawn_app(seeded_store("music", videos(1)).await);

    let (status, body) = get(&app, "/videos/cooking").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "Videos for cooking are not being collected"
    );
}

#[tokio::test]
async fn test_keyword_collected_after_startup_is_found() {
    let store = seeded_store("music", videos(1)).await;
    let app = spawn_app(store.clone());

    let (status, _) = get(&app, "/videos/news").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let persister = VideoPersister::new(store, Arc::new(KnownCollections::new()));
    persister
        .save(&Keyword::parse("news").unwrap(), videos(2))
        .await
        .unwrap();

    let json = get_json(&app, "/videos/news").await;
    assert_eq!(youtube_ids(&json).len(), 2);
}

#[tokio::test]
async fn test_malformed_document_is_skipped() {
    let store = seeded_store("music", videos(2)).await;
    store
        .insert_raw(
            "music",
            bson::doc! {
                "youtubeId": 42,
                "publishedAt": bson::DateTime::from_millis(4_102_444_800_000),
            },
        )
        .await;
    let app = spawn_app(store);

    let json = get_json(&app, "/videos/music").await;

    assert_eq!(youtube_ids(&json), vec!["vid01", "vid00"]);
}

struct BrokenStore;

#[async_trait]
impl VideoStore for BrokenStore {
    async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(vec!["music".to_string()])
    }

    async fn create_indexes(&self, _keyword: &Keyword) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }

    async fn insert_unordered(
        &self,
        _keyword: &Keyword,
        _videos: Vec<Video>,
    ) -> Result<InsertReport, StoreError> {
        Ok(InsertReport::default())
    }

    async fn find_videos(
        &self,
        _keyword: &Keyword,
        _query: &VideoQuery,
    ) -> Result<Vec<Video>, StoreError> {
        Err(StoreError::Database("connection reset by peer".to_string()))
    }
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let app = spawn_app(Arc::new(BrokenStore));

    let (status, body) = get(&app, "/videos/music").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(String::from_utf8(body).unwrap(), "Internal error");
}

#[tokio::test]
async fn test_metrics_endpoint_without_recorder() {
    let app = spawn_app(Arc::new(MemoryStore::new()));

    let (status, body) = get(&app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("Metrics not enabled"));
}

#[tokio::test]
async fn test_invalid_keyword_is_bad_request_naming_it() {
    let app = spawn_app(seeded_store("music", videos(1)).await);

    let (status, body) = get(&app, "/videos/price$").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = String::from_utf8(body).unwrap();
    assert!(body.starts_with("Videos for price$ are not being collected"), "{body}");
}

#[tokio::test]
async fn test_far_page_is_empty_not_an_error() {
    let app = spawn_app(seeded_store("music", videos(3)).await);

    let json = get_json(&app, "/videos/music?page=1000000000000000000&limit=50").await;

    assert!(youtube_ids(&json).is_empty());
    assert!(json.get("next").is_none());
    assert_eq!(
        json["prev"],
        "localhost:8080/videos/music?page=999999999999999999&limit=50"
    );
}

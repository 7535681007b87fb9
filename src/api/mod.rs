use axum::{Router, http::HeaderValue, middleware, routing::get};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::{self, KnownCollections, VideoStore};
use crate::services::{PageLimits, VideoQueryService};

mod error;
mod observability;
mod types;
mod videos;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,

    pub videos: Arc<VideoQueryService>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

/// Builds handler state around an already opened store.
#[must_use]
pub fn create_app_state(
    config: Config,
    store: Arc<dyn VideoStore>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    let known = Arc::new(KnownCollections::new());
    let videos = Arc::new(VideoQueryService::new(
        store,
        known,
        PageLimits::from(&config.server),
    ));

    Arc::new(AppState {
        config,
        videos,
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = db::connect(&config.database).await?;
    Ok(create_app_state(config, store, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = &state.config.server.cors_allowed_origins;

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/videos/{keyword}", get(videos::list_videos))
        .route("/metrics", get(observability::get_metrics))
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::track_metrics))
}

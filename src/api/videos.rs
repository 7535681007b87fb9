use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, Uri, header},
};
use std::sync::Arc;
use url::form_urlencoded;

use super::{ApiError, AppState, VideoDto, VideosResponse};

fn first<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn request_host<'a>(headers: &'a HeaderMap, uri: &'a Uri) -> &'a str {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or_default()
}

/// `host + path + query` with `page` replaced and every other parameter kept in order.
pub(crate) fn page_link(host: &str, path: &str, params: &[(String, String)], page: u64) -> String {
    let page = page.to_string();
    let mut query = form_urlencoded::Serializer::new(String::new());
    let mut placed = false;

    for (key, value) in params {
        if key == "page" {
            if !placed {
                query.append_pair("page", &page);
                placed = true;
            }
        } else {
            query.append_pair(key, value);
        }
    }
    if !placed {
        query.append_pair("page", &page);
    }

    format!("{host}{path}?{}", query.finish())
}

pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    Path(keyword): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<VideosResponse>, ApiError> {
    let keyword = state.videos.validate_keyword(&keyword).await?;

    let request = state.videos.limits().request(
        first(&params, "page"),
        first(&params, "limit"),
        first(&params, "search"),
    );

    let page = state.videos.page(&keyword, &request).await?;

    let host = request_host(&headers, &uri);
    let next = page
        .has_next
        .then(|| page_link(host, uri.path(), &params, page.page.saturating_add(1)));
    let prev = page
        .has_prev()
        .then(|| page_link(host, uri.path(), &params, page.page - 1));

    Ok(Json(VideosResponse {
        page: page.page,
        limit: page.limit,
        result: page.videos.into_iter().map(VideoDto::from).collect(),
        prev,
        next,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_page_link_replaces_page_and_keeps_the_rest() {
        let link = page_link(
            "localhost:8080",
            "/videos/music",
            &params(&[("limit", "5"), ("page", "0"), ("search", "lo fi")]),
            1,
        );
        assert_eq!(link, "localhost:8080/videos/music?limit=5&page=1&search=lo+fi");
    }

    #[test]
    fn test_page_link_adds_missing_page() {
        let link = page_link("h", "/videos/music", &params(&[("limit", "5")]), 1);
        assert_eq!(link, "h/videos/music?limit=5&page=1");
    }

    #[test]
    fn test_page_link_collapses_repeated_page() {
        let link = page_link(
            "h",
            "/videos/music",
            &params(&[("page", "3"), ("page", "9")]),
            2,
        );
        assert_eq!(link, "h/videos/music?page=2");
    }
}

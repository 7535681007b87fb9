use chrono::SecondsFormat;
use serde::Serialize;

use crate::models::Video;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDto {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub youtube_id: String,
    pub title: String,
    pub description: String,
    pub published_at: String,
    pub thumbnail_url: String,
}

impl From<Video> for VideoDto {
    fn from(video: Video) -> Self {
        Self {
            id: video.id.map(|id| id.to_hex()),
            youtube_id: video.youtube_id,
            title: video.title,
            description: video.description,
            published_at: video
                .published_at
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            thumbnail_url: video.thumbnail_url,
        }
    }
}

/// The page envelope returned by `GET /videos/{keyword}`.
#[derive(Debug, Serialize)]
pub struct VideosResponse {
    pub page: u64,
    pub limit: u64,
    pub result: Vec<VideoDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Processing state of a video asset as last reported by Mux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Processing,
    Ready,
    Error,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Ready => "ready",
            VideoStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(VideoStatus::Processing),
            "ready" => Some(VideoStatus::Ready),
            "error" => Some(VideoStatus::Error),
            _ => None,
        }
    }
}

/// One row of the video table, keyed by `asset_id`.
///
/// Rows can be created by a `ready`/`errored` event that overtook its
/// `asset_created`, so everything but the key, status and `updated_at` is
/// optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAssetRecord {
    pub asset_id: String,
    pub upload_id: Option<String>,
    pub project_id: Option<String>,
    pub filename: Option<String>,
    pub status: VideoStatus,
    pub playback_id: Option<String>,
    pub duration: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: String,
}

/// A one-time direct upload destination handed to the browser uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub upload_id: String,
    pub upload_url: String,
}

/// One row of the organization projects table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub project_id: String,
    pub org_id: String,
    pub created_by: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub deadline: Option<String>,
    pub thumbnail: String,
    pub created_at: String,
    pub updated_at: String,
    pub progress: u32,
    pub team_size: u32,
    pub starred: bool,
}

/// Fields accepted by `POST /api/projects`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub user_id: Option<String>,
    pub org_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub deadline: Option<String>,
    pub thumbnail: Option<String>,
}

impl ProjectRecord {
    /// Build a fresh project with the default field values. The caller has
    /// already checked that the owner and title are present.
    pub fn create(
        user_id: String,
        org_id: String,
        title: String,
        input: NewProject,
        now: DateTime<Utc>,
    ) -> Self {
        let created_at = iso_timestamp(now);
        Self {
            project_id: uuid::Uuid::new_v4().to_string(),
            org_id,
            created_by: user_id,
            title,
            description: input.description.unwrap_or_default(),
            status: input.status.unwrap_or_else(|| "planning".to_string()),
            deadline: input.deadline,
            thumbnail: input.thumbnail.unwrap_or_default(),
            updated_at: created_at.clone(),
            created_at,
            progress: 0,
            team_size: 1,
            starred: false,
        }
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix, the format every
/// timestamp in the tables uses.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

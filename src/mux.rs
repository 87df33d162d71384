use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::types::UploadSession;

pub const DEFAULT_MUX_API_BASE_URL: &str = "https://api.mux.com";

#[derive(Debug, Error)]
pub enum MuxError {
    #[error("Mux API credentials are not configured")]
    MissingCredentials,

    #[error("Mux request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Mux returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Settings for a new direct upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectUploadRequest {
    pub new_asset_settings: NewAssetSettings,
    pub cors_origin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAssetSettings {
    pub playback_policy: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passthrough: Option<String>,
}

impl DirectUploadRequest {
    /// Public playback, any browser origin, tagged with the project so the
    /// `asset_created` webhook can be tied back to it.
    pub fn public_for_project(project_id: &str) -> Self {
        Self {
            new_asset_settings: NewAssetSettings {
                playback_policy: vec!["public".to_string()],
                passthrough: Some(project_id.to_string()),
            },
            cors_origin: "*".to_string(),
        }
    }
}

#[async_trait]
pub trait VideoPlatform: Send + Sync {
    async fn create_direct_upload(
        &self,
        request: &DirectUploadRequest,
    ) -> Result<UploadSession, MuxError>;
}

// ---------------------------------------------------------------------------
// Mux REST API
// ---------------------------------------------------------------------------

pub struct MuxClient {
    client: reqwest::Client,
    base_url: String,
    token_id: Option<String>,
    token_secret: Option<String>,
}

#[derive(Deserialize)]
struct MuxEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct MuxUpload {
    id: String,
    url: String,
}

impl MuxClient {
    pub fn new(
        base_url: &str,
        token_id: Option<String>,
        token_secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MuxError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_id,
            token_secret,
        })
    }
}

#[async_trait]
impl VideoPlatform for MuxClient {
    async fn create_direct_upload(
        &self,
        request: &DirectUploadRequest,
    ) -> Result<UploadSession, MuxError> {
        let (token_id, token_secret) = match (&self.token_id, &self.token_secret) {
            (Some(id), Some(secret)) => (id, secret),
            _ => return Err(MuxError::MissingCredentials),
        };

        let url = format!("{}/video/v1/uploads", self.base_url);
        let resp = self
            .client
            .post(&url)
            .basic_auth(token_id, Some(token_secret))
            .json(request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MuxError::Status { status, body });
        }

        let upload: MuxEnvelope<MuxUpload> = resp.json().await?;
        Ok(UploadSession {
            upload_id: upload.data.id,
            upload_url: upload.data.url,
        })
    }
}

// ---------------------------------------------------------------------------
// Issuer
// ---------------------------------------------------------------------------

/// Hands out one-time upload destinations. Failures degrade to `None` so page
/// and API callers can offer a retry instead of failing outright.
pub struct UploadSessionIssuer {
    platform: Arc<dyn VideoPlatform>,
}

impl UploadSessionIssuer {
    pub fn new(platform: Arc<dyn VideoPlatform>) -> Self {
        Self { platform }
    }

    pub async fn issue(&self, project_id: &str, creator_id: Option<&str>) -> Option<UploadSession> {
        let request = DirectUploadRequest::public_for_project(project_id);
        match self.platform.create_direct_upload(&request).await {
            Ok(session) => {
                info!(
                    project_id,
                    creator_id = creator_id.unwrap_or("unknown"),
                    upload_id = %session.upload_id,
                    "issued upload session"
                );
                Some(session)
            }
            Err(e) => {
                error!(project_id, error = %e, "failed to create upload URL");
                None
            }
        }
    }
}

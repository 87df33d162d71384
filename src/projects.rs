//! Project API: create and list organization projects, and issue video
//! upload sessions for a project.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{NewProject, ProjectRecord, UploadSession};

const OWNER_REQUIRED: &str = "userId and orgId are required";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub org_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlRequest {
    creator_id: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn create_project(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut input: NewProject = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "invalid project body");
        ApiError::BadRequest("Invalid JSON body")
    })?;

    let (Some(user_id), Some(org_id)) = (present(input.user_id.take()), present(input.org_id.take()))
    else {
        return Err(ApiError::BadRequest(OWNER_REQUIRED));
    };
    let Some(title) = present(input.title.take()) else {
        return Err(ApiError::BadRequest("Title is required"));
    };

    let project = ProjectRecord::create(user_id, org_id, title, input, Utc::now());
    state.projects.put(&project).await.map_err(|source| {
        error!(org_id = %project.org_id, error = %source, "error creating project");
        ApiError::Store {
            context: "Failed to create project",
            source,
        }
    })?;

    info!(project_id = %project.project_id, org_id = %project.org_id, "project created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "project": project })),
    ))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Value>, ApiError> {
    let (Some(org_id), Some(_user_id)) = (present(query.org_id), present(query.user_id)) else {
        return Err(ApiError::BadRequest(OWNER_REQUIRED));
    };

    let projects = state.projects.list_by_org(&org_id).await.map_err(|source| {
        error!(org_id = %org_id, error = %source, "error fetching projects");
        ApiError::Store {
            context: "Failed to fetch projects",
            source,
        }
    })?;

    Ok(Json(json!({ "success": true, "projects": projects })))
}

/// Issue a direct-upload destination for `project_id`. The body is optional;
/// when present it may name the uploading user.
pub async fn create_upload_url(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    body: Bytes,
) -> Result<Json<UploadSession>, ApiError> {
    let request: UploadUrlRequest = serde_json::from_slice(&body).unwrap_or_default();

    match state.projects.get(&project_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!(project_id = %project_id, "upload requested for unknown project");
            return Err(ApiError::ProjectNotFound(project_id));
        }
        Err(source) => {
            error!(project_id = %project_id, error = %source, "project lookup failed");
            return Err(ApiError::Store {
                context: "Failed to create upload URL",
                source,
            });
        }
    }

    state
        .uploads
        .issue(&project_id, request.creator_id.as_deref())
        .await
        .map(Json)
        .ok_or(ApiError::UploadUnavailable)
}

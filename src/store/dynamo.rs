use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use super::{AssetUpdate, ProjectStore, StoreError, VideoStore};
use crate::types::{ProjectRecord, VideoAssetRecord, VideoStatus};

type Item = HashMap<String, AttributeValue>;

/// Video status table keyed by `assetId`.
pub struct DynamoVideoStore {
    client: Client,
    table: String,
}

impl DynamoVideoStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

/// An `UpdateItem` call in data form, so the expression building is testable
/// without a table.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    pub expression: String,
    pub values: Vec<(&'static str, AttributeValue)>,
}

/// `status` is a DynamoDB reserved word and is always written through the
/// `#status` alias.
pub fn asset_update_plan(update: &AssetUpdate, at: &str) -> UpdatePlan {
    let mut sets: Vec<&'static str> = Vec::new();
    let mut values: Vec<(&'static str, AttributeValue)> = Vec::new();

    match update {
        AssetUpdate::Processing {
            upload_id,
            project_id,
            filename,
        } => {
            sets.push("uploadId = :uploadId");
            values.push((":uploadId", opt_s(upload_id.as_deref())));
            sets.push("filename = :filename");
            values.push((":filename", s(filename)));
            sets.push("#status = :status");
            values.push((":status", s(VideoStatus::Processing.as_str())));
            sets.push("createdAt = :createdAt");
            values.push((":createdAt", s(at)));
            if let Some(project_id) = project_id {
                sets.push("projectId = :projectId");
                values.push((":projectId", s(project_id)));
            }
        }
        AssetUpdate::Ready {
            playback_id,
            duration,
        } => {
            sets.push("playbackId = :playbackId");
            values.push((":playbackId", opt_s(playback_id.as_deref())));
            sets.push("#status = :status");
            values.push((":status", s(VideoStatus::Ready.as_str())));
            sets.push("duration = :duration");
            values.push((
                ":duration",
                match duration {
                    Some(d) => AttributeValue::N(d.to_string()),
                    None => AttributeValue::Null(true),
                },
            ));
        }
        AssetUpdate::Errored { message } => {
            sets.push("#status = :status");
            values.push((":status", s(VideoStatus::Error.as_str())));
            sets.push("errorMessage = :errorMessage");
            values.push((":errorMessage", s(message)));
        }
    }

    sets.push("updatedAt = :updatedAt");
    values.push((":updatedAt", s(at)));

    UpdatePlan {
        expression: format!("SET {}", sets.join(", ")),
        values,
    }
}

#[async_trait]
impl VideoStore for DynamoVideoStore {
    async fn apply(&self, asset_id: &str, update: AssetUpdate, at: &str) -> Result<(), StoreError> {
        let plan = asset_update_plan(&update, at);
        debug!(table = %self.table, asset_id = %asset_id, expression = %plan.expression, "updating video asset");

        let mut request = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("assetId", s(asset_id))
            .update_expression(plan.expression)
            .expression_attribute_names("#status", "status");
        for (name, value) in plan.values {
            request = request.expression_attribute_values(name, value);
        }

        request.send().await.map_err(|e| StoreError::Backend {
            operation: "UpdateItem",
            message: DisplayErrorContext(&e).to_string(),
        })?;
        Ok(())
    }

    async fn delete(&self, asset_id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table)
            .key("assetId", s(asset_id))
            .send()
            .await
            .map_err(|e| StoreError::Backend {
                operation: "DeleteItem",
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }

    async fn get(&self, asset_id: &str) -> Result<Option<VideoAssetRecord>, StoreError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("assetId", s(asset_id))
            .send()
            .await
            .map_err(|e| StoreError::Backend {
                operation: "GetItem",
                message: DisplayErrorContext(&e).to_string(),
            })?;

        match out.item {
            Some(item) => video_from_item(&item)
                .map(Some)
                .map_err(|message| StoreError::Malformed {
                    table: self.table.clone(),
                    message,
                }),
            None => Ok(None),
        }
    }
}

/// Project table keyed by `projectId`, with a secondary index on `orgId`.
pub struct DynamoProjectStore {
    client: Client,
    table: String,
    org_index: String,
}

impl DynamoProjectStore {
    pub fn new(client: Client, table: impl Into<String>, org_index: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            org_index: org_index.into(),
        }
    }

    fn malformed(&self, message: String) -> StoreError {
        StoreError::Malformed {
            table: self.table.clone(),
            message,
        }
    }
}

#[async_trait]
impl ProjectStore for DynamoProjectStore {
    async fn put(&self, project: &ProjectRecord) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(project_to_item(project)))
            .send()
            .await
            .map_err(|e| StoreError::Backend {
                operation: "PutItem",
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }

    async fn get(&self, project_id: &str) -> Result<Option<ProjectRecord>, StoreError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("projectId", s(project_id))
            .send()
            .await
            .map_err(|e| StoreError::Backend {
                operation: "GetItem",
                message: DisplayErrorContext(&e).to_string(),
            })?;

        match out.item {
            Some(item) => project_from_item(&item)
                .map(Some)
                .map_err(|m| self.malformed(m)),
            None => Ok(None),
        }
    }

    async fn list_by_org(&self, org_id: &str) -> Result<Vec<ProjectRecord>, StoreError> {
        let mut projects = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let out = self
                .client
                .query()
                .table_name(&self.table)
                .index_name(&self.org_index)
                .key_condition_expression("orgId = :orgId")
                .expression_attribute_values(":orgId", s(org_id))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| StoreError::Backend {
                    operation: "Query",
                    message: DisplayErrorContext(&e).to_string(),
                })?;

            for item in out.items() {
                projects.push(project_from_item(item).map_err(|m| self.malformed(m))?);
            }

            match out.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(projects)
    }
}

// ---------------------------------------------------------------------------
// Item conversion
// ---------------------------------------------------------------------------

fn s(v: &str) -> AttributeValue {
    AttributeValue::S(v.to_string())
}

fn opt_s(v: Option<&str>) -> AttributeValue {
    match v {
        Some(v) => s(v),
        None => AttributeValue::Null(true),
    }
}

fn read_s(item: &Item, key: &str) -> Option<String> {
    match item.get(key) {
        Some(AttributeValue::S(v)) => Some(v.clone()),
        _ => None,
    }
}

fn require_s(item: &Item, key: &str) -> Result<String, String> {
    read_s(item, key).ok_or_else(|| format!("missing string attribute {key}"))
}

fn read_n<T: FromStr>(item: &Item, key: &str) -> Option<T> {
    match item.get(key) {
        Some(AttributeValue::N(v)) => v.parse().ok(),
        _ => None,
    }
}

fn read_bool(item: &Item, key: &str) -> Option<bool> {
    match item.get(key) {
        Some(AttributeValue::Bool(v)) => Some(*v),
        _ => None,
    }
}

pub fn video_from_item(item: &Item) -> Result<VideoAssetRecord, String> {
    let status = require_s(item, "status")?;
    Ok(VideoAssetRecord {
        asset_id: require_s(item, "assetId")?,
        upload_id: read_s(item, "uploadId"),
        project_id: read_s(item, "projectId"),
        filename: read_s(item, "filename"),
        status: VideoStatus::parse(&status).ok_or_else(|| format!("unknown status {status}"))?,
        playback_id: read_s(item, "playbackId"),
        duration: read_n(item, "duration"),
        error_message: read_s(item, "errorMessage"),
        created_at: read_s(item, "createdAt"),
        updated_at: require_s(item, "updatedAt")?,
    })
}

pub fn project_to_item(project: &ProjectRecord) -> Item {
    let mut item = Item::new();
    item.insert("projectId".into(), s(&project.project_id));
    item.insert("orgId".into(), s(&project.org_id));
    item.insert("createdBy".into(), s(&project.created_by));
    item.insert("title".into(), s(&project.title));
    item.insert("description".into(), s(&project.description));
    item.insert("status".into(), s(&project.status));
    item.insert("deadline".into(), opt_s(project.deadline.as_deref()));
    item.insert("thumbnail".into(), s(&project.thumbnail));
    item.insert("createdAt".into(), s(&project.created_at));
    item.insert("updatedAt".into(), s(&project.updated_at));
    item.insert("progress".into(), AttributeValue::N(project.progress.to_string()));
    item.insert("teamSize".into(), AttributeValue::N(project.team_size.to_string()));
    item.insert("starred".into(), AttributeValue::Bool(project.starred));
    item
}

pub fn project_from_item(item: &Item) -> Result<ProjectRecord, String> {
    Ok(ProjectRecord {
        project_id: require_s(item, "projectId")?,
        org_id: require_s(item, "orgId")?,
        created_by: read_s(item, "createdBy").unwrap_or_default(),
        title: require_s(item, "title")?,
        description: read_s(item, "description").unwrap_or_default(),
        status: read_s(item, "status").unwrap_or_else(|| "planning".to_string()),
        deadline: read_s(item, "deadline"),
        thumbnail: read_s(item, "thumbnail").unwrap_or_default(),
        created_at: require_s(item, "createdAt")?,
        updated_at: require_s(item, "updatedAt")?,
        progress: read_n(item, "progress").unwrap_or(0),
        team_size: read_n(item, "teamSize").unwrap_or(1),
        starred: read_bool(item, "starred").unwrap_or(false),
    })
}

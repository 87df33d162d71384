use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{AssetUpdate, ProjectStore, StoreError, VideoStore};
use crate::types::{ProjectRecord, VideoAssetRecord, VideoStatus};

/// Video table held in process memory. Same upsert semantics as the DynamoDB
/// `UpdateItem` calls: attributes not named by an update are left alone.
#[derive(Default)]
pub struct MemoryVideoStore {
    assets: RwLock<HashMap<String, VideoAssetRecord>>,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.assets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.assets.read().await.is_empty()
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn apply(&self, asset_id: &str, update: AssetUpdate, at: &str) -> Result<(), StoreError> {
        let mut assets = self.assets.write().await;
        let record = assets
            .entry(asset_id.to_string())
            .or_insert_with(|| VideoAssetRecord {
                asset_id: asset_id.to_string(),
                upload_id: None,
                project_id: None,
                filename: None,
                status: VideoStatus::Processing,
                playback_id: None,
                duration: None,
                error_message: None,
                created_at: None,
                updated_at: at.to_string(),
            });

        match update {
            AssetUpdate::Processing {
                upload_id,
                project_id,
                filename,
            } => {
                record.status = VideoStatus::Processing;
                record.upload_id = upload_id;
                if project_id.is_some() {
                    record.project_id = project_id;
                }
                record.filename = Some(filename);
                record.created_at = Some(at.to_string());
            }
            AssetUpdate::Ready {
                playback_id,
                duration,
            } => {
                record.status = VideoStatus::Ready;
                record.playback_id = playback_id;
                record.duration = duration;
            }
            AssetUpdate::Errored { message } => {
                record.status = VideoStatus::Error;
                record.error_message = Some(message);
            }
        }
        record.updated_at = at.to_string();
        Ok(())
    }

    async fn delete(&self, asset_id: &str) -> Result<(), StoreError> {
        self.assets.write().await.remove(asset_id);
        Ok(())
    }

    async fn get(&self, asset_id: &str) -> Result<Option<VideoAssetRecord>, StoreError> {
        Ok(self.assets.read().await.get(asset_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryProjectStore {
    projects: RwLock<HashMap<String, ProjectRecord>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn put(&self, project: &ProjectRecord) -> Result<(), StoreError> {
        self.projects
            .write()
            .await
            .insert(project.project_id.clone(), project.clone());
        Ok(())
    }

    async fn get(&self, project_id: &str) -> Result<Option<ProjectRecord>, StoreError> {
        Ok(self.projects.read().await.get(project_id).cloned())
    }

    async fn list_by_org(&self, org_id: &str) -> Result<Vec<ProjectRecord>, StoreError> {
        let projects = self.projects.read().await;
        let mut items: Vec<ProjectRecord> = projects
            .values()
            .filter(|p| p.org_id == org_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }
}

//! Persistence for video asset status and organization projects.
//!
//! Both tables sit behind a trait so the HTTP layer and the dispatcher only see
//! `Arc<dyn ...>` handles. `dynamo` is the production backend, `memory` serves
//! local development and tests.

pub mod dynamo;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ProjectRecord, VideoAssetRecord};

pub use dynamo::{DynamoProjectStore, DynamoVideoStore};
pub use memory::{MemoryProjectStore, MemoryVideoStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("malformed item in {table}: {message}")]
    Malformed { table: String, message: String },
}

/// A state transition reported by the video platform.
///
/// Every variant is applied as an upsert on the asset key: a transition for an
/// asset with no row yet creates the row.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetUpdate {
    Processing {
        upload_id: Option<String>,
        project_id: Option<String>,
        filename: String,
    },
    Ready {
        playback_id: Option<String>,
        duration: Option<f64>,
    },
    Errored {
        message: String,
    },
}

#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Apply `update` to the row for `asset_id`, stamping `updatedAt` with
    /// `at` (and `createdAt` for [`AssetUpdate::Processing`]).
    async fn apply(&self, asset_id: &str, update: AssetUpdate, at: &str) -> Result<(), StoreError>;

    /// Remove the row. Removing an absent row succeeds.
    async fn delete(&self, asset_id: &str) -> Result<(), StoreError>;

    async fn get(&self, asset_id: &str) -> Result<Option<VideoAssetRecord>, StoreError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn put(&self, project: &ProjectRecord) -> Result<(), StoreError>;

    async fn get(&self, project_id: &str) -> Result<Option<ProjectRecord>, StoreError>;

    /// All projects of one organization, via the org secondary index.
    async fn list_by_org(&self, org_id: &str) -> Result<Vec<ProjectRecord>, StoreError>;
}

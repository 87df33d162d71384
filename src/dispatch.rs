//! Routes normalized events to exactly one downstream action.
//!
//! Identity and organization events are forwarded to serverless compute with a
//! fire-and-forget invocation. Video asset events are projected straight into
//! the video table. Every action is idempotent under redelivery.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::events::NormalizedEvent;
use crate::lambda::{InvokeError, Invoker};
use crate::store::{AssetUpdate, StoreError, VideoStore};
use crate::types::iso_timestamp;

/// Tag carried in every compute payload so the functions know who sent it.
pub const INVOCATION_SOURCE: &str = "clerk.webhook";

/// Stored when Mux reports an error without a message.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("video store update for asset {asset_id} failed: {source}")]
    Store {
        asset_id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to encode invocation payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What the dispatcher did with an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Invoked { function_name: String },
    Projected { asset_id: String },
}

pub struct Dispatcher {
    invoker: Arc<dyn Invoker>,
    videos: Arc<dyn VideoStore>,
    function_prefix: String,
}

impl Dispatcher {
    pub fn new(
        invoker: Arc<dyn Invoker>,
        videos: Arc<dyn VideoStore>,
        function_prefix: impl Into<String>,
    ) -> Self {
        Self {
            invoker,
            videos,
            function_prefix: function_prefix.into(),
        }
    }

    pub fn function_name(&self, suffix: &str) -> String {
        format!("{}-{}", self.function_prefix, suffix)
    }

    pub async fn dispatch(
        &self,
        event: NormalizedEvent,
        now: DateTime<Utc>,
    ) -> Result<Dispatched, DispatchError> {
        match event {
            NormalizedEvent::OrgCreated(data) => {
                self.invoke("organizationCreated", &operation("create", &data)?)
                    .await
            }
            NormalizedEvent::OrgUpdated(data) => {
                self.invoke("organizationUpdated", &operation("update", &data)?)
                    .await
            }
            NormalizedEvent::OrgDeleted(data) => {
                self.invoke("organizationDeleted", &operation("delete", &data)?)
                    .await
            }
            NormalizedEvent::MemberAdded(data) => {
                self.invoke(
                    "organizationMembershipUpdated",
                    &operation("addMember", &data)?,
                )
                .await
            }
            NormalizedEvent::MemberUpdated(data) => {
                self.invoke(
                    "organizationMembershipUpdated",
                    &operation("updateMember", &data)?,
                )
                .await
            }
            NormalizedEvent::MemberRemoved(data) => {
                self.invoke(
                    "organizationMembershipUpdated",
                    &operation("removeMember", &data)?,
                )
                .await
            }
            NormalizedEvent::UserCreated(profile) => {
                self.invoke("userCreated", &serde_json::to_value(&profile)?)
                    .await
            }
            NormalizedEvent::UserUpdated(profile) => {
                self.invoke("userUpdated", &serde_json::to_value(&profile)?)
                    .await
            }
            NormalizedEvent::UserDeleted(data) => {
                self.invoke("userDeleted", &serde_json::to_value(&data)?)
                    .await
            }
            NormalizedEvent::AssetCreated(created) => {
                self.project(
                    created.asset_id,
                    AssetUpdate::Processing {
                        upload_id: created.upload_id,
                        project_id: created.project_id,
                        filename: created.filename,
                    },
                    now,
                )
                .await
            }
            NormalizedEvent::AssetReady(ready) => {
                self.project(
                    ready.asset_id,
                    AssetUpdate::Ready {
                        playback_id: ready.playback_id,
                        duration: ready.duration,
                    },
                    now,
                )
                .await
            }
            NormalizedEvent::AssetErrored(errored) => {
                self.project(
                    errored.asset_id,
                    AssetUpdate::Errored {
                        message: errored
                            .error_message
                            .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
                    },
                    now,
                )
                .await
            }
            NormalizedEvent::AssetDeleted(deleted) => {
                self.videos
                    .delete(&deleted.asset_id)
                    .await
                    .map_err(|source| DispatchError::Store {
                        asset_id: deleted.asset_id.clone(),
                        source,
                    })?;
                info!(asset_id = %deleted.asset_id, "video asset deleted");
                Ok(Dispatched::Projected {
                    asset_id: deleted.asset_id,
                })
            }
        }
    }

    /// Wrap `body` in the compute envelope and send it without waiting for
    /// the function's result.
    async fn invoke(
        &self,
        suffix: &str,
        body: &serde_json::Value,
    ) -> Result<Dispatched, DispatchError> {
        let function_name = self.function_name(suffix);
        let envelope = json!({
            "body": serde_json::to_string(body)?,
            "source": INVOCATION_SOURCE,
        });
        self.invoker
            .invoke_async(&function_name, serde_json::to_vec(&envelope)?)
            .await?;

        info!(function_name = %function_name, "event forwarded to compute");
        Ok(Dispatched::Invoked { function_name })
    }

    async fn project(
        &self,
        asset_id: String,
        update: AssetUpdate,
        now: DateTime<Utc>,
    ) -> Result<Dispatched, DispatchError> {
        self.videos
            .apply(&asset_id, update, &iso_timestamp(now))
            .await
            .map_err(|source| DispatchError::Store {
                asset_id: asset_id.clone(),
                source,
            })?;

        info!(asset_id = %asset_id, "video asset status updated");
        Ok(Dispatched::Projected { asset_id })
    }
}

fn operation(name: &str, data: &impl Serialize) -> Result<serde_json::Value, serde_json::Error> {
    Ok(json!({ "operation": name, "data": serde_json::to_value(data)? }))
}

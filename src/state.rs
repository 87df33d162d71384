use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Config, WebhookSecrets};
use crate::dispatch::Dispatcher;
use crate::lambda::{Invoker, LambdaInvoker, RecordingInvoker};
use crate::mux::{MuxClient, UploadSessionIssuer, VideoPlatform};
use crate::store::{
    DynamoProjectStore, DynamoVideoStore, MemoryProjectStore, MemoryVideoStore, ProjectStore,
    VideoStore,
};

/// Shared handles for every request. Cheap to clone; every client is built
/// once at startup and lives for the whole process.
#[derive(Clone)]
pub struct AppState {
    pub secrets: Arc<WebhookSecrets>,
    pub dispatcher: Arc<Dispatcher>,
    pub uploads: Arc<UploadSessionIssuer>,
    pub projects: Arc<dyn ProjectStore>,
}

impl AppState {
    pub fn new(
        secrets: WebhookSecrets,
        dispatcher: Dispatcher,
        uploads: UploadSessionIssuer,
        projects: Arc<dyn ProjectStore>,
    ) -> Self {
        Self {
            secrets: Arc::new(secrets),
            dispatcher: Arc::new(dispatcher),
            uploads: Arc::new(uploads),
            projects,
        }
    }

    /// Build the backends named by `config.storage_backend`.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let secrets = config.webhook_secrets();
        for (name, secret) in [
            ("CLERK_ORG_GEN_WEBHOOK_SECRET", &secrets.clerk_organization),
            ("CLERK_ORG_MEMBERSHIP_WEBHOOK_SECRET", &secrets.clerk_membership),
            ("CLERK_USER_WEBHOOK_SECRET", &secrets.clerk_user),
            ("MUX_WEBHOOK_SECRET", &secrets.mux),
        ] {
            if secret.is_none() {
                warn!("{name} is not set, its webhook route will reject every delivery");
            }
        }

        let platform: Arc<dyn VideoPlatform> = Arc::new(
            MuxClient::new(
                &config.mux_api_base_url,
                config.mux_token_id.clone(),
                config.mux_token_secret.clone(),
                config.request_timeout(),
            )
            .context("failed to build Mux client")?,
        );

        let (invoker, videos, projects): (
            Arc<dyn Invoker>,
            Arc<dyn VideoStore>,
            Arc<dyn ProjectStore>,
        ) = match config.storage_backend.as_str() {
            "memory" => {
                info!("using in-memory stores, compute invocations are recorded locally");
                (
                    Arc::new(RecordingInvoker::new()),
                    Arc::new(MemoryVideoStore::new()),
                    Arc::new(MemoryProjectStore::new()),
                )
            }
            "dynamodb" => {
                let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .region(aws_config::Region::new(config.aws_region.clone()));
                if let Some(ref profile) = config.aws_profile {
                    loader = loader.profile_name(profile);
                }
                let sdk_config = loader.load().await;
                info!(
                    region = %config.aws_region,
                    video_table = %config.video_table,
                    projects_table = %config.projects_table,
                    "using DynamoDB stores and Lambda invocations"
                );

                let dynamo = aws_sdk_dynamodb::Client::new(&sdk_config);
                (
                    Arc::new(LambdaInvoker::new(aws_sdk_lambda::Client::new(&sdk_config))),
                    Arc::new(DynamoVideoStore::new(dynamo.clone(), &config.video_table)),
                    Arc::new(DynamoProjectStore::new(
                        dynamo,
                        &config.projects_table,
                        &config.projects_org_index,
                    )),
                )
            }
            other => return Err(anyhow!("Unknown storage backend: {other}")),
        };

        Ok(Self::new(
            secrets,
            Dispatcher::new(invoker, videos, config.lambda_function_prefix.clone()),
            UploadSessionIssuer::new(platform),
            projects,
        ))
    }
}

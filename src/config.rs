//! Service configuration.
//!
//! Loaded in priority order: environment variables, then `nexushub.toml` in
//! the working directory, then the defaults below. Keys are the environment
//! variable names in lowercase (`MUX_WEBHOOK_SECRET` → `mux_webhook_secret`).
//!
//! Webhook secrets and Mux credentials are optional at load time. A route
//! whose secret is missing fails closed per request and logs the
//! misconfiguration, so one unconfigured provider does not take the others
//! down.

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::mux::DEFAULT_MUX_API_BASE_URL;

const CONFIG_FILE: &str = "nexushub.toml";

const ENV_KEYS: &[&str] = &[
    "host",
    "port",
    "log_level",
    "request_timeout_secs",
    "storage_backend",
    "aws_region",
    "aws_profile",
    "lambda_function_prefix",
    "video_table",
    "projects_table",
    "projects_org_index",
    "mux_api_base_url",
    "mux_token_id",
    "mux_token_secret",
    "mux_webhook_secret",
    "clerk_org_gen_webhook_secret",
    "clerk_org_membership_webhook_secret",
    "clerk_user_webhook_secret",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Fallback filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// `dynamodb` for AWS-backed tables and Lambda, `memory` for a
    /// self-contained local instance.
    #[serde(default = "default_storage_backend")]
    pub storage_backend: String,
    #[serde(default = "default_aws_region")]
    pub aws_region: String,
    pub aws_profile: Option<String>,
    #[serde(default = "default_lambda_function_prefix")]
    pub lambda_function_prefix: String,
    #[serde(default = "default_video_table")]
    pub video_table: String,
    #[serde(default = "default_projects_table")]
    pub projects_table: String,
    #[serde(default = "default_projects_org_index")]
    pub projects_org_index: String,

    #[serde(default = "default_mux_api_base_url")]
    pub mux_api_base_url: String,
    pub mux_token_id: Option<String>,
    pub mux_token_secret: Option<String>,
    pub mux_webhook_secret: Option<String>,

    pub clerk_org_gen_webhook_secret: Option<String>,
    pub clerk_org_membership_webhook_secret: Option<String>,
    pub clerk_user_webhook_secret: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}
fn default_log_level() -> String {
    "info".into()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_storage_backend() -> String {
    "dynamodb".into()
}
fn default_aws_region() -> String {
    "us-east-1".into()
}
fn default_lambda_function_prefix() -> String {
    "nexushub-dev".into()
}
fn default_video_table() -> String {
    "nexushub-project-videos".into()
}
fn default_projects_table() -> String {
    "nexushub-organization-projects".into()
}
fn default_projects_org_index() -> String {
    "orgId-index".into()
}
fn default_mux_api_base_url() -> String {
    DEFAULT_MUX_API_BASE_URL.into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
            storage_backend: default_storage_backend(),
            aws_region: default_aws_region(),
            aws_profile: None,
            lambda_function_prefix: default_lambda_function_prefix(),
            video_table: default_video_table(),
            projects_table: default_projects_table(),
            projects_org_index: default_projects_org_index(),
            mux_api_base_url: default_mux_api_base_url(),
            mux_token_id: None,
            mux_token_secret: None,
            mux_webhook_secret: None,
            clerk_org_gen_webhook_secret: None,
            clerk_org_membership_webhook_secret: None,
            clerk_user_webhook_secret: None,
        }
    }
}

/// Signing secrets, one per webhook endpoint. Empty values count as unset.
#[derive(Debug, Clone, Default)]
pub struct WebhookSecrets {
    pub clerk_organization: Option<String>,
    pub clerk_membership: Option<String>,
    pub clerk_user: Option<String>,
    pub mux: Option<String>,
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.clone().filter(|s| !s.trim().is_empty())
}

impl Config {
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw().only(ENV_KEYS))
    }

    pub fn load() -> Result<Self> {
        let config: Self = Self::figment()
            .extract()
            .context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.storage_backend.as_str() {
            "dynamodb" | "memory" => {}
            other => bail!("unknown storage_backend: {other} (expected dynamodb or memory)"),
        }
        if self.lambda_function_prefix.trim().is_empty() {
            bail!("lambda_function_prefix must not be empty");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn server_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid server address {}:{}", self.host, self.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn webhook_secrets(&self) -> WebhookSecrets {
        WebhookSecrets {
            clerk_organization: non_empty(&self.clerk_org_gen_webhook_secret),
            clerk_membership: non_empty(&self.clerk_org_membership_webhook_secret),
            clerk_user: non_empty(&self.clerk_user_webhook_secret),
            mux: non_empty(&self.mux_webhook_secret),
        }
    }
}

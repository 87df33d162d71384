use async_trait::async_trait;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Error)]
#[error("invoking {function_name} failed: {message}")]
pub struct InvokeError {
    pub function_name: String,
    pub message: String,
}

/// One-way trigger of downstream compute. Success means the platform accepted
/// the event for processing, nothing more.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke_async(&self, function_name: &str, payload: Vec<u8>) -> Result<(), InvokeError>;
}

// ---------------------------------------------------------------------------
// AWS Lambda
// ---------------------------------------------------------------------------

pub struct LambdaInvoker {
    client: aws_sdk_lambda::Client,
}

impl LambdaInvoker {
    pub fn new(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Invoker for LambdaInvoker {
    async fn invoke_async(&self, function_name: &str, payload: Vec<u8>) -> Result<(), InvokeError> {
        let resp = self
            .client
            .invoke()
            .function_name(function_name)
            .invocation_type(InvocationType::Event)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| InvokeError {
                function_name: function_name.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        debug!(function_name, status = resp.status_code(), "lambda accepted event");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recording (local development, tests)
// ---------------------------------------------------------------------------

/// An invocation captured by [`RecordingInvoker`].
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub function_name: String,
    pub payload: serde_json::Value,
}

/// Keeps recent invocations in memory instead of calling AWS. Used by the
/// `memory` storage backend and by tests asserting what would have been sent.
/// Only the newest `capacity` calls are retained.
pub struct RecordingInvoker {
    calls: Mutex<VecDeque<Invocation>>,
    capacity: usize,
    fail_with: Option<String>,
}

/// Retained calls for [`RecordingInvoker::new`].
pub const DEFAULT_RECORDING_CAPACITY: usize = 1000;

impl Default for RecordingInvoker {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RECORDING_CAPACITY)
    }
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            calls: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            fail_with: None,
        }
    }

    /// An invoker whose every call fails at the transport level.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    /// Retained calls, oldest first.
    pub async fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl Invoker for RecordingInvoker {
    async fn invoke_async(&self, function_name: &str, payload: Vec<u8>) -> Result<(), InvokeError> {
        if let Some(message) = &self.fail_with {
            return Err(InvokeError {
                function_name: function_name.to_string(),
                message: message.clone(),
            });
        }

        let payload = serde_json::from_slice(&payload).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&payload).into_owned())
        });
        info!(function_name, "recorded invocation");
        let mut calls = self.calls.lock().await;
        if calls.len() == self.capacity {
            calls.pop_front();
        }
        calls.push_back(Invocation {
            function_name: function_name.to_string(),
            payload,
        });
        Ok(())
    }
}

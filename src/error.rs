//! Errors surfaced at the HTTP edge.
//!
//! Each endpoint family has its own enum so the status codes and bodies the
//! providers and the web app already depend on stay fixed. Every body is
//! `{"error": "<message>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::store::StoreError;

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Failures on the Clerk (Svix-signed) webhook routes.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing svix headers")]
    MissingHeaders,

    /// The route's signing secret is not configured.
    #[error("webhook secret {0} is not configured")]
    Misconfigured(&'static str),

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("invalid JSON body: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            WebhookError::MissingHeaders => {
                error_body(StatusCode::BAD_REQUEST, "Error: Missing SVIX headers")
            }
            WebhookError::Misconfigured(_) => error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error: Server misconfiguration",
            ),
            WebhookError::InvalidSignature => {
                error_body(StatusCode::BAD_REQUEST, "Error: Invalid webhook signature")
            }
            WebhookError::InvalidPayload(_) => {
                error_body(StatusCode::BAD_REQUEST, "Error: Invalid payload")
            }
            WebhookError::Dispatch(_) => error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error processing webhook",
            ),
        }
    }
}

/// Failures on the Mux webhook route. A missing secret is reported to the
/// caller exactly like a bad signature.
#[derive(Debug, Error)]
pub enum MuxWebhookError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid JSON body: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl IntoResponse for MuxWebhookError {
    fn into_response(self) -> Response {
        match self {
            MuxWebhookError::InvalidSignature => {
                error_body(StatusCode::UNAUTHORIZED, "Invalid signature")
            }
            MuxWebhookError::InvalidPayload(_) | MuxWebhookError::Dispatch(_) => error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process webhook",
            ),
        }
    }
}

/// Failures on the project API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("project {0} not found")]
    ProjectNotFound(String),

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Failed to create upload URL")]
    UploadUnavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => error_body(StatusCode::BAD_REQUEST, message),
            ApiError::ProjectNotFound(_) => error_body(StatusCode::NOT_FOUND, "Project not found"),
            ApiError::Store { context, .. } => {
                error_body(StatusCode::INTERNAL_SERVER_ERROR, context)
            }
            ApiError::UploadUnavailable => error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create upload URL",
            ),
        }
    }
}

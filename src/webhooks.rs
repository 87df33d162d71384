//! Webhook endpoints.
//!
//! Each handler verifies the provider signature over the raw body before
//! anything is parsed, normalizes the event, and hands it to the dispatcher.
//! Deliveries the service has no use for are acknowledged with 200 so the
//! provider does not retry them.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::error::{MuxWebhookError, WebhookError};
use crate::events::{normalize, EventFamily, EventKind, Normalized, WebhookPayload};
use crate::state::AppState;
use crate::verification::{verify_mux_signature, verify_svix_signature};

const HEADER_SVIX_ID: &str = "svix-id";
const HEADER_SVIX_TIMESTAMP: &str = "svix-timestamp";
const HEADER_SVIX_SIGNATURE: &str = "svix-signature";
const HEADER_MUX_SIGNATURE: &str = "mux-signature";

/// The three Clerk endpoints. Each has its own signing secret and event
/// subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClerkEndpoint {
    OrganizationGeneral,
    OrganizationMembership,
    User,
}

impl ClerkEndpoint {
    pub fn secret_name(&self) -> &'static str {
        match self {
            ClerkEndpoint::OrganizationGeneral => "CLERK_ORG_GEN_WEBHOOK_SECRET",
            ClerkEndpoint::OrganizationMembership => "CLERK_ORG_MEMBERSHIP_WEBHOOK_SECRET",
            ClerkEndpoint::User => "CLERK_USER_WEBHOOK_SECRET",
        }
    }

    /// Organization-general forwards organization events plus membership
    /// creation and removal; membership updates only arrive on the
    /// membership endpoint.
    pub fn accepts(&self, kind: EventKind) -> bool {
        match self {
            ClerkEndpoint::OrganizationGeneral => matches!(
                kind,
                EventKind::OrgCreated
                    | EventKind::OrgUpdated
                    | EventKind::OrgDeleted
                    | EventKind::MemberAdded
                    | EventKind::MemberRemoved
            ),
            ClerkEndpoint::OrganizationMembership => kind.family() == EventFamily::Membership,
            ClerkEndpoint::User => kind.family() == EventFamily::User,
        }
    }

    fn secret<'a>(&self, state: &'a AppState) -> Option<&'a str> {
        let secret = match self {
            ClerkEndpoint::OrganizationGeneral => &state.secrets.clerk_organization,
            ClerkEndpoint::OrganizationMembership => &state.secrets.clerk_membership,
            ClerkEndpoint::User => &state.secrets.clerk_user,
        };
        secret.as_deref()
    }
}

pub async fn clerk_organization_general(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    handle_clerk(ClerkEndpoint::OrganizationGeneral, &state, &headers, &body).await
}

pub async fn clerk_organization_membership(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    handle_clerk(ClerkEndpoint::OrganizationMembership, &state, &headers, &body).await
}

pub async fn clerk_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    handle_clerk(ClerkEndpoint::User, &state, &headers, &body).await
}

async fn handle_clerk(
    endpoint: ClerkEndpoint,
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Json<Value>, WebhookError> {
    let (msg_id, timestamp, signature) = match (
        get_header(headers, HEADER_SVIX_ID),
        get_header(headers, HEADER_SVIX_TIMESTAMP),
        get_header(headers, HEADER_SVIX_SIGNATURE),
    ) {
        (Some(id), Some(ts), Some(sig)) => (id, ts, sig),
        _ => {
            warn!(endpoint = ?endpoint, "missing svix headers");
            return Err(WebhookError::MissingHeaders);
        }
    };

    let Some(secret) = endpoint.secret(state) else {
        error!(
            endpoint = ?endpoint,
            secret = endpoint.secret_name(),
            "webhook secret is not configured"
        );
        return Err(WebhookError::Misconfigured(endpoint.secret_name()));
    };

    let now = Utc::now();
    if !verify_svix_signature(secret, body, msg_id, timestamp, signature, now.timestamp()) {
        warn!(endpoint = ?endpoint, svix_id = msg_id, "invalid webhook signature");
        return Err(WebhookError::InvalidSignature);
    }

    let payload: WebhookPayload = serde_json::from_slice(body)?;
    debug!(endpoint = ?endpoint, svix_id = msg_id, event_type = %payload.event_type, "received webhook");

    match EventKind::from_event_type(&payload.event_type) {
        Some(kind) if endpoint.accepts(kind) => {}
        Some(kind) => {
            info!(endpoint = ?endpoint, kind = ?kind, "event not handled by this endpoint");
            return Ok(acknowledged());
        }
        None => {
            info!(endpoint = ?endpoint, event_type = %payload.event_type, "unhandled webhook event type");
            return Ok(acknowledged());
        }
    }

    match normalize(&payload.event_type, &payload.data, now) {
        Normalized::Event(event) => {
            state.dispatcher.dispatch(event, now).await.map_err(|e| {
                error!(endpoint = ?endpoint, svix_id = msg_id, error = %e, "error processing webhook");
                WebhookError::Dispatch(e)
            })?;
        }
        Normalized::Dropped { kind, reason } => {
            debug!(endpoint = ?endpoint, kind = ?kind, reason, "dropped webhook payload");
        }
        Normalized::Unrecognized(event_type) => {
            info!(endpoint = ?endpoint, event_type = %event_type, "unhandled webhook event type");
        }
    }

    Ok(acknowledged())
}

pub async fn mux(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, MuxWebhookError> {
    let Some(secret) = state.secrets.mux.as_deref() else {
        error!("MUX_WEBHOOK_SECRET is not configured, rejecting delivery");
        return Err(MuxWebhookError::InvalidSignature);
    };

    let signature = get_header(&headers, HEADER_MUX_SIGNATURE).unwrap_or("");
    if !verify_mux_signature(secret, &body, signature) {
        warn!("invalid Mux webhook signature");
        return Err(MuxWebhookError::InvalidSignature);
    }

    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "Mux webhook body is not a valid event");
        MuxWebhookError::InvalidPayload(e)
    })?;

    if let Some(kind) = EventKind::from_event_type(&payload.event_type) {
        if kind.family() != EventFamily::Video {
            info!(kind = ?kind, "non-video event on the Mux endpoint");
            return Ok(acknowledged());
        }
    }

    let now = Utc::now();
    match normalize(&payload.event_type, &payload.data, now) {
        Normalized::Event(event) => {
            state.dispatcher.dispatch(event, now).await.map_err(|e| {
                error!(event_type = %payload.event_type, error = %e, "failed to process Mux webhook");
                MuxWebhookError::Dispatch(e)
            })?;
        }
        Normalized::Dropped { kind, reason } => {
            debug!(kind = ?kind, reason, "dropped Mux payload");
        }
        Normalized::Unrecognized(event_type) => {
            info!(event_type = %event_type, "unhandled Mux event type");
        }
    }

    Ok(acknowledged())
}

fn acknowledged() -> Json<Value> {
    Json(json!({ "success": true }))
}

fn get_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

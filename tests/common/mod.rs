#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use nexushub_webhooks::config::WebhookSecrets;
use nexushub_webhooks::dispatch::Dispatcher;
use nexushub_webhooks::http_server::router;
use nexushub_webhooks::lambda::RecordingInvoker;
use nexushub_webhooks::mux::{MuxClient, UploadSessionIssuer, VideoPlatform};
use nexushub_webhooks::state::AppState;
use nexushub_webhooks::store::{MemoryProjectStore, MemoryVideoStore};
use nexushub_webhooks::verification::{compute_mux_signature, compute_svix_signature};

pub const CLERK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
pub const MUX_SECRET: &str = "mux-signing-secret";
pub const FUNCTION_PREFIX: &str = "nexushub-test";

pub struct TestApp {
    pub router: Router,
    pub invoker: Arc<RecordingInvoker>,
    pub videos: Arc<MemoryVideoStore>,
    pub projects: Arc<MemoryProjectStore>,
}

pub fn all_secrets() -> WebhookSecrets {
    WebhookSecrets {
        clerk_organization: Some(CLERK_SECRET.into()),
        clerk_membership: Some(CLERK_SECRET.into()),
        clerk_user: Some(CLERK_SECRET.into()),
        mux: Some(MUX_SECRET.into()),
    }
}

/// A Mux client with no credentials; upload requests fail before any I/O.
pub fn offline_platform() -> Arc<dyn VideoPlatform> {
    Arc::new(
        MuxClient::new("http://127.0.0.1:9", None, None, Duration::from_secs(1))
            .expect("client builds"),
    )
}

pub fn test_app(secrets: WebhookSecrets, platform: Arc<dyn VideoPlatform>) -> TestApp {
    let invoker = Arc::new(RecordingInvoker::new());
    let videos = Arc::new(MemoryVideoStore::new());
    let projects = Arc::new(MemoryProjectStore::new());

    let state = AppState::new(
        secrets,
        Dispatcher::new(invoker.clone(), videos.clone(), FUNCTION_PREFIX),
        UploadSessionIssuer::new(platform),
        projects.clone(),
    );

    TestApp {
        router: router(state, Duration::from_secs(5)),
        invoker,
        videos,
        projects,
    }
}

pub fn svix_request(uri: &str, msg_id: &str, body: &str) -> Request<Body> {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = compute_svix_signature(CLERK_SECRET, msg_id, &timestamp, body.as_bytes());
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("svix-id", msg_id)
        .header("svix-timestamp", timestamp)
        .header("svix-signature", signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn mux_request(body: &str) -> Request<Body> {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = compute_mux_signature(MUX_SECRET, &timestamp, body.as_bytes());
    mux_request_with_header(body, &format!("t={timestamp},v1={signature}"))
}

pub fn mux_request_with_header(body: &str, header: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/webhooks/mux")
        .header("content-type", "application/json")
        .header("mux-signature", header)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

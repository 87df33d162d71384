mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use common::*;
use nexushub_webhooks::config::WebhookSecrets;
use nexushub_webhooks::store::VideoStore;
use nexushub_webhooks::types::VideoStatus;

const ORG_GENERAL: &str = "/api/webhooks/clerk/organization/general";
const ORG_MEMBERSHIP: &str = "/api/webhooks/clerk/organization/membership";
const USER: &str = "/api/webhooks/clerk/user";

fn payload(value: serde_json::Value) -> String {
    value.to_string()
}

// ---------------------------------------------------------------------------
// Mux
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mux_asset_lifecycle_projects_status() {
    let app = test_app(all_secrets(), offline_platform());

    let created = payload(json!({
        "type": "video.upload.asset_created",
        "data": { "upload_id": "u1", "asset_id": "a1" }
    }));
    let (status, body) = send(&app, mux_request(&created)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let record = app.videos.get("a1").await.unwrap().unwrap();
    assert_eq!(record.status, VideoStatus::Processing);
    assert_eq!(record.upload_id.as_deref(), Some("u1"));
    let filename = record.filename.clone().unwrap();
    assert!(filename.starts_with("video-") && filename.ends_with(".mp4"));

    let ready = payload(json!({
        "type": "video.asset.ready",
        "data": { "id": "a1", "playback_ids": [{ "id": "p1" }], "duration": 42.5 }
    }));
    let (status, _) = send(&app, mux_request(&ready)).await;
    assert_eq!(status, StatusCode::OK);

    let record = app.videos.get("a1").await.unwrap().unwrap();
    assert_eq!(record.status, VideoStatus::Ready);
    assert_eq!(record.playback_id.as_deref(), Some("p1"));
    assert_eq!(record.duration, Some(42.5));
    assert_eq!(record.upload_id.as_deref(), Some("u1"));
    assert_eq!(record.filename.as_deref(), Some(filename.as_str()));

    let deleted = payload(json!({ "type": "video.asset.deleted", "data": { "id": "a1" } }));
    for _ in 0..2 {
        let (status, _) = send(&app, mux_request(&deleted)).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert!(app.videos.get("a1").await.unwrap().is_none());
    assert!(app.invoker.calls().await.is_empty());
}

#[tokio::test]
async fn mux_tampered_signature_is_rejected_without_mutation() {
    let app = test_app(all_secrets(), offline_platform());
    let body = payload(json!({
        "type": "video.upload.asset_created",
        "data": { "upload_id": "u1", "asset_id": "a1" }
    }));

    let request = mux_request(&body);
    let header = request.headers()["mux-signature"].to_str().unwrap().to_string();
    let tampered = header.replace("v1=", "v1=00");

    let (status, response) = send(&app, mux_request_with_header(&body, &tampered)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response, json!({ "error": "Invalid signature" }));
    assert!(app.videos.is_empty().await);
}

#[tokio::test]
async fn mux_missing_header_is_rejected() {
    let app = test_app(all_secrets(), offline_platform());
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/mux")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mux_without_secret_fails_closed() {
    let secrets = WebhookSecrets {
        mux: None,
        ..all_secrets()
    };
    let app = test_app(secrets, offline_platform());
    let body = payload(json!({ "type": "video.asset.deleted", "data": { "id": "a1" } }));

    let (status, response) = send(&app, mux_request(&body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response, json!({ "error": "Invalid signature" }));
}

#[tokio::test]
async fn mux_errored_without_message_records_fallback() {
    let app = test_app(all_secrets(), offline_platform());
    let body = payload(json!({ "type": "video.asset.errored", "data": { "id": "a2" } }));

    let (status, _) = send(&app, mux_request(&body)).await;
    assert_eq!(status, StatusCode::OK);
    let record = app.videos.get("a2").await.unwrap().unwrap();
    assert_eq!(record.status, VideoStatus::Error);
    assert_eq!(record.error_message.as_deref(), Some("Unknown error"));
}

#[tokio::test]
async fn mux_non_json_body_fails_processing() {
    let app = test_app(all_secrets(), offline_platform());
    let (status, response) = send(&app, mux_request("not json")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, json!({ "error": "Failed to process webhook" }));
}

#[tokio::test]
async fn mux_unhandled_type_is_acknowledged() {
    let app = test_app(all_secrets(), offline_platform());
    let body = payload(json!({ "type": "video.asset.track.ready", "data": { "id": "a1" } }));
    let (status, _) = send(&app, mux_request(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.videos.is_empty().await);
}

// ---------------------------------------------------------------------------
// Clerk
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clerk_user_created_invokes_user_function() {
    let app = test_app(all_secrets(), offline_platform());
    let body = payload(json!({
        "type": "user.created",
        "data": {
            "id": "user_1",
            "image_url": "https://img.example/u1.png",
            "username": null,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "created_at": 1_700_000_000_000_i64,
            "updated_at": 1_700_000_000_500_i64
        }
    }));

    let (status, response) = send(&app, svix_request(USER, "msg_1", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "success": true }));

    let calls = app.invoker.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].function_name, format!("{FUNCTION_PREFIX}-userCreated"));
    assert_eq!(calls[0].payload["source"], "clerk.webhook");
    let inner: serde_json::Value =
        serde_json::from_str(calls[0].payload["body"].as_str().unwrap()).unwrap();
    assert_eq!(inner["userId"], "user_1");
    assert_eq!(inner["firstName"], "Ada");
    assert_eq!(inner["role"], "member");
    assert_eq!(inner["createdAt"], 1_700_000_000_000_i64);
}

#[tokio::test]
async fn clerk_missing_headers_is_bad_request() {
    let app = test_app(all_secrets(), offline_platform());
    let request = json_request("POST", USER, r#"{"type":"user.deleted","data":{"id":"u"}}"#);

    let (status, response) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response, json!({ "error": "Error: Missing SVIX headers" }));
    assert!(app.invoker.calls().await.is_empty());
}

#[tokio::test]
async fn clerk_missing_secret_is_server_error() {
    let secrets = WebhookSecrets {
        clerk_user: None,
        ..all_secrets()
    };
    let app = test_app(secrets, offline_platform());
    let body = r#"{"type":"user.deleted","data":{"id":"u"}}"#;

    let (status, response) = send(&app, svix_request(USER, "msg_2", body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, json!({ "error": "Error: Server misconfiguration" }));
}

#[tokio::test]
async fn clerk_bad_signature_is_bad_request() {
    let app = test_app(all_secrets(), offline_platform());
    let mut request = svix_request(USER, "msg_3", r#"{"type":"user.deleted","data":{"id":"u"}}"#);
    request.headers_mut().insert(
        "svix-signature",
        "v1,AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".parse().unwrap(),
    );

    let (status, response) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response, json!({ "error": "Error: Invalid webhook signature" }));
    assert!(app.invoker.calls().await.is_empty());
}

#[tokio::test]
async fn clerk_membership_without_organization_is_dropped() {
    let app = test_app(all_secrets(), offline_platform());
    let body = payload(json!({
        "type": "organizationMembership.created",
        "data": { "id": "mem_1", "role": "admin", "public_user_data": { "user_id": "user_1" } }
    }));

    let (status, _) = send(&app, svix_request(ORG_MEMBERSHIP, "msg_4", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.invoker.calls().await.is_empty());
}

#[tokio::test]
async fn clerk_unknown_type_is_acknowledged() {
    let app = test_app(all_secrets(), offline_platform());
    let body = payload(json!({ "type": "foo.bar", "data": {} }));

    let (status, response) = send(&app, svix_request(ORG_GENERAL, "msg_5", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "success": true }));
    assert!(app.invoker.calls().await.is_empty());
}

#[tokio::test]
async fn clerk_event_outside_endpoint_family_is_ignored() {
    let app = test_app(all_secrets(), offline_platform());
    let body = payload(json!({ "type": "organization.deleted", "data": { "id": "org_1" } }));

    let (status, _) = send(&app, svix_request(USER, "msg_6", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.invoker.calls().await.is_empty());
}

#[tokio::test]
async fn general_endpoint_forwards_organization_and_membership_events() {
    let app = test_app(all_secrets(), offline_platform());
    let org = payload(json!({
        "type": "organization.created",
        "data": { "id": "org_1", "name": "Studio", "created_by": "user_1", "created_at": 1_700_000_000_000_i64 }
    }));
    let member = payload(json!({
        "type": "organizationMembership.created",
        "data": {
            "id": "mem_1",
            "role": "org:admin",
            "organization": { "id": "org_1" },
            "public_user_data": { "user_id": "user_2" }
        }
    }));

    assert_eq!(send(&app, svix_request(ORG_GENERAL, "msg_7", &org)).await.0, StatusCode::OK);
    assert_eq!(send(&app, svix_request(ORG_GENERAL, "msg_8", &member)).await.0, StatusCode::OK);

    let calls = app.invoker.calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].function_name, format!("{FUNCTION_PREFIX}-organizationCreated"));
    assert_eq!(
        calls[1].function_name,
        format!("{FUNCTION_PREFIX}-organizationMembershipUpdated")
    );
    let inner: serde_json::Value =
        serde_json::from_str(calls[1].payload["body"].as_str().unwrap()).unwrap();
    assert_eq!(inner["operation"], "addMember");
    assert_eq!(inner["data"]["role"], "org:admin");
}

#[tokio::test]
async fn clerk_non_json_body_is_bad_request() {
    let app = test_app(all_secrets(), offline_platform());
    let (status, _) = send(&app, svix_request(USER, "msg_9", "not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app(WebhookSecrets::default(), offline_platform());
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn general_endpoint_leaves_membership_updates_to_membership_endpoint() {
    let app = test_app(all_secrets(), offline_platform());
    let body = payload(json!({
        "type": "organizationMembership.updated",
        "data": {
            "role": "org:admin",
            "organization": { "id": "org_1" },
            "public_user_data": { "user_id": "user_2" }
        }
    }));

    let (status, _) = send(&app, svix_request(ORG_GENERAL, "msg_10", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.invoker.calls().await.is_empty());

    let (status, _) = send(&app, svix_request(ORG_MEMBERSHIP, "msg_11", &body)).await;
    assert_eq!(status, StatusCode::OK);
    let calls = app.invoker.calls().await;
    assert_eq!(calls.len(), 1);
    let inner: serde_json::Value =
        serde_json::from_str(calls[0].payload["body"].as_str().unwrap()).unwrap();
    assert_eq!(inner["operation"], "updateMember");
}

#[tokio::test]
async fn clerk_body_without_type_is_acknowledged() {
    let app = test_app(all_secrets(), offline_platform());
    let body = payload(json!({ "data": { "id": "user_1" } }));

    let (status, response) = send(&app, svix_request(USER, "msg_12", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "success": true }));
    assert!(app.invoker.calls().await.is_empty());
}

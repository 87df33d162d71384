use std::time::Duration;

use nexushub_webhooks::mux::{DirectUploadRequest, MuxClient, MuxError, VideoPlatform};
use serde_json::json;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> MuxClient {
    MuxClient::new(
        &server.uri(),
        Some("token-id".into()),
        Some("token-secret".into()),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn creates_direct_upload_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/video/v1/uploads"))
        .and(matchers::header(
            "authorization",
            "Basic dG9rZW4taWQ6dG9rZW4tc2VjcmV0",
        ))
        .and(matchers::body_json(json!({
            "new_asset_settings": { "playback_policy": ["public"], "passthrough": "proj_1" },
            "cors_origin": "*"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {
                "id": "upl_123",
                "url": "https://storage.example/upload/upl_123",
                "status": "waiting",
                "timeout": 3600
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = client_for(&server)
        .create_direct_upload(&DirectUploadRequest::public_for_project("proj_1"))
        .await
        .unwrap();

    assert_eq!(session.upload_id, "upl_123");
    assert_eq!(session.upload_url, "https://storage.example/upload/upl_123");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_direct_upload(&DirectUploadRequest::public_for_project("proj_1"))
        .await
        .unwrap_err();

    match err {
        MuxError::Status { status, body } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(body, "unauthorized");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn malformed_response_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_direct_upload(&DirectUploadRequest::public_for_project("proj_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, MuxError::Request(_)));
}

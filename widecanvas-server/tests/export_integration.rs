//! Integration tests for the POST /api/convertFramework endpoint.
//!
//! The server proxies to a wiremock upstream; the export workflow talks to
//! the server through `ConversionClient`.

mod common;

use std::sync::Arc;

use common::TestServer;
use widecanvas_core::{
    ExportWorkflow, Framework, MemoryLinkStore, MemoryQuotaStore, PreviewError, QuotaStore, UserId,
};
use widecanvas_server::ConversionClient;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn upstream_returning(code: &str) -> MockServer {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/convertFramework"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "convertedCode": code })),
        )
        .mount(&upstream)
        .await;
    upstream
}

// ==========================================================================
// Endpoint behaviour
// ==========================================================================

#[tokio::test]
async fn test_convert_proxies_to_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({
            "framework": "swiftui",
            "instruction": Framework::SwiftUi.instruction(),
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "convertedCode": "struct ContentView {}" })),
        )
        .expect(1)
        .mount(&upstream)
        .await;
    let server = TestServer::start_with(MemoryLinkStore::new(), Some(upstream.uri())).await;

    let resp = reqwest::Client::new()
        .post(server.url("/api/convertFramework"))
        .json(&serde_json::json!({ "html": "<p>x</p>", "framework": "swiftui" }))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["convertedCode"], "struct ContentView {}");

    server.shutdown().await;
}

#[tokio::test]
async fn test_unknown_framework_is_bad_request() {
    let upstream = upstream_returning("unused").await;
    let server = TestServer::start_with(MemoryLinkStore::new(), Some(upstream.uri())).await;

    let resp = reqwest::Client::new()
        .post(server.url("/api/convertFramework"))
        .json(&serde_json::json!({ "html": "<p/>", "framework": "cobol" }))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["error"], "Unknown framework: cobol");

    server.shutdown().await;
}

#[tokio::test]
async fn test_missing_upstream_is_unavailable() {
    let server = TestServer::start().await;

    let resp = reqwest::Client::new()
        .post(server.url("/api/convertFramework"))
        .json(&serde_json::json!({ "html": "<p/>", "framework": "react" }))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 503);

    server.shutdown().await;
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstream)
        .await;
    let server = TestServer::start_with(MemoryLinkStore::new(), Some(upstream.uri())).await;

    let resp = reqwest::Client::new()
        .post(server.url("/api/convertFramework"))
        .json(&serde_json::json!({ "html": "<p/>", "framework": "react" }))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 502);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["error"], "Failed to convert code");

    server.shutdown().await;
}

// ==========================================================================
// Export workflow end to end
// ==========================================================================

#[tokio::test]
async fn test_workflow_charges_quota_on_success() {
    let upstream = upstream_returning("export default function App() {}").await;
    let server = TestServer::start_with(MemoryLinkStore::new(), Some(upstream.uri())).await;

    let user = UserId::new("designer");
    let quota = Arc::new(MemoryQuotaStore::with_user(user.clone(), 2));
    let converter = Arc::new(ConversionClient::new(server.base_url()).expect("client"));
    let workflow = ExportWorkflow::new(quota.clone(), converter);

    let receipt = workflow
        .convert(&user, Framework::React, "<p>x</p>")
        .await
        .expect("convert");
    assert_eq!(receipt.usage_left, 1);
    assert_eq!(receipt.source.code, "export default function App() {}");
    assert_eq!(receipt.source.file_name(), "exported_react.txt");
    assert_eq!(quota.usage_left(&user).await.expect("read"), Some(1));

    server.shutdown().await;
}

#[tokio::test]
async fn test_workflow_keeps_quota_on_upstream_failure() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstream)
        .await;
    let server = TestServer::start_with(MemoryLinkStore::new(), Some(upstream.uri())).await;

    let user = UserId::new("designer");
    let quota = Arc::new(MemoryQuotaStore::with_user(user.clone(), 2));
    let converter = Arc::new(ConversionClient::new(server.base_url()).expect("client"));
    let workflow = ExportWorkflow::new(quota.clone(), converter);

    let err = workflow
        .convert(&user, Framework::Flutter, "<p>x</p>")
        .await
        .unwrap_err();
    assert!(matches!(err, PreviewError::ConversionFailed));
    assert_eq!(quota.usage_left(&user).await.expect("read"), Some(2));

    server.shutdown().await;
}

#[tokio::test]
async fn test_workflow_with_no_quota_never_reaches_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;
    let server = TestServer::start_with(MemoryLinkStore::new(), Some(upstream.uri())).await;

    let user = UserId::new("free-tier");
    let quota = Arc::new(MemoryQuotaStore::with_user(user.clone(), 0));
    let converter = Arc::new(ConversionClient::new(server.base_url()).expect("client"));
    let workflow = ExportWorkflow::new(quota, converter);

    let err = workflow
        .convert(&user, Framework::Vue, "<p>x</p>")
        .await
        .unwrap_err();
    assert_eq!(
        err.user_message(),
        "Usage limit reached. Please upgrade your plan."
    );

    server.shutdown().await;
}

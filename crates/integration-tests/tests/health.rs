//! Health, stats, fallback and response header tests.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use nellore_market_integration_tests::TestApp;

#[tokio::test]
async fn test_health_reports_ok() {
    let app = TestApp::new().await;

    let response = app.get("/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["name"], "Nellore Market API");
    assert!(response.body["timestamp"].is_string());
}

#[tokio::test]
async fn test_readiness_checks_database() {
    let app = TestApp::new().await;

    let response = app.get("/health/ready", None).await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_stats_count_marketplace_rows() {
    let app = TestApp::new().await;

    let empty = app.get("/api/stats", None).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body["businesses"], 0);
    assert_eq!(empty.body["services"], 0);

    let vendor = app
        .register_vendor("Ravi", "ravi@example.com", "9876543211")
        .await;
    let category = app.service_category("Home Services", "home-services").await;
    app.create_service(&vendor, category, "Electrician", 199)
        .await;

    let stats = app.get("/api/stats", None).await;
    assert_eq!(stats.body["businesses"], 1);
    assert_eq!(stats.body["services"], 1);
    assert_eq!(stats.body["products"], 0);
    assert_eq!(stats.body["orders"], 0);
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let app = TestApp::new().await;

    let response = app.get("/api/does-not-exist", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({ "error": "Route not found" }));
}

#[tokio::test]
async fn test_security_and_request_id_headers() {
    let app = TestApp::new().await;

    let response = app.get("/api/health", None).await;

    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "DENY");
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new().await;

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

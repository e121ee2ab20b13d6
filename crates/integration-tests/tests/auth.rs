//! Registration, login, profile and bearer-token guard tests.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use nellore_market_integration_tests::TestApp;

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new().await;

    let register = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "name": "Priya Sharma",
                "email": "Priya@Example.com",
                "phone": "9876543212",
                "password": "secret123",
            }),
        )
        .await;
    assert_eq!(register.status, StatusCode::CREATED);
    assert_eq!(register.body["user"]["email"], "priya@example.com");
    assert_eq!(register.body["user"]["role"], "customer");
    assert!(register.body["user"].get("password_hash").is_none());

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "priya@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.body["token"].as_str().unwrap();

    let me = app.get("/api/auth/me", Some(token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["name"], "Priya Sharma");
    assert!(me.body["business"].is_null());
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = TestApp::new().await;
    app.register("Priya", "priya@example.com", None).await;

    let duplicate = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "Other", "email": "PRIYA@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);

    let bad_email = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "Other", "email": "not-an-email", "password": "secret123" }),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_email.body["error"], "Valid email required");

    let short_password = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "Other", "email": "other@example.com", "password": "abc" }),
        )
        .await;
    assert_eq!(short_password.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        short_password.body["error"],
        "Password must be at least 6 characters"
    );
}

#[tokio::test]
async fn test_register_cannot_self_assign_admin() {
    let app = TestApp::new().await;

    let vendor = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "V", "email": "v@example.com", "password": "secret123", "role": "vendor" }),
        )
        .await;
    assert_eq!(vendor.body["user"]["role"], "vendor");

    let admin = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "A", "email": "a@example.com", "password": "secret123", "role": "admin" }),
        )
        .await;
    assert_eq!(admin.body["user"]["role"], "customer");
}

#[tokio::test]
async fn test_login_failures() {
    let app = TestApp::new().await;
    app.register("Priya", "priya@example.com", None).await;

    let wrong = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "priya@example.com", "password": "wrong-pass" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["error"], "Invalid email or password");

    let unknown = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "nobody@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.body["error"], "Invalid email or password");

    let blank = app
        .post("/api/auth/login", None, json!({ "email": " " }))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.body["error"], "Email and password are required");
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let app = TestApp::new().await;

    let missing = app.get("/api/auth/me", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["error"], "Access denied. No token provided.");

    let forged = app.get("/api/auth/me", Some("not.a.token")).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    assert_eq!(forged.body["error"], "Invalid or expired token.");

    let cart = app.get("/api/orders/cart", None).await;
    assert_eq!(cart.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vendor_routes_reject_customers() {
    let app = TestApp::new().await;
    let customer = app.register("Priya", "priya@example.com", None).await;

    let response = app
        .post(
            "/api/services",
            Some(&customer),
            json!({ "category_id": 1, "name": "Electrician", "price": 199 }),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.body["error"],
        "Access denied. Vendor privileges required."
    );
}

#[tokio::test]
async fn test_profile_update_and_password_change() {
    let app = TestApp::new().await;
    let token = app.register("Priya", "priya@example.com", None).await;

    let updated = app
        .put(
            "/api/auth/me",
            Some(&token),
            json!({ "address": "Magunta Layout", "phone": "9876543212" }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["user"]["address"], "Magunta Layout");
    assert_eq!(updated.body["user"]["name"], "Priya");

    let wrong = app
        .put(
            "/api/auth/password",
            Some(&token),
            json!({ "currentPassword": "nope-nope", "newPassword": "newsecret1" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["error"], "Current password is incorrect");

    let changed = app
        .put(
            "/api/auth/password",
            Some(&token),
            json!({ "currentPassword": "secret123", "newPassword": "newsecret1" }),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);

    let old = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "priya@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);

    let new = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "priya@example.com", "password": "newsecret1" }),
        )
        .await;
    assert_eq!(new.status, StatusCode::OK);
}

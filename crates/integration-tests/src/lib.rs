//! Integration tests for Nellore Market.
//!
//! Each test builds the full API router over a private in-memory SQLite
//! database and drives it in-process with `tower::ServiceExt::oneshot`, so
//! no server or external database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p nellore-market-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `health` - Health, stats, fallback and response headers
//! - `auth` - Registration, login, profile and bearer-token guards
//! - `marketplace` - Vendor onboarding, catalog, cart, checkout and order lifecycle
//! - `research` - Reviews, search scoring, comparisons and analytics

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower::ServiceExt;

use nellore_market_api::build_router;
use nellore_market_api::config::{ApiConfig, RateLimitConfig};
use nellore_market_api::db::create_memory_pool;
use nellore_market_api::state::AppState;

const TEST_TOKEN_SECRET: &str = "integration-test-secret-7f3a9c1e5b2d8046a1c9e3f7b5d20486";

/// A response reduced to what the tests assert on.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// The application router over a fresh database.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = create_memory_pool().await.unwrap();
        let config = ApiConfig {
            database_url: SecretString::from("sqlite::memory:"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            token_secret: SecretString::from(TEST_TOKEN_SECRET),
            token_ttl: Duration::from_secs(3600),
            rate_limit: RateLimitConfig::default(),
            cors_origin: None,
            static_dir: None,
            sentry_dsn: None,
            sentry_environment: None,
        };
        let state = AppState::new(config, pool.clone()).unwrap();
        Self {
            router: build_router(state, false),
            pool,
        }
    }

    /// Send a request, optionally authenticated and with a JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    /// Register an account and return its bearer token.
    pub async fn register(&self, name: &str, email: &str, role: Option<&str>) -> String {
        let response = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "name": name,
                    "email": email,
                    "password": "secret123",
                    "role": role,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["token"].as_str().unwrap().to_owned()
    }

    /// Register a customer and turn them into a vendor with a business.
    pub async fn register_vendor(&self, name: &str, email: &str, phone: &str) -> String {
        let token = self.register(name, email, None).await;
        let response = self
            .post(
                "/api/businesses/register",
                Some(&token),
                json!({
                    "business_name": format!("{name} Services"),
                    "business_type": "both",
                    "address": "12 Trunk Road",
                    "area": "Stonehousepet",
                    "pincode": "524002",
                    "phone": phone,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        token
    }

    /// Insert a category directly; the API has no endpoint for it.
    pub async fn category(&self, table: &str, name: &str, slug: &str) -> i64 {
        sqlx::query_scalar(&format!(
            "INSERT INTO {table} (name, slug) VALUES (?, ?) RETURNING id"
        ))
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }

    pub async fn service_category(&self, name: &str, slug: &str) -> i64 {
        self.category("service_categories", name, slug).await
    }

    pub async fn product_category(&self, name: &str, slug: &str) -> i64 {
        self.category("product_categories", name, slug).await
    }

    /// Create a service as `vendor` and return its id.
    pub async fn create_service(
        &self,
        vendor: &str,
        category_id: i64,
        name: &str,
        price: i64,
    ) -> i64 {
        let response = self
            .post(
                "/api/services",
                Some(vendor),
                json!({
                    "category_id": category_id,
                    "name": name,
                    "description": format!("{name} at your doorstep"),
                    "price": price,
                    "duration_mins": 60,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["service"]["id"].as_i64().unwrap()
    }

    /// Create a product as `vendor` and return its id.
    pub async fn create_product(
        &self,
        vendor: &str,
        category_id: i64,
        name: &str,
        price: i64,
        stock: i64,
    ) -> i64 {
        let response = self
            .post(
                "/api/products",
                Some(vendor),
                json!({
                    "category_id": category_id,
                    "name": name,
                    "price": price,
                    "stock": stock,
                    "unit": "pack",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["product"]["id"].as_i64().unwrap()
    }
}

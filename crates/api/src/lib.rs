//! Nellore Market API library.
//!
//! The JSON REST API for the local-services marketplace, exposed as a library
//! so the binary, the CLI and the integration tests share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn,
    routing::get,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Build the full application router.
///
/// `with_rate_limit` turns the per-IP limiter on `/api` on or off. Requests
/// driven through `tower::ServiceExt::oneshot` carry no peer address, so
/// in-process tests build the router without it.
pub fn build_router(state: AppState, with_rate_limit: bool) -> Router {
    let mut api = routes::api_routes();
    if with_rate_limit {
        api = api.layer(middleware::api_rate_limiter(state.config().rate_limit));
    }

    let mut app = Router::new()
        .route("/health/ready", get(routes::health::readiness))
        .nest("/api", api)
        .fallback(not_found);

    if let Some(dir) = &state.config().static_dir {
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    let cors = cors_layer(state.config());

    app.with_state(state)
        .layer(cors)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origin = match config
        .cors_origin
        .as_deref()
        .and_then(|o| HeaderValue::from_str(o).ok())
    {
        Some(origin) => AllowOrigin::exact(origin),
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

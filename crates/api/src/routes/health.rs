//! Health and headline stats.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use serde_json::{Value, json};

use crate::db::StatsRepository;
use crate::db::stats::MarketStats;
use crate::error::Result;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
}

/// Liveness health check. Does not check dependencies.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "name": "Nellore Market API",
    }))
}

/// Readiness health check.
///
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match StatsRepository::new(state.pool()).ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn stats(State(state): State<AppState>) -> Result<Json<MarketStats>> {
    let stats = StatsRepository::new(state.pool()).totals().await?;
    Ok(Json(stats))
}

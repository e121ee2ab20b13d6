//! Business directory and vendor profile routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use nellore_market_core::{BusinessId, BusinessType, ReviewType};

use crate::db::businesses::{BusinessFilter, BusinessUpdate};
use crate::error::Result;
use crate::extract::{JsonBody, Path, Query};
use crate::middleware::{RequireAuth, RequireVendor};
use crate::models::BusinessDetail;
use crate::routes::Page;
use crate::routes::services::{ReviewRequest, submit_review};
use crate::services::{BusinessDraft, BusinessService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).put(update))
        .route("/register", post(register))
        .route("/my/stats", get(stats))
        .route("/{id}", get(detail))
        .route("/{id}/review", post(review))
}

#[derive(Debug, Deserialize)]
pub struct BusinessListQuery {
    #[serde(rename = "type")]
    pub business_type: Option<BusinessType>,
    pub area: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<BusinessListQuery>,
) -> Result<Json<Value>> {
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    let filter = BusinessFilter {
        business_type: query.business_type,
        area: query.area,
        search: query.search,
        limit: page.limit(),
        offset: page.offset(),
    };
    let businesses = BusinessService::new(state.pool()).list(&filter).await?;
    Ok(Json(json!({ "businesses": businesses })))
}

async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BusinessDetail>> {
    let detail = BusinessService::new(state.pool())
        .detail(BusinessId::new(id))
        .await?;
    Ok(Json(detail))
}

async fn register(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(draft): JsonBody<BusinessDraft>,
) -> Result<impl IntoResponse> {
    let business = BusinessService::new(state.pool())
        .register(&user, draft)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Business registered successfully. Verification pending.",
            "business": business,
        })),
    ))
}

async fn update(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    JsonBody(update): JsonBody<BusinessUpdate>,
) -> Result<Json<Value>> {
    let business = BusinessService::new(state.pool())
        .update(&vendor, update)
        .await?;
    Ok(Json(json!({ "message": "Business updated", "business": business })))
}

async fn stats(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
) -> Result<Json<Value>> {
    let (business, stats) = BusinessService::new(state.pool()).stats(&vendor).await?;
    Ok(Json(json!({ "business": business, "stats": stats })))
}

async fn review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<ReviewRequest>,
) -> Result<Json<Value>> {
    submit_review(&state, &user, ReviewType::Business, id, body).await
}

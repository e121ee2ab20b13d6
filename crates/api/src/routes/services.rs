//! Bookable service catalog routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use nellore_market_core::{ItemType, ReviewType, ServiceId};

use crate::db::catalog::{CatalogFilter, ServiceUpdate, SortOrder};
use crate::error::Result;
use crate::extract::{JsonBody, Path, Query};
use crate::middleware::{RequireAuth, RequireVendor};
use crate::models::{ServiceDetail, User};
use crate::routes::Page;
use crate::services::{CatalogService, ReviewService, ServiceDraft};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories))
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).put(update))
        .route("/{id}/review", post(review))
}

#[derive(Debug, Deserialize)]
pub struct ServiceListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Rating submitted against a service, product or business.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

/// Persist a review and wrap it in the shared response envelope.
pub(crate) async fn submit_review(
    state: &AppState,
    user: &User,
    review_type: ReviewType,
    id: i64,
    body: ReviewRequest,
) -> Result<Json<Value>> {
    let review = ReviewService::new(state.pool())
        .submit(
            user.id,
            review_type,
            id,
            body.rating.unwrap_or(0),
            body.comment.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "message": "Review submitted", "review": review })))
}

async fn categories(State(state): State<AppState>) -> Result<Json<Value>> {
    let categories = CatalogService::new(state.pool(), state.categories())
        .categories(ItemType::Service)
        .await?;
    Ok(Json(json!({ "categories": &*categories })))
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ServiceListQuery>,
) -> Result<Json<Value>> {
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    let filter = CatalogFilter {
        category: query.category,
        search: query.search,
        sort: query.sort,
        limit: page.limit(),
        offset: page.offset(),
        ..CatalogFilter::default()
    };
    let (services, total) = CatalogService::new(state.pool(), state.categories())
        .list_services(&filter)
        .await?;

    Ok(Json(json!({
        "services": services,
        "total": total,
        "limit": filter.limit,
        "offset": filter.offset,
    })))
}

async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ServiceDetail>> {
    let detail = CatalogService::new(state.pool(), state.categories())
        .service_detail(ServiceId::new(id))
        .await?;
    Ok(Json(detail))
}

async fn create(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    JsonBody(draft): JsonBody<ServiceDraft>,
) -> Result<impl IntoResponse> {
    let service = CatalogService::new(state.pool(), state.categories())
        .create_service(&vendor, draft)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Service created", "service": service })),
    ))
}

async fn update(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path(id): Path<i64>,
    JsonBody(update): JsonBody<ServiceUpdate>,
) -> Result<Json<Value>> {
    let service = CatalogService::new(state.pool(), state.categories())
        .update_service(&vendor, ServiceId::new(id), update)
        .await?;
    Ok(Json(json!({ "message": "Service updated", "service": service })))
}

async fn review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<ReviewRequest>,
) -> Result<Json<Value>> {
    submit_review(&state, &user, ReviewType::Service, id, body).await
}

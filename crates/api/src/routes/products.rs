//! Stocked product catalog routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use nellore_market_core::{ItemType, Money, ProductId, ReviewType};

use crate::db::catalog::{CatalogFilter, ProductUpdate, SortOrder};
use crate::error::Result;
use crate::extract::{JsonBody, Path, Query};
use crate::middleware::{RequireAuth, RequireVendor};
use crate::models::ProductDetail;
use crate::routes::Page;
use crate::routes::services::{ReviewRequest, submit_review};
use crate::services::{CatalogService, ProductDraft};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories))
        .route("/featured", get(featured))
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).put(update))
        .route("/{id}/review", post(review))
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub featured: bool,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    #[serde(default)]
    pub sort: SortOrder,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn categories(State(state): State<AppState>) -> Result<Json<Value>> {
    let categories = CatalogService::new(state.pool(), state.categories())
        .categories(ItemType::Product)
        .await?;
    Ok(Json(json!({ "categories": &*categories })))
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Value>> {
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    let filter = CatalogFilter {
        category: query.category,
        search: query.search,
        featured: query.featured,
        min_price: query.min_price,
        max_price: query.max_price,
        sort: query.sort,
        limit: page.limit(),
        offset: page.offset(),
    };
    let (products, total) = CatalogService::new(state.pool(), state.categories())
        .list_products(&filter)
        .await?;

    Ok(Json(json!({
        "products": products,
        "total": total,
        "limit": filter.limit,
        "offset": filter.offset,
    })))
}

async fn featured(State(state): State<AppState>) -> Result<Json<Value>> {
    let products = CatalogService::new(state.pool(), state.categories())
        .featured_products()
        .await?;
    Ok(Json(json!({ "products": products })))
}

async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductDetail>> {
    let detail = CatalogService::new(state.pool(), state.categories())
        .product_detail(ProductId::new(id))
        .await?;
    Ok(Json(detail))
}

async fn create(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    JsonBody(draft): JsonBody<ProductDraft>,
) -> Result<impl IntoResponse> {
    let product = CatalogService::new(state.pool(), state.categories())
        .create_product(&vendor, draft)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Product created", "product": product })),
    ))
}

async fn update(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path(id): Path<i64>,
    JsonBody(update): JsonBody<ProductUpdate>,
) -> Result<Json<Value>> {
    let product = CatalogService::new(state.pool(), state.categories())
        .update_product(&vendor, ProductId::new(id), update)
        .await?;
    Ok(Json(json!({ "message": "Product updated", "product": product })))
}

async fn review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<ReviewRequest>,
) -> Result<Json<Value>> {
    submit_review(&state, &user, ReviewType::Product, id, body).await
}

//! Research routes: scored search, comparisons, recommendations, analytics.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::extract::{JsonBody, Path, Query};
use crate::middleware::RequireAuth;
use crate::services::ResearchService;
use crate::services::research::{
    ItemAnalytics, ProductComparison, ProductQuery, ProductResearch, RecommendationScope,
    Recommendations, ServiceComparison, ServiceQuery, ServiceResearch,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", post(research_services))
        .route("/products", post(research_products))
        .route("/compare/services", post(compare_services))
        .route("/compare/products", post(compare_products))
        .route("/recommendations", get(recommendations))
        .route("/analytics/{kind}/{id}", get(analytics))
}

/// Ids arrive untyped so shape errors get the comparison's own messages.
#[derive(Debug, Deserialize)]
pub struct CompareServicesRequest {
    pub service_ids: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CompareProductsRequest {
    pub product_ids: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationsQuery {
    #[serde(default, rename = "type")]
    pub scope: RecommendationScope,
}

async fn research_services(
    State(state): State<AppState>,
    JsonBody(query): JsonBody<ServiceQuery>,
) -> Result<Json<ServiceResearch>> {
    let research = ResearchService::new(state.pool())
        .research_services(query)
        .await?;
    Ok(Json(research))
}

async fn research_products(
    State(state): State<AppState>,
    JsonBody(query): JsonBody<ProductQuery>,
) -> Result<Json<ProductResearch>> {
    let research = ResearchService::new(state.pool())
        .research_products(query)
        .await?;
    Ok(Json(research))
}

async fn compare_services(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CompareServicesRequest>,
) -> Result<Json<ServiceComparison>> {
    let comparison = ResearchService::new(state.pool())
        .compare_services(body.service_ids.as_ref())
        .await?;
    Ok(Json(comparison))
}

async fn compare_products(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CompareProductsRequest>,
) -> Result<Json<ProductComparison>> {
    let comparison = ResearchService::new(state.pool())
        .compare_products(body.product_ids.as_ref())
        .await?;
    Ok(Json(comparison))
}

async fn recommendations(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<RecommendationsQuery>,
) -> Result<Json<Recommendations>> {
    let recommendations = ResearchService::new(state.pool())
        .recommendations(user.id, query.scope)
        .await?;
    Ok(Json(recommendations))
}

async fn analytics(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<Json<ItemAnalytics>> {
    let analytics = ResearchService::new(state.pool())
        .analytics(&kind, id)
        .await?;
    Ok(Json(analytics))
}

//! Cart and order routes. Every route here requires a bearer token.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

use nellore_market_core::{CartItemId, ItemType, OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::extract::{JsonBody, Path, Query};
use crate::middleware::{RequireAuth, RequireVendor};
use crate::models::{Cart, ItemRef};
use crate::routes::Page;
use crate::services::{CartService, CheckoutService, OrderRequest, OrderService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart).post(add_to_cart).delete(clear_cart))
        .route("/cart/{id}", put(update_cart_line).delete(remove_cart_line))
        .route("/", get(list).post(place_order))
        .route("/vendor/all", get(vendor_orders))
        .route("/{id}", get(detail))
        .route("/{id}/status", put(set_status))
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub item_type: Option<String>,
    pub item_id: Option<i64>,
    #[serde(default = "one")]
    pub quantity: i64,
}

const fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OrderListQuery {
    const fn page(&self) -> Page {
        Page {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

// =============================================================================
// Cart
// =============================================================================

async fn cart(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<Cart>> {
    let cart = CartService::new(state.pool()).get(user.id).await?;
    Ok(Json(cart))
}

async fn add_to_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(body): JsonBody<AddToCartRequest>,
) -> Result<Json<Value>> {
    let (Some(item_type), Some(item_id)) = (body.item_type.as_deref(), body.item_id) else {
        return Err(AppError::BadRequest(
            "Item type and ID are required".to_string(),
        ));
    };
    let item_type: ItemType = item_type
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid item type".to_string()))?;

    let cart_item_id = CartService::new(state.pool())
        .add(user.id, ItemRef::new(item_type, item_id), body.quantity)
        .await?;
    Ok(Json(json!({
        "message": "Item added to cart",
        "cart_item_id": cart_item_id,
    })))
}

async fn update_cart_line(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<QuantityRequest>,
) -> Result<Json<Value>> {
    CartService::new(state.pool())
        .update_quantity(user.id, CartItemId::new(id), body.quantity.unwrap_or(0))
        .await?;
    Ok(Json(json!({ "message": "Cart updated" })))
}

async fn remove_cart_line(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    CartService::new(state.pool())
        .remove(user.id, CartItemId::new(id))
        .await?;
    Ok(Json(json!({ "message": "Item removed from cart" })))
}

async fn clear_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>> {
    CartService::new(state.pool()).clear(user.id).await?;
    Ok(Json(json!({ "message": "Cart cleared" })))
}

// =============================================================================
// Orders
// =============================================================================

async fn place_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(request): JsonBody<OrderRequest>,
) -> Result<impl IntoResponse> {
    let order = CheckoutService::new(state.pool())
        .place_order(user.id, &request)
        .await?;
    let order_number = order.order_number.clone();
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Order placed successfully",
            "order": order,
            "order_number": order_number,
        })),
    ))
}

async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Value>> {
    let page = query.page();
    let orders = OrderService::new(state.pool())
        .list_for_customer(user.id, query.status, page.limit(), page.offset())
        .await?;
    Ok(Json(json!({ "orders": orders })))
}

async fn detail(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let order = OrderService::new(state.pool())
        .get(OrderId::new(id), user.id)
        .await?;
    Ok(Json(json!({ "order": order })))
}

async fn set_status(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<StatusRequest>,
) -> Result<Json<Value>> {
    let status = OrderService::new(state.pool())
        .set_status(OrderId::new(id), body.status.trim(), &vendor)
        .await?;
    Ok(Json(json!({ "message": "Order status updated", "status": status })))
}

async fn vendor_orders(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Value>> {
    let page = query.page();
    let orders = OrderService::new(state.pool())
        .list_for_vendor(vendor.id, query.status, page.limit(), page.offset())
        .await?;
    Ok(Json(json!({ "orders": orders })))
}

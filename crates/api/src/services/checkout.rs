//! Checkout: turns an item list into an order.
//!
//! Prices are read from the live catalog inside the same transaction that
//! inserts the order, decrements stock and clears the cart, so a failed line
//! leaves nothing behind.

use rand::Rng;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::instrument;

use nellore_market_core::{ItemType, Money, UserId};

use crate::db::orders::{NewOrder, NewOrderItem};
use crate::db::{CartRepository, CatalogRepository, OrderRepository, RepositoryError};
use crate::models::{ItemRef, Order};
use crate::services::ServiceError;
use crate::services::validation::{check_quantity, non_blank};

/// Flat delivery charge for small product orders (₹39).
pub const DELIVERY_FEE: Money = Money::from_paise(3_900);

/// Product orders at or above this subtotal ship free (₹500).
pub const FREE_DELIVERY_THRESHOLD: Money = Money::from_paise(50_000);

const ORDER_NUMBER_PREFIX: &str = "NLR";
const ORDER_NUMBER_SUFFIX_LEN: usize = 4;
const ORDER_NUMBER_ATTEMPTS: u32 = 5;
const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// One requested line.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLine {
    pub item_type: ItemType,
    pub item_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

const fn default_quantity() -> i64 {
    1
}

/// Checkout input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderRequest {
    pub order_type: Option<ItemType>,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    pub delivery_address: Option<String>,
    pub delivery_area: Option<String>,
    pub delivery_pincode: Option<String>,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Delivery fee for an order of `order_type` with the given subtotal.
#[must_use]
pub fn delivery_fee(order_type: ItemType, subtotal: Money) -> Money {
    if order_type == ItemType::Product && subtotal < FREE_DELIVERY_THRESHOLD {
        DELIVERY_FEE
    } else {
        Money::ZERO
    }
}

/// Uppercase base-36 rendering of `n`.
#[must_use]
pub fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        let idx = usize::try_from(n % 36).unwrap_or(0);
        digits.extend(BASE36.get(idx).copied().map(char::from));
        n /= 36;
    }
    digits.iter().rev().collect()
}

/// `NLR` + base-36 milliseconds + four random base-36 characters.
#[must_use]
pub fn order_number<R: Rng>(now_millis: u64, rng: &mut R) -> String {
    let mut number = format!("{ORDER_NUMBER_PREFIX}{}", to_base36(now_millis));
    for _ in 0..ORDER_NUMBER_SUFFIX_LEN {
        let idx = rng.random_range(0..BASE36.len());
        number.extend(BASE36.get(idx).copied().map(char::from));
    }
    number
}

fn fresh_order_number() -> String {
    let millis = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    order_number(millis, &mut rand::rng())
}

/// A priced line ready to insert.
struct PricedLine {
    item: NewOrderItem,
    vendor_id: Option<UserId>,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Place an order for `user_id`.
    ///
    /// Every line must come from one vendor. On success the stock of each
    /// product line has been taken and the user's cart is empty.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for missing fields, a bad quantity
    /// or a mixed-vendor item list.
    /// Returns `ServiceError::NotFound` if an item is missing or inactive.
    /// Returns `ServiceError::InsufficientStock` if a product is short.
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: &OrderRequest,
    ) -> Result<Order, ServiceError> {
        let Some(order_type) = request.order_type.filter(|_| !request.items.is_empty()) else {
            return Err(ServiceError::validation("Order type and items are required"));
        };
        for line in &request.items {
            check_quantity(line.quantity)?;
        }
        let address = non_blank(request.delivery_address.as_deref())
            .ok_or_else(|| ServiceError::validation("Delivery address is required"))?;

        let mut attempt = 1;
        loop {
            let number = fresh_order_number();
            match self
                .try_place(user_id, order_type, request, &address, &number)
                .await
            {
                Err(ServiceError::Repository(RepositoryError::Conflict(_)))
                    if attempt < ORDER_NUMBER_ATTEMPTS =>
                {
                    tracing::warn!(attempt, order_number = %number, "order number collision, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn try_place(
        &self,
        user_id: UserId,
        order_type: ItemType,
        request: &OrderRequest,
        address: &str,
        order_number: &str,
    ) -> Result<Order, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let mut lines: Vec<PricedLine> = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let item = ItemRef::new(line.item_type, line.item_id);
            let live = CatalogRepository::find_active_item(&mut *tx, item)
                .await?
                .ok_or_else(|| ServiceError::not_found(line_missing(item)))?;
            if live.stock.is_some_and(|stock| stock < line.quantity) {
                return Err(ServiceError::InsufficientStock(format!(
                    "Insufficient stock for {}",
                    live.name
                )));
            }
            let total = live
                .price
                .checked_times(line.quantity)
                .ok_or_else(order_too_large)?;

            lines.push(PricedLine {
                vendor_id: live.vendor_id,
                item: NewOrderItem {
                    item,
                    name: live.name,
                    quantity: line.quantity,
                    price: live.price,
                    total,
                },
            });
        }

        let vendor_id = lines.first().and_then(|line| line.vendor_id);
        if lines.iter().any(|line| line.vendor_id != vendor_id) {
            return Err(ServiceError::validation(
                "All items in an order must come from the same vendor",
            ));
        }

        let subtotal = Money::checked_sum(lines.iter().map(|line| line.item.total))
            .ok_or_else(order_too_large)?;
        let fee = delivery_fee(order_type, subtotal);
        let total = subtotal.checked_add(fee).ok_or_else(order_too_large)?;

        let order = OrderRepository::insert(
            &mut tx,
            &NewOrder {
                order_number,
                user_id,
                vendor_id,
                order_type,
                subtotal,
                delivery_fee: fee,
                total,
                payment_method: request
                    .payment_method
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or("cod"),
                delivery_address: address,
                delivery_area: request.delivery_area.as_deref(),
                delivery_pincode: request.delivery_pincode.as_deref(),
                scheduled_date: request.scheduled_date.as_deref(),
                scheduled_time: request.scheduled_time.as_deref(),
                notes: request.notes.as_deref(),
            },
        )
        .await?;

        for line in &lines {
            OrderRepository::insert_item(&mut tx, order.id, &line.item).await?;
            if let ItemRef::Product(product_id) = line.item.item
                && !CatalogRepository::take_stock(&mut tx, product_id, line.item.quantity).await?
            {
                return Err(ServiceError::InsufficientStock(format!(
                    "Insufficient stock for {}",
                    line.item.name
                )));
            }
        }

        CartRepository::clear(&mut *tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "order placed"
        );
        Ok(order)
    }
}

fn order_too_large() -> ServiceError {
    ServiceError::validation("Order total is too large")
}

fn line_missing(item: ItemRef) -> String {
    match item {
        ItemRef::Service(id) => format!("Service {id} not found"),
        ItemRef::Product(id) => format!("Product {id} not found"),
    }
}

//! Order domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use nellore_market_core::{ItemType, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub vendor_id: Option<UserId>,
    pub order_type: ItemType,
    pub status: OrderStatus,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub discount: Money,
    pub total: Money,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub delivery_address: Option<String>,
    pub delivery_area: Option<String>,
    pub delivery_city: String,
    pub delivery_pincode: Option<String>,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line captured at checkout. Name and unit price are snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub item_type: ItemType,
    pub item_id: i64,
    pub item_name: String,
    pub quantity: i64,
    pub price: Money,
    pub total: Money,
}

/// An order with its lines and the counterpart's contact details: the
/// vendor business for buyers, the customer for vendors.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
}

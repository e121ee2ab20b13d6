//! Read-side types used by the research engine.

use serde::Serialize;

use nellore_market_core::{ItemType, Money};

/// How often a user has bought one catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseCount {
    pub item_type: ItemType,
    pub item_id: i64,
    pub purchase_count: i64,
}

/// Compact view of a same-category competitor.
#[derive(Debug, Clone, Serialize)]
pub struct SiblingItem {
    pub id: i64,
    pub name: String,
    pub price: Money,
    pub rating: f64,
    pub review_count: i64,
}

//! Cart domain types.

use serde::Serialize;

use nellore_market_core::{CartItemId, ItemType, Money};

/// One cart row joined with live catalog data.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub item_type: ItemType,
    pub item_id: i64,
    pub quantity: i64,
    pub name: String,
    pub price: Money,
    pub image: Option<String>,
    /// `None` for services.
    pub stock: Option<i64>,
    pub line_total: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub items: Vec<CartLine>,
    pub total: Money,
    pub count: usize,
}

impl Cart {
    /// Builds a cart, totalling live price times quantity over every line.
    #[must_use]
    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let total = items.iter().map(|line| line.line_total).sum();
        Self {
            count: items.len(),
            items,
            total,
        }
    }
}

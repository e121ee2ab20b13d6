//! Catalog domain types: categories, services and products.

use chrono::{DateTime, Utc};
use serde::Serialize;

use nellore_market_core::{CategoryId, ItemType, Money, ProductId, ServiceId, UserId};

use super::review::ReviewView;

/// A service or product category with its count of active items.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub item_count: i64,
}

/// A bookable service.
#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub id: ServiceId,
    pub category_id: CategoryId,
    pub vendor_id: Option<UserId>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Money,
    pub price_unit: String,
    pub duration_mins: Option<i64>,
    pub rating: f64,
    pub review_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A service joined with its category and vendor business.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceListing {
    #[serde(flatten)]
    pub service: Service,
    pub category_name: String,
    pub category_slug: String,
    pub business_name: Option<String>,
    pub business_phone: Option<String>,
    pub business_area: Option<String>,
    pub vendor_verified: bool,
    pub vendor_rating: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceDetail {
    pub service: ServiceListing,
    pub reviews: Vec<ReviewView>,
    pub related: Vec<ServiceListing>,
}

/// A stocked product.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub vendor_id: Option<UserId>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Money,
    pub mrp: Option<Money>,
    pub stock: i64,
    pub unit: String,
    pub image: Option<String>,
    pub rating: f64,
    pub review_count: i64,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Percentage below MRP, rounded to two places; zero without a usable MRP.
    #[must_use]
    pub fn discount_percent(&self) -> f64 {
        discount_percent(self.price, self.mrp)
    }
}

/// `(mrp - price) / mrp * 100` rounded to two decimals, or 0 when `mrp` is
/// missing or zero.
#[must_use]
pub fn discount_percent(price: Money, mrp: Option<Money>) -> f64 {
    match mrp {
        Some(mrp) if mrp.is_positive() => {
            let raw = (mrp.as_f64() - price.as_f64()) / mrp.as_f64() * 100.0;
            (raw * 100.0).round() / 100.0
        }
        _ => 0.0,
    }
}

/// A product joined with its category and vendor business.
#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: String,
    pub category_slug: String,
    pub business_name: Option<String>,
    pub business_phone: Option<String>,
    pub business_area: Option<String>,
    pub vendor_verified: bool,
    pub discount_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub product: ProductListing,
    pub reviews: Vec<ReviewView>,
    pub related: Vec<ProductListing>,
}

/// Reference to one catalog entry of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Service(ServiceId),
    Product(ProductId),
}

impl ItemRef {
    #[must_use]
    pub fn new(item_type: ItemType, id: i64) -> Self {
        match item_type {
            ItemType::Service => Self::Service(ServiceId::new(id)),
            ItemType::Product => Self::Product(ProductId::new(id)),
        }
    }

    #[must_use]
    pub const fn item_type(self) -> ItemType {
        match self {
            Self::Service(_) => ItemType::Service,
            Self::Product(_) => ItemType::Product,
        }
    }

    #[must_use]
    pub const fn raw_id(self) -> i64 {
        match self {
            Self::Service(id) => id.as_i64(),
            Self::Product(id) => id.as_i64(),
        }
    }
}

/// Live pricing view of an active catalog entry, as used by cart and checkout.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub item: ItemRef,
    pub name: String,
    pub price: Money,
    pub vendor_id: Option<UserId>,
    /// `None` for services, which are not stock-tracked.
    pub stock: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_percent() {
        let price = Money::from_rupees(90);
        assert!((discount_percent(price, Some(Money::from_rupees(120))) - 25.0).abs() < 1e-9);
        assert!((discount_percent(price, Some(Money::from_rupees(110))) - 18.18).abs() < 1e-9);
        assert!(discount_percent(price, None).abs() < f64::EPSILON);
        assert!(discount_percent(price, Some(Money::ZERO)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_item_ref_round_trip() {
        let item = ItemRef::new(ItemType::Product, 7);
        assert_eq!(item, ItemRef::Product(ProductId::new(7)));
        assert_eq!(item.item_type(), ItemType::Product);
        assert_eq!(item.raw_id(), 7);
    }
}

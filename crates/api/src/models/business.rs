//! Business (vendor profile) domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use nellore_market_core::{BusinessId, BusinessType, Money, UserId};

use super::catalog::{ProductListing, ServiceListing};
use super::review::ReviewView;

#[derive(Debug, Clone, Serialize)]
pub struct Business {
    pub id: BusinessId,
    pub user_id: UserId,
    pub business_name: String,
    pub business_type: BusinessType,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub address: Option<String>,
    pub area: Option<String>,
    pub city: String,
    pub pincode: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
    pub gstin: Option<String>,
    pub is_verified: bool,
    pub rating: f64,
    pub review_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Directory entry with the owner's contact name.
#[derive(Debug, Clone, Serialize)]
pub struct BusinessListing {
    #[serde(flatten)]
    pub business: Business,
    pub owner_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BusinessDetail {
    pub business: BusinessListing,
    pub services: Vec<ServiceListing>,
    pub products: Vec<ProductListing>,
    pub reviews: Vec<ReviewView>,
}

/// Dashboard counters for a vendor.
#[derive(Debug, Clone, Serialize, Default)]
pub struct VendorStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub completed_orders: i64,
    /// Sum of totals of completed orders.
    pub total_revenue: Money,
    pub total_services: i64,
    pub total_products: i64,
}

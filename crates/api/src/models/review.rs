//! Review domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use nellore_market_core::{ReviewId, ReviewType, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub review_type: ReviewType,
    pub item_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A review as shown under a service, product or business, with the
/// reviewer's public name.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: ReviewId,
    pub rating: i64,
    pub comment: Option<String>,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

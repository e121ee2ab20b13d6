//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use nellore_market_core::{Email, UserId, UserRole};

/// A marketplace account. The password hash never leaves the repository.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub role: UserRole,
    pub avatar: Option<String>,
    pub address: Option<String>,
    pub city: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

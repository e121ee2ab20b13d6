//! HTTP route handlers for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /api/health                         - Liveness with version
//! GET  /health/ready                       - Readiness (database ping)
//! GET  /api/stats                          - Headline counters
//!
//! # Auth
//! POST /api/auth/register                  - Create account, returns token
//! POST /api/auth/login                     - Exchange credentials for token
//! GET  /api/auth/me                        - Profile (+ business for vendors)
//! PUT  /api/auth/me                        - Update profile
//! PUT  /api/auth/password                  - Change password
//!
//! # Catalog
//! GET  /api/services/categories            - Service categories with counts
//! GET  /api/services                       - Filtered, paged listing
//! GET  /api/services/{id}                  - Detail with reviews and related
//! POST /api/services                       - Create (vendor)
//! PUT  /api/services/{id}                  - Update own listing (vendor)
//! POST /api/services/{id}/review           - Rate a service
//! ... the same under /api/products, plus GET /api/products/featured
//!
//! # Cart & Orders
//! GET|POST|DELETE /api/orders/cart         - View, add to, clear cart
//! PUT|DELETE /api/orders/cart/{id}         - Change quantity, remove line
//! POST /api/orders                         - Place order
//! GET  /api/orders                         - Order history
//! GET  /api/orders/{id}                    - One order (buyer or vendor)
//! PUT  /api/orders/{id}/status             - Advance status (vendor)
//! GET  /api/orders/vendor/all              - Vendor's incoming orders
//!
//! # Businesses
//! GET  /api/businesses                     - Directory
//! GET  /api/businesses/{id}                - Profile with listings
//! POST /api/businesses/register            - Become a vendor
//! PUT  /api/businesses                     - Update own profile (vendor)
//! GET  /api/businesses/my/stats            - Dashboard counters (vendor)
//! POST /api/businesses/{id}/review         - Rate a business
//!
//! # Research
//! POST /api/research/services              - Scored service search
//! POST /api/research/products              - Scored product search
//! POST /api/research/compare/services      - Side-by-side comparison
//! POST /api/research/compare/products
//! GET  /api/research/recommendations       - Trending + purchase history
//! GET  /api/research/analytics/{type}/{id} - Item performance
//! ```

pub mod auth;
pub mod businesses;
pub mod health;
pub mod orders;
pub mod products;
pub mod research;
pub mod services;

use axum::Router;

use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// `limit`/`offset` query parameters shared by every listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    /// Page size, defaulting to 20 and clamped to `1..=100`.
    #[must_use]
    pub fn limit(self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    #[must_use]
    pub fn offset(self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// All `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/auth", auth::router())
        .nest("/services", services::router())
        .nest("/products", products::router())
        .nest("/orders", orders::router())
        .nest("/businesses", businesses::router())
        .nest("/research", research::router())
}

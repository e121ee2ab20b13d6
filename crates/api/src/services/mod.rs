//! Business logic services for the marketplace API.
//!
//! # Services
//!
//! - `auth` - Registration, login, bearer tokens and profile updates
//! - `businesses` - Vendor business profiles and dashboard stats
//! - `cart` - Per-user cart with live pricing
//! - `catalog` - Categories, services and products
//! - `checkout` - Transactional order placement
//! - `orders` - Order history and the status lifecycle
//! - `research` - Search scoring, comparisons, recommendations and analytics
//! - `reviews` - Ratings with aggregate maintenance

pub mod auth;
pub mod businesses;
pub mod cart;
pub mod catalog;
pub mod checkout;
mod error;
pub mod orders;
pub mod research;
pub mod reviews;
pub mod validation;

pub use auth::{AuthError, AuthService, Registration};
pub use businesses::{BusinessDraft, BusinessService};
pub use cart::CartService;
pub use catalog::{CatalogService, CategoryCache, ProductDraft, ServiceDraft};
pub use checkout::{CheckoutService, OrderLine, OrderRequest};
pub use error::ServiceError;
pub use orders::OrderService;
pub use research::ResearchService;
pub use reviews::ReviewService;

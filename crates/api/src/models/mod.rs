//! Domain models returned by repositories and serialized by handlers.
//!
//! These are validated domain objects, separate from the private row types
//! in [`crate::db`].

pub mod business;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod research;
pub mod review;
pub mod user;

pub use business::{Business, BusinessDetail, BusinessListing, VendorStats};
pub use cart::{Cart, CartLine};
pub use catalog::{
    CatalogItem, Category, ItemRef, Product, ProductDetail, ProductListing, Service,
    ServiceDetail, ServiceListing,
};
pub use order::{Order, OrderDetail, OrderItem};
pub use research::{PurchaseCount, SiblingItem};
pub use review::{Review, ReviewView};
pub use user::User;

//! Nellore Market Core - Shared domain types.
//!
//! Used by every marketplace component:
//! - `api` - JSON REST API server
//! - `cli` - Command-line tools for migrations, seeding and accounts
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access. Database encoding is opt-in via the `sqlite` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, money, and role/status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

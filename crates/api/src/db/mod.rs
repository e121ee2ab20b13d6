//! Database operations for the marketplace SQLite store.
//!
//! ## Tables
//!
//! - `users` - Accounts (customers, vendors, admins)
//! - `service_categories`, `services` - Bookable service catalog
//! - `product_categories`, `products` - Stocked product catalog
//! - `businesses` - Vendor profiles (one per user)
//! - `cart` - Per-user cart lines
//! - `orders`, `order_items` - Placed orders with snapshotted lines
//! - `reviews` - Ratings for services, products and businesses
//!
//! # Migrations
//!
//! Migrations live in `crates/api/migrations/` and are embedded in
//! [`MIGRATOR`]. Run them via:
//! ```bash
//! cargo run -p nellore-market-cli -- migrate
//! ```
//!
//! Repositories use runtime-checked `sqlx::query_as` with private `FromRow`
//! row structs converted into model types.

pub mod businesses;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod research;
pub mod reviews;
pub mod stats;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

pub use businesses::BusinessRepository;
pub use cart::CartRepository;
pub use catalog::CatalogRepository;
pub use orders::OrderRepository;
pub use research::ResearchRepository;
pub use reviews::ReviewRepository;
pub use stats::StatsRepository;
pub use users::UserRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Maps a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(what.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a SQLite connection pool.
///
/// Enables WAL journaling and foreign keys, and creates the database file if
/// it does not exist.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(database_url: &SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Create a private in-memory database with migrations applied.
///
/// A single connection is used so every query sees the same database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection or a migration fails.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

/// Escapes `%`, `_` and `\` for use inside a `LIKE ... ESCAPE '\'` pattern and
/// wraps the term for substring matching.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ac"), "%ac%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[tokio::test]
    async fn test_memory_pool_runs_migrations() {
        let pool = create_memory_pool().await.expect("memory pool");
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .expect("users table exists");
        assert_eq!(count, 0);
    }
}

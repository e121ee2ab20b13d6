//! Subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use sqlx::SqlitePool;

use nellore_market_api::config::database_url_from_env;
use nellore_market_api::db;

/// Connect to the configured database, loading `.env` first.
pub async fn connect() -> Result<SqlitePool, sqlx::Error> {
    dotenvy::dotenv().ok();
    tracing::info!("Connecting to database...");
    db::create_pool(&database_url_from_env()).await
}

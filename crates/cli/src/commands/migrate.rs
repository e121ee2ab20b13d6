//! Database migration command.
//!
//! Applies the migrations embedded in the API crate
//! (`crates/api/migrations/`). Already-applied migrations are skipped, so the
//! command is safe to repeat.

use thiserror::Error;

use nellore_market_api::db::MIGRATOR;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!(
        migrations = MIGRATOR.iter().count(),
        "Migrations complete!"
    );
    Ok(())
}

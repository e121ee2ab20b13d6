//! Marketplace-wide counters.

use serde::Serialize;
use sqlx::SqlitePool;

use super::RepositoryError;

/// Headline numbers for the landing page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MarketStats {
    pub businesses: i64,
    pub services: i64,
    pub products: i64,
    pub orders: i64,
}

pub struct StatsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StatsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Active businesses, services and products, and all orders ever placed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn totals(&self) -> Result<MarketStats, RepositoryError> {
        let stats = sqlx::query_as(
            "SELECT \
                (SELECT COUNT(*) FROM businesses WHERE is_active = 1) AS businesses, \
                (SELECT COUNT(*) FROM services WHERE is_active = 1) AS services, \
                (SELECT COUNT(*) FROM products WHERE is_active = 1) AS products, \
                (SELECT COUNT(*) FROM orders) AS orders",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }

    /// Round-trip to the database for readiness checks.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the database is unreachable.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    #[tokio::test]
    async fn test_totals_on_empty_store() {
        let pool = create_memory_pool().await.unwrap();
        let repo = StatsRepository::new(&pool);
        repo.ping().await.unwrap();

        let stats = repo.totals().await.unwrap();
        assert_eq!(stats.businesses, 0);
        assert_eq!(stats.orders, 0);
    }
}

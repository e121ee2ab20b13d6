//! Candidate queries for the research engine.
//!
//! Scoring happens in Rust; these queries only narrow the catalog down to
//! matching active rows in stable `id` order.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use nellore_market_core::{CategoryId, ItemType, Money, ProductId, ServiceId, UserId};

use super::catalog::{
    PRODUCT_LISTING_SELECT, ProductListingRow, SERVICE_LISTING_SELECT, ServiceListingRow,
};
use super::{RepositoryError, like_pattern};
use crate::models::{ProductListing, PurchaseCount, ServiceListing, SiblingItem};

#[derive(Debug, sqlx::FromRow)]
struct PurchaseCountRow {
    item_type: ItemType,
    item_id: i64,
    purchase_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SiblingRow {
    id: i64,
    name: String,
    price: Money,
    rating: f64,
    review_count: i64,
}

impl From<SiblingRow> for SiblingItem {
    fn from(row: SiblingRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            rating: row.rating,
            review_count: row.review_count,
        }
    }
}

/// Optional numeric filters for product research.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductBounds {
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub min_rating: Option<f64>,
}

/// Repository for research read queries.
pub struct ResearchRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ResearchRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Active services whose name, description or category name contains
    /// `query`, optionally priced at or under `budget`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn service_candidates(
        &self,
        query: &str,
        budget: Option<Money>,
    ) -> Result<Vec<ServiceListing>, RepositoryError> {
        let pattern = like_pattern(query);
        let mut qb = QueryBuilder::<Sqlite>::new(SERVICE_LISTING_SELECT);
        qb.push(" WHERE s.is_active = 1 AND (s.name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR s.description LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR c.name LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
        if let Some(budget) = budget {
            qb.push(" AND s.price <= ").push_bind(budget);
        }
        qb.push(" ORDER BY s.id");

        let rows: Vec<ServiceListingRow> = qb.build_query_as().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Active products matching `query` on name, description or category
    /// name, within the given bounds.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_candidates(
        &self,
        query: &str,
        bounds: ProductBounds,
    ) -> Result<Vec<ProductListing>, RepositoryError> {
        let pattern = like_pattern(query);
        let mut qb = QueryBuilder::<Sqlite>::new(PRODUCT_LISTING_SELECT);
        qb.push(" WHERE p.is_active = 1 AND (p.name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR p.description LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR c.name LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
        if let Some(min) = bounds.min_price {
            qb.push(" AND p.price >= ").push_bind(min);
        }
        if let Some(max) = bounds.max_price {
            qb.push(" AND p.price <= ").push_bind(max);
        }
        if let Some(rating) = bounds.min_rating {
            qb.push(" AND p.rating >= ").push_bind(rating);
        }
        qb.push(" ORDER BY p.id");

        let rows: Vec<ProductListingRow> = qb.build_query_as().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The active services among `ids`, in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn services_by_ids(
        &self,
        ids: &[ServiceId],
    ) -> Result<Vec<ServiceListing>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(SERVICE_LISTING_SELECT);
        qb.push(" WHERE s.is_active = 1 AND s.id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        qb.push(") ORDER BY s.id");

        let rows: Vec<ServiceListingRow> = qb.build_query_as().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The active products among `ids`, in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductListing>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(PRODUCT_LISTING_SELECT);
        qb.push(" WHERE p.is_active = 1 AND p.id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        qb.push(") ORDER BY p.id");

        let rows: Vec<ProductListingRow> = qb.build_query_as().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Services with the highest `rating * review_count`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn trending_services(&self, limit: i64) -> Result<Vec<ServiceListing>, RepositoryError> {
        let rows: Vec<ServiceListingRow> = sqlx::query_as(&format!(
            "{SERVICE_LISTING_SELECT} WHERE s.is_active = 1 \
             ORDER BY (s.rating * s.review_count) DESC, s.id ASC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Products with the highest `rating * review_count`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn trending_products(&self, limit: i64) -> Result<Vec<ProductListing>, RepositoryError> {
        let rows: Vec<ProductListingRow> = sqlx::query_as(&format!(
            "{PRODUCT_LISTING_SELECT} WHERE p.is_active = 1 \
             ORDER BY (p.rating * p.review_count) DESC, p.id ASC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Distinct items a user has ordered, most often bought first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purchase_history(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<PurchaseCount>, RepositoryError> {
        let rows: Vec<PurchaseCountRow> = sqlx::query_as(
            "SELECT oi.item_type, oi.item_id, COUNT(*) AS purchase_count \
             FROM orders o JOIN order_items oi ON oi.order_id = o.id \
             WHERE o.user_id = ? \
             GROUP BY oi.item_type, oi.item_id \
             ORDER BY purchase_count DESC, oi.item_type, oi.item_id LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PurchaseCount {
                item_type: row.item_type,
                item_id: row.item_id,
                purchase_count: row.purchase_count,
            })
            .collect())
    }

    /// Every other active item in the same category, best rated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn siblings(
        &self,
        kind: ItemType,
        category_id: CategoryId,
        exclude: i64,
    ) -> Result<Vec<SiblingItem>, RepositoryError> {
        let sql = match kind {
            ItemType::Service => {
                "SELECT id, name, price, rating, review_count FROM services \
                 WHERE category_id = ? AND id != ? AND is_active = 1 \
                 ORDER BY rating DESC, id ASC"
            }
            ItemType::Product => {
                "SELECT id, name, price, rating, review_count FROM products \
                 WHERE category_id = ? AND id != ? AND is_active = 1 \
                 ORDER BY rating DESC, id ASC"
            }
        };
        let rows: Vec<SiblingRow> = sqlx::query_as(sql)
            .bind(category_id)
            .bind(exclude)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

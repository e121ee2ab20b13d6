//! Review repository.
//!
//! Writes run on a caller-supplied connection so the review row and the
//! parent's cached `rating`/`review_count` change in one transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use nellore_market_core::{ReviewId, ReviewType, UserId};

use super::RepositoryError;
use crate::models::{Review, ReviewView};

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    user_id: i64,
    review_type: ReviewType,
    item_id: i64,
    rating: i64,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::new(row.id),
            user_id: UserId::new(row.user_id),
            review_type: row.review_type,
            item_id: row.item_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewViewRow {
    id: i64,
    rating: i64,
    comment: Option<String>,
    user_name: String,
    user_avatar: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReviewViewRow> for ReviewView {
    fn from(row: ReviewViewRow) -> Self {
        Self {
            id: ReviewId::new(row.id),
            rating: row.rating,
            comment: row.comment,
            user_name: row.user_name,
            user_avatar: row.user_avatar,
            created_at: row.created_at,
        }
    }
}

/// Parent table holding the cached aggregate for a review type.
const fn parent_table(review_type: ReviewType) -> &'static str {
    match review_type {
        ReviewType::Service => "services",
        ReviewType::Product => "products",
        ReviewType::Business => "businesses",
    }
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Newest reviews of one target with reviewer names.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for(
        &self,
        review_type: ReviewType,
        item_id: i64,
        limit: i64,
    ) -> Result<Vec<ReviewView>, RepositoryError> {
        let rows: Vec<ReviewViewRow> = sqlx::query_as(
            "SELECT r.id, r.rating, r.comment, u.name AS user_name, u.avatar AS user_avatar, \
                    r.created_at \
             FROM reviews r JOIN users u ON u.id = r.user_id \
             WHERE r.review_type = ? AND r.item_id = ? \
             ORDER BY r.created_at DESC, r.id DESC LIMIT ?",
        )
        .bind(review_type)
        .bind(item_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Star ratings of the newest `limit` reviews of one target.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_ratings(
        &self,
        review_type: ReviewType,
        item_id: i64,
        limit: i64,
    ) -> Result<Vec<i64>, RepositoryError> {
        let ratings: Vec<i64> = sqlx::query_scalar(
            "SELECT rating FROM reviews WHERE review_type = ? AND item_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(review_type)
        .bind(item_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(ratings)
    }

    /// Whether a review target exists. Services and products must be active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn target_exists(
        conn: &mut SqliteConnection,
        review_type: ReviewType,
        item_id: i64,
    ) -> Result<bool, RepositoryError> {
        let sql = match review_type {
            ReviewType::Service => "SELECT EXISTS(SELECT 1 FROM services WHERE id = ? AND is_active = 1)",
            ReviewType::Product => "SELECT EXISTS(SELECT 1 FROM products WHERE id = ? AND is_active = 1)",
            ReviewType::Business => "SELECT EXISTS(SELECT 1 FROM businesses WHERE id = ?)",
        };
        let exists: bool = sqlx::query_scalar(sql).bind(item_id).fetch_one(conn).await?;
        Ok(exists)
    }

    /// Insert a review, or replace the user's earlier review of the same target.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn upsert(
        conn: &mut SqliteConnection,
        user_id: UserId,
        review_type: ReviewType,
        item_id: i64,
        rating: i64,
        comment: Option<&str>,
    ) -> Result<Review, RepositoryError> {
        let row: ReviewRow = sqlx::query_as(
            "INSERT INTO reviews (user_id, review_type, item_id, rating, comment) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, review_type, item_id) DO UPDATE SET \
                rating = excluded.rating, \
                comment = excluded.comment, \
                created_at = CURRENT_TIMESTAMP \
             RETURNING id, user_id, review_type, item_id, rating, comment, created_at",
        )
        .bind(user_id)
        .bind(review_type)
        .bind(item_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(conn)
        .await?;
        Ok(row.into())
    }

    /// Recompute the parent's `rating` (mean, one decimal) and `review_count`
    /// from the review rows, returning the new pair.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn refresh_aggregate(
        conn: &mut SqliteConnection,
        review_type: ReviewType,
        item_id: i64,
    ) -> Result<(f64, i64), RepositoryError> {
        let (rating, count): (f64, i64) = sqlx::query_as(
            "SELECT COALESCE(ROUND(AVG(rating), 1), 0.0), COUNT(*) \
             FROM reviews WHERE review_type = ? AND item_id = ?",
        )
        .bind(review_type)
        .bind(item_id)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(&format!(
            "UPDATE {} SET rating = ?, review_count = ? WHERE id = ?",
            parent_table(review_type)
        ))
        .bind(rating)
        .bind(count)
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

        Ok((rating, count))
    }
}

//! Ratings for services, products and businesses.

use sqlx::SqlitePool;
use tracing::instrument;

use nellore_market_core::{ReviewType, UserId};

use crate::db::ReviewRepository;
use crate::models::Review;
use crate::services::ServiceError;
use crate::services::validation::non_blank;

/// Review service.
pub struct ReviewService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record `user_id`'s rating of a target, replacing any earlier one, and
    /// recompute the target's average and count in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if `rating` is outside 1..=5.
    /// Returns `ServiceError::NotFound` if the target does not exist.
    #[instrument(skip(self, comment))]
    pub async fn submit(
        &self,
        user_id: UserId,
        review_type: ReviewType,
        item_id: i64,
        rating: i64,
        comment: Option<&str>,
    ) -> Result<Review, ServiceError> {
        if !(1..=5).contains(&rating) {
            return Err(ServiceError::validation("Rating must be 1-5"));
        }
        let comment = non_blank(comment);

        let mut tx = self.pool.begin().await?;
        if !ReviewRepository::target_exists(&mut tx, review_type, item_id).await? {
            return Err(ServiceError::not_found(target_missing(review_type)));
        }

        let review = ReviewRepository::upsert(
            &mut tx,
            user_id,
            review_type,
            item_id,
            rating,
            comment.as_deref(),
        )
        .await?;
        let (average, count) =
            ReviewRepository::refresh_aggregate(&mut tx, review_type, item_id).await?;
        tx.commit().await?;

        tracing::info!(%review_type, item_id, average, count, "review recorded");
        Ok(review)
    }
}

const fn target_missing(review_type: ReviewType) -> &'static str {
    match review_type {
        ReviewType::Service => "Service not found",
        ReviewType::Product => "Product not found",
        ReviewType::Business => "Business not found",
    }
}

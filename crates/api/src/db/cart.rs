//! Cart repository.

use sqlx::{SqliteExecutor, SqlitePool};

use nellore_market_core::{CartItemId, ItemType, Money, UserId};

use super::RepositoryError;
use crate::models::{CartLine, ItemRef};

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: i64,
    item_type: ItemType,
    item_id: i64,
    quantity: i64,
    name: String,
    price: Money,
    image: Option<String>,
    stock: Option<i64>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: CartItemId::new(row.id),
            item_type: row.item_type,
            item_id: row.item_id,
            quantity: row.quantity,
            line_total: row.price * row.quantity,
            name: row.name,
            price: row.price,
            image: row.image,
            stock: row.stock,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartRefRow {
    item_type: ItemType,
    item_id: i64,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// A user's cart lines priced from the live catalog, newest first.
    ///
    /// Lines whose catalog entry no longer exists are omitted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows: Vec<CartLineRow> = sqlx::query_as(
            "SELECT c.id, c.item_type, c.item_id, c.quantity, \
                    COALESCE(s.name, p.name) AS name, \
                    COALESCE(s.price, p.price) AS price, \
                    p.image AS image, \
                    p.stock AS stock \
             FROM cart c \
             LEFT JOIN services s ON c.item_type = 'service' AND s.id = c.item_id \
             LEFT JOIN products p ON c.item_type = 'product' AND p.id = c.item_id \
             WHERE c.user_id = ? AND COALESCE(s.id, p.id) IS NOT NULL \
             ORDER BY c.created_at DESC, c.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add `quantity` of an item, incrementing an existing line in place.
    ///
    /// Returns `None`, leaving the line untouched, when the merged quantity
    /// would exceed `max_quantity`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn add(
        &self,
        user_id: UserId,
        item: ItemRef,
        quantity: i64,
        max_quantity: i64,
    ) -> Result<Option<CartItemId>, RepositoryError> {
        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO cart (user_id, item_type, item_id, quantity) VALUES (?, ?, ?, ?) \
             ON CONFLICT (user_id, item_type, item_id) \
             DO UPDATE SET quantity = cart.quantity + excluded.quantity \
             WHERE cart.quantity + excluded.quantity <= ? \
             RETURNING id",
        )
        .bind(user_id)
        .bind(item.item_type())
        .bind(item.raw_id())
        .bind(quantity)
        .bind(max_quantity)
        .fetch_optional(self.pool)
        .await?;
        Ok(id.map(CartItemId::new))
    }

    /// The item a user's cart line points at.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_line(
        &self,
        user_id: UserId,
        id: CartItemId,
    ) -> Result<Option<ItemRef>, RepositoryError> {
        let row: Option<CartRefRow> =
            sqlx::query_as("SELECT item_type, item_id FROM cart WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(|row| ItemRef::new(row.item_type, row.item_id)))
    }

    /// Overwrite the quantity of a user's cart line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not belong to the user.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        id: CartItemId,
        quantity: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE cart SET quantity = ? WHERE id = ? AND user_id = ?")
            .bind(quantity)
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete one of a user's cart lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no line was deleted.
    pub async fn remove(&self, user_id: UserId, id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Empty a user's cart. Accepts the pool or an open transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear<'e, E>(executor: E, user_id: UserId) -> Result<u64, RepositoryError>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM cart WHERE user_id = ?")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use nellore_market_core::{ProductId, ServiceId};

    async fn seed(pool: &SqlitePool) -> UserId {
        let user: i64 = sqlx::query_scalar(
            "INSERT INTO users (name, email, password_hash) \
             VALUES ('Cart', 'cart@nellore.com', 'x') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO service_categories (id, name, slug) VALUES (1, 'Repair', 'repair')")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO product_categories (id, name, slug) VALUES (1, 'Food', 'food')")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO services (id, category_id, name, slug, price) \
             VALUES (1, 1, 'AC Service', 'ac-service', 49900)",
        )
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO products (id, category_id, name, slug, price, stock) \
             VALUES (1, 1, 'Rice 5kg', 'rice-5kg', 35000, 10)",
        )
        .execute(pool)
        .await
        .unwrap();
        UserId::new(user)
    }

    #[tokio::test]
    async fn test_add_increments_existing_line() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed(&pool).await;
        let repo = CartRepository::new(&pool);
        let rice = ItemRef::Product(ProductId::new(1));

        let first = repo.add(user, rice, 2, 100).await.unwrap();
        let second = repo.add(user, rice, 3, 100).await.unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(repo.lines(user).await.unwrap()[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_add_refuses_to_merge_past_cap() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed(&pool).await;
        let repo = CartRepository::new(&pool);
        let ac = ItemRef::Service(ServiceId::new(1));

        repo.add(user, ac, 8, 10).await.unwrap().unwrap();
        assert!(repo.add(user, ac, 3, 10).await.unwrap().is_none());
        repo.add(user, ac, 2, 10).await.unwrap().unwrap();
        assert_eq!(repo.lines(user).await.unwrap()[0].quantity, 10);
    }

    #[tokio::test]
    async fn test_lines_use_live_prices() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed(&pool).await;
        let repo = CartRepository::new(&pool);
        repo.add(user, ItemRef::Service(ServiceId::new(1)), 1, 100).await.unwrap();
        repo.add(user, ItemRef::Product(ProductId::new(1)), 2, 100).await.unwrap();

        sqlx::query("UPDATE products SET price = 30000 WHERE id = 1")
            .execute(&pool)
            .await
            .unwrap();

        let lines = repo.lines(user).await.unwrap();
        assert_eq!(lines.len(), 2);
        let rice = lines.iter().find(|l| l.item_type == ItemType::Product).unwrap();
        assert_eq!(rice.price, Money::from_paise(30000));
        assert_eq!(rice.line_total, Money::from_paise(60000));
        assert_eq!(rice.stock, Some(10));
        let ac = lines.iter().find(|l| l.item_type == ItemType::Service).unwrap();
        assert_eq!(ac.stock, None);
    }

    #[tokio::test]
    async fn test_remove_missing_line_is_not_found() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed(&pool).await;
        let repo = CartRepository::new(&pool);

        let err = repo.remove(user, CartItemId::new(99)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
        assert_eq!(CartRepository::clear(&pool, user).await.unwrap(), 0);
    }
}

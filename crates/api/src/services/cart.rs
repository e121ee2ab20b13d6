//! Cart operations.

use sqlx::SqlitePool;
use tracing::instrument;

use nellore_market_core::{CartItemId, UserId};

use crate::db::{CartRepository, CatalogRepository, RepositoryError};
use crate::models::{Cart, CatalogItem, ItemRef};
use crate::services::ServiceError;
use crate::services::validation::{MAX_LINE_QUANTITY, check_quantity, quantity_limit};

/// Cart service. Lines reference catalog entries and are priced live.
pub struct CartService<'a> {
    pool: &'a SqlitePool,
    cart: CartRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            cart: CartRepository::new(pool),
        }
    }

    /// The user's cart with live names, prices and stock.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the database operation fails.
    pub async fn get(&self, user_id: UserId) -> Result<Cart, ServiceError> {
        let lines = self.cart.lines(user_id).await?;
        Ok(Cart::from_lines(lines))
    }

    /// Add `quantity` units of an item, merging with an existing line.
    ///
    /// Stock is checked against the requested quantity; checkout re-checks
    /// the merged line when it takes stock.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if `quantity`, or the merged line,
    /// falls outside `1..=MAX_LINE_QUANTITY`.
    /// Returns `ServiceError::NotFound` if the item is missing or inactive.
    /// Returns `ServiceError::InsufficientStock` if a product has fewer than
    /// `quantity` units.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: UserId,
        item: ItemRef,
        quantity: i64,
    ) -> Result<CartItemId, ServiceError> {
        check_quantity(quantity)?;
        let live = self.active_item(item).await?;
        if live.stock.is_some_and(|stock| stock < quantity) {
            return Err(ServiceError::InsufficientStock("Insufficient stock".to_string()));
        }

        self.cart
            .add(user_id, item, quantity, MAX_LINE_QUANTITY)
            .await?
            .ok_or_else(quantity_limit)
    }

    /// Set the quantity of one of the user's cart lines.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if `quantity` is outside
    /// `1..=MAX_LINE_QUANTITY`.
    /// Returns `ServiceError::NotFound` if the line is not the user's.
    /// Returns `ServiceError::InsufficientStock` if a product is short.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        id: CartItemId,
        quantity: i64,
    ) -> Result<(), ServiceError> {
        check_quantity(quantity)?;
        let item = self
            .cart
            .find_line(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart item not found"))?;

        if let ItemRef::Product(_) = item {
            let stock = CatalogRepository::find_active_item(self.pool, item)
                .await?
                .and_then(|live| live.stock)
                .unwrap_or(0);
            if stock < quantity {
                return Err(ServiceError::InsufficientStock("Insufficient stock".to_string()));
            }
        }

        self.cart
            .set_quantity(user_id, id, quantity)
            .await
            .map_err(cart_line_missing)
    }

    /// Remove one of the user's cart lines.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if nothing was removed.
    pub async fn remove(&self, user_id: UserId, id: CartItemId) -> Result<(), ServiceError> {
        self.cart.remove(user_id, id).await.map_err(cart_line_missing)
    }

    /// Empty the user's cart. Succeeds on an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the database operation fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), ServiceError> {
        CartRepository::clear(self.pool, user_id).await?;
        Ok(())
    }

    async fn active_item(&self, item: ItemRef) -> Result<CatalogItem, ServiceError> {
        CatalogRepository::find_active_item(self.pool, item)
            .await?
            .ok_or_else(|| ServiceError::not_found(item_missing(item)))
    }
}

/// "Service not found" or "Product not found".
pub(crate) const fn item_missing(item: ItemRef) -> &'static str {
    match item {
        ItemRef::Service(_) => "Service not found",
        ItemRef::Product(_) => "Product not found",
    }
}

fn cart_line_missing(err: RepositoryError) -> ServiceError {
    match err {
        RepositoryError::NotFound => ServiceError::not_found("Cart item not found"),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use nellore_market_core::{Money, ProductId, ServiceId};

    async fn seed(pool: &SqlitePool) -> UserId {
        for sql in [
            "INSERT INTO users (id, name, email, password_hash) VALUES (1, 'Asha', 'asha@example.com', 'x')",
            "INSERT INTO users (id, name, email, password_hash) VALUES (2, 'Bala', 'bala@example.com', 'x')",
            "INSERT INTO service_categories (id, name, slug) VALUES (1, 'Cleaning', 'cleaning')",
            "INSERT INTO product_categories (id, name, slug) VALUES (1, 'Dairy', 'dairy')",
            "INSERT INTO services (id, category_id, name, slug, price) VALUES (1, 1, 'Deep Clean', 'deep-clean', 149900)",
            "INSERT INTO services (id, category_id, name, slug, price, is_active) VALUES (2, 1, 'Retired', 'retired', 100, 0)",
            "INSERT INTO products (id, category_id, name, slug, price, stock) VALUES (1, 1, 'Curd', 'curd', 4000, 3)",
        ] {
            sqlx::query(sql).execute(pool).await.unwrap();
        }
        UserId::new(1)
    }

    #[tokio::test]
    async fn test_add_merges_and_checks_requested_stock() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed(&pool).await;
        let cart = CartService::new(&pool);
        let curd = ItemRef::Product(ProductId::new(1));

        let first = cart.add(user, curd, 2).await.unwrap();
        let second = cart.add(user, curd, 2).await.unwrap();
        assert_eq!(first, second);
        assert!(matches!(
            cart.add(user, curd, 4).await,
            Err(ServiceError::InsufficientStock(_))
        ));

        let view = cart.get(user).await.unwrap();
        assert_eq!(view.count, 1);
        assert_eq!(view.items[0].quantity, 4);
        assert_eq!(view.total, Money::from_paise(16_000));
    }

    #[tokio::test]
    async fn test_add_caps_line_quantity() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed(&pool).await;
        let cart = CartService::new(&pool);
        let clean = ItemRef::Service(ServiceId::new(1));

        assert!(matches!(
            cart.add(user, clean, 100_000_000_000_000).await,
            Err(ServiceError::Validation(_))
        ));
        cart.add(user, clean, MAX_LINE_QUANTITY).await.unwrap();
        assert!(matches!(
            cart.add(user, clean, 1).await,
            Err(ServiceError::Validation(ref m)) if m == "Quantity cannot exceed 1000"
        ));

        let view = cart.get(user).await.unwrap();
        assert_eq!(view.items[0].quantity, MAX_LINE_QUANTITY);
        assert_eq!(view.total, Money::from_paise(149_900 * MAX_LINE_QUANTITY));

        let line = view.items[0].id;
        assert!(matches!(
            cart.update_quantity(user, line, MAX_LINE_QUANTITY + 1).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed(&pool).await;
        let cart = CartService::new(&pool);

        assert!(matches!(
            cart.add(user, ItemRef::Service(ServiceId::new(1)), 0).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            cart.add(user, ItemRef::Service(ServiceId::new(2)), 1).await,
            Err(ServiceError::NotFound(ref m)) if m == "Service not found"
        ));
        assert!(matches!(
            cart.add(user, ItemRef::Product(ProductId::new(9)), 1).await,
            Err(ServiceError::NotFound(ref m)) if m == "Product not found"
        ));
    }

    #[tokio::test]
    async fn test_update_remove_clear_are_scoped_to_owner() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed(&pool).await;
        let stranger = UserId::new(2);
        let cart = CartService::new(&pool);
        let line = cart
            .add(user, ItemRef::Product(ProductId::new(1)), 1)
            .await
            .unwrap();

        assert!(matches!(
            cart.update_quantity(stranger, line, 2).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            cart.update_quantity(user, line, 4).await,
            Err(ServiceError::InsufficientStock(_))
        ));
        cart.update_quantity(user, line, 3).await.unwrap();

        assert!(matches!(
            cart.remove(stranger, line).await,
            Err(ServiceError::NotFound(ref m)) if m == "Cart item not found"
        ));
        cart.remove(user, line).await.unwrap();

        cart.clear(user).await.unwrap();
        assert_eq!(cart.get(user).await.unwrap().total, Money::ZERO);
    }
}

//! Order history and the order status lifecycle.

use sqlx::SqlitePool;
use tracing::instrument;

use nellore_market_core::{OrderId, OrderStatus, UserId};

use crate::db::orders::OrderParty;
use crate::db::{CatalogRepository, OrderRepository};
use crate::models::{OrderDetail, User};
use crate::services::ServiceError;

/// Order service.
pub struct OrderService<'a> {
    pool: &'a SqlitePool,
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            orders: OrderRepository::new(pool),
        }
    }

    /// Orders placed by `user_id`, newest first, with their lines.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the database operation fails.
    pub async fn list_for_customer(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OrderDetail>, ServiceError> {
        Ok(self
            .orders
            .list(OrderParty::Customer(user_id), status, limit, offset)
            .await?)
    }

    /// Orders attributed to `vendor_id`, newest first, with customer contact.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the database operation fails.
    pub async fn list_for_vendor(
        &self,
        vendor_id: UserId,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OrderDetail>, ServiceError> {
        Ok(self
            .orders
            .list(OrderParty::Vendor(vendor_id), status, limit, offset)
            .await?)
    }

    /// One order, visible to its buyer and its vendor only.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist or the
    /// viewer is neither party.
    pub async fn get(&self, id: OrderId, viewer: UserId) -> Result<OrderDetail, ServiceError> {
        self.orders
            .get_visible(id, viewer)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order not found"))
    }

    /// Move an order to `requested` along the lifecycle.
    ///
    /// Cancelling returns the stock of every product line in the same
    /// transaction as the status change.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidStatus` if `requested` is not a status.
    /// Returns `ServiceError::NotFound` if the order does not exist.
    /// Returns `ServiceError::Forbidden` if the actor is neither the order's
    /// vendor nor an admin.
    /// Returns `ServiceError::InvalidTransition` if the lifecycle forbids the move.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn set_status(
        &self,
        id: OrderId,
        requested: &str,
        actor: &User,
    ) -> Result<OrderStatus, ServiceError> {
        let to: OrderStatus = requested
            .parse()
            .map_err(|_| ServiceError::InvalidStatus(requested.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::get(&mut *tx, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order not found"))?;
        if order.vendor_id != Some(actor.id) && !actor.is_admin() {
            return Err(ServiceError::forbidden("Not authorized to update this order"));
        }

        let from = order.status;
        if !from.can_transition_to(to) {
            return Err(ServiceError::InvalidTransition { from, to });
        }
        if !OrderRepository::compare_and_set_status(&mut tx, id, from, to).await? {
            return Err(ServiceError::Conflict(
                "Order was updated by someone else, reload and retry".to_string(),
            ));
        }

        if to == OrderStatus::Cancelled {
            for (product_id, quantity) in OrderRepository::product_lines(&mut tx, id).await? {
                CatalogRepository::restore_stock(&mut tx, product_id, quantity).await?;
            }
        }

        tx.commit().await?;
        tracing::info!(order_id = %id, %from, %to, "order status changed");
        Ok(to)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::services::checkout::{CheckoutService, OrderLine, OrderRequest};
    use chrono::Utc;
    use nellore_market_core::{Email, ItemType, UserRole};

    fn user(id: i64, role: UserRole) -> User {
        User {
            id: UserId::new(id),
            name: "Someone".to_string(),
            email: Email::parse("someone@example.com").unwrap(),
            phone: None,
            role,
            avatar: None,
            address: None,
            city: "Nellore".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn placed_order(pool: &SqlitePool) -> OrderId {
        for sql in [
            "INSERT INTO users (id, name, email, password_hash) VALUES (1, 'Asha', 'asha@example.com', 'x')",
            "INSERT INTO users (id, name, email, password_hash, role) VALUES (2, 'Vendor', 'v@example.com', 'x', 'vendor')",
            "INSERT INTO users (id, name, email, password_hash, role) VALUES (3, 'Other', 'o@example.com', 'x', 'vendor')",
            "INSERT INTO product_categories (id, name, slug) VALUES (1, 'Dairy', 'dairy')",
            "INSERT INTO products (id, category_id, vendor_id, name, slug, price, stock) VALUES (1, 1, 2, 'Curd', 'curd', 4000, 5)",
        ] {
            sqlx::query(sql).execute(pool).await.unwrap();
        }
        CheckoutService::new(pool)
            .place_order(
                UserId::new(1),
                &OrderRequest {
                    order_type: Some(ItemType::Product),
                    items: vec![OrderLine {
                        item_type: ItemType::Product,
                        item_id: 1,
                        quantity: 2,
                    }],
                    delivery_address: Some("12 Trunk Road".to_string()),
                    ..OrderRequest::default()
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn stock(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT stock FROM products WHERE id = 1")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_forward_transitions_and_terminal_state() {
        let pool = create_memory_pool().await.unwrap();
        let id = placed_order(&pool).await;
        let orders = OrderService::new(&pool);
        let vendor = user(2, UserRole::Vendor);

        for next in ["confirmed", "in_progress", "completed"] {
            orders.set_status(id, next, &vendor).await.unwrap();
        }
        assert!(matches!(
            orders.set_status(id, "cancelled", &vendor).await,
            Err(ServiceError::InvalidTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Cancelled
            })
        ));
        assert_eq!(stock(&pool).await, 3);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_once() {
        let pool = create_memory_pool().await.unwrap();
        let id = placed_order(&pool).await;
        let orders = OrderService::new(&pool);
        let vendor = user(2, UserRole::Vendor);
        assert_eq!(stock(&pool).await, 3);

        orders.set_status(id, "cancelled", &vendor).await.unwrap();
        assert_eq!(stock(&pool).await, 5);

        assert!(matches!(
            orders.set_status(id, "cancelled", &vendor).await,
            Err(ServiceError::InvalidTransition { .. })
        ));
        assert_eq!(stock(&pool).await, 5);
    }

    #[tokio::test]
    async fn test_status_authorization_and_parsing() {
        let pool = create_memory_pool().await.unwrap();
        let id = placed_order(&pool).await;
        let orders = OrderService::new(&pool);

        assert!(matches!(
            orders.set_status(id, "shipped", &user(2, UserRole::Vendor)).await,
            Err(ServiceError::InvalidStatus(_))
        ));
        assert!(matches!(
            orders.set_status(id, "confirmed", &user(3, UserRole::Vendor)).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            orders
                .set_status(OrderId::new(404), "confirmed", &user(2, UserRole::Vendor))
                .await,
            Err(ServiceError::NotFound(_))
        ));
        orders
            .set_status(id, "confirmed", &user(9, UserRole::Admin))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_visibility() {
        let pool = create_memory_pool().await.unwrap();
        let id = placed_order(&pool).await;
        let orders = OrderService::new(&pool);

        assert_eq!(orders.get(id, UserId::new(1)).await.unwrap().items.len(), 1);
        assert!(orders.get(id, UserId::new(2)).await.is_ok());
        assert!(matches!(
            orders.get(id, UserId::new(3)).await,
            Err(ServiceError::NotFound(_))
        ));

        let vendor_view = orders
            .list_for_vendor(UserId::new(2), None, 20, 0)
            .await
            .unwrap();
        assert_eq!(vendor_view[0].customer_name.as_deref(), Some("Asha"));
        assert!(
            orders
                .list_for_customer(UserId::new(1), Some(OrderStatus::Completed), 20, 0)
                .await
                .unwrap()
                .is_empty()
        );
    }
}

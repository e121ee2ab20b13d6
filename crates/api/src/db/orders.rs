//! Order repository.
//!
//! Checkout and status changes run inside transactions owned by the service
//! layer, so the write methods here take a `&mut SqliteConnection`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};

use nellore_market_core::{
    ItemType, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId,
};

use super::RepositoryError;
use crate::models::{ItemRef, Order, OrderDetail, OrderItem};

const ORDER_COLUMNS: &str = "id, order_number, user_id, vendor_id, order_type, status, subtotal, \
     delivery_fee, discount, total, payment_method, payment_status, delivery_address, \
     delivery_area, delivery_city, delivery_pincode, scheduled_date, scheduled_time, notes, \
     created_at, updated_at";

const JOINED_ORDER_COLUMNS: &str = "o.id, o.order_number, o.user_id, o.vendor_id, o.order_type, \
     o.status, o.subtotal, o.delivery_fee, o.discount, o.total, o.payment_method, \
     o.payment_status, o.delivery_address, o.delivery_area, o.delivery_city, \
     o.delivery_pincode, o.scheduled_date, o.scheduled_time, o.notes, o.created_at, \
     o.updated_at";

const ITEM_COLUMNS: &str = "id, order_id, item_type, item_id, item_name, quantity, price, total";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    user_id: i64,
    vendor_id: Option<i64>,
    order_type: ItemType,
    status: OrderStatus,
    subtotal: Money,
    delivery_fee: Money,
    discount: Money,
    total: Money,
    payment_method: String,
    payment_status: PaymentStatus,
    delivery_address: Option<String>,
    delivery_area: Option<String>,
    delivery_city: String,
    delivery_pincode: Option<String>,
    scheduled_date: Option<String>,
    scheduled_time: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            user_id: UserId::new(row.user_id),
            vendor_id: row.vendor_id.map(UserId::new),
            order_type: row.order_type,
            status: row.status,
            subtotal: row.subtotal,
            delivery_fee: row.delivery_fee,
            discount: row.discount,
            total: row.total,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            delivery_address: row.delivery_address,
            delivery_area: row.delivery_area,
            delivery_city: row.delivery_city,
            delivery_pincode: row.delivery_pincode,
            scheduled_date: row.scheduled_date,
            scheduled_time: row.scheduled_time,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// An order joined with the other party's contact details.
#[derive(Debug, sqlx::FromRow)]
struct OrderContactRow {
    #[sqlx(flatten)]
    order: OrderRow,
    contact_name: Option<String>,
    contact_phone: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    item_type: ItemType,
    item_id: i64,
    item_name: String,
    quantity: i64,
    price: Money,
    total: Money,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            item_type: row.item_type,
            item_id: row.item_id,
            item_name: row.item_name,
            quantity: row.quantity,
            price: row.price,
            total: row.total,
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// A fully priced order ready to insert.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub order_number: &'a str,
    pub user_id: UserId,
    pub vendor_id: Option<UserId>,
    pub order_type: ItemType,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub payment_method: &'a str,
    pub delivery_address: &'a str,
    pub delivery_area: Option<&'a str>,
    pub delivery_pincode: Option<&'a str>,
    pub scheduled_date: Option<&'a str>,
    pub scheduled_time: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// One snapshotted order line.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub item: ItemRef,
    pub name: String,
    pub quantity: i64,
    pub price: Money,
    pub total: Money,
}

/// Whose orders a listing returns.
#[derive(Debug, Clone, Copy)]
pub enum OrderParty {
    Customer(UserId),
    Vendor(UserId),
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Orders for a customer or a vendor, newest first, each with its items.
    ///
    /// Vendor listings carry the customer's name and phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        party: OrderParty,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {JOINED_ORDER_COLUMNS}, "
        ));
        match party {
            OrderParty::Customer(user_id) => {
                qb.push(
                    "NULL AS contact_name, NULL AS contact_phone FROM orders o WHERE o.user_id = ",
                )
                .push_bind(user_id);
            }
            OrderParty::Vendor(vendor_id) => {
                qb.push(
                    "u.name AS contact_name, u.phone AS contact_phone FROM orders o \
                     JOIN users u ON u.id = o.user_id WHERE o.vendor_id = ",
                )
                .push_bind(vendor_id);
            }
        }
        if let Some(status) = status {
            qb.push(" AND o.status = ").push_bind(status);
        }
        qb.push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<OrderContactRow> = qb.build_query_as().fetch_all(self.pool).await?;

        let ids: Vec<i64> = rows.iter().map(|row| row.order.id).collect();
        let mut items = self.items_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let order: Order = row.order.into();
                let items = items.remove(&order.id).unwrap_or_default();
                let (customer_name, customer_phone) = match party {
                    OrderParty::Customer(_) => (None, None),
                    OrderParty::Vendor(_) => (row.contact_name, row.contact_phone),
                };
                OrderDetail {
                    order,
                    items,
                    business_name: None,
                    business_phone: None,
                    customer_name,
                    customer_phone,
                }
            })
            .collect())
    }

    /// An order visible to `viewer` as its buyer or its vendor, with the
    /// vendor's business name and phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_visible(
        &self,
        id: OrderId,
        viewer: UserId,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let row: Option<OrderContactRow> = sqlx::query_as(&format!(
            "SELECT {JOINED_ORDER_COLUMNS}, b.business_name AS contact_name, \
                    b.phone AS contact_phone \
             FROM orders o LEFT JOIN businesses b ON b.user_id = o.vendor_id \
             WHERE o.id = ? AND (o.user_id = ? OR o.vendor_id = ?)"
        ))
        .bind(id)
        .bind(viewer)
        .bind(viewer)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = Self::items(self.pool, id).await?;
        Ok(Some(OrderDetail {
            order: row.order.into(),
            items,
            business_name: row.contact_name,
            business_phone: row.contact_phone,
            customer_name: None,
            customer_phone: None,
        }))
    }

    /// Lines of one order. Accepts the pool or an open transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items<'e, E>(executor: E, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError>
    where
        E: SqliteExecutor<'e>,
    {
        let rows: Vec<OrderItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn items_for(
        &self,
        order_ids: &[i64],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>, RepositoryError> {
        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id IN ("
        ));
        let mut separated = qb.separated(", ");
        for id in order_ids {
            separated.push_bind(*id);
        }
        qb.push(") ORDER BY order_id, id");

        let rows: Vec<OrderItemRow> = qb.build_query_as().fetch_all(self.pool).await?;
        for row in rows {
            let item: OrderItem = row.into();
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    // =========================================================================
    // Transactional writes
    // =========================================================================

    /// Insert an order header.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number is already used.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(
        conn: &mut SqliteConnection,
        new: &NewOrder<'_>,
    ) -> Result<Order, RepositoryError> {
        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders \
                (order_number, user_id, vendor_id, order_type, subtotal, delivery_fee, total, \
                 payment_method, delivery_address, delivery_area, delivery_pincode, \
                 scheduled_date, scheduled_time, notes) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(new.order_number)
        .bind(new.user_id)
        .bind(new.vendor_id)
        .bind(new.order_type)
        .bind(new.subtotal)
        .bind(new.delivery_fee)
        .bind(new.total)
        .bind(new.payment_method)
        .bind(new.delivery_address)
        .bind(new.delivery_area)
        .bind(new.delivery_pincode)
        .bind(new.scheduled_date)
        .bind(new.scheduled_time)
        .bind(new.notes)
        .fetch_one(conn)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "order number already used"))?;
        Ok(row.into())
    }

    /// Insert one order line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_item(
        conn: &mut SqliteConnection,
        order_id: OrderId,
        item: &NewOrderItem,
    ) -> Result<OrderItem, RepositoryError> {
        let row: OrderItemRow = sqlx::query_as(&format!(
            "INSERT INTO order_items (order_id, item_type, item_id, item_name, quantity, price, total) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {ITEM_COLUMNS}"
        ))
        .bind(order_id)
        .bind(item.item.item_type())
        .bind(item.item.raw_id())
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.price)
        .bind(item.total)
        .fetch_one(conn)
        .await?;
        Ok(row.into())
    }

    /// An order header by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get<'e, E>(executor: E, id: OrderId) -> Result<Option<Order>, RepositoryError>
    where
        E: SqliteExecutor<'e>,
    {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(row.map(Into::into))
    }

    /// Move an order from `from` to `to`, refreshing `updated_at`.
    ///
    /// Returns `false` if the stored status is no longer `from`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn compare_and_set_status(
        conn: &mut SqliteConnection,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET status = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ? AND status = ?",
        )
        .bind(to)
        .bind(id)
        .bind(from)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// `(product, quantity)` for every product line of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_lines(
        conn: &mut SqliteConnection,
        id: OrderId,
    ) -> Result<Vec<(ProductId, i64)>, RepositoryError> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT item_id, quantity FROM order_items \
             WHERE order_id = ? AND item_type = 'product' ORDER BY id",
        )
        .bind(id)
        .fetch_all(conn)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(item_id, quantity)| (ProductId::new(item_id), quantity))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    async fn seed_user(pool: &SqlitePool, email: &str) -> UserId {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (name, email, phone, password_hash) VALUES ('U', ?, NULL, 'x') \
             RETURNING id",
        )
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap();
        UserId::new(id)
    }

    fn new_order(number: &str, user_id: UserId, vendor_id: UserId) -> NewOrder<'_> {
        NewOrder {
            order_number: number,
            user_id,
            vendor_id: Some(vendor_id),
            order_type: ItemType::Product,
            subtotal: Money::from_rupees(100),
            delivery_fee: Money::from_rupees(39),
            total: Money::from_rupees(139),
            payment_method: "cod",
            delivery_address: "12 Trunk Road",
            delivery_area: Some("Magunta Layout"),
            delivery_pincode: Some("524003"),
            scheduled_date: None,
            scheduled_time: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_for_both_parties() {
        let pool = create_memory_pool().await.unwrap();
        let buyer = seed_user(&pool, "buyer@nellore.com").await;
        let vendor = seed_user(&pool, "vendor@nellore.com").await;

        let mut tx = pool.begin().await.unwrap();
        let order = OrderRepository::insert(&mut tx, &new_order("NLR1", buyer, vendor))
            .await
            .unwrap();
        OrderRepository::insert_item(
            &mut tx,
            order.id,
            &NewOrderItem {
                item: ItemRef::Product(ProductId::new(5)),
                name: "Rice".to_string(),
                quantity: 2,
                price: Money::from_rupees(50),
                total: Money::from_rupees(100),
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.delivery_city, "Nellore");

        let repo = OrderRepository::new(&pool);
        let mine = repo
            .list(OrderParty::Customer(buyer), None, 20, 0)
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].items.len(), 1);

        let theirs = repo
            .list(OrderParty::Vendor(vendor), Some(OrderStatus::Pending), 20, 0)
            .await
            .unwrap();
        assert_eq!(theirs[0].customer_name.as_deref(), Some("U"));

        let none = repo
            .list(OrderParty::Vendor(vendor), Some(OrderStatus::Completed), 20, 0)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_order_number_is_conflict() {
        let pool = create_memory_pool().await.unwrap();
        let buyer = seed_user(&pool, "b@nellore.com").await;
        let vendor = seed_user(&pool, "v@nellore.com").await;

        let mut conn = pool.acquire().await.unwrap();
        OrderRepository::insert(&mut conn, &new_order("NLRDUP", buyer, vendor))
            .await
            .unwrap();
        let err = OrderRepository::insert(&mut conn, &new_order("NLRDUP", buyer, vendor))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_compare_and_set_status_detects_stale_status() {
        let pool = create_memory_pool().await.unwrap();
        let buyer = seed_user(&pool, "c@nellore.com").await;
        let vendor = seed_user(&pool, "d@nellore.com").await;

        let mut conn = pool.acquire().await.unwrap();
        let order = OrderRepository::insert(&mut conn, &new_order("NLRCAS", buyer, vendor))
            .await
            .unwrap();

        let moved = OrderRepository::compare_and_set_status(
            &mut conn,
            order.id,
            OrderStatus::Pending,
            OrderStatus::Confirmed,
        )
        .await
        .unwrap();
        assert!(moved);

        let stale = OrderRepository::compare_and_set_status(
            &mut conn,
            order.id,
            OrderStatus::Pending,
            OrderStatus::Cancelled,
        )
        .await
        .unwrap();
        assert!(!stale);
    }

    #[tokio::test]
    async fn test_get_visible_hides_other_users_orders() {
        let pool = create_memory_pool().await.unwrap();
        let buyer = seed_user(&pool, "e@nellore.com").await;
        let vendor = seed_user(&pool, "f@nellore.com").await;
        let stranger = seed_user(&pool, "g@nellore.com").await;

        let order = {
            let mut conn = pool.acquire().await.unwrap();
            OrderRepository::insert(&mut conn, &new_order("NLRVIS", buyer, vendor))
                .await
                .unwrap()
        };

        let repo = OrderRepository::new(&pool);
        assert!(repo.get_visible(order.id, buyer).await.unwrap().is_some());
        assert!(repo.get_visible(order.id, vendor).await.unwrap().is_some());
        assert!(repo.get_visible(order.id, stranger).await.unwrap().is_none());
    }
}

//! Catalog repository: categories, services and products.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};

use nellore_market_core::{CategoryId, ItemType, Money, ProductId, ServiceId, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::catalog::discount_percent;
use crate::models::{
    CatalogItem, Category, ItemRef, Product, ProductListing, Service, ServiceListing,
};

const SERVICE_COLUMNS: &str = "id, category_id, vendor_id, name, slug, description, price, \
     price_unit, duration_mins, rating, review_count, is_active, created_at";

pub(super) const SERVICE_LISTING_SELECT: &str = "SELECT s.id, s.category_id, s.vendor_id, s.name, s.slug, \
     s.description, s.price, s.price_unit, s.duration_mins, s.rating, s.review_count, \
     s.is_active, s.created_at, c.name AS category_name, c.slug AS category_slug, \
     b.business_name, b.phone AS business_phone, b.area AS business_area, \
     COALESCE(b.is_verified, 0) AS vendor_verified, COALESCE(b.rating, 0.0) AS vendor_rating \
     FROM services s \
     JOIN service_categories c ON c.id = s.category_id \
     LEFT JOIN businesses b ON b.user_id = s.vendor_id";

const PRODUCT_COLUMNS: &str = "id, category_id, vendor_id, name, slug, description, price, mrp, \
     stock, unit, image, rating, review_count, is_featured, is_active, created_at";

pub(super) const PRODUCT_LISTING_SELECT: &str = "SELECT p.id, p.category_id, p.vendor_id, p.name, p.slug, \
     p.description, p.price, p.mrp, p.stock, p.unit, p.image, p.rating, p.review_count, \
     p.is_featured, p.is_active, p.created_at, c.name AS category_name, \
     c.slug AS category_slug, b.business_name, b.phone AS business_phone, \
     b.area AS business_area, COALESCE(b.is_verified, 0) AS vendor_verified \
     FROM products p \
     JOIN product_categories c ON c.id = p.category_id \
     LEFT JOIN businesses b ON b.user_id = p.vendor_id";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    icon: Option<String>,
    description: Option<String>,
    image: Option<String>,
    item_count: i64,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
            icon: row.icon,
            description: row.description,
            image: row.image,
            item_count: row.item_count,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: i64,
    category_id: i64,
    vendor_id: Option<i64>,
    name: String,
    slug: String,
    description: Option<String>,
    price: Money,
    price_unit: String,
    duration_mins: Option<i64>,
    rating: f64,
    review_count: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Self {
            id: ServiceId::new(row.id),
            category_id: CategoryId::new(row.category_id),
            vendor_id: row.vendor_id.map(UserId::new),
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            price_unit: row.price_unit,
            duration_mins: row.duration_mins,
            rating: row.rating,
            review_count: row.review_count,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ServiceListingRow {
    #[sqlx(flatten)]
    service: ServiceRow,
    category_name: String,
    category_slug: String,
    business_name: Option<String>,
    business_phone: Option<String>,
    business_area: Option<String>,
    vendor_verified: bool,
    vendor_rating: f64,
}

impl From<ServiceListingRow> for ServiceListing {
    fn from(row: ServiceListingRow) -> Self {
        Self {
            service: row.service.into(),
            category_name: row.category_name,
            category_slug: row.category_slug,
            business_name: row.business_name,
            business_phone: row.business_phone,
            business_area: row.business_area,
            vendor_verified: row.vendor_verified,
            vendor_rating: row.vendor_rating,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    category_id: i64,
    vendor_id: Option<i64>,
    name: String,
    slug: String,
    description: Option<String>,
    price: Money,
    mrp: Option<Money>,
    stock: i64,
    unit: String,
    image: Option<String>,
    rating: f64,
    review_count: i64,
    is_featured: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            category_id: CategoryId::new(row.category_id),
            vendor_id: row.vendor_id.map(UserId::new),
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            mrp: row.mrp,
            stock: row.stock,
            unit: row.unit,
            image: row.image,
            rating: row.rating,
            review_count: row.review_count,
            is_featured: row.is_featured,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductListingRow {
    #[sqlx(flatten)]
    product: ProductRow,
    category_name: String,
    category_slug: String,
    business_name: Option<String>,
    business_phone: Option<String>,
    business_area: Option<String>,
    vendor_verified: bool,
}

impl From<ProductListingRow> for ProductListing {
    fn from(row: ProductListingRow) -> Self {
        let discount_percent = discount_percent(row.product.price, row.product.mrp);
        Self {
            product: row.product.into(),
            category_name: row.category_name,
            category_slug: row.category_slug,
            business_name: row.business_name,
            business_phone: row.business_phone,
            business_area: row.business_area,
            vendor_verified: row.vendor_verified,
            discount_percent,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CatalogItemRow {
    name: String,
    price: Money,
    vendor_id: Option<i64>,
    stock: Option<i64>,
}

// =============================================================================
// Inputs
// =============================================================================

/// Listing order for catalog queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most reviewed first (featured products ahead of the rest).
    #[default]
    Popular,
    PriceLow,
    PriceHigh,
    Rating,
    Newest,
}

/// Filters shared by service and product listings. `featured` and the
/// price bounds only apply to products.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    /// Category slug.
    pub category: Option<String>,
    pub search: Option<String>,
    pub featured: bool,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub sort: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Money,
    pub price_unit: String,
    pub duration_mins: Option<i64>,
}

/// Partial service update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub price_unit: Option<String>,
    pub duration_mins: Option<i64>,
    pub is_active: Option<bool>,
}

impl ServiceUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.price_unit.is_none()
            && self.duration_mins.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Money,
    pub mrp: Money,
    pub stock: i64,
    pub unit: String,
    pub image: Option<String>,
    pub is_featured: bool,
}

/// Partial product update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub mrp: Option<Money>,
    pub stock: Option<i64>,
    pub unit: Option<String>,
    pub image: Option<String>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.mrp.is_none()
            && self.stock.is_none()
            && self.unit.is_none()
            && self.image.is_none()
            && self.is_featured.is_none()
            && self.is_active.is_none()
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
pub struct CatalogRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Active categories of one kind, by name, with active item counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self, kind: ItemType) -> Result<Vec<Category>, RepositoryError> {
        let sql = match kind {
            ItemType::Service => {
                "SELECT c.id, c.name, c.slug, c.icon, c.description, c.image, \
                        COUNT(i.id) AS item_count \
                 FROM service_categories c \
                 LEFT JOIN services i ON i.category_id = c.id AND i.is_active = 1 \
                 WHERE c.is_active = 1 GROUP BY c.id ORDER BY c.name"
            }
            ItemType::Product => {
                "SELECT c.id, c.name, c.slug, c.icon, c.description, c.image, \
                        COUNT(i.id) AS item_count \
                 FROM product_categories c \
                 LEFT JOIN products i ON i.category_id = c.id AND i.is_active = 1 \
                 WHERE c.is_active = 1 GROUP BY c.id ORDER BY c.name"
            }
        };

        let rows: Vec<CategoryRow> = sqlx::query_as(sql).fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Whether an active category of this kind exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_exists(
        &self,
        kind: ItemType,
        id: CategoryId,
    ) -> Result<bool, RepositoryError> {
        let sql = match kind {
            ItemType::Service => {
                "SELECT EXISTS(SELECT 1 FROM service_categories WHERE id = ? AND is_active = 1)"
            }
            ItemType::Product => {
                "SELECT EXISTS(SELECT 1 FROM product_categories WHERE id = ? AND is_active = 1)"
            }
        };
        let exists: bool = sqlx::query_scalar(sql).bind(id).fetch_one(self.pool).await?;
        Ok(exists)
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// Active services matching `filter`, plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_services(
        &self,
        filter: &CatalogFilter,
    ) -> Result<(Vec<ServiceListing>, i64), RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(SERVICE_LISTING_SELECT);
        qb.push(" WHERE s.is_active = 1");
        push_service_filters(&mut qb, filter);
        qb.push(match filter.sort {
            SortOrder::PriceLow => " ORDER BY s.price ASC",
            SortOrder::PriceHigh => " ORDER BY s.price DESC",
            SortOrder::Rating => " ORDER BY s.rating DESC",
            SortOrder::Newest => " ORDER BY s.created_at DESC",
            SortOrder::Popular => " ORDER BY s.review_count DESC, s.rating DESC",
        });
        qb.push(", s.id ASC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows: Vec<ServiceListingRow> = qb.build_query_as().fetch_all(self.pool).await?;

        let mut count = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM services s \
             JOIN service_categories c ON c.id = s.category_id WHERE s.is_active = 1",
        );
        push_service_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// An active service with category and vendor details.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_service_listing(
        &self,
        id: ServiceId,
    ) -> Result<Option<ServiceListing>, RepositoryError> {
        let row: Option<ServiceListingRow> = sqlx::query_as(&format!(
            "{SERVICE_LISTING_SELECT} WHERE s.id = ? AND s.is_active = 1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// A service regardless of its active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_service(&self, id: ServiceId) -> Result<Option<Service>, RepositoryError> {
        let row: Option<ServiceRow> =
            sqlx::query_as(&format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    /// Other active services in the same category, best rated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related_services(
        &self,
        category_id: CategoryId,
        exclude: ServiceId,
        limit: i64,
    ) -> Result<Vec<ServiceListing>, RepositoryError> {
        let rows: Vec<ServiceListingRow> = sqlx::query_as(&format!(
            "{SERVICE_LISTING_SELECT} \
             WHERE s.is_active = 1 AND s.category_id = ? AND s.id != ? \
             ORDER BY s.rating DESC, s.id ASC LIMIT ?"
        ))
        .bind(category_id)
        .bind(exclude)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A vendor's active services, best rated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn services_by_vendor(
        &self,
        vendor_id: UserId,
        limit: i64,
    ) -> Result<Vec<ServiceListing>, RepositoryError> {
        let rows: Vec<ServiceListingRow> = sqlx::query_as(&format!(
            "{SERVICE_LISTING_SELECT} WHERE s.is_active = 1 AND s.vendor_id = ? \
             ORDER BY s.rating DESC, s.id ASC LIMIT ?"
        ))
        .bind(vendor_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a service owned by `vendor_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_service(
        &self,
        vendor_id: UserId,
        new: &NewService,
    ) -> Result<Service, RepositoryError> {
        let row: ServiceRow = sqlx::query_as(&format!(
            "INSERT INTO services \
                (category_id, vendor_id, name, slug, description, price, price_unit, duration_mins) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {SERVICE_COLUMNS}"
        ))
        .bind(new.category_id)
        .bind(vendor_id)
        .bind(&new.name)
        .bind(&new.slug)
        .bind(new.description.as_deref())
        .bind(new.price)
        .bind(&new.price_unit)
        .bind(new.duration_mins)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Apply a partial update to a service.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the service does not exist.
    pub async fn update_service(
        &self,
        id: ServiceId,
        update: &ServiceUpdate,
    ) -> Result<Service, RepositoryError> {
        let row: Option<ServiceRow> = sqlx::query_as(&format!(
            "UPDATE services SET \
                name = COALESCE(?, name), \
                description = COALESCE(?, description), \
                price = COALESCE(?, price), \
                price_unit = COALESCE(?, price_unit), \
                duration_mins = COALESCE(?, duration_mins), \
                is_active = COALESCE(?, is_active) \
             WHERE id = ? RETURNING {SERVICE_COLUMNS}"
        ))
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.price)
        .bind(update.price_unit.as_deref())
        .bind(update.duration_mins)
        .bind(update.is_active)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Active products matching `filter`, plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(
        &self,
        filter: &CatalogFilter,
    ) -> Result<(Vec<ProductListing>, i64), RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(PRODUCT_LISTING_SELECT);
        qb.push(" WHERE p.is_active = 1");
        push_product_filters(&mut qb, filter);
        qb.push(match filter.sort {
            SortOrder::PriceLow => " ORDER BY p.price ASC",
            SortOrder::PriceHigh => " ORDER BY p.price DESC",
            SortOrder::Rating => " ORDER BY p.rating DESC",
            SortOrder::Newest => " ORDER BY p.created_at DESC",
            SortOrder::Popular => " ORDER BY p.is_featured DESC, p.review_count DESC, p.rating DESC",
        });
        qb.push(", p.id ASC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows: Vec<ProductListingRow> = qb.build_query_as().fetch_all(self.pool).await?;

        let mut count = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM products p \
             JOIN product_categories c ON c.id = p.category_id WHERE p.is_active = 1",
        );
        push_product_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Up to `limit` featured products, best rated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured_products(
        &self,
        limit: i64,
    ) -> Result<Vec<ProductListing>, RepositoryError> {
        let rows: Vec<ProductListingRow> = sqlx::query_as(&format!(
            "{PRODUCT_LISTING_SELECT} WHERE p.is_active = 1 AND p.is_featured = 1 \
             ORDER BY p.rating DESC, p.id ASC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// An active product with category and vendor details.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product_listing(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductListing>, RepositoryError> {
        let row: Option<ProductListingRow> = sqlx::query_as(&format!(
            "{PRODUCT_LISTING_SELECT} WHERE p.id = ? AND p.is_active = 1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// A product regardless of its active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    /// Other active products in the same category, best rated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related_products(
        &self,
        category_id: CategoryId,
        exclude: ProductId,
        limit: i64,
    ) -> Result<Vec<ProductListing>, RepositoryError> {
        let rows: Vec<ProductListingRow> = sqlx::query_as(&format!(
            "{PRODUCT_LISTING_SELECT} \
             WHERE p.is_active = 1 AND p.category_id = ? AND p.id != ? \
             ORDER BY p.rating DESC, p.id ASC LIMIT ?"
        ))
        .bind(category_id)
        .bind(exclude)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A vendor's active products, best rated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products_by_vendor(
        &self,
        vendor_id: UserId,
        limit: i64,
    ) -> Result<Vec<ProductListing>, RepositoryError> {
        let rows: Vec<ProductListingRow> = sqlx::query_as(&format!(
            "{PRODUCT_LISTING_SELECT} WHERE p.is_active = 1 AND p.vendor_id = ? \
             ORDER BY p.rating DESC, p.id ASC LIMIT ?"
        ))
        .bind(vendor_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a product owned by `vendor_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_product(
        &self,
        vendor_id: UserId,
        new: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO products \
                (category_id, vendor_id, name, slug, description, price, mrp, stock, unit, \
                 image, is_featured) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(new.category_id)
        .bind(vendor_id)
        .bind(&new.name)
        .bind(&new.slug)
        .bind(new.description.as_deref())
        .bind(new.price)
        .bind(new.mrp)
        .bind(new.stock)
        .bind(&new.unit)
        .bind(new.image.as_deref())
        .bind(new.is_featured)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Apply a partial update to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "UPDATE products SET \
                name = COALESCE(?, name), \
                description = COALESCE(?, description), \
                price = COALESCE(?, price), \
                mrp = COALESCE(?, mrp), \
                stock = COALESCE(?, stock), \
                unit = COALESCE(?, unit), \
                image = COALESCE(?, image), \
                is_featured = COALESCE(?, is_featured), \
                is_active = COALESCE(?, is_active) \
             WHERE id = ? RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.price)
        .bind(update.mrp)
        .bind(update.stock)
        .bind(update.unit.as_deref())
        .bind(update.image.as_deref())
        .bind(update.is_featured)
        .bind(update.is_active)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    // =========================================================================
    // Cart & checkout helpers
    // =========================================================================

    /// Live name, price, vendor and stock of an active catalog entry.
    ///
    /// Accepts the pool or an open transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_active_item<'e, E>(
        executor: E,
        item: ItemRef,
    ) -> Result<Option<CatalogItem>, RepositoryError>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = match item {
            ItemRef::Service(_) => {
                "SELECT name, price, vendor_id, NULL AS stock FROM services \
                 WHERE id = ? AND is_active = 1"
            }
            ItemRef::Product(_) => {
                "SELECT name, price, vendor_id, stock FROM products \
                 WHERE id = ? AND is_active = 1"
            }
        };

        let row: Option<CatalogItemRow> = sqlx::query_as(sql)
            .bind(item.raw_id())
            .fetch_optional(executor)
            .await?;

        Ok(row.map(|row| CatalogItem {
            item,
            name: row.name,
            price: row.price,
            vendor_id: row.vendor_id.map(UserId::new),
            stock: row.stock,
        }))
    }

    /// Atomically takes `quantity` units if at least that many are in stock.
    ///
    /// Returns `false` (and changes nothing) when stock is short.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn take_stock(
        conn: &mut SqliteConnection,
        id: ProductId,
        quantity: i64,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE products SET stock = stock - ? WHERE id = ? AND stock >= ?")
                .bind(quantity)
                .bind(id)
                .bind(quantity)
                .execute(conn)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Returns `quantity` units to a product's stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn restore_stock(
        conn: &mut SqliteConnection,
        id: ProductId,
        quantity: i64,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE products SET stock = stock + ? WHERE id = ?")
            .bind(quantity)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

fn push_service_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &CatalogFilter) {
    if let Some(slug) = &filter.category {
        qb.push(" AND c.slug = ").push_bind(slug.clone());
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        qb.push(" AND (s.name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR s.description LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &CatalogFilter) {
    if let Some(slug) = &filter.category {
        qb.push(" AND c.slug = ").push_bind(slug.clone());
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        qb.push(" AND (p.name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR p.description LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if filter.featured {
        qb.push(" AND p.is_featured = 1");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
}

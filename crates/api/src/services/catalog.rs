//! Catalog service: browsing, detail pages and vendor-managed listings.
//!
//! Category lists are cached in memory for five minutes and dropped whenever
//! a listing is created or edited, since each category carries an item count.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::instrument;

use nellore_market_core::{CategoryId, ItemType, Money, ProductId, ReviewType, ServiceId};

use crate::db::catalog::{
    CatalogFilter, NewProduct, NewService, ProductUpdate, ServiceUpdate,
};
use crate::db::{CatalogRepository, RepositoryError, ReviewRepository};
use crate::models::{
    Category, Product, ProductDetail, ProductListing, Service, ServiceDetail, ServiceListing, User,
};
use crate::services::ServiceError;
use crate::services::validation::non_blank;

const DETAIL_REVIEWS: i64 = 10;
const RELATED_ITEMS: i64 = 4;
const FEATURED_PRODUCTS: i64 = 6;

/// In-memory cache of category lists keyed by kind.
pub type CategoryCache = Cache<ItemType, Arc<Vec<Category>>>;

/// Build the category cache (two entries, five-minute TTL).
#[must_use]
pub fn category_cache() -> CategoryCache {
    Cache::builder()
        .max_capacity(2)
        .time_to_live(Duration::from_secs(300))
        .build()
}

/// URL slug for a listing name: lowercase ASCII alphanumerics with every
/// other run of characters collapsed to a single `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// A vendor's new service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDraft {
    pub category_id: Option<CategoryId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub price_unit: Option<String>,
    pub duration_mins: Option<i64>,
}

/// A vendor's new product. `mrp` defaults to the price and `stock` to zero.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDraft {
    pub category_id: Option<CategoryId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub mrp: Option<Money>,
    pub stock: Option<i64>,
    pub unit: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

/// Catalog service.
pub struct CatalogService<'a> {
    catalog: CatalogRepository<'a>,
    reviews: ReviewRepository<'a>,
    categories: &'a CategoryCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, categories: &'a CategoryCache) -> Self {
        Self {
            catalog: CatalogRepository::new(pool),
            reviews: ReviewRepository::new(pool),
            categories,
        }
    }

    /// Active categories of one kind with item counts.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the database operation fails.
    pub async fn categories(&self, kind: ItemType) -> Result<Arc<Vec<Category>>, ServiceError> {
        if let Some(cached) = self.categories.get(&kind).await {
            return Ok(cached);
        }
        let fresh = Arc::new(self.catalog.list_categories(kind).await?);
        self.categories.insert(kind, Arc::clone(&fresh)).await;
        Ok(fresh)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the database operation fails.
    pub async fn list_services(
        &self,
        filter: &CatalogFilter,
    ) -> Result<(Vec<ServiceListing>, i64), ServiceError> {
        Ok(self.catalog.list_services(filter).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the database operation fails.
    pub async fn list_products(
        &self,
        filter: &CatalogFilter,
    ) -> Result<(Vec<ProductListing>, i64), ServiceError> {
        Ok(self.catalog.list_products(filter).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the database operation fails.
    pub async fn featured_products(&self) -> Result<Vec<ProductListing>, ServiceError> {
        Ok(self.catalog.featured_products(FEATURED_PRODUCTS).await?)
    }

    /// An active service with its latest reviews and related services.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the service is missing or inactive.
    pub async fn service_detail(&self, id: ServiceId) -> Result<ServiceDetail, ServiceError> {
        let service = self
            .catalog
            .get_service_listing(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Service not found"))?;

        let reviews = self
            .reviews
            .list_for(ReviewType::Service, id.as_i64(), DETAIL_REVIEWS)
            .await?;
        let related = self
            .catalog
            .related_services(service.service.category_id, id, RELATED_ITEMS)
            .await?;

        Ok(ServiceDetail {
            service,
            reviews,
            related,
        })
    }

    /// An active product with its latest reviews and related products.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product is missing or inactive.
    pub async fn product_detail(&self, id: ProductId) -> Result<ProductDetail, ServiceError> {
        let product = self
            .catalog
            .get_product_listing(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product not found"))?;

        let reviews = self
            .reviews
            .list_for(ReviewType::Product, id.as_i64(), DETAIL_REVIEWS)
            .await?;
        let related = self
            .catalog
            .related_products(product.product.category_id, id, RELATED_ITEMS)
            .await?;

        Ok(ProductDetail {
            product,
            reviews,
            related,
        })
    }

    /// Create a service owned by `vendor`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the category, name or price is
    /// missing or invalid.
    #[instrument(skip(self, vendor, draft), fields(vendor_id = %vendor.id))]
    pub async fn create_service(
        &self,
        vendor: &User,
        draft: ServiceDraft,
    ) -> Result<Service, ServiceError> {
        let (Some(category_id), Some(name), Some(price)) =
            (draft.category_id, non_blank(draft.name.as_deref()), draft.price)
        else {
            return Err(ServiceError::validation(
                "Category, name, and price are required",
            ));
        };
        check_price(price)?;
        if draft.duration_mins.is_some_and(|mins| mins <= 0) {
            return Err(ServiceError::validation("Duration must be positive"));
        }
        self.require_category(ItemType::Service, category_id).await?;

        let service = self
            .catalog
            .create_service(
                vendor.id,
                &NewService {
                    category_id,
                    slug: slugify(&name),
                    name,
                    description: non_blank(draft.description.as_deref()),
                    price,
                    price_unit: non_blank(draft.price_unit.as_deref())
                        .unwrap_or_else(|| "per service".to_string()),
                    duration_mins: draft.duration_mins,
                },
            )
            .await?;

        self.categories.invalidate(&ItemType::Service).await;
        tracing::info!(service_id = %service.id, "service created");
        Ok(service)
    }

    /// Apply a partial update to a service the actor owns (or any service,
    /// for admins).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the service does not exist.
    /// Returns `ServiceError::Forbidden` if the actor does not own it.
    /// Returns `ServiceError::Validation` if the update is empty or invalid.
    #[instrument(skip(self, actor, update), fields(actor_id = %actor.id))]
    pub async fn update_service(
        &self,
        actor: &User,
        id: ServiceId,
        update: ServiceUpdate,
    ) -> Result<Service, ServiceError> {
        let existing = self
            .catalog
            .get_service(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Service not found"))?;
        if existing.vendor_id != Some(actor.id) && !actor.is_admin() {
            return Err(ServiceError::forbidden(
                "Not authorized to update this service",
            ));
        }

        let update = ServiceUpdate {
            name: non_blank(update.name.as_deref()),
            price_unit: non_blank(update.price_unit.as_deref()),
            ..update
        };
        if update.is_empty() {
            return Err(ServiceError::validation("No fields to update"));
        }
        if let Some(price) = update.price {
            check_price(price)?;
        }

        let service = self
            .catalog
            .update_service(id, &update)
            .await
            .map_err(|e| missing_as(e, "Service not found"))?;
        self.categories.invalidate(&ItemType::Service).await;
        Ok(service)
    }

    /// Create a product owned by `vendor`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the category, name or price is
    /// missing or invalid.
    #[instrument(skip(self, vendor, draft), fields(vendor_id = %vendor.id))]
    pub async fn create_product(
        &self,
        vendor: &User,
        draft: ProductDraft,
    ) -> Result<Product, ServiceError> {
        let (Some(category_id), Some(name), Some(price)) =
            (draft.category_id, non_blank(draft.name.as_deref()), draft.price)
        else {
            return Err(ServiceError::validation(
                "Category, name, and price are required",
            ));
        };
        check_price(price)?;
        let mrp = draft.mrp.filter(|mrp| mrp.is_positive()).unwrap_or(price);
        let stock = draft.stock.unwrap_or(0);
        if stock < 0 {
            return Err(ServiceError::validation("Stock cannot be negative"));
        }
        self.require_category(ItemType::Product, category_id).await?;

        let product = self
            .catalog
            .create_product(
                vendor.id,
                &NewProduct {
                    category_id,
                    slug: slugify(&name),
                    name,
                    description: non_blank(draft.description.as_deref()),
                    price,
                    mrp,
                    stock,
                    unit: non_blank(draft.unit.as_deref()).unwrap_or_else(|| "piece".to_string()),
                    image: non_blank(draft.image.as_deref()),
                    is_featured: draft.is_featured,
                },
            )
            .await?;

        self.categories.invalidate(&ItemType::Product).await;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Apply a partial update to a product the actor owns (or any product,
    /// for admins).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    /// Returns `ServiceError::Forbidden` if the actor does not own it.
    /// Returns `ServiceError::Validation` if the update is empty or invalid.
    #[instrument(skip(self, actor, update), fields(actor_id = %actor.id))]
    pub async fn update_product(
        &self,
        actor: &User,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, ServiceError> {
        let existing = self
            .catalog
            .get_product(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product not found"))?;
        if existing.vendor_id != Some(actor.id) && !actor.is_admin() {
            return Err(ServiceError::forbidden(
                "Not authorized to update this product",
            ));
        }

        let update = ProductUpdate {
            name: non_blank(update.name.as_deref()),
            unit: non_blank(update.unit.as_deref()),
            ..update
        };
        if update.is_empty() {
            return Err(ServiceError::validation("No fields to update"));
        }
        if let Some(price) = update.price {
            check_price(price)?;
        }
        if update.stock.is_some_and(|stock| stock < 0) {
            return Err(ServiceError::validation("Stock cannot be negative"));
        }

        let product = self
            .catalog
            .update_product(id, &update)
            .await
            .map_err(|e| missing_as(e, "Product not found"))?;
        self.categories.invalidate(&ItemType::Product).await;
        Ok(product)
    }

    async fn require_category(&self, kind: ItemType, id: CategoryId) -> Result<(), ServiceError> {
        if self.catalog.category_exists(kind, id).await? {
            Ok(())
        } else {
            Err(ServiceError::validation("Invalid category"))
        }
    }
}

fn check_price(price: Money) -> Result<(), ServiceError> {
    if price.is_negative() {
        return Err(ServiceError::validation("Price cannot be negative"));
    }
    Ok(())
}

fn missing_as(err: RepositoryError, msg: &str) -> ServiceError {
    match err {
        RepositoryError::NotFound => ServiceError::not_found(msg),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::db::users::{NewUser, UserRepository};
    use nellore_market_core::{Email, UserRole};

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("AC Repair & Service"), "ac-repair-service");
        assert_eq!(slugify("  Fresh Curd (1L) "), "fresh-curd-1l");
        assert_eq!(slugify("Nellore"), "nellore");
        assert_eq!(slugify("***"), "");
    }

    async fn vendor(pool: &SqlitePool, email: &str, role: UserRole) -> User {
        UserRepository::new(pool)
            .create(&NewUser {
                name: "Vendor",
                email: &Email::parse(email).unwrap(),
                phone: None,
                password_hash: "hash",
                role,
            })
            .await
            .unwrap()
    }

    fn draft(category_id: i64) -> ServiceDraft {
        ServiceDraft {
            category_id: Some(CategoryId::new(category_id)),
            name: Some("Split AC Service".to_string()),
            description: None,
            price: Some(Money::from_rupees(499)),
            price_unit: None,
            duration_mins: Some(60),
        }
    }

    #[tokio::test]
    async fn test_create_and_update_service_ownership() {
        let pool = create_memory_pool().await.unwrap();
        sqlx::query("INSERT INTO service_categories (id, name, slug) VALUES (1, 'AC Repair', 'ac-repair')")
            .execute(&pool)
            .await
            .unwrap();
        let cache = category_cache();
        let catalog = CatalogService::new(&pool, &cache);
        let owner = vendor(&pool, "owner@example.com", UserRole::Vendor).await;
        let other = vendor(&pool, "other@example.com", UserRole::Vendor).await;
        let admin = vendor(&pool, "admin@example.com", UserRole::Admin).await;

        let before = catalog.categories(ItemType::Service).await.unwrap();
        assert_eq!(before[0].item_count, 0);

        let service = catalog.create_service(&owner, draft(1)).await.unwrap();
        assert_eq!(service.slug, "split-ac-service");
        assert_eq!(service.price_unit, "per service");

        let after = catalog.categories(ItemType::Service).await.unwrap();
        assert_eq!(after[0].item_count, 1);

        let bump = ServiceUpdate {
            price: Some(Money::from_rupees(549)),
            ..ServiceUpdate::default()
        };
        assert!(matches!(
            catalog.update_service(&other, service.id, bump.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            catalog
                .update_service(&owner, service.id, ServiceUpdate::default())
                .await,
            Err(ServiceError::Validation(_))
        ));
        let updated = catalog
            .update_service(&admin, service.id, bump)
            .await
            .unwrap();
        assert_eq!(updated.price, Money::from_rupees(549));

        assert!(matches!(
            catalog
                .update_service(&owner, ServiceId::new(999), ServiceUpdate::default())
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let pool = create_memory_pool().await.unwrap();
        let cache = category_cache();
        let catalog = CatalogService::new(&pool, &cache);
        let owner = vendor(&pool, "owner@example.com", UserRole::Vendor).await;

        let missing_name = ServiceDraft {
            name: Some("  ".to_string()),
            ..draft(1)
        };
        assert!(matches!(
            catalog.create_service(&owner, missing_name).await,
            Err(ServiceError::Validation(ref m)) if m == "Category, name, and price are required"
        ));
        assert!(matches!(
            catalog.create_service(&owner, draft(42)).await,
            Err(ServiceError::Validation(ref m)) if m == "Invalid category"
        ));
    }
}

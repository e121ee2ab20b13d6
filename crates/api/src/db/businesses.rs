//! Business profile repository.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use nellore_market_core::{BusinessId, BusinessType, Money, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::{Business, BusinessListing, VendorStats};

const BUSINESS_COLUMNS: &str = "id, user_id, business_name, business_type, description, logo, \
     address, area, city, pincode, phone, whatsapp, email, gstin, is_verified, rating, \
     review_count, is_active, created_at";

const JOINED_BUSINESS_COLUMNS: &str = "b.id, b.user_id, b.business_name, b.business_type, \
     b.description, b.logo, b.address, b.area, b.city, b.pincode, b.phone, b.whatsapp, \
     b.email, b.gstin, b.is_verified, b.rating, b.review_count, b.is_active, b.created_at";

#[derive(Debug, sqlx::FromRow)]
struct BusinessRow {
    id: i64,
    user_id: i64,
    business_name: String,
    business_type: BusinessType,
    description: Option<String>,
    logo: Option<String>,
    address: Option<String>,
    area: Option<String>,
    city: String,
    pincode: Option<String>,
    phone: Option<String>,
    whatsapp: Option<String>,
    email: Option<String>,
    gstin: Option<String>,
    is_verified: bool,
    rating: f64,
    review_count: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<BusinessRow> for Business {
    fn from(row: BusinessRow) -> Self {
        Self {
            id: BusinessId::new(row.id),
            user_id: UserId::new(row.user_id),
            business_name: row.business_name,
            business_type: row.business_type,
            description: row.description,
            logo: row.logo,
            address: row.address,
            area: row.area,
            city: row.city,
            pincode: row.pincode,
            phone: row.phone,
            whatsapp: row.whatsapp,
            email: row.email,
            gstin: row.gstin,
            is_verified: row.is_verified,
            rating: row.rating,
            review_count: row.review_count,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BusinessListingRow {
    #[sqlx(flatten)]
    business: BusinessRow,
    owner_name: String,
    owner_email: Option<String>,
}

impl From<BusinessListingRow> for BusinessListing {
    fn from(row: BusinessListingRow) -> Self {
        Self {
            business: row.business.into(),
            owner_name: row.owner_name,
            owner_email: row.owner_email,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VendorStatsRow {
    total_orders: i64,
    pending_orders: i64,
    completed_orders: i64,
    total_revenue: Money,
    total_services: i64,
    total_products: i64,
}

/// Directory filters.
#[derive(Debug, Clone, Default)]
pub struct BusinessFilter {
    /// Matches this type or `both`.
    pub business_type: Option<BusinessType>,
    pub area: Option<String>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// A validated business registration.
#[derive(Debug, Clone)]
pub struct NewBusiness {
    pub user_id: UserId,
    pub business_name: String,
    pub business_type: BusinessType,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub address: String,
    pub area: String,
    pub pincode: String,
    pub phone: String,
    pub whatsapp: String,
    pub email: Option<String>,
    pub gstin: Option<String>,
}

/// Partial profile update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessUpdate {
    pub business_name: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub address: Option<String>,
    pub area: Option<String>,
    pub pincode: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
}

impl BusinessUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.business_name.is_none()
            && self.description.is_none()
            && self.logo.is_none()
            && self.address.is_none()
            && self.area.is_none()
            && self.pincode.is_none()
            && self.phone.is_none()
            && self.whatsapp.is_none()
            && self.email.is_none()
    }
}

/// Repository for business database operations.
pub struct BusinessRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BusinessRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Active businesses, verified first, then by rating.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &BusinessFilter,
    ) -> Result<Vec<BusinessListing>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {JOINED_BUSINESS_COLUMNS}, u.name AS owner_name, NULL AS owner_email \
             FROM businesses b JOIN users u ON u.id = b.user_id WHERE b.is_active = 1"
        ));
        if let Some(kind) = filter.business_type {
            qb.push(" AND (b.business_type = ")
                .push_bind(kind)
                .push(" OR b.business_type = 'both')");
        }
        if let Some(area) = &filter.area {
            qb.push(" AND b.area LIKE ")
                .push_bind(like_pattern(area))
                .push(" ESCAPE '\\'");
        }
        if let Some(term) = &filter.search {
            let pattern = like_pattern(term);
            qb.push(" AND (b.business_name LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR b.description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        qb.push(" ORDER BY b.is_verified DESC, b.rating DESC, b.id ASC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows: Vec<BusinessListingRow> = qb.build_query_as().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// An active business with its owner's name and email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_listing(
        &self,
        id: BusinessId,
    ) -> Result<Option<BusinessListing>, RepositoryError> {
        let row: Option<BusinessListingRow> = sqlx::query_as(&format!(
            "SELECT {JOINED_BUSINESS_COLUMNS}, u.name AS owner_name, u.email AS owner_email \
             FROM businesses b JOIN users u ON u.id = b.user_id \
             WHERE b.id = ? AND b.is_active = 1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// The business owned by a user, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<Option<Business>, RepositoryError> {
        let row: Option<BusinessRow> = sqlx::query_as(&format!(
            "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE user_id = ?"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Insert a business inside an open transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already owns a business.
    pub async fn create(
        conn: &mut SqliteConnection,
        new: &NewBusiness,
    ) -> Result<Business, RepositoryError> {
        let row: BusinessRow = sqlx::query_as(&format!(
            "INSERT INTO businesses \
                (user_id, business_name, business_type, description, logo, address, area, \
                 pincode, phone, whatsapp, email, gstin) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {BUSINESS_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(&new.business_name)
        .bind(new.business_type)
        .bind(new.description.as_deref())
        .bind(new.logo.as_deref())
        .bind(&new.address)
        .bind(&new.area)
        .bind(&new.pincode)
        .bind(&new.phone)
        .bind(&new.whatsapp)
        .bind(new.email.as_deref())
        .bind(new.gstin.as_deref())
        .fetch_one(conn)
        .await
        .map_err(|e| {
            RepositoryError::conflict_on_unique(e, "You already have a registered business")
        })?;
        Ok(row.into())
    }

    /// Apply a partial update to the business owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user owns no business.
    pub async fn update_for_owner(
        &self,
        user_id: UserId,
        update: &BusinessUpdate,
    ) -> Result<Business, RepositoryError> {
        let row: Option<BusinessRow> = sqlx::query_as(&format!(
            "UPDATE businesses SET \
                business_name = COALESCE(?, business_name), \
                description = COALESCE(?, description), \
                logo = COALESCE(?, logo), \
                address = COALESCE(?, address), \
                area = COALESCE(?, area), \
                pincode = COALESCE(?, pincode), \
                phone = COALESCE(?, phone), \
                whatsapp = COALESCE(?, whatsapp), \
                email = COALESCE(?, email) \
             WHERE user_id = ? RETURNING {BUSINESS_COLUMNS}"
        ))
        .bind(update.business_name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.logo.as_deref())
        .bind(update.address.as_deref())
        .bind(update.area.as_deref())
        .bind(update.pincode.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.whatsapp.as_deref())
        .bind(update.email.as_deref())
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Order and catalog counters for a vendor's dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn vendor_stats(&self, vendor_id: UserId) -> Result<VendorStats, RepositoryError> {
        let row: VendorStatsRow = sqlx::query_as(
            "SELECT \
                (SELECT COUNT(*) FROM orders WHERE vendor_id = ?1) AS total_orders, \
                (SELECT COUNT(*) FROM orders WHERE vendor_id = ?1 AND status = 'pending') \
                    AS pending_orders, \
                (SELECT COUNT(*) FROM orders WHERE vendor_id = ?1 AND status = 'completed') \
                    AS completed_orders, \
                (SELECT COALESCE(SUM(total), 0) FROM orders \
                    WHERE vendor_id = ?1 AND status = 'completed') AS total_revenue, \
                (SELECT COUNT(*) FROM services WHERE vendor_id = ?1 AND is_active = 1) \
                    AS total_services, \
                (SELECT COUNT(*) FROM products WHERE vendor_id = ?1 AND is_active = 1) \
                    AS total_products",
        )
        .bind(vendor_id)
        .fetch_one(self.pool)
        .await?;

        Ok(VendorStats {
            total_orders: row.total_orders,
            pending_orders: row.pending_orders,
            completed_orders: row.completed_orders,
            total_revenue: row.total_revenue,
            total_services: row.total_services,
            total_products: row.total_products,
        })
    }
}

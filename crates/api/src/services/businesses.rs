//! Vendor business profiles.

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::instrument;

use nellore_market_core::{BusinessId, BusinessType, ReviewType, UserRole};

use crate::db::businesses::{BusinessFilter, BusinessUpdate, NewBusiness};
use crate::db::{BusinessRepository, CatalogRepository, RepositoryError, ReviewRepository, UserRepository};
use crate::models::{Business, BusinessDetail, BusinessListing, User, VendorStats};
use crate::services::ServiceError;
use crate::services::validation::{is_indian_mobile, is_pincode, non_blank};

const DETAIL_LISTINGS: i64 = 10;
const DETAIL_REVIEWS: i64 = 10;

/// A business registration as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessDraft {
    pub business_name: Option<String>,
    pub business_type: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub address: Option<String>,
    pub area: Option<String>,
    pub pincode: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
    pub gstin: Option<String>,
}

/// Business service.
pub struct BusinessService<'a> {
    pool: &'a SqlitePool,
    businesses: BusinessRepository<'a>,
}

impl<'a> BusinessService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            businesses: BusinessRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the database operation fails.
    pub async fn list(&self, filter: &BusinessFilter) -> Result<Vec<BusinessListing>, ServiceError> {
        Ok(self.businesses.list(filter).await?)
    }

    /// A business with its owner, top listings and latest reviews.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the business is missing or inactive.
    pub async fn detail(&self, id: BusinessId) -> Result<BusinessDetail, ServiceError> {
        let business = self
            .businesses
            .get_listing(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Business not found"))?;

        let catalog = CatalogRepository::new(self.pool);
        let owner = business.business.user_id;
        let services = catalog.services_by_vendor(owner, DETAIL_LISTINGS).await?;
        let products = catalog.products_by_vendor(owner, DETAIL_LISTINGS).await?;
        let reviews = ReviewRepository::new(self.pool)
            .list_for(ReviewType::Business, id.as_i64(), DETAIL_REVIEWS)
            .await?;

        Ok(BusinessDetail {
            business,
            services,
            products,
            reviews,
        })
    }

    /// Register `user`'s business and make them a vendor.
    ///
    /// The insert and the role change commit together.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if a required field is missing or
    /// malformed.
    /// Returns `ServiceError::Conflict` if the user already has a business.
    #[instrument(skip(self, user, draft), fields(user_id = %user.id))]
    pub async fn register(&self, user: &User, draft: BusinessDraft) -> Result<Business, ServiceError> {
        let new = validate_registration(user, draft)?;

        let mut tx = self.pool.begin().await?;
        let business = BusinessRepository::create(&mut tx, &new)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) => ServiceError::Conflict(msg),
                other => other.into(),
            })?;
        if user.role == UserRole::Customer {
            UserRepository::set_role(&mut tx, user.id, UserRole::Vendor).await?;
        }
        tx.commit().await?;

        tracing::info!(business_id = %business.id, "business registered");
        Ok(business)
    }

    /// Apply a partial update to the caller's own business.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if nothing was supplied or a
    /// field is malformed.
    /// Returns `ServiceError::NotFound` if the caller has no business.
    pub async fn update(&self, user: &User, update: BusinessUpdate) -> Result<Business, ServiceError> {
        let update = BusinessUpdate {
            business_name: non_blank(update.business_name.as_deref()),
            description: non_blank(update.description.as_deref()),
            logo: non_blank(update.logo.as_deref()),
            address: non_blank(update.address.as_deref()),
            area: non_blank(update.area.as_deref()),
            pincode: non_blank(update.pincode.as_deref()),
            phone: non_blank(update.phone.as_deref()),
            whatsapp: non_blank(update.whatsapp.as_deref()),
            email: non_blank(update.email.as_deref()),
        };
        if update.is_empty() {
            return Err(ServiceError::validation("No fields to update"));
        }
        if update.pincode.as_deref().is_some_and(|p| !is_pincode(p)) {
            return Err(ServiceError::validation("Valid pincode required"));
        }
        if update.phone.as_deref().is_some_and(|p| !is_indian_mobile(p)) {
            return Err(ServiceError::validation("Valid phone required"));
        }

        self.businesses
            .update_for_owner(user.id, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ServiceError::not_found("Business not found"),
                other => other.into(),
            })
    }

    /// The caller's business with its dashboard counters.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the caller has no business.
    pub async fn stats(&self, user: &User) -> Result<(Business, VendorStats), ServiceError> {
        let business = self
            .businesses
            .get_by_user(user.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Business not found"))?;
        let stats = self.businesses.vendor_stats(user.id).await?;
        Ok((business, stats))
    }
}

fn validate_registration(user: &User, draft: BusinessDraft) -> Result<NewBusiness, ServiceError> {
    let business_name = non_blank(draft.business_name.as_deref())
        .ok_or_else(|| ServiceError::validation("Business name required"))?;
    let business_type: BusinessType = draft
        .business_type
        .as_deref()
        .and_then(|t| t.trim().parse().ok())
        .ok_or_else(|| ServiceError::validation("Invalid business type"))?;
    let address = non_blank(draft.address.as_deref())
        .ok_or_else(|| ServiceError::validation("Address required"))?;
    let area = non_blank(draft.area.as_deref())
        .ok_or_else(|| ServiceError::validation("Area required"))?;
    let pincode = non_blank(draft.pincode.as_deref())
        .filter(|p| is_pincode(p))
        .ok_or_else(|| ServiceError::validation("Valid pincode required"))?;
    let phone = non_blank(draft.phone.as_deref())
        .filter(|p| is_indian_mobile(p))
        .ok_or_else(|| ServiceError::validation("Valid phone required"))?;
    let whatsapp = non_blank(draft.whatsapp.as_deref()).unwrap_or_else(|| phone.clone());

    Ok(NewBusiness {
        user_id: user.id,
        business_name,
        business_type,
        description: non_blank(draft.description.as_deref()),
        logo: non_blank(draft.logo.as_deref()),
        address,
        area,
        pincode,
        phone,
        whatsapp,
        email: non_blank(draft.email.as_deref()),
        gstin: non_blank(draft.gstin.as_deref()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::db::users::NewUser;
    use nellore_market_core::Email;

    fn draft() -> BusinessDraft {
        BusinessDraft {
            business_name: Some("Sri Sai Dairy".to_string()),
            business_type: Some("product".to_string()),
            address: Some("4/12 Stonehousepet".to_string()),
            area: Some("Stonehousepet".to_string()),
            pincode: Some("524002".to_string()),
            phone: Some("9848012345".to_string()),
            ..BusinessDraft::default()
        }
    }

    async fn customer(pool: &SqlitePool) -> User {
        UserRepository::new(pool)
            .create(&NewUser {
                name: "Sai",
                email: &Email::parse("sai@example.com").unwrap(),
                phone: None,
                password_hash: "hash",
                role: UserRole::Customer,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_promotes_to_vendor_once() {
        let pool = create_memory_pool().await.unwrap();
        let user = customer(&pool).await;
        let service = BusinessService::new(&pool);

        let business = service.register(&user, draft()).await.unwrap();
        assert_eq!(business.whatsapp.as_deref(), Some("9848012345"));
        assert!(!business.is_verified);

        let reloaded = UserRepository::new(&pool)
            .get_by_id(user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.role, UserRole::Vendor);

        assert!(matches!(
            service.register(&reloaded, draft()).await,
            Err(ServiceError::Conflict(ref m)) if m == "You already have a registered business"
        ));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let pool = create_memory_pool().await.unwrap();
        let user = customer(&pool).await;
        let service = BusinessService::new(&pool);

        let cases = [
            (BusinessDraft { business_type: Some("florist".to_string()), ..draft() }, "Invalid business type"),
            (BusinessDraft { pincode: Some("52400".to_string()), ..draft() }, "Valid pincode required"),
            (BusinessDraft { phone: Some("123".to_string()), ..draft() }, "Valid phone required"),
            (BusinessDraft { area: None, ..draft() }, "Area required"),
        ];
        for (input, expected) in cases {
            assert!(matches!(
                service.register(&user, input).await,
                Err(ServiceError::Validation(ref m)) if m == expected
            ));
        }
    }

    #[tokio::test]
    async fn test_update_and_stats() {
        let pool = create_memory_pool().await.unwrap();
        let user = customer(&pool).await;
        let service = BusinessService::new(&pool);

        assert!(matches!(
            service.stats(&user).await,
            Err(ServiceError::NotFound(_))
        ));
        service.register(&user, draft()).await.unwrap();

        assert!(matches!(
            service.update(&user, BusinessUpdate::default()).await,
            Err(ServiceError::Validation(ref m)) if m == "No fields to update"
        ));
        let updated = service
            .update(
                &user,
                BusinessUpdate {
                    description: Some("Fresh milk twice a day".to_string()),
                    ..BusinessUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("Fresh milk twice a day"));

        let (business, stats) = service.stats(&user).await.unwrap();
        assert_eq!(business.id, updated.id);
        assert_eq!(stats.total_orders, 0);

        let detail = service.detail(business.id).await.unwrap();
        assert_eq!(detail.business.owner_name, "Sai");
        assert!(detail.services.is_empty());
    }
}

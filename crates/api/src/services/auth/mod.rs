//! Authentication service.
//!
//! Password accounts with bearer tokens. Passwords are hashed with Argon2id;
//! tokens are HS256-signed and carry the user's id, email and role.

mod error;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, TokenError, TokenSigner};

use sqlx::SqlitePool;
use tracing::instrument;

use nellore_market_core::{Email, UserRole};

use crate::db::users::{NewUser, ProfileUpdate, UserRepository};
use crate::db::{BusinessRepository, RepositoryError};
use crate::models::{Business, User};
use crate::services::validation::{is_indian_mobile, non_blank};

use password::{hash_password, validate_password, verify_password};

/// Input for a new account.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub password: &'a str,
    /// Requested role; only `vendor` is honoured, anything else registers a
    /// customer.
    pub role: Option<&'a str>,
}

/// Authentication service.
///
/// Handles registration, login, profile edits and token verification.
pub struct AuthService<'a> {
    pool: &'a SqlitePool,
    users: UserRepository<'a>,
    signer: &'a TokenSigner,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, signer: &'a TokenSigner) -> Self {
        Self {
            pool,
            users: UserRepository::new(pool),
            signer,
        }
    }

    /// Register a new account and issue its first token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` for a blank name or a bad phone number.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UserAlreadyExists` if the email or phone is taken.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration<'_>) -> Result<(User, String), AuthError> {
        let name = non_blank(Some(registration.name))
            .ok_or_else(|| AuthError::InvalidInput("Name is required".to_string()))?;
        let email = Email::parse(registration.email)?;
        let phone = non_blank(registration.phone);
        if let Some(phone) = phone.as_deref()
            && !is_indian_mobile(phone)
        {
            return Err(AuthError::InvalidInput("Valid phone number required".to_string()));
        }
        validate_password(registration.password)?;

        let role = if registration.role == Some(UserRole::Vendor.as_str()) {
            UserRole::Vendor
        } else {
            UserRole::Customer
        };

        // Email is reported ahead of phone when both are taken.
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists(
                "Email already registered".to_string(),
            ));
        }

        let password_hash = hash_password(registration.password)?;

        let user = self
            .users
            .create(&NewUser {
                name: &name,
                email: &email,
                phone: phone.as_deref(),
                password_hash: &password_hash,
                role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) => AuthError::UserAlreadyExists(msg),
                other => AuthError::Repository(other),
            })?;

        let token = self.signer.issue(&user)?;
        tracing::info!(user_id = %user.id, role = %user.role, "account registered");
        Ok((user, token))
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.signer.issue(&user)?;
        Ok((user, token))
    }

    /// Resolve a bearer token to the current user record.
    ///
    /// The user is re-read on every call so role changes apply immediately.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is rejected.
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.signer.verify(token)?;
        self.users
            .get_by_id(claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// The user's profile and, for vendors, their business.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn profile(&self, user: &User) -> Result<Option<Business>, AuthError> {
        if user.role != UserRole::Vendor {
            return Ok(None);
        }
        let business = BusinessRepository::new(self.pool).get_by_user(user.id).await?;
        Ok(business)
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` if nothing usable was supplied or the
    /// phone number is invalid.
    /// Returns `AuthError::UserAlreadyExists` if the new phone is taken.
    #[instrument(skip(self, update), fields(user_id = %user.id))]
    pub async fn update_profile(&self, user: &User, update: ProfileUpdate) -> Result<User, AuthError> {
        let update = ProfileUpdate {
            name: non_blank(update.name.as_deref()),
            phone: non_blank(update.phone.as_deref()),
            address: non_blank(update.address.as_deref()),
            city: non_blank(update.city.as_deref()),
        };
        if update.is_empty() {
            return Err(AuthError::InvalidInput("No fields to update".to_string()));
        }
        if let Some(phone) = update.phone.as_deref()
            && !is_indian_mobile(phone)
        {
            return Err(AuthError::InvalidInput("Valid phone number required".to_string()));
        }

        self.users
            .update_profile(user.id, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) => AuthError::UserAlreadyExists(msg),
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Replace the password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong.
    /// Returns `AuthError::WeakPassword` if `new` is too short.
    #[instrument(skip(self, current, new), fields(user_id = %user.id))]
    pub async fn change_password(
        &self,
        user: &User,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let hash = self
            .users
            .get_password_hash(user.id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        verify_password(current, &hash)?;
        validate_password(new)?;

        let new_hash = hash_password(new)?;
        self.users.update_password(user.id, &new_hash).await?;
        tracing::info!("password changed");
        Ok(())
    }
}

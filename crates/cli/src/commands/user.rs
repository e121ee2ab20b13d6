//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! nm-cli user create -n "Admin" -e admin@example.com -p 'long-passphrase' -r admin
//! ```
//!
//! Unlike `POST /api/auth/register`, this can create `admin` accounts.

use thiserror::Error;

use nellore_market_api::db::RepositoryError;
use nellore_market_api::db::users::{NewUser, UserRepository};
use nellore_market_api::services::AuthError;
use nellore_market_api::services::auth::password::{hash_password, validate_password};
use nellore_market_core::{Email, UserId, UserRole};

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid role: {0}. Valid roles: customer, vendor, admin")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Name is required")]
    MissingName,

    #[error(transparent)]
    Password(#[from] AuthError),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

/// Create an account with the given role.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Result<UserId, UserError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|_| UserError::InvalidEmail(email.to_owned()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(UserError::MissingName);
    }
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let pool = super::connect().await?;

    tracing::info!("Creating user: {} ({})", email.as_str(), role);
    let user = UserRepository::new(&pool)
        .create(&NewUser {
            name,
            email: &email,
            phone: None,
            password_hash: &password_hash,
            role,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(msg) => UserError::UserExists(msg),
            other => UserError::Repository(other),
        })?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email.as_str(),
        user.role
    );
    Ok(user.id)
}

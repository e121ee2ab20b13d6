//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] nellore_market_core::EmailError),

    /// Wrong password or unknown email.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Name, phone or profile input rejected.
    #[error("{0}")]
    InvalidInput(String),

    /// Password too short.
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    /// Email or phone already registered.
    #[error("{0}")]
    UserAlreadyExists(String),

    /// Bearer token missing, malformed, badly signed, or expired.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] super::token::TokenError),

    /// Token subject no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

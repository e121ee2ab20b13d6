//! Error type shared by the marketplace domain services.

use thiserror::Error;

use nellore_market_core::OrderStatus;

use crate::db::RepositoryError;

/// Errors raised by catalog, cart, order, review, business and research
/// operations.
///
/// Messages are user-facing; handlers return them verbatim except for
/// `Repository`, which is reported as an internal error.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// The entity is absent, inactive, or not visible to the caller.
    #[error("{0}")]
    NotFound(String),

    /// A product line asks for more units than are in stock.
    #[error("{0}")]
    InsufficientStock(String),

    /// The caller does not own the resource.
    #[error("{0}")]
    Forbidden(String),

    /// The requested order status is not one of the known statuses.
    #[error("Invalid status")]
    InvalidStatus(String),

    /// The order lifecycle does not allow this move.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Duplicate of something that must be unique.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub(crate) fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_user_facing() {
        assert_eq!(
            ServiceError::validation("Valid quantity required").to_string(),
            "Valid quantity required"
        );
        let err = ServiceError::InvalidTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Pending,
        };
        assert_eq!(
            err.to_string(),
            "Cannot change order status from completed to pending"
        );
    }
}

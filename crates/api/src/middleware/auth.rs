//! Bearer token extractors.
//!
//! Handlers that need a caller take [`RequireAuth`]; vendor-only handlers take
//! [`RequireVendor`]. Both resolve `Authorization: Bearer <token>` to a fresh
//! user record, so role changes apply on the next request.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use nellore_market_core::UserRole;

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

const NO_TOKEN: &str = "Access denied. No token provided.";
const BAD_TOKEN: &str = "Invalid or expired token.";
const VENDOR_ONLY: &str = "Access denied. Vendor privileges required.";

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     Json(user)
/// }
/// ```
pub struct RequireAuth(pub User);

/// Extractor that requires a vendor or admin account.
pub struct RequireVendor(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| AppError::Unauthorized(NO_TOKEN.to_string()))?;

        let user = AuthService::new(state.pool(), state.signer())
            .authenticate(token)
            .await
            .map_err(|e| match e {
                AuthError::Repository(_) => AppError::Auth(e),
                _ => AppError::Unauthorized(BAD_TOKEN.to_string()),
            })?;

        Span::current().record("user_id", user.id.as_i64());
        set_sentry_user(&user.id, Some(user.email.as_str()));

        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireVendor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !matches!(user.role, UserRole::Vendor | UserRole::Admin) {
            return Err(AppError::Forbidden(VENDOR_ONLY.to_string()));
        }
        Ok(Self(user))
    }
}

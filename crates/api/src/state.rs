//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::ApiConfig;
use crate::services::CategoryCache;
use crate::services::auth::{TokenError, TokenSigner};
use crate::services::catalog::category_cache;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool and the token signer.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: SqlitePool,
    signer: TokenSigner,
    categories: CategoryCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the token secret cannot key the signer.
    pub fn new(config: ApiConfig, pool: SqlitePool) -> Result<Self, TokenError> {
        let signer = TokenSigner::new(&config.token_secret, config.token_ttl)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                signer,
                categories: category_cache(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Bearer token signer and verifier.
    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.inner.signer
    }

    /// Per-kind category listings, refreshed every five minutes.
    #[must_use]
    pub fn categories(&self) -> &CategoryCache {
        &self.inner.categories
    }
}

//! Rate limiting middleware using governor and `tower_governor`.
//!
//! One limiter covers every `/api` route. Each client IP gets a bucket of
//! `max_requests` tokens that refills evenly over the configured window;
//! exhausted clients receive `429 Too Many Requests`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::config::RateLimitConfig;

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Key extractor that prefers proxy headers and falls back to the peer
/// address of the TCP connection.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

fn header_ip<T>(req: &Request<T>, name: &str) -> Option<IpAddr> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        // CF-Connecting-IP, then the first X-Forwarded-For hop, then X-Real-IP
        ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"]
            .into_iter()
            .find_map(|name| header_ip(req, name))
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Time to earn back one request so a full bucket refills over one window.
fn replenish_period(config: RateLimitConfig) -> Duration {
    (config.window / config.max_requests.max(1)).max(Duration::from_millis(1))
}

/// Create the API rate limiter from configuration.
///
/// The default (100 requests per 15 minutes) replenishes one token every nine
/// seconds with a burst of 100.
///
/// # Panics
///
/// Will not panic: the period is clamped to at least one millisecond and the
/// burst to at least one, both of which `GovernorConfigBuilder` accepts.
#[must_use]
pub fn api_rate_limiter(config: RateLimitConfig) -> RateLimiterLayer {
    let governor = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .period(replenish_period(config))
        .burst_size(config.max_requests.max(1))
        .finish()
        .expect("rate limiter config with a positive period and burst is valid");
    GovernorLayer::new(Arc::new(governor))
}

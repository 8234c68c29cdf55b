//! Fixed-window rate limiting keyed by client address.
//!
//! Counters live in the cache store, so the redis backend shares windows
//! across replicas while test/local deployments stay in-process.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::cache::CacheStore;
use crate::exception::AppError;

use super::super::context::AppContext;
use super::{ClientIp, resolve_client_ip};

#[derive(Clone)]
pub struct RateLimiter {
    cache: CacheStore,
    key_prefix: &'static str,
    points: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(
        cache: CacheStore,
        key_prefix: &'static str,
        points: u64,
        window: Duration,
    ) -> Self {
        Self {
            cache,
            key_prefix,
            points,
            window,
        }
    }

    /// Consume one point for `key`. Exceeding the window's budget is an
    /// operational 429 carrying retry metadata.
    pub async fn check(&self, key: &str) -> Result<(), AppError> {
        let counter_key = format!("{}:{}", self.key_prefix, key);
        let count = self
            .cache
            .incr_window(&counter_key, self.window)
            .await
            .map_err(|e| AppError::internal(e.to_string()))?;

        if count <= self.points {
            return Ok(());
        }

        let retry_after_secs = self.window.as_secs().max(1);
        tracing::warn!(
            client = key,
            hits = count,
            limit = self.points,
            "rate limit exceeded"
        );
        Err(AppError::TooManyRequests {
            retry_after_secs,
            limit: self.points,
            reset_at: Utc::now() + chrono::Duration::seconds(retry_after_secs as i64),
        })
    }
}

/// Global API limiter. Skips non-API paths so asset requests are untouched.
pub async fn api_rate_limit(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Response {
    if !req.uri().path().starts_with("/api") {
        return next.run(req).await;
    }
    enforce(&ctx.api_limiter, req, next).await
}

/// Stricter limiter for credential endpoints.
pub async fn auth_rate_limit(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Response {
    enforce(&ctx.auth_limiter, req, next).await
}

async fn enforce(limiter: &RateLimiter, req: Request, next: Next) -> Response {
    let key = req
        .extensions()
        .get::<ClientIp>()
        .map(|ip| ip.0.clone())
        .unwrap_or_else(|| resolve_client_ip(&req));

    match limiter.check(&key).await {
        Ok(()) => next.run(req).await,
        Err(error) => error.into_response(),
    }
}

//! Shared request context.
//!
//! `AppContext` is the axum state: cheap-to-clone handles snapshotted from a
//! booted [`Application`]. Handlers and middleware receive it through
//! `State` extraction; nothing reaches for a global.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderValue;

use crate::auth::{AuthService, PasswordHasher, TokenIssuer};
use crate::cache::CacheStore;
use crate::config::Env;
use crate::db::Database;
use crate::lifecycle::{Application, LifecycleError};
use crate::worker::WorkerPool;

use super::middleware::rate_limit::RateLimiter;

/// Response headers precomputed from the environment so the security layer
/// does not rebuild them per request.
#[derive(Clone)]
pub struct SecurityHeaders {
    pub csp: HeaderValue,
    pub hsts: Option<HeaderValue>,
}

impl SecurityHeaders {
    fn build(env: &Env) -> Self {
        let csp = if env.is_production() {
            "default-src 'self'; script-src 'self'; \
             style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
             img-src 'self' data: https:"
                .to_string()
        } else {
            // The dev policy admits the Vite dev server and its HMR sockets.
            let vite = format!("{}:{}", env.vite_server.host, env.vite_server.port);
            format!(
                "default-src 'self'; script-src 'self' 'unsafe-inline' 'unsafe-eval'; \
                 style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
                 connect-src 'self' ws: wss: http://{vite} ws://{vite}; \
                 img-src 'self' data: blob:"
            )
        };

        Self {
            csp: HeaderValue::from_str(&csp)
                .unwrap_or_else(|_| HeaderValue::from_static("default-src 'self'")),
            hsts: env
                .is_production()
                .then(|| HeaderValue::from_static("max-age=15552000; includeSubDomains")),
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub env: Arc<Env>,
    pub db: Database,
    pub cache: CacheStore,
    pub auth: AuthService,
    pub api_limiter: RateLimiter,
    pub auth_limiter: RateLimiter,
    pub security: SecurityHeaders,
    pub http_client: reqwest::Client,
    started_at: Instant,
}

impl AppContext {
    /// Snapshot a booted application into request-scope handles. Fails if
    /// called before `boot` has acquired the database and cache.
    pub fn from_application(app: &Application) -> Result<Self, LifecycleError> {
        let env = Arc::new(app.env().clone());
        let db = app
            .database()
            .cloned()
            .ok_or_else(|| LifecycleError::start_failed("database handle not acquired"))?;
        let cache = app
            .cache()
            .cloned()
            .ok_or_else(|| LifecycleError::start_failed("cache handle not acquired"))?;

        let pool = WorkerPool::with_default_threads()
            .map_err(|e| LifecycleError::start_failed(e.to_string()))?;
        let tokens = TokenIssuer::new(&env.jwt_secret, env.jwt_expires_in);
        let passwords = PasswordHasher::new(pool, env.bcrypt_cost);
        let auth = AuthService::new(db.clone(), cache.clone(), tokens, passwords);

        let api_limiter = RateLimiter::new(
            cache.clone(),
            "rl",
            env.rate_limit_max_requests,
            env.rate_limit_window,
        );
        let auth_limiter = RateLimiter::new(cache.clone(), "auth", 5, Duration::from_secs(60));

        Ok(Self {
            security: SecurityHeaders::build(&env),
            http_client: reqwest::Client::new(),
            env,
            db,
            cache,
            auth,
            api_limiter,
            auth_limiter,
            started_at: app.started_at(),
        })
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

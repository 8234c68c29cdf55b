//! HTTP kernel: assembles the request pipeline exactly once per process run.
//!
//! Middleware order is fixed. The centralized error renderer
//! is outermost so it can rewrite any failure the pipeline produces; the
//! client-IP annotation runs before the request logger and the rate limiter
//! so both see the resolved address. Route registration is synchronous; the
//! listener is only bound after the kernel has the full route table.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use super::context::AppContext;
use super::handlers::{auth, meta};
use super::middleware::rate_limit::{api_rate_limit, auth_rate_limit};
use super::middleware::{
    adaptive_timeout, client_ip, error::render_errors, request_logger, security_headers,
};
use super::proxy::frontend_fallback;

const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("HTTP kernel is not booted")]
    NotBooted,
}

/// Owns the assembled router for one server-process run. Not reused across
/// restarts: a fresh process builds a fresh kernel.
pub struct HttpKernel {
    ctx: AppContext,
    router: Option<Router>,
    booted: bool,
}

impl HttpKernel {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            router: None,
            booted: false,
        }
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    /// Assemble middleware, routes, and error handling. Idempotent: a second
    /// call warns and leaves the assembled router untouched.
    pub fn boot(&mut self) {
        if self.booted {
            tracing::warn!("HTTP kernel is already booted");
            return;
        }

        tracing::info!("booting HTTP kernel");
        self.router = Some(build_router(&self.ctx));
        self.booted = true;
        tracing::info!("HTTP kernel booted successfully");
    }

    /// The assembled application. Errors if the kernel has not booted.
    pub fn router(&self) -> Result<Router, KernelError> {
        self.router.clone().ok_or(KernelError::NotBooted)
    }
}

fn build_router(ctx: &AppContext) -> Router {
    // Credential endpoints carry the stricter limiter on top of the global
    // one.
    let credential_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(from_fn_with_state(ctx.clone(), auth_rate_limit));

    let auth_routes = credential_routes
        .route("/refresh", post(auth::refresh))
        .route("/profile", get(auth::profile).put(auth::update_profile))
        .route("/password", put(auth::change_password));

    Router::new()
        .route("/health", get(meta::health))
        .route("/api", get(meta::api_banner))
        .nest("/api/auth", auth_routes)
        .fallback(frontend_fallback)
        .layer(
            // Top of the builder is the outermost layer.
            ServiceBuilder::new()
                .layer(from_fn_with_state(ctx.clone(), render_errors))
                .layer(from_fn_with_state(ctx.clone(), security_headers))
                .layer(cors_layer(ctx))
                .layer(CompressionLayer::new())
                .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
                .layer(from_fn(client_ip))
                .layer(from_fn(request_logger))
                .layer(from_fn(adaptive_timeout))
                .layer(from_fn_with_state(ctx.clone(), api_rate_limit)),
        )
        .with_state(ctx.clone())
}

fn cors_layer(ctx: &AppContext) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    match ctx.env.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = %ctx.env.cors_origin, "invalid CORS_ORIGIN, allowing none");
            layer
        }
    }
}

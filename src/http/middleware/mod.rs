//! Request-pipeline middleware.
//!
//! Each concern is a small `axum::middleware::from_fn` layer; the kernel
//! installs them in a fixed order (see `http::kernel`).

pub mod auth;
pub mod error;
pub mod rate_limit;

use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;

use super::context::AppContext;

/// Client address resolved for the request, available to downstream
/// middleware and handlers as a request extension.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

/// Resolve the client address. Forwarding headers win over the socket peer
/// so deployments behind a proxy or load balancer see real addresses.
pub fn resolve_client_ip(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    req.extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Annotate the request with its client address.
pub async fn client_ip(mut req: Request, next: Next) -> Response {
    let ip = resolve_client_ip(&req);
    req.extensions_mut().insert(ClientIp(ip));
    next.run(req).await
}

/// Log method, path, status and latency for every request.
pub async fn request_logger(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let ip = req
        .extensions()
        .get::<ClientIp>()
        .map(|ip| ip.0.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        %uri,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        client_ip = %ip,
        "request completed"
    );
    response
}

/// Attach the security response headers built at kernel boot.
pub async fn security_headers(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_SECURITY_POLICY, ctx.security.csp.clone());
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        header::HeaderValue::from_static("SAMEORIGIN"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        header::HeaderValue::from_static("no-referrer"),
    );
    if let Some(hsts) = &ctx.security.hsts {
        headers.insert(header::STRICT_TRANSPORT_SECURITY, hsts.clone());
    }
    response
}

/// Static path-prefix → timeout table. Fixed at install time; auth endpoints
/// fail fast while upload/stream endpoints get room to work.
const ROUTE_TIMEOUTS: &[(&str, Duration)] = &[
    ("/api/auth", Duration::from_secs(15)),
    ("/api/upload", Duration::from_secs(300)),
    ("/api/stream", Duration::from_secs(600)),
    ("/api/process", Duration::from_secs(180)),
];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub fn timeout_for_path(path: &str) -> Duration {
    ROUTE_TIMEOUTS
        .iter()
        .find(|(prefix, _)| path.starts_with(prefix))
        .map(|(_, timeout)| *timeout)
        .unwrap_or(DEFAULT_TIMEOUT)
}

/// Enforce the per-route timeout; an elapsed request gets 408.
pub async fn adaptive_timeout(req: Request, next: Next) -> Response {
    let timeout = timeout_for_path(req.uri().path());
    match tokio::time::timeout(timeout, next.run(req)).await {
        Ok(response) => response,
        Err(_) => (
            axum::http::StatusCode::REQUEST_TIMEOUT,
            axum::Json(json!({
                "error": "Request Timeout",
                "message": "The request took too long to process",
                "timestamp": Utc::now().to_rfc3339(),
            })),
        )
            .into_response(),
    }
}

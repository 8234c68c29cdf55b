//! Frontend fallback: Vite dev-server proxy or static production assets.
//!
//! Anything the API router does not claim lands here. In development the
//! request is forwarded to the Vite dev server so the scaffold serves the
//! frontend and backend from one origin; in production the built assets are
//! served from `public/dist`.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;
use tower::util::ServiceExt;
use tower_http::services::ServeDir;

use crate::exception::AppError;

use super::context::AppContext;

const STATIC_ASSET_DIR: &str = "public/dist";

/// Proxied request bodies are buffered; dev assets and HMR payloads stay
/// well under this.
const PROXY_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Router fallback. API-shaped paths get the JSON 404; everything else goes
/// to the frontend.
pub async fn frontend_fallback(State(ctx): State<AppContext>, req: Request) -> Response {
    let path = req.uri().path();
    if path.starts_with("/api") || path.starts_with("/events") || path.starts_with("/health") {
        return AppError::not_found(format!("Route {} {} not found", req.method(), path))
            .into_response();
    }

    if ctx.env.is_production() {
        return serve_static(req).await;
    }

    vite_proxy(ctx, req).await
}

async fn serve_static(req: Request) -> Response {
    match ServeDir::new(STATIC_ASSET_DIR).oneshot(req).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

async fn vite_proxy(ctx: AppContext, req: Request) -> Response {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let target = format!("{}{}", ctx.env.vite_server.base_url(), path_and_query);
    let method = req.method().clone();

    tracing::debug!(%method, url = %target, "proxying request to vite");

    let (parts, body) = req.into_parts();
    let body_bytes = match axum::body::to_bytes(body, PROXY_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return AppError::validation("Request body too large for dev proxy").into_response();
        }
    };

    let mut upstream_req = ctx.http_client.request(method, &target);
    for (name, value) in parts.headers.iter() {
        if *name == header::HOST {
            continue;
        }
        upstream_req = upstream_req.header(name, value);
    }

    match upstream_req.body(body_bytes).send().await {
        Ok(upstream) => {
            let status = upstream.status();
            let headers = upstream.headers().clone();
            let bytes = upstream.bytes().await.unwrap_or_default();

            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            for (name, value) in headers.iter() {
                if *name == header::TRANSFER_ENCODING
                    || *name == header::CONNECTION
                    || *name == header::CONTENT_LENGTH
                {
                    continue;
                }
                response.headers_mut().insert(name, value.clone());
            }
            response
        }
        Err(error) => {
            tracing::debug!(error = %error, url = %target, "vite proxy error");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                axum::Json(json!({
                    "status": "error",
                    "error": "Development server unavailable",
                    "message": "Vite development server is not running. Start it with: npm run dev:client",
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
                .into_response()
        }
    }
}

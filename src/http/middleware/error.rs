//! Centralized error rendering.
//!
//! The outermost layer of the kernel. Handlers convert failures into
//! [`AppError`]; the conversion attaches an [`ErrorDetail`] extension to an
//! empty response, and this middleware is the single place that turns the
//! detail into a client-facing JSON body. Operational errors surface
//! verbatim; anything else is logged in full and rendered generic in
//! production.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;

use crate::exception::ErrorDetail;

use super::super::context::AppContext;
use super::resolve_client_ip;

pub async fn render_errors(State(ctx): State<AppContext>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let client_ip = resolve_client_ip(&req);

    let response = next.run(req).await;

    let Some(detail) = response.extensions().get::<Arc<ErrorDetail>>().cloned() else {
        return response;
    };

    let body = if detail.operational {
        tracing::warn!(
            %method,
            %uri,
            client_ip = %client_ip,
            status = detail.status.as_u16(),
            error = %detail.message,
            "request failed"
        );
        json!({
            "error": detail.message,
            "statusCode": detail.status.as_u16(),
            "timestamp": Utc::now().to_rfc3339(),
        })
    } else {
        tracing::error!(
            %method,
            %uri,
            client_ip = %client_ip,
            error = %detail.message,
            "request error"
        );
        let message = if ctx.env.is_production() {
            "Something went wrong".to_string()
        } else {
            detail.message.clone()
        };
        json!({
            "error": "Internal Server Error",
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
        })
    };

    let mut rendered = (detail.status, Json(body)).into_response();
    if let Some(rate_limit) = &detail.rate_limit {
        let headers = rendered.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&rate_limit.retry_after_secs.to_string()) {
            headers.insert(header::RETRY_AFTER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&rate_limit.limit.to_string()) {
            headers.insert("x-ratelimit-limit", value);
        }
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        if let Ok(value) = HeaderValue::from_str(&rate_limit.reset_at.to_rfc3339()) {
            headers.insert("x-ratelimit-reset", value);
        }
    }
    rendered
}

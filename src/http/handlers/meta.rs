//! Health check and API banner.

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde_json::{Value, json};

use super::super::context::AppContext;

pub async fn health(State(ctx): State<AppContext>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": ctx.uptime().as_secs_f64(),
        "environment": ctx.env.app_env.to_string(),
    }))
}

pub async fn api_banner() -> Json<Value> {
    Json(json!({
        "message": "Groundwork Fullstack Starter API",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

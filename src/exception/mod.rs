//! HTTP error taxonomy.
//!
//! Every request-path failure is an [`AppError`]. Errors carry an
//! "operational" flag: operational errors describe a known client-facing
//! condition and are rendered verbatim; everything else is logged in full
//! and rendered as a generic internal error by the centralized error
//! middleware (see `http::middleware::error`).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests, please try again later")]
    TooManyRequests {
        retry_after_secs: u64,
        limit: u64,
        reset_at: chrono::DateTime<chrono::Utc>,
    },

    #[error("{0}")]
    Internal(String),

    #[error("database operation failed: {0}")]
    Database(#[from] DbError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Operational errors are safe to surface verbatim to clients.
    pub fn is_operational(&self) -> bool {
        !matches!(self, AppError::Internal(_) | AppError::Database(_))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Captured failure detail, attached to the response as an extension and
/// rendered into a body by the centralized error middleware. Responses that
/// bypass the kernel (tests hitting handlers directly) still carry the right
/// status code.
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub status: StatusCode,
    pub message: String,
    pub operational: bool,
    pub rate_limit: Option<RateLimitDetail>,
}

#[derive(Debug, Clone)]
pub struct RateLimitDetail {
    pub retry_after_secs: u64,
    pub limit: u64,
    pub reset_at: chrono::DateTime<chrono::Utc>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let rate_limit = match &self {
            AppError::TooManyRequests {
                retry_after_secs,
                limit,
                reset_at,
            } => Some(RateLimitDetail {
                retry_after_secs: *retry_after_secs,
                limit: *limit,
                reset_at: *reset_at,
            }),
            _ => None,
        };

        let detail = ErrorDetail {
            status: self.status(),
            message: self.to_string(),
            operational: self.is_operational(),
            rate_limit,
        };

        let mut response = Response::new(Body::empty());
        *response.status_mut() = detail.status;
        response.extensions_mut().insert(Arc::new(detail));
        response
    }
}

/// JSON extractor whose rejection lands in the error taxonomy instead of
/// axum's plain-text default, so malformed payloads get the standard
/// operational 400 envelope.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_rejection(rejection)),
        }
    }
}

fn map_rejection(rejection: JsonRejection) -> AppError {
    AppError::Validation(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::validation("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::authentication("no").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Authorization("denied".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::not_found("gone").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("dup").status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::internal("boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn operational_flag() {
        assert!(AppError::validation("bad").is_operational());
        assert!(AppError::conflict("dup").is_operational());
        assert!(!AppError::internal("boom").is_operational());
        assert!(!AppError::Database(DbError::Unavailable("down".into())).is_operational());
    }

    #[test]
    fn into_response_attaches_detail() {
        let response = AppError::conflict("email taken").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let detail = response
            .extensions()
            .get::<Arc<ErrorDetail>>()
            .expect("detail extension");
        assert!(detail.operational);
        assert_eq!(detail.message, "email taken");
    }
}

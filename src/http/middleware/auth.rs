//! Bearer-token authentication.
//!
//! `CurrentUser` is the route guard: extracting it verifies the
//! `Authorization` header and rejects anything but a valid access token, so
//! a handler that takes `CurrentUser` cannot run unauthenticated.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::exception::AppError;

use super::super::context::AppContext;

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

impl FromRequestParts<AppContext> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::authentication("Authentication required"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::authentication("Authentication required"))?;

        let claims = ctx.auth.tokens().verify_access(token)?;
        Ok(CurrentUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}

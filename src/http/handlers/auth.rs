//! Auth endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{LoginCredentials, RegisterData};
use crate::exception::{AppError, AppJson};

use super::super::context::AppContext;
use super::super::middleware::auth::CurrentUser;
use super::super::validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
    pub current_password: String,
    pub new_password: String,
}

pub async fn register(
    State(ctx): State<AppContext>,
    AppJson(payload): AppJson<RegisterPayload>,
) -> Result<impl IntoResponse, AppError> {
    validate::register(&payload)?;

    let (user, tokens) = ctx
        .auth
        .register(RegisterData {
            email: payload.email,
            password: payload.password,
            name: payload.name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": user,
            "tokens": tokens,
        })),
    ))
}

pub async fn login(
    State(ctx): State<AppContext>,
    AppJson(payload): AppJson<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    validate::login(&payload)?;

    let (user, tokens) = ctx
        .auth
        .login(LoginCredentials {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok(Json(json!({
        "message": "Login successful",
        "user": user,
        "tokens": tokens,
    })))
}

pub async fn refresh(
    State(ctx): State<AppContext>,
    AppJson(payload): AppJson<RefreshPayload>,
) -> Result<impl IntoResponse, AppError> {
    validate::refresh(&payload)?;
    let tokens = ctx.auth.refresh(&payload.refresh_token).await?;
    Ok(Json(tokens))
}

pub async fn profile(
    State(ctx): State<AppContext>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let user = ctx.auth.profile(user.id).await?;
    Ok(Json(json!({ "user": user })))
}

pub async fn update_profile(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    AppJson(payload): AppJson<UpdateProfilePayload>,
) -> Result<impl IntoResponse, AppError> {
    validate::update_profile(&payload)?;

    let user = ctx
        .auth
        .update_profile(user.id, payload.name, payload.email)
        .await?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": user,
    })))
}

pub async fn change_password(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    AppJson(payload): AppJson<ChangePasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    validate::change_password(&payload)?;

    ctx.auth
        .change_password(user.id, payload.current_password, payload.new_password)
        .await?;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}

//! Auth service: registration, login, token refresh, profile management.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::db::{Database, DbError, NewUser, UserRecord};
use crate::exception::AppError;

use super::password::PasswordHasher;
use super::token::TokenIssuer;

/// Refresh tokens are single-use and expire from the cache after this TTL.
const REFRESH_TTL: Duration = Duration::from_secs(30 * 86_400);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Client-facing view of a user row. Never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for AuthUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    cache: CacheStore,
    tokens: TokenIssuer,
    passwords: PasswordHasher,
}

impl AuthService {
    pub fn new(
        db: Database,
        cache: CacheStore,
        tokens: TokenIssuer,
        passwords: PasswordHasher,
    ) -> Self {
        Self {
            db,
            cache,
            tokens,
            passwords,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Register a new user. Duplicate email is an operational conflict.
    pub async fn register(&self, data: RegisterData) -> Result<(AuthUser, AuthTokens), AppError> {
        let password_hash = self.passwords.hash(data.password).await?;

        let user = self
            .db
            .insert_user(NewUser {
                email: data.email,
                password_hash,
                name: data.name,
            })
            .map_err(|e| match e {
                DbError::DuplicateEmail => {
                    AppError::conflict("User with this email already exists")
                }
                other => AppError::Database(other),
            })?;

        let tokens = self.issue_tokens(&user).await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok((AuthUser::from(&user), tokens))
    }

    /// Log a user in. Unknown email and wrong password are indistinguishable
    /// to the caller.
    pub async fn login(
        &self,
        credentials: LoginCredentials,
    ) -> Result<(AuthUser, AuthTokens), AppError> {
        let user = self
            .db
            .find_by_email(&credentials.email)
            .ok_or_else(|| AppError::authentication("Invalid credentials"))?;

        let valid = self
            .passwords
            .verify(credentials.password, user.password_hash.clone())
            .await?;
        if !valid {
            return Err(AppError::authentication("Invalid credentials"));
        }

        let tokens = self.issue_tokens(&user).await?;
        Ok((AuthUser::from(&user), tokens))
    }

    /// Exchange a refresh token for a fresh pair. The presented token is
    /// consumed atomically, so replaying it fails.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AppError> {
        let user_id = self
            .cache
            .take(&refresh_key(refresh_token))
            .await
            .map_err(|e| AppError::internal(e.to_string()))?
            .and_then(|raw| raw.parse::<Uuid>().ok())
            .ok_or_else(|| AppError::authentication("Invalid refresh token"))?;

        let user = self
            .db
            .find_by_id(user_id)
            .ok_or_else(|| AppError::authentication("Invalid refresh token"))?;

        self.issue_tokens(&user).await
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<AuthUser, AppError> {
        let user = self
            .db
            .find_by_id(user_id)
            .ok_or_else(|| AppError::authentication("User not found"))?;
        Ok(AuthUser::from(&user))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<AuthUser, AppError> {
        let user = self
            .db
            .update_user(user_id, name, email)
            .map_err(|e| match e {
                DbError::DuplicateEmail => AppError::conflict("Email already in use"),
                DbError::UserNotFound => AppError::authentication("User not found"),
                other => AppError::Database(other),
            })?;

        tracing::info!(user_id = %user.id, email = %user.email, "user profile updated");
        Ok(AuthUser::from(&user))
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: String,
        new_password: String,
    ) -> Result<(), AppError> {
        let user = self
            .db
            .find_by_id(user_id)
            .ok_or_else(|| AppError::authentication("User not found"))?;

        let valid = self
            .passwords
            .verify(current_password, user.password_hash.clone())
            .await?;
        if !valid {
            return Err(AppError::authentication("Current password is incorrect"));
        }

        let new_hash = self.passwords.hash(new_password).await?;
        self.db.update_password(user_id, new_hash)?;

        tracing::info!(user_id = %user.id, "user password changed");
        Ok(())
    }

    async fn issue_tokens(&self, user: &UserRecord) -> Result<AuthTokens, AppError> {
        let access_token = self.tokens.issue_access(user.id, &user.email)?;
        let refresh_token = self.tokens.new_refresh_token();
        self.cache
            .put_with_ttl(
                &refresh_key(&refresh_token),
                &user.id.to_string(),
                REFRESH_TTL,
            )
            .await
            .map_err(|e| AppError::internal(e.to_string()))?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
        })
    }
}

fn refresh_key(token: &str) -> String {
    format!("refresh:{token}")
}

//! Access-token issuing and verification (HS256).

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::exception::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Sign a short-lived access token for a user.
    pub fn issue_access(&self, user_id: Uuid, email: &str) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            token_type: TokenType::Access,
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("failed to sign token: {e}")))
    }

    /// Verify a bearer token and require it to be an access token.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AppError::authentication("Invalid token"))?;
        if data.claims.token_type != TokenType::Access {
            return Err(AppError::authentication("Invalid token type"));
        }
        Ok(data.claims)
    }

    /// Mint an opaque refresh token. Validity lives in the cache store, not
    /// in the token itself.
    pub fn new_refresh_token(&self) -> String {
        format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            "0123456789abcdef0123456789abcdef",
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn roundtrip() {
        let issuer = issuer();
        let id = Uuid::new_v4();
        let token = issuer.issue_access(id, "a@example.com").unwrap();
        let claims = issuer.verify_access(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn rejects_tampered_token() {
        let issuer = issuer();
        let token = issuer.issue_access(Uuid::new_v4(), "a@example.com").unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        assert!(issuer.verify_access(&tampered).is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = issuer().issue_access(Uuid::new_v4(), "a@example.com").unwrap();
        let other = TokenIssuer::new(
            "ffffffffffffffffffffffffffffffff",
            Duration::from_secs(3600),
        );
        assert!(other.verify_access(&token).is_err());
    }

    #[test]
    fn rejects_non_access_type() {
        let issuer = issuer();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            token_type: TokenType::Refresh,
            iat: now,
            exp: now + 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("0123456789abcdef0123456789abcdef".as_bytes()),
        )
        .unwrap();
        assert!(issuer.verify_access(&token).is_err());
    }

    #[test]
    fn refresh_tokens_are_unique() {
        let issuer = issuer();
        assert_ne!(issuer.new_refresh_token(), issuer.new_refresh_token());
        assert_eq!(issuer.new_refresh_token().len(), 64);
    }
}

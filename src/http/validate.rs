//! Request payload validation.
//!
//! Plain functions over the deserialized payloads; every violation is an
//! operational 400 carried through the error taxonomy.

use crate::exception::AppError;

use super::handlers::auth::{
    ChangePasswordPayload, LoginPayload, RefreshPayload, RegisterPayload, UpdateProfilePayload,
};

pub fn register(payload: &RegisterPayload) -> Result<(), AppError> {
    email(&payload.email)?;
    min_len("Password", &payload.password, 8)?;
    min_len("Name", &payload.name, 2)
}

pub fn login(payload: &LoginPayload) -> Result<(), AppError> {
    email(&payload.email)?;
    non_empty("Password", &payload.password)
}

pub fn refresh(payload: &RefreshPayload) -> Result<(), AppError> {
    non_empty("Refresh token", &payload.refresh_token)
}

pub fn update_profile(payload: &UpdateProfilePayload) -> Result<(), AppError> {
    if payload.name.is_none() && payload.email.is_none() {
        return Err(AppError::validation("Nothing to update"));
    }
    if let Some(name) = &payload.name {
        min_len("Name", name, 2)?;
    }
    if let Some(address) = &payload.email {
        email(address)?;
    }
    Ok(())
}

pub fn change_password(payload: &ChangePasswordPayload) -> Result<(), AppError> {
    non_empty("Current password", &payload.current_password)?;
    min_len("Password", &payload.new_password, 8)
}

/// Same shape the original schema accepted: non-empty local part and domain,
/// a dot in the domain, no whitespace.
fn email(value: &str) -> Result<(), AppError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::validation("Invalid email format"))
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(())
}

fn min_len(field: &str, value: &str, min: usize) -> Result<(), AppError> {
    if value.chars().count() < min {
        return Err(AppError::validation(format!(
            "{field} must be at least {min} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(email("user@example.com").is_ok());
        assert!(email("a.b+c@sub.example.org").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "plain", "@example.com", "user@", "user@domain", "a b@x.com", "user@.com"] {
            assert!(email(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn register_rules() {
        let mut payload = RegisterPayload {
            email: "user@example.com".to_string(),
            password: "longenough".to_string(),
            name: "Jo".to_string(),
        };
        assert!(register(&payload).is_ok());

        payload.password = "short".to_string();
        assert!(register(&payload).is_err());

        payload.password = "longenough".to_string();
        payload.name = "J".to_string();
        assert!(register(&payload).is_err());
    }

    #[test]
    fn update_profile_requires_a_field() {
        let empty = UpdateProfilePayload {
            name: None,
            email: None,
        };
        assert!(update_profile(&empty).is_err());

        let ok = UpdateProfilePayload {
            name: Some("New Name".to_string()),
            email: None,
        };
        assert!(update_profile(&ok).is_ok());
    }
}

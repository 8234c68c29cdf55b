//! Database handle.
//!
//! The scaffold ships an in-memory user store behind the `Database` handle:
//! a `DashMap` keyed by user id plus a unique-email index. Handles are cheap
//! to clone and internally synchronized, so request handlers share one
//! instance without extra locking. Swapping in a real driver means replacing
//! this module while keeping the handle surface.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Env;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("user not found")]
    UserNotFound,
}

/// A stored user row.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted by [`Database::insert_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

#[derive(Clone, Default)]
pub struct Database {
    users: Arc<DashMap<Uuid, UserRecord>>,
    email_index: Arc<DashMap<String, Uuid>>,
}

impl Database {
    /// Acquire a database handle for the configured environment. The URL is
    /// checked here so a misconfigured deployment fails at boot, not on the
    /// first query.
    pub fn connect(env: &Env) -> Result<Self, DbError> {
        let scheme = env
            .db_url
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or_default();
        if scheme.is_empty() {
            return Err(DbError::Unavailable(format!(
                "malformed DB_URL for {} database",
                env.db
            )));
        }
        tracing::debug!(db = %env.db, "database handle acquired");
        Ok(Self::default())
    }

    /// Insert a user, enforcing email uniqueness. The email index entry is
    /// claimed first so concurrent registrations of the same address cannot
    /// both succeed.
    pub fn insert_user(&self, new_user: NewUser) -> Result<UserRecord, DbError> {
        let id = Uuid::new_v4();
        match self.email_index.entry(new_user.email.clone()) {
            Entry::Occupied(_) => return Err(DbError::DuplicateEmail),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let now = Utc::now();
        let record = UserRecord {
            id,
            email: new_user.email,
            password_hash: new_user.password_hash,
            name: new_user.name,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(id, record.clone());
        Ok(record)
    }

    pub fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        let id = *self.email_index.get(email)?;
        self.users.get(&id).map(|r| r.clone())
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<UserRecord> {
        self.users.get(&id).map(|r| r.clone())
    }

    /// Update name and/or email. A changed email must not belong to another
    /// user.
    pub fn update_user(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<UserRecord, DbError> {
        if let Some(new_email) = &email {
            if let Some(owner) = self.email_index.get(new_email) {
                if *owner != id {
                    return Err(DbError::DuplicateEmail);
                }
            }
        }

        let mut record = self.users.get_mut(&id).ok_or(DbError::UserNotFound)?;
        if let Some(new_email) = email {
            if new_email != record.email {
                match self.email_index.entry(new_email.clone()) {
                    Entry::Occupied(_) => return Err(DbError::DuplicateEmail),
                    Entry::Vacant(slot) => {
                        slot.insert(id);
                    }
                }
                self.email_index.remove(&record.email);
                record.email = new_email;
            }
        }
        if let Some(new_name) = name {
            record.name = new_name;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    pub fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), DbError> {
        let mut record = self.users.get_mut(&id).ok_or(DbError::UserNotFound)?;
        record.password_hash = password_hash;
        record.updated_at = Utc::now();
        Ok(())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: "Test User".to_string(),
        }
    }

    #[test]
    fn insert_and_lookup() {
        let db = Database::default();
        let user = db.insert_user(new_user("a@example.com")).unwrap();
        assert_eq!(db.find_by_email("a@example.com").unwrap().id, user.id);
        assert_eq!(db.find_by_id(user.id).unwrap().email, "a@example.com");
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = Database::default();
        db.insert_user(new_user("a@example.com")).unwrap();
        assert!(matches!(
            db.insert_user(new_user("a@example.com")),
            Err(DbError::DuplicateEmail)
        ));
        assert_eq!(db.user_count(), 1);
    }

    #[test]
    fn email_change_updates_index() {
        let db = Database::default();
        let user = db.insert_user(new_user("old@example.com")).unwrap();
        db.update_user(user.id, None, Some("new@example.com".to_string()))
            .unwrap();
        assert!(db.find_by_email("old@example.com").is_none());
        assert_eq!(db.find_by_email("new@example.com").unwrap().id, user.id);
    }

    #[test]
    fn email_change_to_taken_address_rejected() {
        let db = Database::default();
        let a = db.insert_user(new_user("a@example.com")).unwrap();
        db.insert_user(new_user("b@example.com")).unwrap();
        assert!(matches!(
            db.update_user(a.id, None, Some("b@example.com".to_string())),
            Err(DbError::DuplicateEmail)
        ));
    }

    #[test]
    fn same_email_update_is_noop() {
        let db = Database::default();
        let a = db.insert_user(new_user("a@example.com")).unwrap();
        let updated = db
            .update_user(a.id, Some("Renamed".to_string()), Some("a@example.com".to_string()))
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(db.find_by_email("a@example.com").unwrap().id, a.id);
    }
}

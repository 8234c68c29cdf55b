//! Authentication glue.
//!
//! Thin orchestration over the password-hashing and JWT libraries plus the
//! user store. Split one concern per file: `token` issues and verifies
//! JWTs, `password` runs bcrypt on the worker pool, `service` wires both to
//! the database and cache.

mod password;
mod service;
mod token;

pub use password::PasswordHasher;
pub use service::{AuthService, AuthTokens, AuthUser, LoginCredentials, RegisterData};
pub use token::{Claims, TokenIssuer, TokenType};

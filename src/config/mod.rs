//! Environment configuration.
//!
//! All runtime configuration comes from process environment variables,
//! validated once at startup. An invalid environment is fatal: the binary
//! reports the failure and exits with code 1 before any subsystem starts.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use strum_macros::{Display, EnumString};
use thiserror::Error;

/// Deployment environment, from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AppEnv {
    Development,
    Production,
    Test,
    Local,
}

/// Database flavor selector, from `DB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DbKind {
    Postgres,
    Mysql,
    Sqlite,
    Mongodb,
}

/// Log verbosity, from `LOG_LEVEL`. Maps onto a `tracing` filter directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Location of the Vite development asset server.
#[derive(Debug, Clone)]
pub struct ViteServer {
    pub host: String,
    pub port: u16,
    pub ssl: bool,
}

impl ViteServer {
    pub fn base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Validated environment configuration. Immutable after construction; the
/// `Application` freezes it at `init` simply by never exposing mutation.
#[derive(Debug, Clone)]
pub struct Env {
    pub app_env: AppEnv,
    pub port: u16,
    pub host: String,
    pub db: DbKind,
    pub db_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: u64,
    pub log_level: LogLevel,
    pub cors_origin: String,
    pub bcrypt_cost: u32,
    pub vite_server: ViteServer,
}

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl EnvError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

impl Env {
    /// Read and validate the process environment.
    pub fn from_process_env() -> Result<Self, EnvError> {
        Self::from_vars(std::env::vars())
    }

    /// Read and validate from an explicit variable set. Used by tests.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, EnvError> {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let jwt_secret = required(&vars, "JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            return Err(EnvError::invalid(
                "JWT_SECRET",
                "must be at least 32 characters",
            ));
        }

        let bcrypt_cost: u32 = parse_or(&vars, "BCRYPT_SALT_ROUNDS", 12)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(EnvError::invalid(
                "BCRYPT_SALT_ROUNDS",
                "must be between 4 and 31",
            ));
        }

        Ok(Self {
            app_env: parse_or(&vars, "NODE_ENV", AppEnv::Development)?,
            port: parse_or(&vars, "PORT", 8080)?,
            host: vars
                .get("HOST")
                .cloned()
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            db: parse_or(&vars, "DB", DbKind::Postgres)?,
            db_url: required_url(&vars, "DB_URL")?,
            redis_url: required_url(&vars, "REDIS_URL")?,
            jwt_secret,
            jwt_expires_in: duration_or(&vars, "JWT_EXPIRES_IN", Duration::from_secs(7 * 86_400))?,
            rate_limit_window: Duration::from_millis(parse_or(
                &vars,
                "RATE_LIMIT_WINDOW_MS",
                60_000,
            )?),
            rate_limit_max_requests: parse_or(&vars, "RATE_LIMIT_MAX_REQUESTS", 100)?,
            log_level: parse_or(&vars, "LOG_LEVEL", LogLevel::Info)?,
            cors_origin: vars
                .get("CORS_ORIGIN")
                .cloned()
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            bcrypt_cost,
            vite_server: ViteServer {
                host: vars
                    .get("VITE_SERVER_HOST")
                    .cloned()
                    .unwrap_or_else(|| "localhost".to_string()),
                port: parse_or(&vars, "VITE_SERVER_PORT", 5173)?,
                ssl: parse_or(&vars, "VITE_SERVER_SSL", false)?,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }

    pub fn is_development(&self) -> bool {
        self.app_env == AppEnv::Development
    }

    pub fn is_test(&self) -> bool {
        self.app_env == AppEnv::Test
    }

    pub fn is_local(&self) -> bool {
        self.app_env == AppEnv::Local
    }
}

fn required(vars: &HashMap<String, String>, key: &'static str) -> Result<String, EnvError> {
    match vars.get(key) {
        Some(v) if !v.is_empty() => Ok(v.clone()),
        _ => Err(EnvError::Missing(key)),
    }
}

fn required_url(vars: &HashMap<String, String>, key: &'static str) -> Result<String, EnvError> {
    let value = required(vars, key)?;
    if !value.contains("://") {
        return Err(EnvError::invalid(key, "must be a URL"));
    }
    Ok(value)
}

fn parse_or<T>(vars: &HashMap<String, String>, key: &'static str, default: T) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| EnvError::invalid(key, e.to_string())),
        None => Ok(default),
    }
}

fn duration_or(
    vars: &HashMap<String, String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, EnvError> {
    match vars.get(key) {
        Some(raw) => {
            humantime::parse_duration(raw).map_err(|e| EnvError::invalid(key, e.to_string()))
        }
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> Vec<(String, String)> {
        [
            ("DB_URL", "postgres://localhost:5432/app"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn parses_defaults() {
        let env = Env::from_vars(base_vars()).unwrap();
        assert_eq!(env.app_env, AppEnv::Development);
        assert_eq!(env.port, 8080);
        assert_eq!(env.host, "0.0.0.0");
        assert_eq!(env.db, DbKind::Postgres);
        assert_eq!(env.jwt_expires_in, Duration::from_secs(7 * 86_400));
        assert_eq!(env.rate_limit_window, Duration::from_millis(60_000));
        assert_eq!(env.rate_limit_max_requests, 100);
        assert_eq!(env.bcrypt_cost, 12);
        assert_eq!(env.vite_server.base_url(), "http://localhost:5173");
    }

    #[test]
    fn rejects_missing_secret() {
        let vars: Vec<_> = base_vars()
            .into_iter()
            .filter(|(k, _)| k != "JWT_SECRET")
            .collect();
        assert!(matches!(
            Env::from_vars(vars),
            Err(EnvError::Missing("JWT_SECRET"))
        ));
    }

    #[test]
    fn rejects_short_secret() {
        let mut vars = base_vars();
        vars.retain(|(k, _)| k != "JWT_SECRET");
        vars.push(("JWT_SECRET".into(), "too-short".into()));
        assert!(matches!(
            Env::from_vars(vars),
            Err(EnvError::Invalid {
                key: "JWT_SECRET",
                ..
            })
        ));
    }

    #[test]
    fn rejects_unknown_app_env() {
        let mut vars = base_vars();
        vars.push(("NODE_ENV".into(), "staging".into()));
        assert!(Env::from_vars(vars).is_err());
    }

    #[test]
    fn rejects_non_url_db() {
        let mut vars = base_vars();
        vars.retain(|(k, _)| k != "DB_URL");
        vars.push(("DB_URL".into(), "not-a-url".into()));
        assert!(matches!(
            Env::from_vars(vars),
            Err(EnvError::Invalid { key: "DB_URL", .. })
        ));
    }

    #[test]
    fn parses_overrides() {
        let mut vars = base_vars();
        vars.push(("NODE_ENV".into(), "production".into()));
        vars.push(("PORT".into(), "9090".into()));
        vars.push(("JWT_EXPIRES_IN".into(), "1h".into()));
        vars.push(("LOG_LEVEL".into(), "debug".into()));
        let env = Env::from_vars(vars).unwrap();
        assert!(env.is_production());
        assert_eq!(env.port, 9090);
        assert_eq!(env.jwt_expires_in, Duration::from_secs(3600));
        assert_eq!(env.log_level, LogLevel::Debug);
    }
}

//! Cache client handle.
//!
//! `CacheStore` fronts two backends behind one API: a redis connection
//! manager for development/production deployments, and an in-process map
//! with TTLs for `test`/`local` environments so the suite runs without a
//! running redis. The store carries the scaffold's volatile state: rate-limit
//! windows and refresh tokens.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use thiserror::Error;

use crate::config::Env;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

#[derive(Clone)]
enum Backend {
    Memory(MemoryCache),
    Redis(ConnectionManager),
}

#[derive(Clone)]
pub struct CacheStore {
    backend: Backend,
}

impl CacheStore {
    /// Acquire the cache client for the configured environment. Connection
    /// failures propagate: a deployment that cannot reach its cache must not
    /// come up half-working.
    pub async fn connect(env: &Env) -> Result<Self, CacheError> {
        if env.is_test() || env.is_local() {
            tracing::debug!("cache store using in-memory backend");
            return Ok(Self {
                backend: Backend::Memory(MemoryCache::default()),
            });
        }

        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(3)
            .set_connection_timeout(Duration::from_secs(2));

        let client = redis::Client::open(env.redis_url.as_str())?;
        let manager = client.get_connection_manager_with_config(config).await?;
        tracing::debug!("cache store connected to redis");
        Ok(Self {
            backend: Backend::Redis(manager),
        })
    }

    /// In-memory store, regardless of environment. Used by unit tests.
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryCache::default()),
        }
    }

    /// Fixed-window counter: increments `key` and returns the count within
    /// the current window. The first hit of a window arms its expiry.
    pub async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, CacheError> {
        match &self.backend {
            Backend::Memory(memory) => Ok(memory.incr_window(key, window)),
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                let count: u64 = conn.incr(key, 1u64).await?;
                if count == 1 {
                    let _: () = conn.expire(key, window.as_secs().max(1) as i64).await?;
                }
                Ok(count)
            }
        }
    }

    /// Store a value that expires after `ttl`.
    pub async fn put_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        match &self.backend {
            Backend::Memory(memory) => {
                memory.put(key, value, ttl);
                Ok(())
            }
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
                Ok(())
            }
        }
    }

    /// Atomically fetch and delete a value. Refresh tokens are single-use, so
    /// consumption and lookup must be one operation.
    pub async fn take(&self, key: &str) -> Result<Option<String>, CacheError> {
        match &self.backend {
            Backend::Memory(memory) => Ok(memory.take(key)),
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                let value: Option<String> = redis::cmd("GETDEL")
                    .arg(key)
                    .query_async(&mut conn)
                    .await?;
                Ok(value)
            }
        }
    }
}

#[derive(Clone, Default)]
struct MemoryCache {
    windows: Arc<DashMap<String, WindowEntry>>,
    values: Arc<DashMap<String, ValueEntry>>,
}

struct WindowEntry {
    count: u64,
    expires_at: Instant,
}

struct ValueEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryCache {
    fn incr_window(&self, key: &str, window: Duration) -> u64 {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                expires_at: now + window,
            });
        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + window;
        }
        entry.count += 1;
        entry.count
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) {
        self.values.insert(
            key.to_string(),
            ValueEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn take(&self, key: &str) -> Option<String> {
        let (_, entry) = self.values.remove(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value)
    }
}

//! # Groundwork
//!
//! A pre-wired fullstack backend scaffold for Rust: a lifecycle-managed HTTP
//! server with auth endpoints, standard middleware, and graceful shutdown.
//!
//! Groundwork gives a new project the plumbing that is usually rebuilt from
//! scratch: validated environment configuration, an application state
//! machine with one-shot lifecycle hooks, an assembled axum pipeline
//! (security headers, CORS, compression, request logging, rate limiting,
//! centralized error rendering), JWT auth glue, and a server process that
//! tracks connections, monitors memory, and drains cleanly on shutdown.
//!
//! ## Features
//!
//! - **Lifecycle state machine**: `created → initiated → booted → ready →
//!   terminating → terminated`, with ordered one-shot hooks per phase
//! - **HTTP kernel**: middleware + routes + error handler assembled in a
//!   fixed order, exactly once per process run
//! - **Server process**: connection counting, resource monitoring, graceful
//!   shutdown with a drain deadline
//! - **Auth scaffold**: register/login/refresh/profile over bcrypt and JWT
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use groundwork::config::Env;
//! use groundwork::lifecycle::Application;
//! use groundwork::server::{HttpServerProcess, ServerOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let env = Env::from_process_env().expect("invalid environment");
//!     let mut app = Application::new(env);
//!     let mut server = HttpServerProcess::new(ServerOptions::default());
//!
//!     if let Err(e) = server.start(&mut app).await {
//!         eprintln!("failed to start: {e}");
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod exception;
pub mod http;
pub mod lifecycle;
pub mod server;
pub mod worker;

// Re-export core types
pub use config::Env;
pub use exception::AppError;
pub use http::{AppContext, HttpKernel};
pub use lifecycle::{Application, ApplicationState, LifecycleError, LifecyclePhase};
pub use server::{HttpServerProcess, ServerOptions};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use groundwork::prelude::*;
/// ```
pub mod prelude {
    pub use crate::auth::{AuthService, AuthTokens, AuthUser};
    pub use crate::cache::CacheStore;
    pub use crate::config::{AppEnv, Env, EnvError};
    pub use crate::db::Database;
    pub use crate::exception::{AppError, AppJson};
    pub use crate::http::{AppContext, HttpKernel, KernelError};
    pub use crate::lifecycle::{
        Application, ApplicationState, LifecycleError, LifecyclePhase, shutdown_signal,
    };
    pub use crate::server::{
        ConnectionCounter, HttpServerProcess, MemorySampler, MemoryUsage, ResourceMonitor,
        ServerOptions,
    };
    pub use crate::worker::WorkerPool;
    pub use async_trait::async_trait;
    pub use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}

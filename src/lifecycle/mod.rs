//! Application Lifecycle Module
//!
//! This module provides the application state machine and its hook system:
//! one-shot, ordered handlers attached to named lifecycle phases.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Environment Validation
//!    ↓
//! 2. init()      - runs `initiating` hooks     → state: initiated
//!    ↓
//! 3. boot()      - runs `booting` hooks,
//!                  acquires DB + cache handles,
//!                  runs `booted` hooks          → state: booted
//!    ↓
//! 4. start(cb)   - runs `starting` hooks,
//!                  kernel boot + socket bind,
//!                  runs `ready` hooks           → state: ready
//!    ↓
//! [Serving...]
//!    ↓
//! 5. Shutdown Signal (SIGINT/SIGTERM/SIGQUIT)
//!    ↓
//! 6. terminate() - runs `terminating` hooks     → state: terminated
//! ```
//!
//! Hooks are single-use: running a phase drains its handler list, so a
//! guarded re-entry can never dispatch the same handler twice. A terminated
//! application is not reusable; restarting means constructing a fresh one.
//!
//! # Example
//!
//! ```rust,ignore
//! use groundwork::lifecycle::Application;
//!
//! let mut app = Application::new(env);
//! app.terminating(|app| {
//!     Box::pin(async move {
//!         tracing::info!("flushing buffers");
//!         Ok(())
//!     })
//! });
//! app.init().await?;
//! app.boot().await?;
//! ```

mod application;
mod error;
mod hooks;
mod shutdown;
mod state;

pub use application::Application;
pub use error::{LifecycleError, Result};
pub use hooks::{Hook, HookFuture, HookRegistry};
pub use shutdown::shutdown_signal;
pub use state::{ApplicationState, LifecyclePhase};

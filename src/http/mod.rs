//! HTTP surface: request context, kernel assembly, middleware, handlers.

pub mod context;
pub mod handlers;
pub mod kernel;
pub mod middleware;
pub mod proxy;
pub mod validate;

pub use context::AppContext;
pub use kernel::{HttpKernel, KernelError};

//! Lifecycle-specific error types

use thiserror::Error;

use super::state::LifecyclePhase;

/// Errors that can occur during lifecycle operations
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Application initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Boot failed while acquiring shared service handles
    #[error("Boot failed: {0}")]
    BootFailed(String),

    /// The start callback (kernel boot / socket bind) failed
    #[error("Start failed: {0}")]
    StartFailed(String),

    /// Shutdown operation failed
    #[error("Shutdown failed: {0}")]
    ShutdownFailed(String),

    /// Hook execution failed
    #[error("Hook execution failed during {phase}: {message}")]
    HookFailed {
        /// The phase whose handler failed
        phase: LifecyclePhase,
        /// Error message
        message: String,
    },

    /// The listener could not be bound or the server failed while serving
    #[error("Listener error: {0}")]
    Listen(#[source] std::io::Error),
}

impl LifecycleError {
    /// Create an initialization failure error
    pub fn init_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a boot failure error
    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::BootFailed(msg.into())
    }

    /// Create a start failure error
    pub fn start_failed(msg: impl Into<String>) -> Self {
        Self::StartFailed(msg.into())
    }

    /// Create a shutdown failure error
    pub fn shutdown_failed(msg: impl Into<String>) -> Self {
        Self::ShutdownFailed(msg.into())
    }

    /// Create a hook failure error
    pub fn hook_failed(phase: LifecyclePhase, message: impl Into<String>) -> Self {
        Self::HookFailed {
            phase,
            message: message.into(),
        }
    }
}

/// A specialized Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;

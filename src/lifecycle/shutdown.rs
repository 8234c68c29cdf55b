//! Shutdown signal handling.
//!
//! Wraps OS signal delivery into a single future the server process can
//! select against while serving.

use tokio::signal;

/// Resolve when a shutdown signal arrives, returning the signal's name.
///
/// Covers Ctrl+C (SIGINT) everywhere, SIGTERM and SIGQUIT on unix, and
/// Ctrl+Break on Windows.
///
/// # Example
///
/// ```rust,ignore
/// tokio::select! {
///     signal = shutdown_signal() => {
///         tracing::info!(signal, "starting graceful shutdown");
///     }
///     _ = server.serve() => {}
/// }
/// ```
pub async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(unix)]
    let quit = async {
        signal::unix::signal(signal::unix::SignalKind::quit())
            .expect("Failed to install SIGQUIT handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    #[cfg(not(unix))]
    let quit = std::future::pending::<()>();

    #[cfg(windows)]
    let ctrl_break = async {
        signal::windows::ctrl_break()
            .expect("Failed to install Ctrl+Break handler")
            .recv()
            .await;
    };

    #[cfg(not(windows))]
    let ctrl_break = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
            "SIGINT"
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
            "SIGTERM"
        },
        _ = quit => {
            tracing::info!("Received SIGQUIT signal");
            "SIGQUIT"
        },
        _ = ctrl_break => {
            tracing::info!("Received Ctrl+Break signal");
            "SIGBREAK"
        },
    }
}

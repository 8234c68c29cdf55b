//! Process entry point.
//!
//! Validates the environment, wires logging, constructs the application and
//! the server process, and maps the outcome to an exit code: 0 for a clean
//! shutdown, 1 for a startup failure, listener error, or shutdown failure.

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

use groundwork::config::Env;
use groundwork::lifecycle::Application;
use groundwork::server::{HttpServerProcess, ServerOptions};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Failed to start application: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let env = Env::from_process_env().context("Invalid environment variables")?;
    init_tracing(&env);
    install_panic_hook();

    let mut app = Application::new(env);
    let mut server = HttpServerProcess::new(ServerOptions::default());
    server
        .start(&mut app)
        .await
        .context("HTTP server process failed")?;
    Ok(())
}

fn init_tracing(env: &Env) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(env.log_level.as_filter()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if env.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// A panic anywhere in the process is not recoverable in-process; log it and
/// exit 1 so the supervisor restarts us.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        tracing::error!("uncaught panic, terminating process");
        std::process::exit(1);
    }));
}

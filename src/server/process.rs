//! HTTP server process.
//!
//! Owns the listener and its operational health: drives the application
//! through init/boot/start, binds the socket, tracks connections, runs the
//! resource monitor, and coordinates graceful shutdown. Startup failures
//! propagate to the binary, which exits nonzero for a
//! supervisor to restart.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use futures::future::BoxFuture;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Env;
use crate::http::context::AppContext;
use crate::http::kernel::HttpKernel;
use crate::lifecycle::{Application, ApplicationState, LifecycleError, Result, shutdown_signal};

use super::connection::{ConnectionCounter, ConnectionTracking};
use super::monitor::ResourceMonitor;

pub struct ServerOptions {
    pub max_connections: u64,
    pub memory_warning_threshold: f64,
    pub monitor_interval: Duration,
    /// How long accepted connections may drain after the shutdown signal
    /// before the process stops waiting for them.
    pub drain_deadline: Duration,
    /// Test seam: when set, this future replaces OS signals as the shutdown
    /// trigger.
    pub shutdown_trigger: Option<BoxFuture<'static, ()>>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            memory_warning_threshold: 0.8,
            monitor_interval: Duration::from_secs(30),
            drain_deadline: Duration::from_secs(30),
            shutdown_trigger: None,
        }
    }
}

pub struct HttpServerProcess {
    running: bool,
    connections: ConnectionCounter,
    options: ServerOptions,
    monitor_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    bound_addr: Arc<Mutex<Option<SocketAddr>>>,
}

impl HttpServerProcess {
    pub fn new(options: ServerOptions) -> Self {
        Self {
            running: false,
            connections: ConnectionCounter::new(),
            options,
            monitor_handle: Arc::new(Mutex::new(None)),
            bound_addr: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn connection_count(&self) -> u64 {
        self.connections.active()
    }

    pub fn connections(&self) -> ConnectionCounter {
        self.connections.clone()
    }

    /// The address the listener bound, once serving.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound_addr.lock().ok().and_then(|guard| *guard)
    }

    /// Start the server process and serve until shutdown. Idempotent: a
    /// second call on a running process warns and returns.
    pub async fn start(&mut self, app: &mut Application) -> Result<()> {
        if self.running {
            tracing::warn!("HTTP server process is already running");
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Shutdown plumbing is installed from an `initiating` hook so it
        // exists before boot acquires anything worth cleaning up.
        let trigger = self.options.shutdown_trigger.take();
        app.initiating(move |_app| {
            Box::pin(async move {
                match trigger {
                    Some(trigger) => {
                        tokio::spawn(async move {
                            trigger.await;
                            tracing::info!("shutdown trigger fired, starting graceful shutdown");
                            let _ = shutdown_tx.send(true);
                        });
                    }
                    None => {
                        tokio::spawn(async move {
                            let signal = shutdown_signal().await;
                            tracing::info!(signal, "starting graceful shutdown");
                            let _ = shutdown_tx.send(true);
                        });
                    }
                }
                Ok(())
            })
        });

        app.init().await?;
        app.boot().await?;

        let bound: Arc<Mutex<Option<(TcpListener, Router)>>> = Arc::new(Mutex::new(None));
        {
            let slot = Arc::clone(&bound);
            let counter = self.connections.clone();
            let monitor_slot = Arc::clone(&self.monitor_handle);
            let addr_slot = Arc::clone(&self.bound_addr);
            let max_connections = self.options.max_connections;
            let memory_warning_threshold = self.options.memory_warning_threshold;
            let monitor_interval = self.options.monitor_interval;

            app.start(move |app| {
                Box::pin(async move {
                    let ctx = AppContext::from_application(app)?;
                    let mut kernel = HttpKernel::new(ctx);
                    kernel.boot();
                    let router = kernel
                        .router()
                        .map_err(|e| LifecycleError::start_failed(e.to_string()))?;

                    let listener = listen(app.env()).await?;
                    if let Ok(local) = listener.local_addr() {
                        if let Ok(mut guard) = addr_slot.lock() {
                            *guard = Some(local);
                        }
                    }

                    let monitor = ResourceMonitor::new(
                        counter.clone(),
                        max_connections,
                        memory_warning_threshold,
                        monitor_interval,
                    );
                    if let Ok(mut guard) = monitor_slot.lock() {
                        *guard = Some(monitor.spawn());
                    }

                    // When the application begins to terminate, stop the
                    // monitor and zero the counters. The listener itself is
                    // closed by the graceful-shutdown drain.
                    let hook_monitor = Arc::clone(&monitor_slot);
                    let hook_counter = counter.clone();
                    app.terminating(move |_app| {
                        Box::pin(async move {
                            tracing::debug!("terminating signal received");
                            if let Ok(mut guard) = hook_monitor.lock() {
                                if let Some(handle) = guard.take() {
                                    handle.abort();
                                }
                            }
                            hook_counter.reset();
                            tracing::debug!("http server closed");
                            Ok(())
                        })
                    });

                    if let Ok(mut guard) = slot.lock() {
                        *guard = Some((listener, router));
                    }
                    Ok(())
                })
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to start HTTP server process");
                e
            })?;
        }

        let (listener, router) = bound
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
            .ok_or_else(|| LifecycleError::start_failed("listener was not bound"))?;
        self.running = true;

        self.serve(app, listener, router, shutdown_rx).await
    }

    async fn serve(
        &mut self,
        app: &mut Application,
        listener: TcpListener,
        router: Router,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<()> {
        let make_service = ConnectionTracking::new(router, self.connections.clone());

        let mut graceful_rx = shutdown_rx.clone();
        let server = axum::serve(listener, make_service)
            .with_graceful_shutdown(async move {
                let _ = graceful_rx.changed().await;
            })
            .into_future();

        let drain_deadline = self.options.drain_deadline;
        let mut deadline_rx = shutdown_rx;
        let force_close = async move {
            let _ = deadline_rx.changed().await;
            tokio::time::sleep(drain_deadline).await;
        };

        let serve_result = tokio::select! {
            result = server => result,
            () = force_close => {
                tracing::warn!(
                    deadline_secs = drain_deadline.as_secs(),
                    "drain deadline exceeded, closing remaining connections"
                );
                Ok(())
            }
        };

        self.running = false;
        if let Ok(mut guard) = self.bound_addr.lock() {
            *guard = None;
        }

        match serve_result {
            Ok(()) => self.finish_shutdown(app).await,
            Err(error) => {
                tracing::error!(error = %error, "http server crashed");
                if let Err(term_error) = app.terminate().await {
                    tracing::error!(error = %term_error, "error terminating after server crash");
                }
                Err(LifecycleError::Listen(error))
            }
        }
    }

    /// Graceful-shutdown tail: nothing to do when the application never got
    /// past `created` or already terminated; otherwise terminate and let the
    /// result decide the exit code.
    async fn finish_shutdown(&mut self, app: &mut Application) -> Result<()> {
        if app.is_terminated() || app.state() == ApplicationState::Created {
            tracing::debug!("app already terminated or never initialized");
            return Ok(());
        }
        app.terminate().await
    }
}

async fn listen(env: &Env) -> Result<TcpListener> {
    let addr = format!("{}:{}", env.host, env.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(error = %e, %addr, "error binding http server");
        LifecycleError::Listen(e)
    })?;

    let local = listener.local_addr().map_err(LifecycleError::Listen)?;
    tracing::info!("server running at http://{local}");
    tracing::info!("health check available at http://{local}/health");
    tracing::info!("api available at http://{local}/api");
    Ok(listener)
}

//! Application state machine.
//!
//! One `Application` exists per process. It owns the validated environment,
//! the database and cache handles, and the hook registry, and it walks the
//! forward-only state sequence `created → initiated → booted → ready →
//! terminating → terminated`. There is no ambient singleton: the entry point
//! constructs the instance and passes it by reference to everything that
//! needs it.

use std::time::{Duration, Instant};

use crate::cache::CacheStore;
use crate::config::Env;
use crate::db::Database;

use super::error::{LifecycleError, Result};
use super::hooks::{Hook, HookFuture, HookRegistry};
use super::state::{ApplicationState, LifecyclePhase};

pub struct Application {
    env: Env,
    state: ApplicationState,
    terminating: bool,
    db: Option<Database>,
    cache: Option<CacheStore>,
    hooks: HookRegistry,
    started_at: Instant,
}

impl Application {
    /// Create an application in the `created` state. The environment is
    /// immutable from here on; `init` marks the point past which no caller
    /// may replace it.
    pub fn new(env: Env) -> Self {
        Self {
            env,
            state: ApplicationState::Created,
            terminating: false,
            db: None,
            cache: None,
            hooks: HookRegistry::new(),
            started_at: Instant::now(),
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn state(&self) -> ApplicationState {
        self.state
    }

    /// The database handle. `None` until `boot` has run.
    pub fn database(&self) -> Option<&Database> {
        self.db.as_ref()
    }

    /// The cache-client handle. `None` until `boot` has run.
    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn is_booted(&self) -> bool {
        !matches!(
            self.state,
            ApplicationState::Created | ApplicationState::Initiated
        )
    }

    pub fn is_ready(&self) -> bool {
        self.state == ApplicationState::Ready
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ApplicationState::Terminated
    }

    pub fn is_terminating(&self) -> bool {
        self.terminating && self.state != ApplicationState::Terminated
    }

    pub fn in_production(&self) -> bool {
        self.env.is_production()
    }

    pub fn in_development(&self) -> bool {
        self.env.is_development()
    }

    pub fn in_test(&self) -> bool {
        self.env.is_test()
    }

    pub fn in_local(&self) -> bool {
        self.env.is_local()
    }

    /// Register a hook for the `initiating` phase.
    pub fn initiating<F>(&mut self, hook: F) -> &mut Self
    where
        F: for<'a> FnOnce(&'a mut Application) -> HookFuture<'a> + Send + 'static,
    {
        self.register(LifecyclePhase::Initiating, Box::new(hook))
    }

    /// Register a hook that runs before boot acquires service handles.
    pub fn booting<F>(&mut self, hook: F) -> &mut Self
    where
        F: for<'a> FnOnce(&'a mut Application) -> HookFuture<'a> + Send + 'static,
    {
        self.register(LifecyclePhase::Booting, Box::new(hook))
    }

    /// Register a hook that runs once service handles are acquired.
    pub fn booted<F>(&mut self, hook: F) -> &mut Self
    where
        F: for<'a> FnOnce(&'a mut Application) -> HookFuture<'a> + Send + 'static,
    {
        self.register(LifecyclePhase::Booted, Box::new(hook))
    }

    /// Register a hook that runs before the start callback.
    pub fn starting<F>(&mut self, hook: F) -> &mut Self
    where
        F: for<'a> FnOnce(&'a mut Application) -> HookFuture<'a> + Send + 'static,
    {
        self.register(LifecyclePhase::Starting, Box::new(hook))
    }

    /// Register a hook that runs once the listener is bound.
    pub fn ready<F>(&mut self, hook: F) -> &mut Self
    where
        F: for<'a> FnOnce(&'a mut Application) -> HookFuture<'a> + Send + 'static,
    {
        self.register(LifecyclePhase::Ready, Box::new(hook))
    }

    /// Register a hook for graceful shutdown.
    pub fn terminating<F>(&mut self, hook: F) -> &mut Self
    where
        F: for<'a> FnOnce(&'a mut Application) -> HookFuture<'a> + Send + 'static,
    {
        self.register(LifecyclePhase::Terminating, Box::new(hook))
    }

    fn register(&mut self, phase: LifecyclePhase, hook: Hook) -> &mut Self {
        self.hooks.add(phase, hook);
        self
    }

    /// Initialize the application. Valid only from `created`; from any other
    /// state this is a logged no-op.
    pub async fn init(&mut self) -> Result<()> {
        if self.state != ApplicationState::Created {
            tracing::debug!(state = %self.state, "app already initialized");
            return Ok(());
        }

        tracing::debug!("initializing app");
        self.run_hooks(LifecyclePhase::Initiating).await?;
        self.state = ApplicationState::Initiated;
        Ok(())
    }

    /// Boot the application: run `booting` hooks, acquire the database and
    /// cache handles, run `booted` hooks. A handle-acquisition failure is
    /// fatal and propagates to the caller.
    pub async fn boot(&mut self) -> Result<()> {
        if self.state != ApplicationState::Initiated {
            tracing::warn!(state = %self.state, "application is not initialized");
            return Ok(());
        }

        self.run_hooks(LifecyclePhase::Booting).await?;

        tracing::info!("booting application");
        let db = Database::connect(&self.env).map_err(|e| {
            tracing::error!(error = %e, "failed to boot application");
            LifecycleError::boot_failed(e.to_string())
        })?;
        let cache = CacheStore::connect(&self.env).await.map_err(|e| {
            tracing::error!(error = %e, "failed to boot application");
            LifecycleError::boot_failed(e.to_string())
        })?;
        self.db = Some(db);
        self.cache = Some(cache);

        self.run_hooks(LifecyclePhase::Booted).await?;
        self.state = ApplicationState::Booted;
        tracing::info!("application booted successfully");
        Ok(())
    }

    /// Start the application. The callback is where the HTTP kernel is
    /// assembled and the listener bound; it runs between the `starting` and
    /// `ready` hooks. Valid only from `booted`.
    pub async fn start<F>(&mut self, callback: F) -> Result<()>
    where
        F: for<'a> FnOnce(&'a mut Application) -> HookFuture<'a>,
    {
        if self.state != ApplicationState::Booted {
            tracing::debug!(state = %self.state, "cannot start app from state");
            return Ok(());
        }

        tracing::debug!("starting app");
        self.run_hooks(LifecyclePhase::Starting).await?;

        callback(self).await?;

        self.run_hooks(LifecyclePhase::Ready).await?;
        self.state = ApplicationState::Ready;
        tracing::debug!("application ready");
        Ok(())
    }

    /// Stop the application gracefully. Valid unless the state is still
    /// `created` or already `terminated`. Hook errors are logged and
    /// propagate; the state only reaches `terminated` on success.
    pub async fn terminate(&mut self) -> Result<()> {
        if matches!(
            self.state,
            ApplicationState::Created | ApplicationState::Terminated
        ) {
            tracing::debug!(state = %self.state, "cannot terminate app from state");
            return Ok(());
        }

        tracing::debug!("app terminating");
        self.terminating = true;
        self.state = ApplicationState::Terminating;

        match self.run_hooks(LifecyclePhase::Terminating).await {
            Ok(()) => {
                self.state = ApplicationState::Terminated;
                tracing::debug!("application terminated successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "error stopping application");
                Err(e)
            }
        }
    }

    /// Run and clear a phase's hooks, in registration order.
    async fn run_hooks(&mut self, phase: LifecyclePhase) -> Result<()> {
        let hooks = self.hooks.drain(phase);
        if hooks.is_empty() {
            return Ok(());
        }

        tracing::debug!(%phase, count = hooks.len(), "running lifecycle hooks");
        for hook in hooks {
            hook(self)
                .await
                .map_err(|e| LifecycleError::hook_failed(phase, e.to_string()))?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn hook_count(&self, phase: LifecyclePhase) -> usize {
        self.hooks.len(phase)
    }
}

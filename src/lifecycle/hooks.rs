//! Lifecycle hook registry.
//!
//! A hook is a one-shot handler attached to a [`LifecyclePhase`]. Handlers
//! run in registration order and receive the application itself; running a
//! phase drains its list, so hooks fire exactly once per lifecycle run.

use futures::future::BoxFuture;

use super::application::Application;
use super::error::Result;
use super::state::LifecyclePhase;

/// The future returned by a hook, borrowing the application for its run.
pub type HookFuture<'a> = BoxFuture<'a, Result<()>>;

/// A registered lifecycle handler.
pub type Hook = Box<dyn for<'a> FnOnce(&'a mut Application) -> HookFuture<'a> + Send>;

/// Ordered, per-phase hook storage. One field per phase rather than a map
/// keyed by name: the compiler owns the phase set.
#[derive(Default)]
pub struct HookRegistry {
    initiating: Vec<Hook>,
    booting: Vec<Hook>,
    booted: Vec<Hook>,
    starting: Vec<Hook>,
    ready: Vec<Hook>,
    terminating: Vec<Hook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to a phase. Registration order is execution order.
    pub fn add(&mut self, phase: LifecyclePhase, hook: Hook) {
        self.list_mut(phase).push(hook);
    }

    /// Remove and return all handlers for a phase. The caller runs them; the
    /// registry forgets them.
    pub fn drain(&mut self, phase: LifecyclePhase) -> Vec<Hook> {
        std::mem::take(self.list_mut(phase))
    }

    /// Number of handlers currently registered for a phase.
    pub fn len(&self, phase: LifecyclePhase) -> usize {
        match phase {
            LifecyclePhase::Initiating => self.initiating.len(),
            LifecyclePhase::Booting => self.booting.len(),
            LifecyclePhase::Booted => self.booted.len(),
            LifecyclePhase::Starting => self.starting.len(),
            LifecyclePhase::Ready => self.ready.len(),
            LifecyclePhase::Terminating => self.terminating.len(),
        }
    }

    pub fn is_empty(&self, phase: LifecyclePhase) -> bool {
        self.len(phase) == 0
    }

    fn list_mut(&mut self, phase: LifecyclePhase) -> &mut Vec<Hook> {
        match phase {
            LifecyclePhase::Initiating => &mut self.initiating,
            LifecyclePhase::Booting => &mut self.booting,
            LifecyclePhase::Booted => &mut self.booted,
            LifecyclePhase::Starting => &mut self.starting,
            LifecyclePhase::Ready => &mut self.ready,
            LifecyclePhase::Terminating => &mut self.terminating,
        }
    }
}

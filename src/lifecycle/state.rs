//! Lifecycle state and phase enums.

use strum_macros::Display;

/// Current position of the application in its lifecycle. Transitions are
/// strictly forward; no state is re-entered once passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ApplicationState {
    Created,
    Initiated,
    Booted,
    Ready,
    Terminating,
    Terminated,
}

/// A hook dispatch point. Each phase owns an ordered, one-shot handler list
/// in the [`HookRegistry`](super::HookRegistry). A typed enum rather than
/// string event names: an unknown phase cannot exist at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LifecyclePhase {
    Initiating,
    Booting,
    Booted,
    Starting,
    Ready,
    Terminating,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lowercase() {
        assert_eq!(ApplicationState::Created.to_string(), "created");
        assert_eq!(ApplicationState::Terminated.to_string(), "terminated");
        assert_eq!(LifecyclePhase::Initiating.to_string(), "initiating");
    }
}

use std::fmt;

/// Application context lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Context is built but `refresh()` has not run
    Uninitialized,
    /// `refresh()` is in progress, or failed partway through
    Refreshing,
    /// Refresh completed, the object graph is live
    Ready,
    /// `close()` ran, singletons are destroyed
    Closed,
}

impl ContextState {
    /// Check whether objects may be handed out in this state.
    ///
    /// `Refreshing` is included so that processors and context-aware objects
    /// constructed during refresh can already resolve dependencies through
    /// their `ContextRef`.
    pub fn is_usable(&self) -> bool {
        matches!(self, ContextState::Refreshing | ContextState::Ready)
    }

    /// Check whether the context reached its terminal state
    pub fn is_closed(&self) -> bool {
        matches!(self, ContextState::Closed)
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContextState::Uninitialized => "uninitialized",
            ContextState::Refreshing => "refreshing",
            ContextState::Ready => "ready",
            ContextState::Closed => "closed",
        };
        write!(f, "{}", label)
    }
}

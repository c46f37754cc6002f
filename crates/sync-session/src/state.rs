//! The per-session state machine (spec §4.G).

/// Lifecycle state of a document session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Storage is being fetched; joining clients queue until `Loaded`.
    Initializing,
    /// Normal operation.
    Loaded,
    /// Last client left; a 60s cleanup timer is armed. A new join
    /// cancels the timer and returns to `Loaded`.
    Draining,
    /// Terminal: the session has been disposed and must not be reused.
    Disposed,
}

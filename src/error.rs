//! Error types shared across the crate

use thiserror::Error;

/// Failure to run work on the UI-affine context
///
/// Callers treat every variant as "skip this tick / drop this dispatch";
/// none of them is surfaced to the application.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The context is shutting down and no longer accepts work
    #[error("UI context is shutting down")]
    ShuttingDown,

    /// The job was dropped before producing a result (context exited or job panicked)
    #[error("UI job was dropped before completing")]
    Dropped,

    /// A blocking call did not complete in time
    #[error("UI call timed out after {0} ms")]
    TimedOut(u64),
}

/// Failure to register a global hotkey
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HotkeyError {
    /// The gesture string could not be parsed
    #[error("invalid hotkey gesture '{gesture}': {reason}")]
    InvalidGesture { gesture: String, reason: String },

    /// The OS refused the registration (conflict, window not ready, ...)
    #[error("hotkey '{gesture}' rejected: {reason}")]
    Rejected { gesture: String, reason: String },

    /// The hotkey facility could not be initialised on this thread
    #[error("hotkey backend unavailable: {0}")]
    Unavailable(String),
}

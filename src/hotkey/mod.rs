//! Global hotkey registration
//!
//! [`HotkeyRegistrar`] owns the registration lifecycle and its bounded
//! retry timer. The OS facility sits behind [`HotkeyBackend`]; every
//! backend call is made on the UI context.

pub mod global;
pub mod registrar;

use crate::error::HotkeyError;
use crate::listener::ToggleCallback;

pub use global::GlobalHotkeyBackend;
pub use registrar::{HotkeyRegistrar, RetryPolicy};

/// Registration lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    /// Nothing registered (never started, disabled, stopped or abandoned)
    Unregistered,
    /// Last attempt failed; `attempts` retries made so far
    PendingRetry { attempts: u32 },
    Registered,
}

/// OS hotkey facility
///
/// At most one gesture is registered at a time. Implementations may be
/// thread-affine; callers only use them on the UI context.
pub trait HotkeyBackend: Send {
    /// Register `gesture`; `on_fire` runs each time it is pressed
    fn register(&mut self, gesture: &str, on_fire: ToggleCallback) -> Result<(), HotkeyError>;

    /// Remove the registered gesture, if any
    fn unregister(&mut self);
}

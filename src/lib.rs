//! Overlay input activation
//!
//! Turns a global hotkey and game controller chords into one
//! `ToggleRequested` event, and drives overlay navigation from controller
//! buttons while the overlay is shown.

pub mod config;
pub mod error;
pub mod hotkey;
pub mod input;
pub mod listener;
pub mod overlay;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AppConfig, InputConfig};
pub use error::{DispatchError, HotkeyError};
pub use hotkey::{GlobalHotkeyBackend, HotkeyBackend, HotkeyRegistrar, RegistrationState};
pub use listener::{InputListener, ToggleCallback, ToggleSink};
pub use overlay::{ConsoleOverlay, OverlayNavigator};
pub use ui::{Priority, UiContext, UiContextExt, UiThread};

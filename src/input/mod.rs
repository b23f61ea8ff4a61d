//! Controller input
//!
//! Two independent pollers sample the same controllers:
//! - [`toggle`] watches for the configured chord and raises toggles
//! - [`navigation`] turns button presses into overlay navigation
//!
//! Each keeps its own per-slot state.

pub mod buttons;
pub mod combo;
pub mod diagnostics;
pub mod navigation;
pub mod poll_loop;
pub mod slot;
pub mod source;
pub mod toggle;

pub use buttons::ButtonMask;
pub use navigation::{NavAction, NavigationPoller};
pub use source::{open_default_source, ControllerSource, ControllerState};
pub use toggle::ControllerTogglePoller;

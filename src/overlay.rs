//! Overlay collaborator surface
//!
//! The overlay window itself lives in the host application. Navigation
//! calls are only ever made on the UI context.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Methods the navigation poller drives on the overlay
pub trait OverlayNavigator: Send + Sync {
    /// Whether the overlay is shown and ready for input
    fn is_visible_and_loaded(&self) -> bool;

    fn navigate_up(&self);
    fn navigate_down(&self);
    fn navigate_left(&self);
    fn navigate_right(&self);
    fn accept(&self);
    fn cancel(&self);
}

/// Stand-in overlay that logs navigation to the console
#[derive(Debug, Default)]
pub struct ConsoleOverlay {
    visible: AtomicBool,
}

impl ConsoleOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip visibility
    ///
    /// # Returns
    /// The new visibility
    pub fn toggle(&self) -> bool {
        let visible = !self.visible.fetch_xor(true, Ordering::SeqCst);
        if visible {
            info!("🪟 Overlay shown");
        } else {
            info!("🪟 Overlay hidden");
        }
        visible
    }

    pub fn hide(&self) {
        if self.visible.swap(false, Ordering::SeqCst) {
            info!("🪟 Overlay hidden");
        }
    }
}

impl OverlayNavigator for ConsoleOverlay {
    fn is_visible_and_loaded(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    fn navigate_up(&self) {
        info!("⬆️  Navigate up");
    }

    fn navigate_down(&self) {
        info!("⬇️  Navigate down");
    }

    fn navigate_left(&self) {
        info!("⬅️  Navigate left");
    }

    fn navigate_right(&self) {
        info!("➡️  Navigate right");
    }

    fn accept(&self) {
        info!("✅ Accept");
    }

    fn cancel(&self) {
        info!("❌ Cancel");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_overlay_toggle() {
        let overlay = ConsoleOverlay::new();
        assert!(!overlay.is_visible_and_loaded());
        assert!(overlay.toggle());
        assert!(overlay.is_visible_and_loaded());
        assert!(!overlay.toggle());
        overlay.toggle();
        overlay.hide();
        assert!(!overlay.is_visible_and_loaded());
    }
}

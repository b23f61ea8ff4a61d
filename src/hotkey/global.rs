//! `global-hotkey` backed hotkey facility
//!
//! The `GlobalHotKeyManager` is created lazily on the first registration
//! and lives in a thread-local, so it stays on the UI thread that pumps
//! its messages.

use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::HotkeyBackend;
use crate::error::HotkeyError;
use crate::listener::ToggleCallback;

thread_local! {
    static MANAGER: RefCell<Option<GlobalHotKeyManager>> = const { RefCell::new(None) };
}

type HandlerMap = Arc<Mutex<HashMap<u32, ToggleCallback>>>;

fn with_manager<R>(
    f: impl FnOnce(&GlobalHotKeyManager) -> Result<R, HotkeyError>,
) -> Result<R, HotkeyError> {
    MANAGER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            let manager = GlobalHotKeyManager::new()
                .map_err(|e| HotkeyError::Unavailable(e.to_string()))?;
            debug!("Global hotkey manager created");
            *slot = Some(manager);
        }

        match slot.as_ref() {
            Some(manager) => f(manager),
            None => Err(HotkeyError::Unavailable("hotkey manager missing".to_string())),
        }
    })
}

/// Hotkey backend using the `global-hotkey` crate
pub struct GlobalHotkeyBackend {
    /// Registered hotkey and the gesture it was parsed from
    current: Option<(HotKey, String)>,
    handlers: HandlerMap,
}

impl GlobalHotkeyBackend {
    /// Create the backend and route pressed events to registered callbacks
    pub fn new() -> Self {
        let handlers: HandlerMap = Arc::default();
        let routes = handlers.clone();

        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            if event.state != HotKeyState::Pressed {
                return;
            }
            // Release the map before running the callback
            let callback = routes.lock().get(&event.id).cloned();
            if let Some(callback) = callback {
                callback();
            }
        }));

        Self {
            current: None,
            handlers,
        }
    }
}

impl Default for GlobalHotkeyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn register(&mut self, gesture: &str, on_fire: ToggleCallback) -> Result<(), HotkeyError> {
        let hotkey = gesture
            .parse::<HotKey>()
            .map_err(|e| HotkeyError::InvalidGesture {
                gesture: gesture.to_string(),
                reason: e.to_string(),
            })?;

        self.unregister();

        with_manager(|manager| {
            manager.register(hotkey).map_err(|e| HotkeyError::Rejected {
                gesture: gesture.to_string(),
                reason: e.to_string(),
            })
        })?;

        self.handlers.lock().insert(hotkey.id(), on_fire);
        self.current = Some((hotkey, gesture.to_string()));
        Ok(())
    }

    fn unregister(&mut self) {
        let Some((hotkey, gesture)) = self.current.take() else {
            return;
        };

        self.handlers.lock().remove(&hotkey.id());
        if let Err(e) = with_manager(|manager| {
            manager.unregister(hotkey).map_err(|e| HotkeyError::Rejected {
                gesture: gesture.clone(),
                reason: e.to_string(),
            })
        }) {
            warn!("⚠️  Failed to unregister hotkey: {}", e);
        }
    }
}

impl Drop for GlobalHotkeyBackend {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_gesture_rejected_before_os_call() {
        let mut backend = GlobalHotkeyBackend {
            current: None,
            handlers: Arc::default(),
        };

        let err = backend
            .register("Ctrl+Shift+NotAKey", Arc::new(|| {}))
            .unwrap_err();
        assert!(matches!(err, HotkeyError::InvalidGesture { .. }));
        assert!(backend.current.is_none());
        assert!(backend.handlers.lock().is_empty());
    }

    #[test]
    fn test_gesture_format_parses() {
        for gesture in ["Ctrl+Shift+O", "alt+F10", "Shift+Alt+KeyQ"] {
            assert!(gesture.parse::<HotKey>().is_ok(), "{} should parse", gesture);
        }
    }
}

//! Input listener façade
//!
//! Owns the hotkey registrar and the controller toggle poller, and funnels
//! both into one `ToggleRequested` event. Hotkey and controller lifecycles
//! are independent: the hotkey normally runs for the whole session, while
//! the host may only poll controllers while a game is active.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{InputConfig, SharedInputConfig, TimingConfig};
use crate::hotkey::{HotkeyBackend, HotkeyRegistrar, RegistrationState, RetryPolicy};
use crate::input::source::ControllerSource;
use crate::input::toggle::ControllerTogglePoller;
use crate::ui::UiContext;

/// Callback invoked for every `ToggleRequested`
pub type ToggleCallback = Arc<dyn Fn() + Send + Sync>;

/// Fan-in point for toggle requests
///
/// Cloning shares the subscriber list. Subscribers run on the emitting
/// thread (poller thread for chords, UI thread for hotkeys).
#[derive(Clone, Default)]
pub struct ToggleSink {
    subscribers: Arc<RwLock<Vec<ToggleCallback>>>,
}

impl ToggleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: ToggleCallback) {
        self.subscribers.write().push(callback);
    }

    /// Raise one `ToggleRequested`
    pub fn emit(&self) {
        // Snapshot so subscribers may subscribe from inside a callback
        let subscribers = self.subscribers.read().clone();
        debug!("Toggle requested ({} subscriber(s))", subscribers.len());
        for callback in subscribers {
            callback();
        }
    }

    /// Callback that emits into this sink
    pub fn emitter(&self) -> ToggleCallback {
        let sink = self.clone();
        Arc::new(move || sink.emit())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

/// Hotkey + controller toggle sources behind one event
pub struct InputListener {
    source: Arc<dyn ControllerSource>,
    config: SharedInputConfig,
    timing: TimingConfig,
    sink: ToggleSink,
    registrar: HotkeyRegistrar,
    controller: Mutex<Option<ControllerTogglePoller>>,
}

impl InputListener {
    /// Create a stopped listener
    ///
    /// # Arguments
    /// * `ui` - Context hotkey registration runs on
    /// * `backend` - OS hotkey facility
    /// * `source` - Controller state for the toggle poller
    /// * `config` - Initial input configuration
    /// * `timing` - Poll interval and hotkey retry policy
    pub fn new(
        ui: Arc<dyn UiContext>,
        backend: Box<dyn HotkeyBackend>,
        source: Arc<dyn ControllerSource>,
        config: InputConfig,
        timing: TimingConfig,
    ) -> Self {
        let sink = ToggleSink::new();
        let policy = RetryPolicy {
            interval: timing.hotkey_retry_interval(),
            limit: timing.hotkey_retry_limit,
        };
        let registrar = HotkeyRegistrar::new(ui, backend, sink.emitter(), policy);

        Self {
            source,
            config: Arc::new(RwLock::new(config)),
            timing,
            sink,
            registrar,
            controller: Mutex::new(None),
        }
    }

    /// Register a `ToggleRequested` consumer
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.sink.subscribe(Arc::new(callback));
    }

    /// Start the hotkey and the controller poller
    pub fn start(&self) -> std::io::Result<()> {
        self.start_hotkey();
        self.start_controller()
    }

    pub fn stop(&self) {
        self.stop_hotkey();
        self.stop_controller();
    }

    /// (Re)register the configured hotkey
    ///
    /// # Returns
    /// Registration state after the immediate attempt
    pub fn start_hotkey(&self) -> RegistrationState {
        let gesture = self.config.read().custom_hotkey.clone();
        match self.registrar.start(gesture.as_deref()) {
            Ok(state) => state,
            Err(e) => {
                debug!("Hotkey registration skipped: {}", e);
                self.registrar.state()
            },
        }
    }

    pub fn stop_hotkey(&self) {
        self.registrar.stop();
    }

    /// Start the controller toggle poller; no-op when already running
    pub fn start_controller(&self) -> std::io::Result<()> {
        let mut controller = self.controller.lock();
        if controller.as_ref().is_some_and(ControllerTogglePoller::is_running) {
            return Ok(());
        }

        *controller = Some(ControllerTogglePoller::start(
            self.source.clone(),
            self.config.clone(),
            self.timing.toggle_poll_interval(),
            self.sink.emitter(),
        )?);

        info!("🎮 Controller toggle polling started");
        Ok(())
    }

    pub fn stop_controller(&self) {
        // Release the lock before joining; toggle subscribers may query the listener
        let poller = self.controller.lock().take();
        if let Some(mut poller) = poller {
            poller.stop();
            info!("🎮 Controller toggle polling stopped");
        }
    }

    /// Replace the input configuration and re-run hotkey registration
    ///
    /// The controller poller picks up the new chord on its next tick.
    pub fn apply_settings(&self, config: InputConfig) -> RegistrationState {
        info!(
            "Applying input settings: hotkey={}, controller={} ({})",
            config.custom_hotkey.as_deref().unwrap_or("off"),
            if config.controller_toggle_enabled { "on" } else { "off" },
            config.controller_combo
        );
        *self.config.write() = config;
        self.start_hotkey()
    }

    /// Raise `ToggleRequested`
    pub fn trigger_toggle(&self) {
        self.sink.emit();
    }

    pub fn hotkey_state(&self) -> RegistrationState {
        self.registrar.state()
    }

    pub fn is_controller_running(&self) -> bool {
        self.controller
            .lock()
            .as_ref()
            .is_some_and(ControllerTogglePoller::is_running)
    }

    /// Current input configuration
    pub fn config(&self) -> InputConfig {
        self.config.read().clone()
    }
}

impl Drop for InputListener {
    fn drop(&mut self) {
        self.stop();
    }
}

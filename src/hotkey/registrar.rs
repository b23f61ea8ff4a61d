//! Hotkey registration state machine with bounded retry
//!
//! Registration can fail transiently (window handle not ready yet, another
//! app holding the gesture). A failed `start` arms a recurring retry timer
//! whose ticks run on the UI context:
//!
//! ```text
//! Unregistered --start ok--> Registered
//! Unregistered --start fails--> PendingRetry(0)
//! PendingRetry(n) --tick ok--> Registered
//! PendingRetry(n) --tick fails, n+1 < limit--> PendingRetry(n+1)
//! PendingRetry(n) --tick fails, n+1 >= limit--> Unregistered (abandoned)
//! ```
//!
//! Every attempt registers the same callback.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use crossbeam::select;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{HotkeyBackend, RegistrationState};
use crate::error::DispatchError;
use crate::listener::ToggleCallback;
use crate::ui::{Priority, UiContext, UiContextExt};

/// Retry cadence and bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// Retries after the initial attempt before giving up
    pub limit: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            limit: 10,
        }
    }
}

struct RegistrarCore {
    me: Weak<Mutex<RegistrarCore>>,
    ui: Arc<dyn UiContext>,
    backend: Box<dyn HotkeyBackend>,
    on_fire: ToggleCallback,
    policy: RetryPolicy,
    state: RegistrationState,
    gesture: Option<String>,
    /// Dropping the sender stops the timer thread
    timer: Option<Sender<()>>,
    /// Bumped on every cancel; ticks from an older timer are ignored
    generation: u64,
}

impl RegistrarCore {
    fn start(&mut self, gesture: Option<String>) -> RegistrationState {
        self.cancel_timer();
        self.release();

        self.gesture = gesture;
        let Some(gesture) = self.gesture.clone() else {
            debug!("No custom hotkey configured");
            return self.state;
        };

        match self.backend.register(&gesture, self.on_fire.clone()) {
            Ok(()) => {
                info!("⌨️  Hotkey '{}' registered", gesture);
                self.state = RegistrationState::Registered;
            },
            Err(e) => {
                warn!(
                    "⚠️  Hotkey '{}' registration failed: {}; retrying every {} ms",
                    gesture,
                    e,
                    self.policy.interval.as_millis()
                );
                self.state = RegistrationState::PendingRetry { attempts: 0 };
                self.arm_timer();
            },
        }

        self.state
    }

    fn stop(&mut self) {
        self.cancel_timer();
        self.release();
        self.gesture = None;
    }

    /// Unregister if something is registered; always ends `Unregistered`
    fn release(&mut self) {
        if self.state == RegistrationState::Registered {
            self.backend.unregister();
            debug!("Hotkey unregistered");
        }
        self.state = RegistrationState::Unregistered;
    }

    fn on_retry_tick(&mut self, generation: u64) {
        if generation != self.generation {
            debug!("Ignoring stale hotkey retry tick");
            return;
        }

        let RegistrationState::PendingRetry { attempts } = self.state else {
            self.cancel_timer();
            return;
        };

        let Some(gesture) = self.gesture.clone() else {
            self.cancel_timer();
            self.state = RegistrationState::Unregistered;
            return;
        };

        let attempts = attempts + 1;
        match self.backend.register(&gesture, self.on_fire.clone()) {
            Ok(()) => {
                self.cancel_timer();
                self.state = RegistrationState::Registered;
                info!("✅ Hotkey '{}' registered after {} retries", gesture, attempts);
            },
            Err(e) if attempts >= self.policy.limit => {
                self.cancel_timer();
                self.state = RegistrationState::Unregistered;
                warn!(
                    "⚠️  Giving up on hotkey '{}' after {} retries: {}",
                    gesture, attempts, e
                );
            },
            Err(e) => {
                self.state = RegistrationState::PendingRetry { attempts };
                debug!(
                    "Hotkey '{}' retry {}/{} failed: {}",
                    gesture, attempts, self.policy.limit, e
                );
            },
        }
    }

    fn arm_timer(&mut self) {
        self.cancel_timer();

        let generation = self.generation;
        let interval = self.policy.interval;
        let core = self.me.clone();
        let ui = self.ui.clone();
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let spawned = std::thread::Builder::new()
            .name("hotkey-retry".to_string())
            .spawn(move || retry_timer_loop(core, ui, generation, interval, stop_rx));

        match spawned {
            Ok(_) => self.timer = Some(stop_tx),
            Err(e) => {
                error!("Failed to start hotkey retry timer: {}", e);
                self.state = RegistrationState::Unregistered;
            },
        }
    }

    fn cancel_timer(&mut self) {
        if self.timer.take().is_some() {
            self.generation += 1;
            debug!("Hotkey retry timer cancelled");
        }
    }
}

/// Post one retry tick per interval, never more than one in flight
///
/// The interval is measured from the end of the previous tick, so a busy UI
/// context delays retries instead of letting them queue up.
fn retry_timer_loop(
    core: Weak<Mutex<RegistrarCore>>,
    ui: Arc<dyn UiContext>,
    generation: u64,
    interval: Duration,
    stop_rx: Receiver<()>,
) {
    let (done_tx, done_rx) = channel::bounded::<()>(1);

    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {},
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }

        if core.strong_count() == 0 {
            return;
        }

        let target = core.clone();
        let done = done_tx.clone();
        let posted = ui.post(
            Priority::Normal,
            Box::new(move || {
                if let Some(core) = target.upgrade() {
                    core.lock().on_retry_tick(generation);
                }
                let _ = done.send(());
            }),
        );

        if posted.is_err() {
            debug!("UI context gone; hotkey retry timer exiting");
            return;
        }

        // Wait for the tick to run before timing the next one
        loop {
            let tick_done = select! {
                recv(done_rx) -> _ => Some(true),
                recv(stop_rx) -> _ => None,
                default(interval) => Some(false),
            };

            match tick_done {
                Some(true) => break,
                None => return,
                Some(false) if core.strong_count() == 0 || ui.is_shutting_down() => return,
                Some(false) => {},
            }
        }
    }
}

/// Owns hotkey registration and its retry timer
pub struct HotkeyRegistrar {
    core: Arc<Mutex<RegistrarCore>>,
    ui: Arc<dyn UiContext>,
}

impl HotkeyRegistrar {
    /// Create an idle registrar
    ///
    /// # Arguments
    /// * `ui` - Context all backend calls and retry ticks run on
    /// * `backend` - OS hotkey facility
    /// * `on_fire` - Callback registered with every attempt
    /// * `policy` - Retry cadence and bound
    pub fn new(
        ui: Arc<dyn UiContext>,
        backend: Box<dyn HotkeyBackend>,
        on_fire: ToggleCallback,
        policy: RetryPolicy,
    ) -> Self {
        let core = Arc::new_cyclic(|me| {
            Mutex::new(RegistrarCore {
                me: me.clone(),
                ui: ui.clone(),
                backend,
                on_fire,
                policy,
                state: RegistrationState::Unregistered,
                gesture: None,
                timer: None,
                generation: 0,
            })
        });

        Self { core, ui }
    }

    /// Register `gesture`, replacing any previous registration
    ///
    /// A blank or absent gesture just unregisters. Failure to register is
    /// not an error: the registrar moves to `PendingRetry` and retries.
    ///
    /// # Returns
    /// State after the immediate attempt
    pub fn start(&self, gesture: Option<&str>) -> Result<RegistrationState, DispatchError> {
        let gesture = gesture
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string);

        let core = self.core.clone();
        self.ui.run_blocking(move || core.lock().start(gesture))
    }

    /// Cancel the retry timer, then unregister; idempotent
    pub fn stop(&self) {
        let core = self.core.clone();
        if let Err(e) = self.ui.run_blocking(move || core.lock().stop()) {
            debug!(
                "Hotkey stop without UI context ({}); OS registration is released when it exits",
                e
            );
            let mut core = self.core.lock();
            core.cancel_timer();
            core.gesture = None;
            core.state = RegistrationState::Unregistered;
        }
    }

    /// Run one retry tick now, exactly as the timer would
    pub fn retry_tick(&self) -> Result<RegistrationState, DispatchError> {
        let core = self.core.clone();
        self.ui.run_blocking(move || {
            let mut core = core.lock();
            let generation = core.generation;
            core.on_retry_tick(generation);
            core.state
        })
    }

    pub fn state(&self) -> RegistrationState {
        self.core.lock().state
    }

    /// Gesture of the current or pending registration
    pub fn gesture(&self) -> Option<String> {
        self.core.lock().gesture.clone()
    }

    pub fn is_retrying(&self) -> bool {
        self.core.lock().timer.is_some()
    }
}

impl Drop for HotkeyRegistrar {
    fn drop(&mut self) {
        // Unregister on the UI context; the backend may be dropped elsewhere
        self.stop();
    }
}

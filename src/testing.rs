//! In-process fakes for the external collaborators

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{DispatchError, HotkeyError};
use crate::hotkey::HotkeyBackend;
use crate::input::buttons::flags;
use crate::input::navigation::NavAction;
use crate::input::slot::SLOT_COUNT;
use crate::input::source::{ControllerSource, ControllerState};
use crate::listener::ToggleCallback;
use crate::overlay::OverlayNavigator;
use crate::ui::{Priority, UiContext, UiJob};

/// Controller source whose slots are set directly by the test
#[derive(Default)]
pub struct ScriptedSource {
    slots: Mutex<[Option<u16>; SLOT_COUNT]>,
    plain_reads: AtomicUsize,
    guide_reads: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Set the guide-inclusive button word for a slot (`None` = unplugged)
    pub fn set(&self, slot: usize, buttons: Option<u16>) {
        self.slots.lock()[slot] = buttons;
    }

    pub fn plain_reads(&self) -> usize {
        self.plain_reads.load(Ordering::SeqCst)
    }

    pub fn guide_reads(&self) -> usize {
        self.guide_reads.load(Ordering::SeqCst)
    }
}

impl ControllerSource for ScriptedSource {
    fn read(&self, slot: usize) -> Option<ControllerState> {
        self.plain_reads.fetch_add(1, Ordering::SeqCst);
        self.slots.lock()[slot].map(|b| ControllerState {
            buttons: b & !flags::GUIDE,
        })
    }

    fn read_with_guide(&self, slot: usize) -> Option<ControllerState> {
        self.guide_reads.fetch_add(1, Ordering::SeqCst);
        self.slots.lock()[slot].map(|buttons| ControllerState { buttons })
    }
}

/// What a [`ScriptedHotkeys`] backend has been asked to do
#[derive(Default)]
pub struct HotkeyLog {
    /// Gesture of every registration attempt, in order
    pub attempts: Vec<String>,
    /// Callback passed with every attempt
    pub callbacks: Vec<ToggleCallback>,
    pub unregisters: usize,
    /// Gesture currently registered
    pub active: Option<String>,
    /// Remaining attempts that will be rejected
    pub failures_remaining: usize,
}

impl HotkeyLog {
    /// Simulate the OS delivering the registered hotkey
    pub fn fire(&self) -> bool {
        match (&self.active, self.callbacks.last()) {
            (Some(_), Some(callback)) => {
                callback();
                true
            },
            _ => false,
        }
    }
}

/// Hotkey backend that rejects a scripted number of attempts
pub struct ScriptedHotkeys {
    log: Arc<Mutex<HotkeyLog>>,
}

impl ScriptedHotkeys {
    /// Backend failing the first `failures` attempts, plus its shared log
    pub fn failing(failures: usize) -> (Self, Arc<Mutex<HotkeyLog>>) {
        let log = Arc::new(Mutex::new(HotkeyLog {
            failures_remaining: failures,
            ..HotkeyLog::default()
        }));
        (Self { log: log.clone() }, log)
    }
}

impl HotkeyBackend for ScriptedHotkeys {
    fn register(&mut self, gesture: &str, on_fire: ToggleCallback) -> Result<(), HotkeyError> {
        let mut log = self.log.lock();
        log.attempts.push(gesture.to_string());
        log.callbacks.push(on_fire);

        if log.failures_remaining > 0 {
            log.failures_remaining -= 1;
            return Err(HotkeyError::Rejected {
                gesture: gesture.to_string(),
                reason: "scripted failure".to_string(),
            });
        }

        log.active = Some(gesture.to_string());
        Ok(())
    }

    fn unregister(&mut self) {
        let mut log = self.log.lock();
        log.unregisters += 1;
        log.active = None;
    }
}

/// Overlay that records every navigation call
pub struct RecordingOverlay {
    visible: AtomicBool,
    actions: Mutex<Vec<NavAction>>,
}

impl RecordingOverlay {
    pub fn new(visible: bool) -> Arc<Self> {
        Arc::new(Self {
            visible: AtomicBool::new(visible),
            actions: Mutex::new(Vec::new()),
        })
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    pub fn actions(&self) -> Vec<NavAction> {
        self.actions.lock().clone()
    }

    fn record(&self, action: NavAction) {
        self.actions.lock().push(action);
    }
}

impl OverlayNavigator for RecordingOverlay {
    fn is_visible_and_loaded(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    fn navigate_up(&self) {
        self.record(NavAction::Up);
    }

    fn navigate_down(&self) {
        self.record(NavAction::Down);
    }

    fn navigate_left(&self) {
        self.record(NavAction::Left);
    }

    fn navigate_right(&self) {
        self.record(NavAction::Right);
    }

    fn accept(&self) {
        self.record(NavAction::Accept);
    }

    fn cancel(&self) {
        self.record(NavAction::Cancel);
    }
}

/// UI context that runs posted jobs immediately on the posting thread
///
/// `foreign()` reports that the caller is never on the context, so
/// dispatches go through `post` and their priority is recorded.
pub struct InlineContext {
    current: bool,
    shutting_down: AtomicBool,
    posted: Mutex<Vec<Priority>>,
}

impl InlineContext {
    pub fn current() -> Arc<Self> {
        Arc::new(Self::with_current(true))
    }

    pub fn foreign() -> Arc<Self> {
        Arc::new(Self::with_current(false))
    }

    fn with_current(current: bool) -> Self {
        Self {
            current,
            shutting_down: AtomicBool::new(false),
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    /// Priorities of every job that went through `post`
    pub fn posted(&self) -> Vec<Priority> {
        self.posted.lock().clone()
    }
}

impl UiContext for InlineContext {
    fn is_current(&self) -> bool {
        self.current
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    fn post(&self, priority: Priority, job: UiJob) -> Result<(), DispatchError> {
        if self.is_shutting_down() {
            return Err(DispatchError::ShuttingDown);
        }
        self.posted.lock().push(priority);
        job();
        Ok(())
    }
}

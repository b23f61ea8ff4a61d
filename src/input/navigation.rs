//! Overlay navigation poller
//!
//! Created when the overlay shows and disposed when it hides. Each tick:
//! 1. Asks the UI context whether the overlay is visible (blocking)
//! 2. Reads every slot and edge-detects D-pad, A, B and Back
//! 3. Dispatches each edge onto the UI context at send priority
//!
//! A single cooldown clock, shared by all slots and actions, drops edges
//! that arrive too soon after the last dispatched action.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::buttons::flags;
use super::poll_loop::PollLoop;
use super::slot::SLOT_COUNT;
use super::source::{ControllerSource, ControllerState};
use crate::overlay::OverlayNavigator;
use crate::ui::{Priority, UiContext, UiContextExt};

/// Navigation call made on the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavAction {
    Up,
    Down,
    Left,
    Right,
    Accept,
    Cancel,
}

impl NavAction {
    /// Invoke the matching overlay method
    pub fn apply(self, overlay: &dyn OverlayNavigator) {
        match self {
            NavAction::Up => overlay.navigate_up(),
            NavAction::Down => overlay.navigate_down(),
            NavAction::Left => overlay.navigate_left(),
            NavAction::Right => overlay.navigate_right(),
            NavAction::Accept => overlay.accept(),
            NavAction::Cancel => overlay.cancel(),
        }
    }
}

/// Button bits -> action; any rising bit in the group triggers the action once
const BINDINGS: [(u16, NavAction); 6] = [
    (flags::DPAD_UP, NavAction::Up),
    (flags::DPAD_DOWN, NavAction::Down),
    (flags::DPAD_LEFT, NavAction::Left),
    (flags::DPAD_RIGHT, NavAction::Right),
    (flags::A, NavAction::Accept),
    (flags::B | flags::BACK, NavAction::Cancel),
];

/// Per-slot single-button edge detector
///
/// Independent of the toggle poller's slot state.
#[derive(Debug, Default)]
pub struct NavDetector {
    last: [u16; SLOT_COUNT],
}

impl NavDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample for `slot`, returning the actions whose buttons were just pressed
    pub fn observe(&mut self, slot: usize, state: Option<ControllerState>) -> Vec<NavAction> {
        let Some(last) = self.last.get_mut(slot) else {
            return Vec::new();
        };

        let Some(state) = state else {
            *last = 0;
            return Vec::new();
        };

        let rising = state.buttons & !*last;
        *last = state.buttons;

        BINDINGS
            .iter()
            .filter(|(bits, _)| rising & bits != 0)
            .map(|(_, action)| *action)
            .collect()
    }
}

/// Global quiet period after each dispatched action
#[derive(Debug, Clone)]
pub struct Cooldown {
    period: Option<Duration>,
    last_dispatch: Option<Instant>,
}

impl Cooldown {
    /// `None` disables the cooldown
    pub fn new(period: Option<Duration>) -> Self {
        Self {
            period: period.filter(|p| !p.is_zero()),
            last_dispatch: None,
        }
    }

    /// Claim the right to dispatch at `now`; starts a new quiet period on success
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if let (Some(period), Some(last)) = (self.period, self.last_dispatch) {
            if now.saturating_duration_since(last) < period {
                return false;
            }
        }

        self.last_dispatch = Some(now);
        true
    }
}

/// One navigation tick
pub struct NavTick {
    ui: Arc<dyn UiContext>,
    source: Arc<dyn ControllerSource>,
    overlay: Arc<dyn OverlayNavigator>,
    disposed: Arc<AtomicBool>,
    detector: NavDetector,
    cooldown: Cooldown,
}

impl NavTick {
    pub fn new(
        ui: Arc<dyn UiContext>,
        source: Arc<dyn ControllerSource>,
        overlay: Arc<dyn OverlayNavigator>,
        disposed: Arc<AtomicBool>,
        cooldown: Option<Duration>,
    ) -> Self {
        Self {
            ui,
            source,
            overlay,
            disposed,
            detector: NavDetector::new(),
            cooldown: Cooldown::new(cooldown),
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Run one tick using `now` as the cooldown clock
    pub fn tick(&mut self, now: Instant) {
        if self.is_disposed() {
            return;
        }

        let overlay = self.overlay.clone();
        match self.ui.run_blocking(move || overlay.is_visible_and_loaded()) {
            Ok(true) => {},
            Ok(false) => {
                trace!("Overlay not visible; skipping navigation tick");
                return;
            },
            Err(e) => {
                debug!("Skipping navigation tick: {}", e);
                return;
            },
        }

        for slot in 0..SLOT_COUNT {
            let actions = self.detector.observe(slot, self.source.read(slot));

            for action in actions {
                if self.is_disposed() {
                    return;
                }
                if !self.cooldown.try_acquire(now) {
                    debug!("Controller {} {:?} suppressed by cooldown", slot + 1, action);
                    continue;
                }
                self.dispatch(action);
            }
        }
    }

    fn dispatch(&self, action: NavAction) {
        let overlay = self.overlay.clone();
        let disposed = self.disposed.clone();

        let result = self.ui.invoke(Priority::Send, move || {
            // The overlay may have hidden while this job was queued
            if disposed.load(Ordering::SeqCst) || !overlay.is_visible_and_loaded() {
                debug!("Dropping {:?}: navigation no longer active", action);
                return;
            }
            action.apply(overlay.as_ref());
        });

        if let Err(e) = result {
            debug!("Navigation {:?} not dispatched: {}", action, e);
        }
    }
}

/// Background navigation poller, alive while the overlay is shown
pub struct NavigationPoller {
    poll: PollLoop,
}

impl NavigationPoller {
    /// Start polling
    ///
    /// # Arguments
    /// * `ui` - Context owning the overlay
    /// * `source` - Controller state
    /// * `overlay` - Navigation target
    /// * `interval` - Tick interval
    /// * `cooldown` - Global quiet period after a dispatch (`None` disables)
    pub fn start(
        ui: Arc<dyn UiContext>,
        source: Arc<dyn ControllerSource>,
        overlay: Arc<dyn OverlayNavigator>,
        interval: Duration,
        cooldown: Option<Duration>,
    ) -> std::io::Result<Self> {
        let disposed = Arc::new(AtomicBool::new(false));
        let mut tick = NavTick::new(ui, source, overlay, disposed.clone(), cooldown);
        let poll = PollLoop::spawn("overlay-navigation", interval, disposed, move |now| tick.tick(now))?;

        debug!("Navigation poller started");
        Ok(Self { poll })
    }

    /// Stop the timer; no navigation is dispatched afterwards
    ///
    /// Does not wait for an in-flight tick, so it is safe to call from the
    /// UI context while that tick is blocked on it.
    pub fn dispose(&mut self) {
        if !self.poll.is_stopped() {
            self.poll.cancel();
            debug!("Navigation poller disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.poll.is_stopped()
    }
}

impl Drop for NavigationPoller {
    fn drop(&mut self) {
        self.dispose();
    }
}

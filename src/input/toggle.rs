//! Controller toggle poller
//!
//! Samples all controller slots on a fixed interval and raises a toggle when
//! the configured chord goes from "not all held" to "all held". Runs
//! regardless of overlay visibility; the listener decides when it runs.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use super::buttons::ButtonMask;
use super::combo;
use super::poll_loop::PollLoop;
use super::slot::{SlotArray, SLOT_COUNT};
use super::source::{ControllerSource, ControllerState};
use crate::config::SharedInputConfig;
use crate::listener::ToggleCallback;

/// Per-slot chord edge detector
///
/// Owns its slot array; no other poller sees it.
#[derive(Debug, Default)]
pub struct ToggleDetector {
    slots: SlotArray,
}

impl ToggleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample for `slot`
    ///
    /// # Arguments
    /// * `slot` - Controller index
    /// * `state` - Read result; `None` when no controller is present
    /// * `chord` - Buttons that must all be held
    ///
    /// # Returns
    /// `true` on the sample where the chord becomes fully held
    pub fn observe(&mut self, slot: usize, state: Option<ControllerState>, chord: ButtonMask) -> bool {
        let Some(entry) = self.slots.get_mut(slot) else {
            return false;
        };

        let Some(state) = state else {
            entry.mark_absent();
            return false;
        };

        entry.mark_present();

        let fired = !chord.is_empty()
            && chord.all_down(state.buttons)
            && !chord.all_down(entry.last_buttons);

        entry.last_buttons = state.buttons;
        fired
    }

    /// Last stored button word for `slot`
    pub fn last_buttons(&self, slot: usize) -> Option<u16> {
        self.slots.get(slot).map(|s| s.last_buttons)
    }

    pub fn connected_count(&self) -> usize {
        self.slots.connected_count()
    }
}

/// One poller tick: read config, sample every slot, emit toggles
pub struct ToggleTick {
    source: Arc<dyn ControllerSource>,
    config: SharedInputConfig,
    detector: ToggleDetector,
    on_toggle: ToggleCallback,
}

impl ToggleTick {
    pub fn new(source: Arc<dyn ControllerSource>, config: SharedInputConfig, on_toggle: ToggleCallback) -> Self {
        Self {
            source,
            config,
            detector: ToggleDetector::new(),
            on_toggle,
        }
    }

    pub fn tick(&mut self) {
        let chord = {
            let config = self.config.read();
            if !config.controller_toggle_enabled {
                return;
            }
            combo::resolve(&config.controller_combo)
        };

        // Guide is only visible through the inclusive read
        let with_guide = chord.requires_guide();

        for slot in 0..SLOT_COUNT {
            let state = if with_guide {
                self.source.read_with_guide(slot)
            } else {
                self.source.read(slot)
            };

            if self.detector.observe(slot, state, chord) {
                info!("🎮 Controller {} chord {} pressed", slot + 1, chord);
                (self.on_toggle)();
            }
        }

        trace!("toggle tick: {} controller(s) connected", self.detector.connected_count());
    }
}

/// Background toggle poller
pub struct ControllerTogglePoller {
    poll: PollLoop,
}

impl ControllerTogglePoller {
    /// Start polling
    ///
    /// The toggle callback runs on the poller thread.
    pub fn start(
        source: Arc<dyn ControllerSource>,
        config: SharedInputConfig,
        interval: Duration,
        on_toggle: ToggleCallback,
    ) -> std::io::Result<Self> {
        let mut tick = ToggleTick::new(source, config, on_toggle);
        let poll = PollLoop::spawn(
            "controller-toggle",
            interval,
            Arc::new(AtomicBool::new(false)),
            move |_: Instant| tick.tick(),
        )?;

        debug!("Controller toggle poller started");
        Ok(Self { poll })
    }

    /// Stop polling and wait for an in-flight tick; idempotent
    pub fn stop(&mut self) {
        if !self.poll.is_stopped() {
            self.poll.stop();
            debug!("Controller toggle poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.poll.is_stopped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use crate::input::buttons::flags;
    use crate::testing::ScriptedSource;
    use parking_lot::RwLock;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LB: u16 = flags::LEFT_SHOULDER;
    const RB: u16 = flags::RIGHT_SHOULDER;

    fn present(buttons: u16) -> Option<ControllerState> {
        Some(ControllerState { buttons })
    }

    fn counting_tick(source: Arc<ScriptedSource>, combo: &str) -> (ToggleTick, SharedInputConfig, Arc<AtomicUsize>) {
        let config = Arc::new(RwLock::new(InputConfig {
            custom_hotkey: None,
            controller_toggle_enabled: true,
            controller_combo: combo.to_string(),
        }));
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let tick = ToggleTick::new(
            source,
            config.clone(),
            Arc::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (tick, config, count)
    }

    #[test]
    fn test_lb_rb_fires_once_at_full_chord() {
        let mut detector = ToggleDetector::new();
        let chord = combo::resolve("LB+RB");

        let fired: Vec<bool> = [0, LB, LB | RB, RB]
            .iter()
            .map(|b| detector.observe(0, present(*b), chord))
            .collect();

        assert_eq!(fired, vec![false, false, true, false]);
    }

    #[test]
    fn test_held_chord_does_not_repeat() {
        let mut detector = ToggleDetector::new();
        let chord = combo::resolve("Start+Back");
        let both = flags::START | flags::BACK;

        assert!(detector.observe(0, present(both), chord));
        assert!(!detector.observe(0, present(both), chord));
        // Unrelated bit changes while held
        assert!(!detector.observe(0, present(both | flags::A), chord));
        assert!(!detector.observe(0, present(flags::START), chord));
        assert!(detector.observe(0, present(both), chord));
    }

    #[test]
    fn test_reconnect_resets_last_mask() {
        let mut detector = ToggleDetector::new();
        let chord = combo::resolve("LB+RB");

        assert!(detector.observe(1, present(LB | RB), chord));
        assert!(!detector.observe(1, None, chord));
        assert_eq!(detector.last_buttons(1), Some(0));

        // Held through the unplug: reconnecting sees a genuine edge from 0
        assert!(detector.observe(1, present(LB | RB), chord));
        assert_eq!(detector.connected_count(), 1);
    }

    #[test]
    fn test_mask_stored_even_without_chord() {
        let mut detector = ToggleDetector::new();
        assert!(!detector.observe(2, present(flags::A), ButtonMask::NONE));
        assert_eq!(detector.last_buttons(2), Some(flags::A));
    }

    #[test]
    fn test_slots_are_independent() {
        let mut detector = ToggleDetector::new();
        let chord = combo::resolve("LB+RB");

        assert!(!detector.observe(0, present(LB), chord));
        assert!(!detector.observe(1, present(RB), chord));
        assert!(detector.observe(1, present(LB | RB), chord));
        assert!(!detector.observe(0, present(LB), chord));
    }

    #[test]
    fn test_tick_uses_guide_read_only_for_guide_chord() {
        let source = ScriptedSource::new();
        source.set(0, Some(flags::GUIDE));

        let (mut tick, config, count) = counting_tick(source.clone(), "Start+Back");
        tick.tick();
        assert_eq!(source.guide_reads(), 0);
        assert_eq!(source.plain_reads(), SLOT_COUNT);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        config.write().controller_combo = "guide".to_string();
        tick.tick();
        assert_eq!(source.guide_reads(), SLOT_COUNT);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tick_disabled_is_noop() {
        let source = ScriptedSource::new();
        source.set(0, Some(flags::START | flags::BACK));

        let (mut tick, config, count) = counting_tick(source.clone(), "Start+Back");
        config.write().controller_toggle_enabled = false;
        tick.tick();

        assert_eq!(source.plain_reads(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_tick_multiple_slots_fire_in_one_tick() {
        let source = ScriptedSource::new();
        source.set(0, Some(LB | RB));
        source.set(3, Some(LB | RB));

        let (mut tick, _config, count) = counting_tick(source, "LB+RB");
        tick.tick();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        tick.tick();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_poller_runs_and_stops() {
        let source = ScriptedSource::new();
        source.set(0, Some(flags::START | flags::BACK));

        let config = Arc::new(RwLock::new(InputConfig::default()));
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();

        let mut poller = ControllerTogglePoller::start(
            source.clone(),
            config,
            Duration::from_millis(5),
            Arc::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
        assert!(poller.is_running());

        std::thread::sleep(Duration::from_millis(80));
        poller.stop();
        poller.stop();
        assert!(!poller.is_running());

        // Chord held the whole time: exactly one edge
        assert_eq!(count.load(Ordering::SeqCst), 1);
        let reads = source.plain_reads();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(source.plain_reads(), reads);
    }

    proptest! {
        #[test]
        fn prop_unknown_combo_never_fires(
            samples in prop::collection::vec(prop::option::of(any::<u16>()), 0..64)
        ) {
            let mut detector = ToggleDetector::new();
            let chord = combo::resolve("Start+Guide");
            for sample in samples {
                let state = sample.map(|buttons| ControllerState { buttons });
                prop_assert!(!detector.observe(0, state, chord));
            }
        }

        #[test]
        fn prop_fires_exactly_on_rising_edges(
            samples in prop::collection::vec(any::<u16>(), 1..64),
            name in prop::sample::select(vec!["Guide", "Start+Back", "LB+RB"]),
        ) {
            let mut detector = ToggleDetector::new();
            let chord = combo::resolve(name);
            let mut previous = 0u16;

            for buttons in samples {
                let expected = chord.all_down(buttons) && !chord.all_down(previous);
                prop_assert_eq!(detector.observe(0, present(buttons), chord), expected);
                previous = buttons;
            }
        }
    }
}

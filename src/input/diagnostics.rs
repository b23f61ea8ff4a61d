//! Controller diagnostics for troubleshooting detection issues

use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

use super::buttons::ButtonMask;
use super::combo;
use super::slot::SLOT_COUNT;
use super::source::ControllerSource;

/// One slot's reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotReport {
    pub slot: usize,
    /// Guide-inclusive buttons, `None` when nothing is connected
    pub buttons: Option<u16>,
}

/// Sample every slot once
pub fn scan(source: &dyn ControllerSource) -> Vec<SlotReport> {
    (0..SLOT_COUNT)
        .map(|slot| SlotReport {
            slot,
            buttons: source.read_with_guide(slot).map(|s| s.buttons),
        })
        .collect()
}

/// Log which slots have a controller attached
///
/// Waits up to `settle` for at least one controller to show up, since
/// Bluetooth pads can take a moment to wake.
pub fn print_controller_diagnostics(source: &dyn ControllerSource, settle: Duration) {
    info!("=== Controller Diagnostics ===");
    info!("Platform: {}", std::env::consts::OS);
    info!("⏳ Waiting up to {} ms for controllers...", settle.as_millis());

    let start = Instant::now();
    let mut reports = scan(source);
    while reports.iter().all(|r| r.buttons.is_none()) && start.elapsed() < settle {
        thread::sleep(Duration::from_millis(100));
        reports = scan(source);
    }

    for report in &reports {
        match report.buttons {
            Some(buttons) => info!(
                "   🎮 Slot {}: connected (held: {})",
                report.slot + 1,
                ButtonMask(buttons)
            ),
            None => info!("   ⚪ Slot {}: empty", report.slot + 1),
        }
    }

    let connected = reports.iter().filter(|r| r.buttons.is_some()).count();
    if connected == 0 {
        info!("⚠️  No controllers detected");
    } else {
        info!("✅ {} controller(s) detected", connected);
    }
    info!("Toggle chords: {}", combo::known_names().join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::buttons::flags;
    use crate::testing::ScriptedSource;

    #[test]
    fn test_scan_reports_guide() {
        let source = ScriptedSource::new();
        source.set(1, Some(flags::GUIDE));

        let reports = scan(source.as_ref());
        assert_eq!(reports.len(), SLOT_COUNT);
        assert_eq!(reports[0].buttons, None);
        assert_eq!(reports[1].buttons, Some(flags::GUIDE));
    }
}

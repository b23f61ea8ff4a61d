//! gilrs-backed controller sampler
//!
//! gilrs reports buttons by physical position; positions are translated to
//! XInput bits using the Xbox layout (South = A, East = B). Gamepads are
//! assigned to the first free slot when they connect and keep it until they
//! disconnect.

use anyhow::{anyhow, Result};
use gilrs::{Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use tracing::{debug, info, warn};

use super::Sampler;
use crate::input::buttons::flags;
use crate::input::slot::SLOT_COUNT;

/// gilrs button -> XInput bit
const BUTTON_BITS: [(Button, u16); 15] = [
    (Button::South, flags::A),
    (Button::East, flags::B),
    (Button::West, flags::X),
    (Button::North, flags::Y),
    (Button::LeftTrigger, flags::LEFT_SHOULDER),
    (Button::RightTrigger, flags::RIGHT_SHOULDER),
    (Button::Select, flags::BACK),
    (Button::Start, flags::START),
    (Button::Mode, flags::GUIDE),
    (Button::LeftThumb, flags::LEFT_THUMB),
    (Button::RightThumb, flags::RIGHT_THUMB),
    (Button::DPadUp, flags::DPAD_UP),
    (Button::DPadDown, flags::DPAD_DOWN),
    (Button::DPadLeft, flags::DPAD_LEFT),
    (Button::DPadRight, flags::DPAD_RIGHT),
];

/// Stable mapping of backend device ids to slot indices
#[derive(Debug, Clone)]
pub struct SlotAssignments<Id> {
    slots: [Option<Id>; SLOT_COUNT],
}

impl<Id: Copy + PartialEq> SlotAssignments<Id> {
    pub fn new() -> Self {
        Self {
            slots: [None; SLOT_COUNT],
        }
    }

    /// Assign `id` to its existing slot or the first free one
    ///
    /// # Returns
    /// Slot index, or `None` when all slots are taken
    pub fn assign(&mut self, id: Id) -> Option<usize> {
        if let Some(idx) = self.slot_of(id) {
            return Some(idx);
        }

        let idx = self.slots.iter().position(Option::is_none)?;
        self.slots[idx] = Some(id);
        Some(idx)
    }

    /// Free the slot held by `id`
    pub fn release(&mut self, id: Id) -> Option<usize> {
        let idx = self.slot_of(id)?;
        self.slots[idx] = None;
        Some(idx)
    }

    pub fn slot_of(&self, id: Id) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(id))
    }

    /// Iterate (slot index, id) over occupied slots
    pub fn iter(&self) -> impl Iterator<Item = (usize, Id)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, id)| id.map(|id| (idx, id)))
    }
}

impl<Id: Copy + PartialEq> Default for SlotAssignments<Id> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sampler polling gilrs on the sampling thread
pub struct GilrsSampler {
    // gilrs is not Send-safe; this struct never leaves the sampling thread
    gilrs: Gilrs,
    assignments: SlotAssignments<GamepadId>,
}

impl GilrsSampler {
    pub fn new() -> Result<Self> {
        let gilrs = Gilrs::new().map_err(|e| anyhow!("gilrs initialization failed: {}", e))?;
        debug!("gilrs initialized");

        let mut assignments = SlotAssignments::new();
        for (id, gamepad) in gilrs.gamepads().filter(|(_, gp)| gp.is_connected()) {
            match assignments.assign(id) {
                Some(slot) => info!("🎮 \"{}\" assigned to controller slot {}", gamepad.name(), slot + 1),
                None => warn!("⚠️  No free controller slot for \"{}\"", gamepad.name()),
            }
        }

        Ok(Self { gilrs, assignments })
    }

    fn handle_event(&mut self, id: GamepadId, event: EventType) {
        match event {
            EventType::Connected => {
                let name = self.gilrs.gamepad(id).name().to_string();
                match self.assignments.assign(id) {
                    Some(slot) => info!("🎮 \"{}\" assigned to controller slot {}", name, slot + 1),
                    None => warn!("⚠️  No free controller slot for \"{}\"", name),
                }
            },
            EventType::Disconnected => {
                if let Some(slot) = self.assignments.release(id) {
                    debug!("gilrs gamepad {:?} released slot {}", id, slot + 1);
                }
            },
            _ => {},
        }
    }
}

/// Build the XInput-layout button word for a gamepad
fn buttons_of(gamepad: &Gamepad<'_>) -> u16 {
    BUTTON_BITS
        .iter()
        .filter(|(button, _)| gamepad.is_pressed(*button))
        .fold(0, |acc, (_, bit)| acc | bit)
}

impl Sampler for GilrsSampler {
    fn name(&self) -> &'static str {
        "gilrs"
    }

    fn sample(&mut self, out: &mut [Option<u16>; SLOT_COUNT]) {
        // Drain events so gilrs updates its cached button state
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            self.handle_event(id, event);
        }

        for (slot, id) in self.assignments.iter() {
            out[slot] = self.gilrs.connected_gamepad(id).map(|gp| buttons_of(&gp));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_first_free_slot() {
        let mut slots = SlotAssignments::<u32>::new();
        assert_eq!(slots.assign(10), Some(0));
        assert_eq!(slots.assign(11), Some(1));
        assert_eq!(slots.assign(10), Some(0)); // Already assigned
    }

    #[test]
    fn test_release_frees_slot_for_reuse() {
        let mut slots = SlotAssignments::<u32>::new();
        slots.assign(1);
        slots.assign(2);
        assert_eq!(slots.release(1), Some(0));
        assert_eq!(slots.release(1), None);
        assert_eq!(slots.assign(3), Some(0));
        assert_eq!(slots.iter().collect::<Vec<_>>(), vec![(0, 3), (1, 2)]);
    }

    #[test]
    fn test_full_slots() {
        let mut slots = SlotAssignments::<u32>::new();
        for id in 0..SLOT_COUNT as u32 {
            assert!(slots.assign(id).is_some());
        }
        assert_eq!(slots.assign(99), None);
    }

    #[test]
    fn test_button_table_is_one_bit_each() {
        let mut seen = 0u16;
        for (_, bit) in BUTTON_BITS {
            assert_eq!(bit.count_ones(), 1);
            assert_eq!(seen & bit, 0, "bit {:#06x} mapped twice", bit);
            seen |= bit;
        }
    }
}

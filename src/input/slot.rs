//! Per-poller controller slot state
//!
//! Each slot represents one controller index (0-3) as seen by a single
//! poller:
//! - Last sampled button word, used for edge detection
//! - Connection state, used for connect/disconnect logging
//!
//! Pollers own their slot arrays outright; two pollers watching the same
//! hardware keep independent state.

use tracing::{info, warn};

/// Number of controller indices polled each tick
pub const SLOT_COUNT: usize = 4;

/// Edge-detection state for one controller index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerSlot {
    /// Slot index (0-based)
    pub index: usize,

    /// Button word from the previous successful sample (0 after a failed read)
    pub last_buttons: u16,

    /// Whether the previous read found a controller
    pub connected: bool,
}

impl ControllerSlot {
    /// Create a disconnected slot
    pub fn new(index: usize) -> Self {
        Self {
            index,
            last_buttons: 0,
            connected: false,
        }
    }

    /// Record a failed read
    ///
    /// Resets the last-seen mask so reconnecting can never fabricate an edge.
    ///
    /// # Returns
    /// `true` if this read transitioned the slot to disconnected
    pub fn mark_absent(&mut self) -> bool {
        let was_connected = self.connected;
        self.connected = false;
        self.last_buttons = 0;

        if was_connected {
            warn!("🔌 Controller {} disconnected", self.index + 1);
        }

        was_connected
    }

    /// Record a successful read (does not touch `last_buttons`)
    ///
    /// # Returns
    /// `true` if this read transitioned the slot to connected
    pub fn mark_present(&mut self) -> bool {
        if self.connected {
            return false;
        }

        self.connected = true;
        info!("✅ Controller {} connected", self.index + 1);
        true
    }
}

/// Fixed array of slots, one per controller index
#[derive(Debug, Clone)]
pub struct SlotArray {
    slots: [ControllerSlot; SLOT_COUNT],
}

impl SlotArray {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(ControllerSlot::new),
        }
    }

    pub fn get(&self, index: usize) -> Option<&ControllerSlot> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ControllerSlot> {
        self.slots.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.slots.iter().filter(|s| s.connected).count()
    }
}

impl Default for SlotArray {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_indices() {
        let slots = SlotArray::new();
        assert_eq!(slots.len(), SLOT_COUNT);
        for i in 0..SLOT_COUNT {
            assert_eq!(slots.get(i).unwrap().index, i);
        }
        assert!(slots.get(SLOT_COUNT).is_none());
    }

    #[test]
    fn test_connect_disconnect_transitions() {
        let mut slot = ControllerSlot::new(0);

        assert!(slot.mark_present());
        assert!(!slot.mark_present()); // Already connected

        slot.last_buttons = 0x1000;
        assert!(slot.mark_absent());
        assert_eq!(slot.last_buttons, 0);
        assert!(!slot.mark_absent()); // Already disconnected
    }

    #[test]
    fn test_absent_resets_mask_even_when_never_connected() {
        let mut slot = ControllerSlot::new(2);
        slot.last_buttons = 0x0010;
        assert!(!slot.mark_absent());
        assert_eq!(slot.last_buttons, 0);
    }

    #[test]
    fn test_connected_count() {
        let mut slots = SlotArray::new();
        slots.get_mut(1).unwrap().mark_present();
        slots.get_mut(3).unwrap().mark_present();
        assert_eq!(slots.connected_count(), 2);
    }
}

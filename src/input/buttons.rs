//! Controller button bit layout
//!
//! All controller state in this crate is expressed as an XInput-style
//! `wButtons` word, regardless of which backend produced it. Backends that
//! report buttons by name (gilrs) translate into these bits.

use std::fmt;

/// XInput button bit flags
///
/// rusty_xinput doesn't export individual button constants,
/// so we define them here from the XInput API documentation.
/// `GUIDE` is only reported by the guide-inclusive state call.
pub mod flags {
    pub const DPAD_UP: u16 = 0x0001;
    pub const DPAD_DOWN: u16 = 0x0002;
    pub const DPAD_LEFT: u16 = 0x0004;
    pub const DPAD_RIGHT: u16 = 0x0008;
    pub const START: u16 = 0x0010;
    pub const BACK: u16 = 0x0020;
    pub const LEFT_THUMB: u16 = 0x0040;
    pub const RIGHT_THUMB: u16 = 0x0080;
    pub const LEFT_SHOULDER: u16 = 0x0100;
    pub const RIGHT_SHOULDER: u16 = 0x0200;
    pub const GUIDE: u16 = 0x0400;
    pub const A: u16 = 0x1000;
    pub const B: u16 = 0x2000;
    pub const X: u16 = 0x4000;
    pub const Y: u16 = 0x8000;
}

/// A set of buttons that must all be held at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ButtonMask(pub u16);

impl ButtonMask {
    /// Mask that matches nothing; chords resolving to it never fire.
    pub const NONE: ButtonMask = ButtonMask(0);

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of the mask is down in `buttons`
    pub fn all_down(self, buttons: u16) -> bool {
        (buttons & self.0) == self.0
    }

    /// Whether the chord can only be observed through the guide-inclusive read
    pub fn requires_guide(self) -> bool {
        self.0 & flags::GUIDE != 0
    }
}

impl fmt::Display for ButtonMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (flags::DPAD_UP, "Up"),
            (flags::DPAD_DOWN, "Down"),
            (flags::DPAD_LEFT, "Left"),
            (flags::DPAD_RIGHT, "Right"),
            (flags::START, "Start"),
            (flags::BACK, "Back"),
            (flags::LEFT_THUMB, "LS"),
            (flags::RIGHT_THUMB, "RS"),
            (flags::LEFT_SHOULDER, "LB"),
            (flags::RIGHT_SHOULDER, "RB"),
            (flags::GUIDE, "Guide"),
            (flags::A, "A"),
            (flags::B, "B"),
            (flags::X, "X"),
            (flags::Y, "Y"),
        ];

        let parts: Vec<&str> = names
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| *name)
            .collect();

        if parts.is_empty() {
            write!(f, "(none)")
        } else {
            write!(f, "{}", parts.join("+"))
        }
    }
}

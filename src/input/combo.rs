//! Chord name resolution
//!
//! Maps the configured `controller_combo` string to the button mask the
//! toggle poller watches for. Unknown names resolve to an empty mask, so a
//! typo in the settings disables the chord instead of failing.

use super::buttons::{flags, ButtonMask};

struct Combo {
    /// Display name
    name: &'static str,
    /// Accepted spellings, lowercase, buttons joined by a bare `+`
    spellings: &'static [&'static str],
    mask: u16,
}

const COMBOS: &[Combo] = &[
    Combo {
        name: "Guide",
        spellings: &["guide"],
        mask: flags::GUIDE,
    },
    Combo {
        name: "Start+Back",
        spellings: &["start+back", "back+start"],
        mask: flags::START | flags::BACK,
    },
    Combo {
        name: "LB+RB",
        spellings: &["lb+rb", "rb+lb"],
        mask: flags::LEFT_SHOULDER | flags::RIGHT_SHOULDER,
    },
];

/// Lowercase, trimming whitespace around the name and each `+`
fn normalize(name: &str) -> String {
    name.split('+')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("+")
        .to_lowercase()
}

fn find(name: &str) -> Option<&'static Combo> {
    let normalized = normalize(name);
    COMBOS
        .iter()
        .find(|combo| combo.spellings.contains(&normalized.as_str()))
}

/// Resolve a chord name to its button mask
///
/// Case-insensitive and total: unrecognised names yield [`ButtonMask::NONE`].
pub fn resolve(name: &str) -> ButtonMask {
    find(name)
        .map(|combo| ButtonMask(combo.mask))
        .unwrap_or(ButtonMask::NONE)
}

/// Chord display names, for diagnostics and settings UIs
pub fn known_names() -> Vec<&'static str> {
    COMBOS.iter().map(|combo| combo.name).collect()
}

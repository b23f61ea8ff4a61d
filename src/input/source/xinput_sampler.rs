//! XInput-backed controller sampler (Windows only)
//!
//! Uses the guide-inclusive state call when the loaded XInput library
//! exports it, and falls back to the plain call otherwise.

use anyhow::{anyhow, Result};
use rusty_xinput::{XInputHandle, XInputState, XInputUsageError};
use tracing::debug;

use super::Sampler;
use crate::input::slot::SLOT_COUNT;

pub struct XInputSampler {
    handle: XInputHandle,
    guide_supported: bool,
}

impl XInputSampler {
    pub fn new() -> Result<Self> {
        let handle = XInputHandle::load_default()
            .map_err(|e| anyhow!("XInput library not available: {:?}", e))?;
        debug!("XInput initialized successfully");

        Ok(Self {
            handle,
            guide_supported: true,
        })
    }

    fn read_buttons(&mut self, user_index: u32) -> Option<u16> {
        if self.guide_supported {
            match self.handle.get_state_ex(user_index) {
                Ok(state) => return Some(buttons_of(&state)),
                Err(XInputUsageError::DeviceNotConnected) => return None,
                Err(e) => {
                    debug!("Guide-inclusive XInput read unavailable ({:?}), using plain reads", e);
                    self.guide_supported = false;
                },
            }
        }

        match self.handle.get_state(user_index) {
            Ok(state) => Some(buttons_of(&state)),
            Err(_) => None,
        }
    }
}

fn buttons_of(state: &XInputState) -> u16 {
    state.raw.Gamepad.wButtons
}

impl Sampler for XInputSampler {
    fn name(&self) -> &'static str {
        "xinput"
    }

    fn sample(&mut self, out: &mut [Option<u16>; SLOT_COUNT]) {
        for (idx, slot) in out.iter_mut().enumerate() {
            *slot = self.read_buttons(idx as u32);
        }
    }
}

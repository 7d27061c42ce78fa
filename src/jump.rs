//! Jump request and budget.

use bevy::prelude::*;

/// Tracks the pending jump request and the jumps used since the last landing.
///
/// A request is recorded on press and cleared on release or when a jump is
/// granted. While the button stays held with the budget exhausted the request
/// stays pending, so the next landing grants a jump right away.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JumpController {
    requested: bool,
    jumps_used: u32,
}

impl JumpController {
    /// Record a jump request (button press).
    pub fn request(&mut self) {
        self.requested = true;
    }

    /// Drop a pending request (button release).
    pub fn cancel(&mut self) {
        self.requested = false;
    }

    /// Whether a request is pending.
    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Jumps used since the last landing.
    pub fn jumps_used(&self) -> u32 {
        self.jumps_used
    }

    /// Restore the full budget. Called on landing.
    pub fn reset(&mut self) {
        self.jumps_used = 0;
    }

    /// Consume the pending request if the budget allows it.
    ///
    /// Returns `true` when a jump is granted.
    pub fn try_jump(&mut self, max_jumps: u32) -> bool {
        if !self.requested || self.jumps_used >= max_jumps {
            return false;
        }
        self.jumps_used += 1;
        self.requested = false;
        true
    }
}

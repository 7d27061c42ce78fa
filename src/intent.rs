//! Movement intent components.
//!
//! Intents carry the sampled player input into the fixed step. The host fills
//! them from whatever input source it uses; the controller folds them into its
//! own state at the start of every fixed step.

use bevy::prelude::*;

/// Horizontal movement direction around the column.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MovementDirection {
    /// Counter-clockwise seen from above (positive rotation about up).
    Left,
    /// Clockwise seen from above (negative rotation about up).
    Right,
    /// Not moving.
    #[default]
    Stopped,
}

impl MovementDirection {
    /// Direction selected by the sign of a horizontal axis value.
    ///
    /// Returns `None` for a zero axis.
    pub fn from_axis(axis: f32) -> Option<Self> {
        if axis > 0.0 {
            Some(Self::Right)
        } else if axis < 0.0 {
            Some(Self::Left)
        } else {
            None
        }
    }

    /// The direction's sign along the actor's local X axis.
    pub fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
            Self::Stopped => 0.0,
        }
    }

    /// The local forward vector for this direction (`X` or `-X`).
    pub fn local_forward(self) -> Option<Vec3> {
        match self {
            Self::Left => Some(Vec3::NEG_X),
            Self::Right => Some(Vec3::X),
            Self::Stopped => None,
        }
    }
}

/// Input sampled for one fixed step.
///
/// Jump input is edge-based: `jump_pressed` and `jump_released` are set on the
/// step the button goes down or up, and are cleared once the controller has
/// read them.
///
/// # Example
///
/// ```rust
/// use arc_character_controller::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_horizontal(1.0);
/// intent.set_jump_held(true);
/// assert!(intent.jump_pressed);
///
/// intent.set_jump_held(true);
/// intent.set_jump_held(false);
/// assert!(intent.jump_released);
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Horizontal axis value in `[-1, 1]`. Only the sign is used.
    pub horizontal: f32,
    /// Jump button went down since the last step.
    pub jump_pressed: bool,
    /// Jump button went up since the last step.
    pub jump_released: bool,
    /// Held state seen by [`MovementIntent::set_jump_held`], for edge detection.
    pub(crate) jump_held_prev: bool,
}

impl MovementIntent {
    /// Create an empty intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the horizontal axis (-1.0 = left, 1.0 = right).
    pub fn set_horizontal(&mut self, axis: f32) {
        self.horizontal = axis.clamp(-1.0, 1.0);
    }

    /// Record a jump button press edge.
    pub fn press_jump(&mut self) {
        self.jump_pressed = true;
    }

    /// Record a jump button release edge.
    pub fn release_jump(&mut self) {
        self.jump_released = true;
    }

    /// Feed the current held state of the jump button; edges are derived from
    /// the previous call.
    pub fn set_jump_held(&mut self, held: bool) {
        if held && !self.jump_held_prev {
            self.jump_pressed = true;
        } else if !held && self.jump_held_prev {
            self.jump_released = true;
        }
        self.jump_held_prev = held;
    }

    /// The direction requested by the axis, if any.
    pub fn direction(&self) -> Option<MovementDirection> {
        MovementDirection::from_axis(self.horizontal)
    }

    /// Clear the edge flags once they have been consumed.
    pub fn clear_edges(&mut self) {
        self.jump_pressed = false;
        self.jump_released = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_from_axis_sign() {
        assert_eq!(MovementDirection::from_axis(0.3), Some(MovementDirection::Right));
        assert_eq!(MovementDirection::from_axis(-1.0), Some(MovementDirection::Left));
        assert_eq!(MovementDirection::from_axis(0.0), None);
    }

    #[test]
    fn direction_local_forward() {
        assert_eq!(MovementDirection::Right.local_forward(), Some(Vec3::X));
        assert_eq!(MovementDirection::Left.local_forward(), Some(Vec3::NEG_X));
        assert_eq!(MovementDirection::Stopped.local_forward(), None);
        assert_eq!(MovementDirection::Stopped.sign(), 0.0);
    }

    #[test]
    fn intent_clamps_axis() {
        let mut intent = MovementIntent::new();
        intent.set_horizontal(4.0);
        assert_eq!(intent.horizontal, 1.0);
        intent.set_horizontal(-4.0);
        assert_eq!(intent.horizontal, -1.0);
        assert_eq!(intent.direction(), Some(MovementDirection::Left));
    }

    #[test]
    fn held_state_produces_single_edges() {
        let mut intent = MovementIntent::new();

        intent.set_jump_held(true);
        assert!(intent.jump_pressed);
        intent.clear_edges();

        // Still held: no new edge.
        intent.set_jump_held(true);
        assert!(!intent.jump_pressed);
        assert!(!intent.jump_released);

        intent.set_jump_held(false);
        assert!(intent.jump_released);
        assert!(!intent.jump_pressed);
    }

    #[test]
    fn clear_edges_resets_flags() {
        let mut intent = MovementIntent::new();
        intent.press_jump();
        intent.release_jump();
        intent.clear_edges();
        assert!(!intent.jump_pressed);
        assert!(!intent.jump_released);
    }
}

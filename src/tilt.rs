//! Platform tilt tracking.
//!
//! When enabled, the actor rolls about its forward axis to match the platform
//! it is about to land on. The current tilt chases the desired tilt with a
//! frame-rate independent exponential approach.

use bevy::prelude::*;

/// Rolls within this many degrees of each other are treated as equal.
pub const TILT_EPSILON: f32 = 0.01;

/// Wrap an angle in degrees into `(-180, 180]`.
pub fn normalize_degrees(angle: f32) -> f32 {
    let mut wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped -= 360.0;
    } else if wrapped <= -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Current and desired roll of the actor, in degrees.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct TiltState {
    /// Roll currently applied to the actor.
    pub current: f32,
    /// Roll the actor is turning towards.
    pub desired: f32,
}

impl TiltState {
    /// Set the desired roll from a surface angle.
    pub fn set_desired(&mut self, surface_degrees: f32) {
        self.desired = normalize_degrees(surface_degrees);
    }

    /// Move the current roll towards the desired roll.
    ///
    /// The roll settles exactly on the desired value once it is within
    /// [`TILT_EPSILON`]. Returns the new current roll.
    pub fn advance(&mut self, speed: f32, dt: f32) -> f32 {
        let blend = 1.0 - (-speed * dt).exp();
        self.current += (self.desired - self.current) * blend;
        if (self.desired - self.current).abs() < TILT_EPSILON {
            self.current = self.desired;
        }
        self.current
    }

    /// Whether a noticeable roll is applied.
    pub fn is_tilted(&self) -> bool {
        self.current.abs() >= TILT_EPSILON
    }

    /// Rotation combining `heading` (rotation about up) with the current roll.
    pub fn rotation(&self, heading: Quat) -> Quat {
        let (yaw, _, _) = heading.to_euler(EulerRot::YXZ);
        Quat::from_rotation_y(yaw) * Quat::from_rotation_z(self.current.to_radians())
    }
}

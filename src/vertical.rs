//! Vertical motion: gravity, terminal velocity, landing and ceiling contact.
//!
//! The resolver predicts where the actor would be at the end of the step and
//! compares that against the floor and ceiling reported by the probe:
//!
//! 1. **Ceiling**: when rising into a ceiling, velocity is zeroed and the top
//!    of the actor is snapped to the ceiling for this step.
//! 2. **Staying grounded**: a grounded actor is kept on the floor the probe
//!    reports. It becomes airborne once there is no floor below, or the floor
//!    is lower than its bottom, e.g. after stepping off a ledge.
//! 3. **Landing**: an airborne actor whose predicted bottom reaches the floor
//!    is snapped onto it. The prediction uses the trajectory from before the
//!    ceiling snap, so a floor contact overrides a ceiling contact in the same
//!    step.
//! 4. **Falling**: otherwise gravity is integrated and clamped to the terminal
//!    velocity.

use bevy::prelude::*;

use crate::collision::{CollisionData, CollisionState};
use crate::config::ControllerConfig;
use crate::state::VerticalState;
use crate::tilt::TiltState;

/// Slack allowed when comparing predicted positions against contact heights.
const CONTACT_EPSILON: f32 = 1.0e-4;

/// Vertical velocity and landing state.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct VerticalMotion {
    /// Airborne or grounded.
    pub state: VerticalState,
    /// Vertical velocity (positive is up).
    pub velocity: f32,
}

/// What happened during one vertical step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VerticalReport {
    /// The floor the actor landed on this step.
    pub landed_on: Option<CollisionData>,
    /// The actor hit a ceiling and was snapped below it.
    pub hit_ceiling: bool,
    /// The actor lost its floor this step.
    pub left_ground: bool,
}

impl VerticalMotion {
    /// Height of the ceiling the actor would reach this step, if any.
    pub fn will_hit_ceiling(
        &self,
        y: f32,
        half_height: f32,
        collisions: &CollisionState,
        dt: f32,
    ) -> Option<f32> {
        if self.velocity <= 0.0 {
            return None;
        }
        let ceiling = collisions.above?;
        let predicted = y + self.velocity * dt;
        (predicted + half_height >= ceiling.point.y - CONTACT_EPSILON).then_some(ceiling.point.y)
    }

    /// The floor the actor would reach this step, if any.
    pub fn will_land(
        &self,
        y: f32,
        half_height: f32,
        collisions: &CollisionState,
        dt: f32,
    ) -> Option<CollisionData> {
        let floor = collisions.below?;
        let predicted = y + self.velocity * dt;
        (predicted - half_height <= floor.point.y + CONTACT_EPSILON).then_some(floor)
    }

    /// Advance one fixed step, moving `position` vertically.
    pub fn resolve(
        &mut self,
        position: &mut Vec3,
        half_height: f32,
        collisions: &CollisionState,
        config: &ControllerConfig,
        tilt: &mut TiltState,
        dt: f32,
    ) -> VerticalReport {
        let mut report = VerticalReport::default();

        // Both predictions use the trajectory from the start of the step.
        let ceiling = self.will_hit_ceiling(position.y, half_height, collisions, dt);
        let landing = self.will_land(position.y, half_height, collisions, dt);

        if let Some(ceiling_y) = ceiling {
            self.velocity = 0.0;
            position.y = ceiling_y - half_height;
            report.hit_ceiling = true;
        }

        if self.state == VerticalState::Grounded {
            match collisions.below {
                // Still resting on the floor: keep the bottom on it.
                Some(floor) if position.y - half_height <= floor.point.y + CONTACT_EPSILON => {
                    position.y = floor.point.y + half_height;
                    return report;
                }
                // The floor is gone or now lies below the actor.
                _ => {
                    self.state = VerticalState::Airborne;
                    report.left_ground = true;
                }
            }
        }

        if let Some(floor) = landing {
            position.y = floor.point.y + half_height;
            self.velocity = 0.0;
            self.state = VerticalState::Grounded;
            if config.tilt_enabled {
                tilt.set_desired(floor.surface.tilt_degrees);
            }
            report.landed_on = Some(floor);
            return report;
        }

        if config.tilt_enabled && self.velocity < 0.0 {
            if let Some(floor) = collisions.below {
                tilt.set_desired(floor.surface.tilt_degrees);
            }
        }

        if !report.hit_ceiling {
            self.velocity = (self.velocity - config.gravity * dt).max(-config.max_vertical_velocity);
            position.y += self.velocity * dt;
        }

        report
    }
}

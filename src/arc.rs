//! Arc motion around the column.
//!
//! Horizontal movement never translates the actor directly. A linear surface
//! distance is turned into an angle about the column's vertical axis, so the
//! orbit radius is preserved by construction.

use bevy::prelude::*;
use std::f32::consts::TAU;

use crate::error::ControllerError;
use crate::intent::MovementDirection;
use crate::tilt::TILT_EPSILON;

/// Radii at or below this are treated as "on the axis".
pub const MIN_ORBIT_RADIUS: f32 = 1.0e-5;

/// Result of one arc step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArcStep {
    /// Signed rotation about up, in degrees (positive is Left).
    pub angle_degrees: f32,
    /// Vertical displacement applied before rotating.
    pub vertical: f32,
}

/// Angle in degrees covered by an arc of length `distance` at `radius`.
pub fn arc_angle_degrees(distance: f32, radius: f32) -> f32 {
    distance * 360.0 / (TAU * radius)
}

/// Horizontal (XZ) distance from `position` to the vertical line through `column`.
pub fn orbit_radius(position: Vec3, column: Vec3) -> f32 {
    Vec2::new(column.x - position.x, column.z - position.z).length()
}

/// Move the actor `distance` along its arc around `column`.
///
/// With a `tilt_degrees` of at least [`TILT_EPSILON`] in magnitude, the step
/// is split into a vertical part `cos(tilt) * distance` (negated for Left) and
/// an arc of `sin(tilt) * distance`.
///
/// Fails without moving when the actor sits on the column axis.
pub fn move_along_arc(
    transform: &mut Transform,
    column: Vec3,
    direction: MovementDirection,
    distance: f32,
    tilt_degrees: Option<f32>,
) -> Result<ArcStep, ControllerError> {
    if direction == MovementDirection::Stopped {
        return Ok(ArcStep::default());
    }

    let radius = orbit_radius(transform.translation, column);
    if radius <= MIN_ORBIT_RADIUS {
        return Err(ControllerError::DegenerateRadius { radius });
    }

    let mut step = ArcStep::default();
    let mut arc_length = distance;

    if let Some(tilt) = tilt_degrees.filter(|tilt| tilt.abs() >= TILT_EPSILON) {
        let tilt = tilt.to_radians();
        step.vertical = tilt.cos() * distance;
        if direction == MovementDirection::Left {
            step.vertical = -step.vertical;
        }
        arc_length = tilt.sin() * distance;
        transform.translation.y += step.vertical;
    }

    // Left turns counter-clockwise seen from above, i.e. positive about +Y.
    step.angle_degrees = -direction.sign() * arc_angle_degrees(arc_length, radius);
    transform.rotate_around(column, Quat::from_rotation_y(step.angle_degrees.to_radians()));

    Ok(step)
}

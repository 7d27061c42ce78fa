//! Controller configuration components.
//!
//! This module defines the tuning parameters for a controller, the bounding
//! volume it collides with, and the [`CharacterController`] component that
//! holds the controller's persistent state.

use bevy::prelude::*;

use crate::collision::CollisionState;
use crate::error::ControllerError;
use crate::intent::{MovementDirection, MovementIntent};
use crate::jump::JumpController;
use crate::probe::CollisionProbe;
use crate::state::VerticalState;
use crate::tilt::TiltState;
use crate::vertical::VerticalMotion;

/// How the overlap probe finds the point of another volume nearest to the actor.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClosestPointMode {
    /// Exact nearest point on the other volume's box, when the world exposes it.
    /// Falls back to [`ClosestPointMode::RayFan`] for volumes without bounds.
    #[default]
    Exact,
    /// Cast four rays from the actor center (down, right, left, up) and keep the
    /// first one that hits the other volume.
    RayFan,
}

/// Bounding box of the actor, as half extents along its local axes.
///
/// Required: an actor without bounds fails initialization and never moves.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct ActorBounds {
    /// Half size of the actor's box.
    pub half_extents: Vec3,
}

impl ActorBounds {
    /// Bounds from half extents.
    pub fn new(half_extents: Vec3) -> Self {
        Self { half_extents }
    }

    /// Bounds of a cube with the given edge length.
    pub fn cube(size: f32) -> Self {
        Self::new(Vec3::splat(size * 0.5))
    }

    /// Check the extents are usable.
    pub fn validate(&self, entity: Entity) -> Result<Vec3, ControllerError> {
        let h = self.half_extents;
        if h.is_finite() && h.cmpgt(Vec3::ZERO).all() {
            Ok(h)
        } else {
            Err(ControllerError::InvalidBounds {
                entity,
                half_extents: h,
            })
        }
    }
}

impl Default for ActorBounds {
    fn default() -> Self {
        Self::cube(1.0)
    }
}

/// Configuration parameters for the character controller.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct ControllerConfig {
    // === Vertical Settings ===
    /// Gravity acceleration (units/second^2), applied along world down.
    ///
    /// Gravity is local to each controller; nothing global is touched.
    pub gravity: f32,

    /// Terminal falling speed. Vertical velocity never drops below the negative
    /// of this value.
    pub max_vertical_velocity: f32,

    // === Jump Settings ===
    /// Vertical velocity set when a jump is granted.
    pub jump_velocity: f32,

    /// Number of jumps allowed between landings (2 = double jump).
    pub max_jumps: u32,

    // === Arc Settings ===
    /// Linear speed along the column surface (units/second).
    pub moving_speed: f32,

    /// A point on the vertical centerline of the column the actor runs around.
    pub column_position: Vec3,

    /// Stop when the horizontal axis returns to zero. When `false`, the actor
    /// keeps running in the last direction.
    pub stop_on_release: bool,

    // === Tilt Settings ===
    /// Match the actor's roll to tilted platforms.
    pub tilt_enabled: bool,

    /// Rate (1/second) at which the current tilt chases the desired tilt.
    pub tilt_speed: f32,

    // === Probe Settings ===
    /// Tolerance for face-normal classification: a normal matches an axis when
    /// their dot product exceeds `1 - normal_tolerance`.
    pub normal_tolerance: f32,

    /// Closest-point strategy used by the overlap probe.
    pub closest_point_mode: ClosestPointMode,

    // === Level Settings ===
    /// Falling below this height requests a level restart.
    pub restart_height: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Vertical settings
            gravity: 9.8,
            max_vertical_velocity: 20.0,

            // Jump settings
            jump_velocity: 6.0,
            max_jumps: 2,

            // Arc settings
            moving_speed: 4.0,
            column_position: Vec3::ZERO,
            stop_on_release: false,

            // Tilt settings
            tilt_enabled: false,
            tilt_speed: 10.0,

            // Probe settings
            normal_tolerance: 1.0e-3,
            closest_point_mode: ClosestPointMode::Exact,

            // Level settings
            restart_height: -10.0,
        }
    }
}

impl ControllerConfig {
    /// Create a config tuned for a fast auto-runner with a triple jump.
    pub fn runner() -> Self {
        Self {
            gravity: 20.0,
            max_vertical_velocity: 25.0,
            jump_velocity: 9.0,
            max_jumps: 3,
            moving_speed: 6.0,
            ..default()
        }
    }

    /// Builder: set gravity acceleration.
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Builder: set terminal falling speed.
    pub fn with_max_vertical_velocity(mut self, max_velocity: f32) -> Self {
        self.max_vertical_velocity = max_velocity;
        self
    }

    /// Builder: set jump velocity and jump budget.
    pub fn with_jump(mut self, velocity: f32, max_jumps: u32) -> Self {
        self.jump_velocity = velocity;
        self.max_jumps = max_jumps;
        self
    }

    /// Builder: set surface speed.
    pub fn with_moving_speed(mut self, speed: f32) -> Self {
        self.moving_speed = speed;
        self
    }

    /// Builder: set the column the actor runs around.
    pub fn with_column(mut self, position: Vec3) -> Self {
        self.column_position = position;
        self
    }

    /// Builder: choose whether a released axis stops the actor.
    pub fn with_stop_on_release(mut self, stop_on_release: bool) -> Self {
        self.stop_on_release = stop_on_release;
        self
    }

    /// Builder: enable platform tilt tracking with the given chase rate.
    pub fn with_tilt(mut self, speed: f32) -> Self {
        self.tilt_enabled = true;
        self.tilt_speed = speed;
        self
    }

    /// Builder: set the normal classification tolerance.
    pub fn with_normal_tolerance(mut self, tolerance: f32) -> Self {
        self.normal_tolerance = tolerance;
        self
    }

    /// Builder: set the overlap probe's closest-point strategy.
    pub fn with_closest_point_mode(mut self, mode: ClosestPointMode) -> Self {
        self.closest_point_mode = mode;
        self
    }

    /// Builder: set the restart height.
    pub fn with_restart_height(mut self, height: f32) -> Self {
        self.restart_height = height;
        self
    }
}

/// Core character controller component.
///
/// This is the **central hub** for all controller state. Collision results are
/// replaced every fixed step; the kinematic state (velocity, landing, jump
/// budget, direction, tilt) persists across steps.
///
/// Spawning a controller also inserts a default [`ControllerConfig`],
/// [`CollisionProbe`] and [`MovementIntent`] unless they are given.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
#[require(ControllerConfig, CollisionProbe, MovementIntent, Transform)]
pub struct CharacterController {
    /// Collision results of the latest step.
    #[reflect(ignore)]
    pub(crate) collisions: CollisionState,
    /// Vertical velocity and landing state.
    pub(crate) vertical: VerticalMotion,
    /// Jump request and budget.
    pub(crate) jump: JumpController,
    /// Current horizontal direction.
    pub(crate) direction: MovementDirection,
    /// Platform tilt tracking.
    pub(crate) tilt: TiltState,
    /// Half extents resolved at initialization. `None` until initialized.
    pub(crate) half_extents: Option<Vec3>,
    /// Set while the actor is below the restart height.
    pub(crate) below_restart_height: bool,
}

impl CharacterController {
    /// Create an uninitialized controller. Bounds are resolved from
    /// [`ActorBounds`] on the first fixed step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a controller that is already initialized with the given bounds.
    pub fn with_half_extents(half_extents: Vec3) -> Self {
        Self {
            half_extents: Some(half_extents),
            ..default()
        }
    }

    /// Resolve the actor's bounds.
    pub fn initialize(
        &mut self,
        entity: Entity,
        bounds: Option<&ActorBounds>,
    ) -> Result<(), ControllerError> {
        let bounds = bounds.ok_or(ControllerError::MissingBounds(entity))?;
        self.half_extents = Some(bounds.validate(entity)?);
        Ok(())
    }

    /// Whether bounds have been resolved.
    pub fn is_initialized(&self) -> bool {
        self.half_extents.is_some()
    }

    /// Half extents of the actor's box, once initialized.
    pub fn half_extents(&self) -> Option<Vec3> {
        self.half_extents
    }

    /// Collision results of the latest step.
    pub fn collisions(&self) -> &CollisionState {
        &self.collisions
    }

    /// Current vertical state.
    pub fn vertical_state(&self) -> VerticalState {
        self.vertical.state
    }

    /// Whether the actor is resting on a floor.
    pub fn is_grounded(&self) -> bool {
        self.vertical.state == VerticalState::Grounded
    }

    /// Current vertical velocity (positive is up).
    pub fn vertical_velocity(&self) -> f32 {
        self.vertical.velocity
    }

    /// Jumps used since the last landing.
    pub fn jumps_used(&self) -> u32 {
        self.jump.jumps_used()
    }

    /// Whether a jump request is pending.
    pub fn jump_requested(&self) -> bool {
        self.jump.is_requested()
    }

    /// Current horizontal direction.
    pub fn movement_direction(&self) -> MovementDirection {
        self.direction
    }

    /// Platform tilt state.
    pub fn tilt(&self) -> &TiltState {
        &self.tilt
    }

    /// Horizontal (XZ) distance from `position` to the column axis.
    pub fn orbit_radius(position: Vec3, column: Vec3) -> f32 {
        crate::arc::orbit_radius(position, column)
    }
}

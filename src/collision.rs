//! Collision query results.
//!
//! These structures hold the results of world queries (raycasts and overlap
//! classification) for a single fixed step.

use bevy::prelude::*;

use crate::intent::MovementDirection;

/// Marker for platforms that start falling once the actor lands on them.
///
/// The controller only notifies: it emits [`StartFalling`](crate::events::StartFalling)
/// on the landing transition and leaves the falling behavior to the game.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct FallingPlatform;

/// Properties of the surface that was hit, read from the hit collider.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceInfo {
    /// Rotation of the surface about its forward (Z) axis, in degrees.
    pub tilt_degrees: f32,
    /// Whether the surface is tagged as a [`FallingPlatform`].
    pub falling_platform: bool,
}

impl SurfaceInfo {
    /// Read surface properties from a collider's transform.
    pub fn from_rotation(rotation: Quat, falling_platform: bool) -> Self {
        let (_, _, roll) = rotation.to_euler(EulerRot::YXZ);
        Self {
            tilt_degrees: roll.to_degrees(),
            falling_platform,
        }
    }
}

/// Information about a raycast collision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionData {
    /// Distance to the hit point.
    pub distance: f32,
    /// Normal of the surface at hit point.
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
    /// Orientation and tag of the surface that was hit.
    pub surface: SurfaceInfo,
}

impl CollisionData {
    /// Create a collision result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
            surface: SurfaceInfo::default(),
        }
    }

    /// Attach surface information.
    pub fn with_surface(mut self, surface: SurfaceInfo) -> Self {
        self.surface = surface;
        self
    }
}

/// Per-direction collision state for one fixed step.
///
/// Rebuilt from scratch by the collision source every step; nothing here
/// carries over except what an overlap probe deliberately latches.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionState {
    /// Closest ceiling hit (minimum y among upward rays).
    pub above: Option<CollisionData>,
    /// Closest floor hit (maximum y among downward rays).
    pub below: Option<CollisionData>,
    /// First hit found to the actor's left.
    pub left: Option<CollisionData>,
    /// First hit found to the actor's right.
    pub right: Option<CollisionData>,
    /// Translation that removes overlap with the world, applied before motion.
    pub correction: Vec3,
}

impl CollisionState {
    /// Whether anything was hit in any direction.
    pub fn any(&self) -> bool {
        self.above.is_some() || self.below.is_some() || self.left.is_some() || self.right.is_some()
    }

    /// Whether a collision was reported above.
    pub fn collided_above(&self) -> bool {
        self.above.is_some()
    }

    /// Whether a collision was reported below.
    pub fn collided_below(&self) -> bool {
        self.below.is_some()
    }

    /// Whether a collision was reported on the left.
    pub fn collided_left(&self) -> bool {
        self.left.is_some()
    }

    /// Whether a collision was reported on the right.
    pub fn collided_right(&self) -> bool {
        self.right.is_some()
    }

    /// The floor hit, including the identity of the surface underneath.
    pub fn hit_below(&self) -> Option<&CollisionData> {
        self.below.as_ref()
    }

    /// Whether motion in `direction` is blocked by a collision on that side.
    pub fn is_blocked(&self, direction: MovementDirection) -> bool {
        match direction {
            MovementDirection::Left => self.left.is_some(),
            MovementDirection::Right => self.right.is_some(),
            MovementDirection::Stopped => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_data_hit() {
        let cast = CollisionData::new(5.0, Vec3::Y, Vec3::new(10.0, 0.0, 0.0), None);

        assert_eq!(cast.distance, 5.0);
        assert_eq!(cast.normal, Vec3::Y);
        assert_eq!(cast.point, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(cast.surface, SurfaceInfo::default());
    }

    #[test]
    fn collision_data_with_entity() {
        let entity = Entity::from_raw(42);
        let cast = CollisionData::new(3.0, Vec3::X, Vec3::ZERO, Some(entity));

        assert_eq!(cast.entity, Some(entity));
    }

    #[test]
    fn surface_info_reads_roll() {
        let surface = SurfaceInfo::from_rotation(Quat::from_rotation_z(30f32.to_radians()), true);
        assert!((surface.tilt_degrees - 30.0).abs() < 1.0e-3);
        assert!(surface.falling_platform);

        // Heading does not leak into the tilt.
        let yawed = Quat::from_rotation_y(1.2) * Quat::from_rotation_z(-15f32.to_radians());
        let surface = SurfaceInfo::from_rotation(yawed, false);
        assert!((surface.tilt_degrees + 15.0).abs() < 1.0e-3);
    }

    #[test]
    fn empty_state_blocks_nothing() {
        let state = CollisionState::default();
        assert!(!state.any());
        assert!(!state.is_blocked(MovementDirection::Left));
        assert!(!state.is_blocked(MovementDirection::Right));
        assert!(state.hit_below().is_none());
    }

    #[test]
    fn blocked_only_on_matching_side() {
        let state = CollisionState {
            right: Some(CollisionData::new(0.1, Vec3::NEG_X, Vec3::X, None)),
            ..default()
        };
        assert!(state.any());
        assert!(state.collided_right());
        assert!(state.is_blocked(MovementDirection::Right));
        assert!(!state.is_blocked(MovementDirection::Left));
        assert!(!state.is_blocked(MovementDirection::Stopped));
    }
}

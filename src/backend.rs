//! Physics backend abstraction.
//!
//! This module defines the traits a world backend implements to drive the
//! character controller. The controller itself only needs synchronous ray
//! casts (and, optionally, the boxes of overlapped volumes); a backend wraps
//! whatever spatial structure the game uses and runs the controller step in
//! [`CharacterControllerSet::Motion`](crate::CharacterControllerSet::Motion).

use bevy::prelude::*;

use crate::collision::{CollisionData, SurfaceInfo};
use crate::geometry::OrientedBox;

/// Trait for physics backend implementations.
///
/// A backend contributes the plugin that registers its motion system. The
/// motion system builds a [`SpatialQuery`] over the backend's world and hands
/// it to [`drive_controllers`](crate::systems::drive_controllers).
///
/// Two backends ship with the crate:
/// - [`BoxWorldBackend`](crate::box_world::BoxWorldBackend): static oriented
///   boxes, no physics engine required.
/// - `Rapier3dBackend` (feature `rapier3d`): ray casts through Rapier's query
///   pipeline.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;
}

/// Synchronous, read-only view of the world used by the collision probes.
pub trait SpatialQuery {
    /// Cast a ray and return the nearest hit, if any.
    ///
    /// The hit carries the entity and the surface info of the collider.
    fn cast_ray(&self, request: &RaycastRequest) -> Option<CollisionData>;

    /// The box and surface of a volume, when the world can expose them.
    ///
    /// Used by the overlap probe for exact closest-point queries. Worlds that
    /// return `None` fall back to the ray fan.
    fn volume(&self, _entity: Entity) -> Option<VolumeInfo> {
        None
    }
}

/// A volume's box together with its surface properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeInfo {
    /// World-space box of the volume.
    pub bounds: OrientedBox,
    /// Tilt and tag of the volume.
    pub surface: SurfaceInfo,
}

impl VolumeInfo {
    /// Build from a box, reading the tilt from its rotation.
    pub fn new(bounds: OrientedBox, falling_platform: bool) -> Self {
        Self {
            bounds,
            surface: SurfaceInfo::from_rotation(bounds.rotation, falling_platform),
        }
    }
}

/// Helper struct for building raycasts.
#[derive(Debug, Clone, Copy)]
pub struct RaycastRequest {
    /// Origin point of the ray.
    pub origin: Vec3,
    /// Direction of the ray (should be normalized).
    pub direction: Vec3,
    /// Maximum distance to cast.
    pub max_distance: f32,
    /// Entity to exclude from results.
    pub exclude: Option<Entity>,
}

impl RaycastRequest {
    /// Create a new raycast request.
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            max_distance,
            exclude: None,
        }
    }

    /// Exclude an entity from the raycast.
    pub fn excluding(mut self, entity: Entity) -> Self {
        self.exclude = Some(entity);
        self
    }
}

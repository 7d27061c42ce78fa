//! Physics-free backend over static oriented boxes.
//!
//! Level geometry is any entity with a [`StaticBox`] and a [`GlobalTransform`].
//! Each fixed step the motion system snapshots those boxes into a [`BoxWorld`],
//! derives overlap enter/exit events for overlap probes by diffing the boxes
//! the actor intersects, and runs the controller step against the snapshot.

use bevy::prelude::*;

use crate::backend::{CharacterPhysicsBackend, RaycastRequest, SpatialQuery, VolumeInfo};
use crate::collision::{CollisionData, FallingPlatform};
use crate::geometry::OrientedBox;
use crate::probe::CollisionProbe;
use crate::systems::{drive_controllers, fixed_timestep, ControllerEvents, ControllerQuery};
use crate::CharacterControllerSet;

/// Boxes closer than this to the actor count as overlapped.
pub const OVERLAP_SKIN: f32 = 1.0e-3;

/// Static box collider for [`BoxWorldBackend`].
///
/// The box is centered on the entity and rotated with it; the global scale is
/// folded into the extents.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct StaticBox {
    /// Half size along each local axis.
    pub half_extents: Vec3,
}

impl StaticBox {
    /// Create a box collider.
    pub fn new(half_extents: Vec3) -> Self {
        Self { half_extents }
    }

    /// Create a cube collider with the given half size.
    pub fn cube(half_size: f32) -> Self {
        Self::new(Vec3::splat(half_size))
    }
}

/// Snapshot of the static boxes in the world.
#[derive(Debug, Clone, Default)]
pub struct BoxWorld {
    volumes: Vec<(Entity, VolumeInfo)>,
}

impl BoxWorld {
    /// An empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a box owned by `entity`.
    pub fn insert(&mut self, entity: Entity, bounds: OrientedBox, falling_platform: bool) {
        self.volumes.push((entity, VolumeInfo::new(bounds, falling_platform)));
    }

    /// Number of boxes in the world.
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Whether the world has no boxes.
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Boxes intersecting `actor`, skipping `exclude`.
    pub fn overlapping(&self, actor: &OrientedBox, exclude: Entity, skin: f32) -> Vec<Entity> {
        self.volumes
            .iter()
            .filter(|(entity, info)| *entity != exclude && actor.intersects(&info.bounds, skin))
            .map(|(entity, _)| *entity)
            .collect()
    }
}

impl SpatialQuery for BoxWorld {
    fn cast_ray(&self, request: &RaycastRequest) -> Option<CollisionData> {
        self.volumes
            .iter()
            .filter(|(entity, _)| Some(*entity) != request.exclude)
            .filter_map(|(entity, info)| {
                info.bounds
                    .cast_ray(request.origin, request.direction, request.max_distance)
                    .map(|hit| {
                        CollisionData::new(hit.distance, hit.normal, hit.point, Some(*entity))
                            .with_surface(info.surface)
                    })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn volume(&self, entity: Entity) -> Option<VolumeInfo> {
        self.volumes
            .iter()
            .find(|(other, _)| *other == entity)
            .map(|(_, info)| *info)
    }
}

/// Backend that collides against [`StaticBox`] entities.
///
/// No physics engine is involved: actors are moved by writing their
/// [`Transform`] directly.
pub struct BoxWorldBackend;

impl CharacterPhysicsBackend for BoxWorldBackend {
    fn plugin() -> impl Plugin {
        BoxWorldBackendPlugin
    }
}

/// Plugin that sets up the box world motion system.
pub struct BoxWorldBackendPlugin;

impl Plugin for BoxWorldBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<StaticBox>();
        app.add_systems(
            FixedUpdate,
            box_world_motion.in_set(CharacterControllerSet::Motion),
        );
    }
}

/// Snapshot the boxes, feed overlap probes and step every controller.
pub fn box_world_motion(
    time: Res<Time<Fixed>>,
    q_boxes: Query<(Entity, &StaticBox, &GlobalTransform, Has<FallingPlatform>)>,
    mut q_controllers: ControllerQuery,
    mut events: ControllerEvents,
) {
    let mut world = BoxWorld::new();
    for (entity, static_box, transform, falling) in &q_boxes {
        world.insert(
            entity,
            OrientedBox::from_global(transform, static_box.half_extents),
            falling,
        );
    }

    for (entity, controller, transform, mut probe, _) in &mut q_controllers {
        let (CollisionProbe::Overlap(overlap), Some(half_extents)) =
            (probe.as_mut(), controller.half_extents())
        else {
            continue;
        };
        let actor = OrientedBox::from_transform(&transform, half_extents);
        overlap.sync_overlaps(&world.overlapping(&actor, entity, OVERLAP_SKIN));
    }

    drive_controllers(&world, fixed_timestep(&time), &mut q_controllers, &mut events);
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR: Entity = Entity::from_raw(1);
    const WALL: Entity = Entity::from_raw(2);
    const ACTOR: Entity = Entity::from_raw(3);

    fn world() -> BoxWorld {
        let mut world = BoxWorld::new();
        world.insert(
            FLOOR,
            OrientedBox::axis_aligned(Vec3::new(0.0, -0.5, 0.0), Vec3::new(5.0, 0.5, 5.0)),
            true,
        );
        world.insert(
            WALL,
            OrientedBox::axis_aligned(Vec3::new(3.0, 1.0, 0.0), Vec3::new(0.5, 1.0, 5.0)),
            false,
        );
        world
    }

    #[test]
    fn ray_reports_nearest_box() {
        let world = world();
        let hit = world
            .cast_ray(&RaycastRequest::new(Vec3::new(0.0, 1.0, 0.0), Vec3::X, 10.0))
            .unwrap();
        assert_eq!(hit.entity, Some(WALL));
        assert!((hit.distance - 2.5).abs() < 1.0e-5);
        assert!((hit.normal - Vec3::NEG_X).length() < 1.0e-5);
        assert!(!hit.surface.falling_platform);

        let hit = world
            .cast_ray(&RaycastRequest::new(Vec3::new(2.8, 5.0, 0.0), Vec3::NEG_Y, 10.0))
            .unwrap();
        assert_eq!(hit.entity, Some(WALL));
    }

    #[test]
    fn ray_carries_surface_of_hit_box() {
        let world = world();
        let hit = world
            .cast_ray(&RaycastRequest::new(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y, 2.0))
            .unwrap();
        assert_eq!(hit.entity, Some(FLOOR));
        assert!(hit.surface.falling_platform);
        assert!((hit.point.y - 0.0).abs() < 1.0e-5);
    }

    #[test]
    fn ray_skips_excluded_entity() {
        let world = world();
        let request = RaycastRequest::new(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y, 2.0).excluding(FLOOR);
        assert!(world.cast_ray(&request).is_none());
    }

    #[test]
    fn ray_respects_max_distance() {
        let world = world();
        let request = RaycastRequest::new(Vec3::new(0.0, 1.0, 0.0), Vec3::X, 2.0);
        assert!(world.cast_ray(&request).is_none());
    }

    #[test]
    fn volume_exposes_bounds_and_tilt() {
        let mut world = BoxWorld::new();
        let rotation = Quat::from_rotation_z(15f32.to_radians());
        world.insert(FLOOR, OrientedBox::new(Vec3::ZERO, Vec3::ONE, rotation), false);

        let info = world.volume(FLOOR).unwrap();
        assert_eq!(info.bounds.rotation, rotation);
        assert!((info.surface.tilt_degrees - 15.0).abs() < 1.0e-3);
        assert!(world.volume(WALL).is_none());
    }

    #[test]
    fn overlapping_lists_touching_boxes() {
        let world = world();

        // Resting flush on the floor.
        let actor = OrientedBox::axis_aligned(Vec3::new(0.0, 0.5, 0.0), Vec3::splat(0.5));
        assert_eq!(world.overlapping(&actor, ACTOR, OVERLAP_SKIN), vec![FLOOR]);

        // Pressed against the wall while standing.
        let actor = OrientedBox::axis_aligned(Vec3::new(2.0, 0.5, 0.0), Vec3::splat(0.5));
        assert_eq!(world.overlapping(&actor, ACTOR, OVERLAP_SKIN), vec![FLOOR, WALL]);

        // Hovering.
        let actor = OrientedBox::axis_aligned(Vec3::new(0.0, 2.0, 0.0), Vec3::splat(0.5));
        assert!(world.overlapping(&actor, ACTOR, OVERLAP_SKIN).is_empty());
    }

    #[test]
    fn overlapping_skips_the_actor() {
        let mut world = world();
        let actor = OrientedBox::axis_aligned(Vec3::new(0.0, 2.0, 0.0), Vec3::splat(0.5));
        world.insert(ACTOR, actor, false);
        assert!(world.overlapping(&actor, ACTOR, OVERLAP_SKIN).is_empty());
        assert_eq!(world.len(), 3);
    }
}

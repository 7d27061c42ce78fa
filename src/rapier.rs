//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.
//!
//! Actors are kinematic: the controller writes their [`Transform`] and Rapier
//! only answers ray casts and reports the volumes the actor's sensor overlaps.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::backend::{CharacterPhysicsBackend, RaycastRequest, SpatialQuery, VolumeInfo};
use crate::collision::{CollisionData, FallingPlatform, SurfaceInfo};
use crate::config::{ActorBounds, CharacterController};
use crate::geometry::OrientedBox;
use crate::probe::{CollisionProbe, OverlapEvent};
use crate::systems::{self, drive_controllers, fixed_timestep, ControllerEvents, ControllerQuery};
use crate::CharacterControllerSet;

/// Rapier3D physics backend for the character controller.
///
/// Ray casts go through Rapier's query pipeline. Overlap probes are fed from
/// Rapier's [`CollisionEvent`]s, so actors using them need
/// [`ActiveEvents::COLLISION_EVENTS`] (see [`Rapier3dCharacterBundle`]).
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }
}

/// Plugin that sets up Rapier3D-specific systems for the character controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        // Bounds must exist before the controllers are initialized.
        app.add_systems(
            FixedUpdate,
            (
                detect_actor_bounds.before(systems::initialize_controllers),
                forward_collision_events,
            )
                .in_set(CharacterControllerSet::Preparation),
        );

        app.add_systems(
            FixedUpdate,
            rapier_motion.in_set(CharacterControllerSet::Motion),
        );
    }
}

/// Collider data read for hit surfaces.
pub type VolumeData = (
    &'static GlobalTransform,
    Option<&'static Collider>,
    Has<FallingPlatform>,
);

/// [`SpatialQuery`] over a Rapier context.
pub struct RapierSpatialQuery<'a, 'w, 's> {
    context: &'a RapierContext<'a>,
    volumes: &'a Query<'w, 's, VolumeData>,
}

impl<'a, 'w, 's> RapierSpatialQuery<'a, 'w, 's> {
    /// Wrap a context and the collider lookup used for surface info.
    pub fn new(context: &'a RapierContext<'a>, volumes: &'a Query<'w, 's, VolumeData>) -> Self {
        Self { context, volumes }
    }

    fn surface(&self, entity: Entity) -> SurfaceInfo {
        self.volumes
            .get(entity)
            .map(|(transform, _, falling)| {
                let (_, rotation, _) = transform.to_scale_rotation_translation();
                SurfaceInfo::from_rotation(rotation, falling)
            })
            .unwrap_or_default()
    }
}

impl SpatialQuery for RapierSpatialQuery<'_, '_, '_> {
    fn cast_ray(&self, request: &RaycastRequest) -> Option<CollisionData> {
        let mut filter = QueryFilter::default().exclude_sensors();
        if let Some(exclude) = request.exclude {
            filter = filter.exclude_rigid_body(exclude).exclude_collider(exclude);
        }

        self.context
            .cast_ray_and_get_normal(
                request.origin,
                request.direction,
                request.max_distance,
                true, // solid: a ray starting inside reports distance zero
                filter,
            )
            .map(|(hit_entity, hit)| {
                CollisionData::new(hit.time_of_impact, hit.normal, hit.point, Some(hit_entity))
                    .with_surface(self.surface(hit_entity))
            })
    }

    fn volume(&self, entity: Entity) -> Option<VolumeInfo> {
        let (transform, collider, falling) = self.volumes.get(entity).ok()?;
        let cuboid = collider?.as_cuboid()?;
        Some(VolumeInfo::new(
            OrientedBox::from_global(transform, cuboid.half_extents()),
            falling,
        ))
    }
}

/// Step every controller against the Rapier world.
fn rapier_motion(
    time: Res<Time<Fixed>>,
    rapier_context: ReadRapierContext,
    q_volumes: Query<VolumeData>,
    mut q_controllers: ControllerQuery,
    mut events: ControllerEvents,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    let world = RapierSpatialQuery::new(&context, &q_volumes);
    drive_controllers(&world, fixed_timestep(&time), &mut q_controllers, &mut events);
}

/// Feed Rapier collision events into the overlap probes of the actors involved.
fn forward_collision_events(
    mut collision_events: EventReader<CollisionEvent>,
    mut q_probes: Query<&mut CollisionProbe>,
) {
    for event in collision_events.read() {
        let (a, b, started) = match event {
            CollisionEvent::Started(a, b, _) => (*a, *b, true),
            CollisionEvent::Stopped(a, b, _) => (*a, *b, false),
        };

        for (actor, other) in [(a, b), (b, a)] {
            let Ok(mut probe) = q_probes.get_mut(actor) else {
                continue;
            };
            probe.push_event(if started {
                OverlapEvent::Enter(other)
            } else {
                OverlapEvent::Exit(other)
            });
        }
    }
}

/// Derive [`ActorBounds`] from a cuboid collider on new controllers.
///
/// The actor's own scale is folded in, as Rapier does for the collider.
fn detect_actor_bounds(
    mut commands: Commands,
    q_actors: Query<
        (Entity, &Collider, &Transform),
        (With<CharacterController>, Without<ActorBounds>, Added<Collider>),
    >,
) {
    for (entity, collider, transform) in &q_actors {
        match collider.as_cuboid() {
            Some(cuboid) => {
                let half_extents = cuboid.half_extents() * transform.scale.abs();
                commands
                    .entity(entity)
                    .insert(ActorBounds::new(half_extents));
            }
            None => warn!("{entity}: only cuboid colliders provide ActorBounds; add them explicitly"),
        }
    }
}

/// Bundle containing the Rapier components an actor needs.
///
/// # Usage
///
/// Use this bundle when spawning a character controller entity with the
/// Rapier backend. The actor is a kinematic, position-based body: the
/// controller moves it and Rapier never pushes it.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use arc_character_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, -5.0),
///         CharacterController::new(),
///         ControllerConfig::runner(),
///         Rapier3dCharacterBundle::new(),
///         // ActorBounds are read from the cuboid
///         Collider::cuboid(0.5, 0.5, 0.5),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::KinematicPositionBased`]
/// - `locked_axes`: [`LockedAxes::ROTATION_LOCKED`]
/// - `sensor`: the actor's collider overlaps instead of colliding
/// - `active_events`: [`ActiveEvents::COLLISION_EVENTS`], feeding overlap probes
/// - `active_collision_types`: default plus kinematic vs. fixed and kinematic
///   vs. kinematic, so overlaps with level geometry are reported
#[derive(Bundle)]
pub struct Rapier3dCharacterBundle {
    /// The rigid body type. Kinematic so that only the controller moves it.
    pub rigid_body: RigidBody,
    /// Which axes are locked.
    pub locked_axes: LockedAxes,
    /// Makes the actor's collider a sensor.
    pub sensor: Sensor,
    /// Event flags for the actor's collider.
    pub active_events: ActiveEvents,
    /// Body pairs that generate contacts and events.
    pub active_collision_types: ActiveCollisionTypes,
}

impl Default for Rapier3dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dCharacterBundle {
    /// Create a kinematic actor bundle.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::KinematicPositionBased,
            locked_axes: LockedAxes::ROTATION_LOCKED,
            sensor: Sensor,
            active_events: ActiveEvents::COLLISION_EVENTS,
            active_collision_types: ActiveCollisionTypes::default()
                | ActiveCollisionTypes::KINEMATIC_STATIC
                | ActiveCollisionTypes::KINEMATIC_KINEMATIC,
        }
    }

    /// Set the rigid body type for the character.
    ///
    /// Dynamic bodies will fight the controller, which writes the
    /// [`Transform`] directly every fixed step.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set which axes should be locked for the rigid body.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }

    /// Set which body pairs generate collision events.
    pub fn with_collision_types(mut self, types: ActiveCollisionTypes) -> Self {
        self.active_collision_types = types;
        self
    }
}

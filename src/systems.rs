//! Core controller systems.
//!
//! Preparation resolves bounds and folds input into the controller; the
//! backend's motion system calls [`drive_controllers`]; the sync system keeps
//! the state markers in line with the controller.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::backend::SpatialQuery;
use crate::config::{ActorBounds, CharacterController, ControllerConfig};
use crate::error::ControllerFault;
use crate::events::{RestartLevel, StartFalling};
use crate::intent::MovementIntent;
use crate::probe::CollisionProbe;
use crate::state::{Airborne, Grounded};

/// Step length used when the fixed clock has not advanced yet.
pub const DEFAULT_TIMESTEP: f32 = 1.0 / 60.0;

/// Controllers that can be stepped.
pub type ControllerQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static mut CharacterController,
        &'static mut Transform,
        &'static mut CollisionProbe,
        &'static ControllerConfig,
    ),
    Without<ControllerFault>,
>;

/// Writers for the events a step can produce.
#[derive(SystemParam)]
pub struct ControllerEvents<'w> {
    /// Landing on a falling platform.
    pub start_falling: EventWriter<'w, StartFalling>,
    /// Falling below the restart height.
    pub restart_level: EventWriter<'w, RestartLevel>,
}

/// Length of the current fixed step.
pub fn fixed_timestep(time: &Time<Fixed>) -> f32 {
    Some(time.delta_secs())
        .filter(|&dt| dt > 0.0)
        .unwrap_or(DEFAULT_TIMESTEP)
}

/// Resolve bounds for new controllers, or when their bounds change.
///
/// A controller that cannot be initialized is tagged with [`ControllerFault`]
/// and skipped by every other system.
pub fn initialize_controllers(
    mut commands: Commands,
    mut q_controllers: Query<
        (
            Entity,
            &mut CharacterController,
            &mut CollisionProbe,
            Option<&ActorBounds>,
        ),
        (
            Without<ControllerFault>,
            Or<(
                Added<CharacterController>,
                Added<CollisionProbe>,
                Changed<ActorBounds>,
            )>,
        ),
    >,
) {
    for (entity, mut controller, mut probe, bounds) in &mut q_controllers {
        if bounds.is_some() || !controller.is_initialized() {
            if let Err(err) = controller.initialize(entity, bounds) {
                error!("{err}");
                commands.entity(entity).insert(ControllerFault(err));
                continue;
            }
        }

        let Some(half_extents) = controller.half_extents() else {
            continue;
        };
        probe.fit_to_bounds(half_extents);
        info!("{entity}: character controller ready with half extents {half_extents}");
    }
}

/// Fold each step's input into the controller and consume its edges.
pub fn apply_movement_intent(
    mut q_controllers: Query<
        (
            &mut CharacterController,
            &mut MovementIntent,
            &mut CollisionProbe,
            &ControllerConfig,
        ),
        Without<ControllerFault>,
    >,
) {
    for (mut controller, mut intent, mut probe, config) in &mut q_controllers {
        controller.apply_intent(&intent, config, probe.as_mut());
        intent.clear_edges();
    }
}

/// Step every controller against `world` and publish the resulting events.
///
/// Backends call this from their motion system once they have a
/// [`SpatialQuery`] for the current step.
pub fn drive_controllers<Q: SpatialQuery + ?Sized>(
    world: &Q,
    dt: f32,
    q_controllers: &mut ControllerQuery,
    events: &mut ControllerEvents,
) {
    for (entity, mut controller, mut transform, mut probe, config) in q_controllers.iter_mut() {
        let report = match controller.step(entity, &mut transform, probe.as_mut(), config, world, dt) {
            Ok(report) => report,
            Err(err) => {
                trace!("{entity}: {err}");
                continue;
            }
        };

        if let Some(platform) = report.start_falling {
            info!("{entity} landed on falling platform {platform}");
            events.start_falling.write(StartFalling {
                actor: entity,
                platform,
            });
        }

        if report.fell_out {
            info!(
                "{entity} fell below {:.2}, requesting level restart",
                config.restart_height
            );
            events.restart_level.write(RestartLevel { actor: entity });
        }
    }
}

/// Sync the [`Grounded`] / [`Airborne`] markers with the controller.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(Entity, &CharacterController, Has<Grounded>, Has<Airborne>)>,
) {
    for (entity, controller, has_grounded, has_airborne) in &q_controllers {
        if !controller.is_initialized() {
            continue;
        }

        if controller.is_grounded() && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !controller.is_grounded() && (has_grounded || !has_airborne) {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    #[test]
    fn timestep_falls_back_before_first_tick() {
        let time = Time::<Fixed>::from_hz(30.0);
        assert_eq!(fixed_timestep(&time), DEFAULT_TIMESTEP);
    }

    #[test]
    fn timestep_uses_fixed_delta() {
        let mut time = Time::<Fixed>::from_hz(30.0);
        time.advance_by(std::time::Duration::from_millis(20));
        assert!((fixed_timestep(&time) - 0.02).abs() < 1.0e-6);
    }

    #[test]
    fn missing_bounds_faults_the_controller() {
        let mut world = World::new();
        let entity = world
            .spawn((
                CharacterController::new(),
                Transform::from_xyz(0.0, 5.0, -5.0),
                CollisionProbe::default(),
                ControllerConfig::default(),
            ))
            .id();

        world.run_system_once(initialize_controllers).unwrap();
        assert!(world.get::<ControllerFault>(entity).is_some());
        assert!(!world.get::<CharacterController>(entity).unwrap().is_initialized());
    }

    #[test]
    fn markers_follow_vertical_state() {
        let mut world = World::new();
        let entity = world
            .spawn(CharacterController::with_half_extents(Vec3::splat(0.5)))
            .id();

        world.run_system_once(sync_state_markers).unwrap();
        assert!(world.get::<Airborne>(entity).is_some());
        assert!(world.get::<Grounded>(entity).is_none());

        world
            .get_mut::<CharacterController>(entity)
            .unwrap()
            .vertical
            .state = crate::state::VerticalState::Grounded;
        world.run_system_once(sync_state_markers).unwrap();
        assert!(world.get::<Grounded>(entity).is_some());
        assert!(world.get::<Airborne>(entity).is_none());
    }
}

//! The fixed-step pipeline.
//!
//! One call to [`CharacterController::step`] runs, in order:
//! probe, overlap correction, vertical resolve, jump, tilt, arc motion and the
//! restart check. Every backend drives its actors through this one function.

use bevy::prelude::*;

use crate::arc::{self, ArcStep};
use crate::backend::SpatialQuery;
use crate::collision::CollisionData;
use crate::config::{CharacterController, ControllerConfig};
use crate::error::ControllerError;
use crate::intent::{MovementDirection, MovementIntent};
use crate::probe::{CollisionSource, ProbeContext};
use crate::state::VerticalState;

/// What happened during one fixed step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// The floor landed on this step.
    pub landed_on: Option<CollisionData>,
    /// A falling platform to notify about the landing.
    pub start_falling: Option<Entity>,
    /// A jump was granted.
    pub jumped: bool,
    /// The actor was stopped by a ceiling.
    pub hit_ceiling: bool,
    /// The actor walked off its floor.
    pub left_ground: bool,
    /// Arc motion was suppressed by a collision in the movement direction.
    pub blocked: bool,
    /// Arc motion applied this step.
    pub arc: Option<ArcStep>,
    /// The actor dropped below the restart height this step.
    pub fell_out: bool,
}

impl CharacterController {
    /// Fold one step of input into the controller.
    ///
    /// A release is applied before a press, so tapping jump within one step
    /// still requests a jump. A direction change releases any wall latched in
    /// front of the actor.
    pub fn apply_intent(
        &mut self,
        intent: &MovementIntent,
        config: &ControllerConfig,
        probe: &mut impl CollisionSource,
    ) {
        if intent.jump_released {
            self.jump.cancel();
        }
        if intent.jump_pressed {
            self.jump.request();
        }

        let direction = match intent.direction() {
            Some(direction) => direction,
            None if config.stop_on_release => MovementDirection::Stopped,
            None => self.direction,
        };

        if direction != self.direction {
            self.direction = direction;
            probe.release_front_latch();
        }
    }

    /// Run one fixed step for the actor at `transform`.
    ///
    /// Fails only when the controller has not been initialized.
    pub fn step<Q: SpatialQuery + ?Sized>(
        &mut self,
        actor: Entity,
        transform: &mut Transform,
        probe: &mut impl CollisionSource,
        config: &ControllerConfig,
        world: &Q,
        dt: f32,
    ) -> Result<StepReport, ControllerError> {
        let half_extents = self
            .half_extents
            .ok_or(ControllerError::MissingBounds(actor))?;
        let mut report = StepReport::default();

        // Probe
        let ctx = ProbeContext {
            actor,
            position: transform.translation,
            rotation: transform.rotation,
            half_extents,
            direction: self.direction,
            normal_tolerance: config.normal_tolerance,
            closest_point_mode: config.closest_point_mode,
        };
        self.collisions = probe.probe(world, &ctx);
        transform.translation += self.collisions.correction;

        // Vertical
        let vertical = self.vertical.resolve(
            &mut transform.translation,
            half_extents.y,
            &self.collisions,
            config,
            &mut self.tilt,
            dt,
        );
        report.hit_ceiling = vertical.hit_ceiling;
        report.left_ground = vertical.left_ground;

        if let Some(floor) = vertical.landed_on {
            self.jump.reset();
            debug!("{actor} landed at y = {:.3}", transform.translation.y);
            if floor.surface.falling_platform {
                report.start_falling = floor.entity;
            }
            report.landed_on = Some(floor);
        }

        // Jump
        if self.jump.try_jump(config.max_jumps) {
            self.vertical.velocity = config.jump_velocity;
            self.vertical.state = VerticalState::Airborne;
            if config.tilt_enabled {
                self.tilt.desired = 0.0;
            }
            report.jumped = true;
            debug!("{actor} jumped ({}/{})", self.jump.jumps_used(), config.max_jumps);
        }

        // Tilt
        if config.tilt_enabled {
            self.tilt.advance(config.tilt_speed, dt);
            transform.rotation = self.tilt.rotation(transform.rotation);
        }

        // Horizontal
        if self.collisions.is_blocked(self.direction) {
            report.blocked = true;
        } else {
            // Only a surface the actor stands on splits the step.
            let grounded = self.vertical.state == VerticalState::Grounded;
            let tilt = (config.tilt_enabled && grounded).then_some(self.tilt.current);
            match arc::move_along_arc(
                transform,
                config.column_position,
                self.direction,
                config.moving_speed * dt,
                tilt,
            ) {
                Ok(step) => {
                    // A grounded actor never sinks below its floor.
                    if step.vertical < 0.0 {
                        if let Some(floor) = self.collisions.below.filter(|_| grounded) {
                            let rest = floor.point.y + half_extents.y;
                            transform.translation.y = transform.translation.y.max(rest);
                        }
                    }
                    report.arc = Some(step);
                }
                Err(err) => debug!("{actor}: {err}; skipping arc motion this step"),
            }
        }

        // Restart
        if transform.translation.y < config.restart_height {
            if !self.below_restart_height {
                self.below_restart_height = true;
                report.fell_out = true;
            }
        } else {
            self.below_restart_height = false;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::box_world::BoxWorld;
    use crate::geometry::OrientedBox;
    use crate::probe::{CollisionProbe, OverlapCollisionProbe, OverlapEvent, RayCollisionProbe};
    use crate::tilt::TiltState;

    const ACTOR: Entity = Entity::from_raw(100);
    const FLOOR: Entity = Entity::from_raw(1);

    /// A ring of floor around the column at radius 5, top at y = 0.
    fn floor_world(falling: bool) -> BoxWorld {
        let mut world = BoxWorld::new();
        world.insert(
            FLOOR,
            OrientedBox::axis_aligned(Vec3::new(0.0, -0.5, 0.0), Vec3::new(10.0, 0.5, 10.0)),
            falling,
        );
        world
    }

    fn ray_probe() -> CollisionProbe {
        let mut probe = CollisionProbe::Ray(RayCollisionProbe::default());
        probe.fit_to_bounds(Vec3::splat(0.5));
        probe
    }

    fn controller() -> CharacterController {
        CharacterController::with_half_extents(Vec3::splat(0.5))
    }

    fn run(
        controller: &mut CharacterController,
        transform: &mut Transform,
        probe: &mut CollisionProbe,
        config: &ControllerConfig,
        world: &BoxWorld,
        steps: usize,
    ) -> Vec<StepReport> {
        (0..steps)
            .map(|_| {
                controller
                    .step(ACTOR, transform, probe, config, world, 1.0 / 60.0)
                    .unwrap()
            })
            .collect()
    }

    // ==================== Pipeline Tests ====================

    #[test]
    fn uninitialized_controller_refuses_to_step() {
        let mut controller = CharacterController::new();
        let mut transform = Transform::from_xyz(5.0, 1.0, 0.0);
        let result = controller.step(
            ACTOR,
            &mut transform,
            &mut ray_probe(),
            &ControllerConfig::default(),
            &BoxWorld::new(),
            0.1,
        );
        assert_eq!(result, Err(ControllerError::MissingBounds(ACTOR)));
        assert_eq!(transform, Transform::from_xyz(5.0, 1.0, 0.0));
    }

    #[test]
    fn falls_and_lands_on_floor() {
        let world = floor_world(false);
        let config = ControllerConfig::default();
        let mut controller = controller();
        let mut probe = ray_probe();
        let mut transform = Transform::from_xyz(5.0, 2.0, 0.0);

        let reports = run(&mut controller, &mut transform, &mut probe, &config, &world, 120);

        assert!(controller.is_grounded());
        assert!((transform.translation.y - 0.5).abs() < 1.0e-5);
        assert_eq!(controller.vertical_velocity(), 0.0);
        assert_eq!(reports.iter().filter(|r| r.landed_on.is_some()).count(), 1);
        assert!(reports.iter().all(|r| r.start_falling.is_none()));
    }

    #[test]
    fn landing_on_falling_platform_notifies_once() {
        let world = floor_world(true);
        let config = ControllerConfig::default();
        let mut controller = controller();
        let mut probe = ray_probe();
        let mut transform = Transform::from_xyz(5.0, 1.5, 0.0);

        let reports = run(&mut controller, &mut transform, &mut probe, &config, &world, 90);
        let notified: Vec<_> = reports.iter().filter_map(|r| r.start_falling).collect();
        assert_eq!(notified, vec![FLOOR]);
    }

    #[test]
    fn double_jump_then_budget_resets_on_landing() {
        let world = floor_world(false);
        let config = ControllerConfig::default().with_jump(6.0, 2);
        let mut controller = controller();
        let mut probe = ray_probe();
        let mut transform = Transform::from_xyz(5.0, 0.5, 0.0);
        let mut intent = MovementIntent::new();

        run(&mut controller, &mut transform, &mut probe, &config, &world, 2);
        assert!(controller.is_grounded());

        let mut press = |controller: &mut CharacterController, probe: &mut CollisionProbe| {
            intent.press_jump();
            controller.apply_intent(&intent, &config, probe);
            intent.clear_edges();
            intent.release_jump();
            let report = controller
                .step(ACTOR, &mut transform, probe, &config, &world, 1.0 / 60.0)
                .unwrap();
            controller.apply_intent(&intent, &config, probe);
            intent.clear_edges();
            report
        };

        assert!(press(&mut controller, &mut probe).jumped);
        assert!(press(&mut controller, &mut probe).jumped);
        // Budget exhausted.
        assert!(!press(&mut controller, &mut probe).jumped);
        assert_eq!(controller.jumps_used(), 2);
        assert!(!controller.is_grounded());

        let reports = run(&mut controller, &mut transform, &mut probe, &config, &world, 240);
        assert!(reports.iter().any(|r| r.landed_on.is_some()));
        assert!(controller.is_grounded());
        assert_eq!(controller.jumps_used(), 0);
    }

    #[test]
    fn running_keeps_orbit_radius() {
        let world = floor_world(false);
        let config = ControllerConfig::default();
        let mut controller = controller();
        let mut probe = ray_probe();
        // In front of the column with local X along the orbit tangent.
        let mut transform = Transform::from_xyz(0.0, 0.5, -5.0);
        let mut intent = MovementIntent::new();
        intent.set_horizontal(1.0);
        controller.apply_intent(&intent, &config, &mut probe);

        let reports = run(&mut controller, &mut transform, &mut probe, &config, &world, 60);

        assert!(reports.iter().all(|r| r.arc.is_some_and(|arc| arc.angle_degrees < 0.0)));
        let radius = CharacterController::orbit_radius(transform.translation, Vec3::ZERO);
        assert!((radius - 5.0).abs() < 1.0e-3);
        assert!(transform.translation.x > 0.0);
        // The heading turns with the actor.
        let tangent = transform.rotation * Vec3::X;
        assert!(tangent.dot(transform.translation.normalize()).abs() < 1.0e-3);
    }

    #[test]
    fn wall_blocks_running() {
        let mut world = floor_world(false);
        // A wall across the orbit, half a radian to the right.
        let angle = 0.5f32;
        world.insert(
            Entity::from_raw(2),
            OrientedBox::new(
                Vec3::new(5.0 * angle.sin(), 2.0, -5.0 * angle.cos()),
                Vec3::new(0.25, 2.0, 2.0),
                Quat::from_rotation_y(-angle),
            ),
            false,
        );
        let config = ControllerConfig::default();
        let mut controller = controller();
        let mut probe = ray_probe();
        let mut transform = Transform::from_xyz(0.0, 0.5, -5.0);
        let mut intent = MovementIntent::new();
        intent.set_horizontal(1.0);
        controller.apply_intent(&intent, &config, &mut probe);

        let reports = run(&mut controller, &mut transform, &mut probe, &config, &world, 300);
        assert!(reports.last().is_some_and(|r| r.blocked));
        assert!(controller.collisions().collided_right());

        // Stopped short of the wall.
        let travelled = transform.translation.x.atan2(-transform.translation.z);
        assert!(travelled > 0.25 && travelled < angle);
    }

    #[test]
    fn stop_on_release_stops_and_zero_axis_keeps_running() {
        let config = ControllerConfig::default();
        let mut controller = controller();
        let mut probe = ray_probe();
        let mut intent = MovementIntent::new();

        intent.set_horizontal(-1.0);
        controller.apply_intent(&intent, &config, &mut probe);
        assert_eq!(controller.movement_direction(), MovementDirection::Left);

        intent.set_horizontal(0.0);
        controller.apply_intent(&intent, &config, &mut probe);
        assert_eq!(controller.movement_direction(), MovementDirection::Left);

        let config = config.with_stop_on_release(true);
        controller.apply_intent(&intent, &config, &mut probe);
        assert_eq!(controller.movement_direction(), MovementDirection::Stopped);
    }

    #[test]
    fn tap_within_one_step_still_requests_jump() {
        let config = ControllerConfig::default();
        let mut controller = controller();
        let mut intent = MovementIntent::new();
        intent.press_jump();
        intent.release_jump();

        controller.apply_intent(&intent, &config, &mut ray_probe());
        assert!(controller.jump_requested());
    }

    #[test]
    fn actor_on_axis_skips_arc_but_still_falls() {
        let world = BoxWorld::new();
        let config = ControllerConfig::default();
        let mut controller = controller();
        let mut probe = ray_probe();
        let mut transform = Transform::from_xyz(0.0, 5.0, 0.0);
        let mut intent = MovementIntent::new();
        intent.set_horizontal(1.0);
        controller.apply_intent(&intent, &config, &mut probe);

        let report = controller
            .step(ACTOR, &mut transform, &mut probe, &config, &world, 0.1)
            .unwrap();
        assert!(report.arc.is_none());
        assert!(transform.translation.y < 5.0);
        assert_eq!(transform.translation.x, 0.0);
    }

    #[test]
    fn falling_out_reports_once_and_rearms() {
        let world = BoxWorld::new();
        let config = ControllerConfig::default();
        let mut controller = controller();
        let mut probe = ray_probe();
        let mut transform = Transform::from_xyz(5.0, -9.0, 0.0);

        let reports = run(&mut controller, &mut transform, &mut probe, &config, &world, 120);
        assert_eq!(reports.iter().filter(|r| r.fell_out).count(), 1);

        // Back above the restart height, then falling out again.
        transform.translation.y = 0.0;
        let reports = run(&mut controller, &mut transform, &mut probe, &config, &world, 120);
        assert_eq!(reports.iter().filter(|r| r.fell_out).count(), 1);
    }

    #[test]
    fn tilt_tracks_platform_and_resets_on_jump() {
        let mut world = BoxWorld::new();
        world.insert(
            FLOOR,
            OrientedBox::new(Vec3::new(5.0, -0.5, 0.0), Vec3::new(2.0, 0.5, 2.0), Quat::from_rotation_z(0.1)),
            false,
        );
        let config = ControllerConfig::default().with_tilt(20.0);
        let mut controller = controller();
        let mut probe = ray_probe();
        let mut transform = Transform::from_xyz(5.0, 1.2, 0.0);

        run(&mut controller, &mut transform, &mut probe, &config, &world, 60);
        let expected = 0.1f32.to_degrees();
        assert!((controller.tilt().desired - expected).abs() < 1.0e-3);
        assert!(controller.tilt().current > 0.0);

        let mut intent = MovementIntent::new();
        intent.press_jump();
        controller.apply_intent(&intent, &config, &mut probe);
        let report = controller
            .step(ACTOR, &mut transform, &mut probe, &config, &world, 1.0 / 60.0)
            .unwrap();
        assert!(report.jumped);
        assert_eq!(controller.tilt().desired, 0.0);
    }

    fn grounded_with_residual_tilt(direction: f32) -> (CharacterController, Transform, CollisionProbe, ControllerConfig) {
        let config = ControllerConfig::default().with_tilt(10.0);
        let mut controller = controller();
        controller.vertical.state = VerticalState::Grounded;
        controller.tilt = TiltState { current: 5.0, desired: 0.0 };
        let mut probe = ray_probe();
        let mut intent = MovementIntent::new();
        intent.set_horizontal(direction);
        controller.apply_intent(&intent, &config, &mut probe);
        (controller, Transform::from_xyz(0.0, 0.5, -5.0), probe, config)
    }

    #[test]
    fn residual_tilt_keeps_left_runner_on_flat_floor() {
        let world = floor_world(false);
        let (mut controller, mut transform, mut probe, config) = grounded_with_residual_tilt(-1.0);

        for _ in 0..60 {
            controller
                .step(ACTOR, &mut transform, &mut probe, &config, &world, 1.0 / 60.0)
                .unwrap();
            assert!((transform.translation.y - 0.5).abs() < 1.0e-5, "y = {}", transform.translation.y);
            assert!(controller.is_grounded());
        }

        assert_eq!(controller.tilt().current, 0.0);
        // Left runs towards -X from in front of the column.
        let travelled = -transform.translation.x.atan2(-transform.translation.z);
        assert!(travelled > 0.25, "travelled {travelled} rad");
        let radius = CharacterController::orbit_radius(transform.translation, Vec3::ZERO);
        assert!((radius - 5.0).abs() < 1.0e-3);
    }

    #[test]
    fn residual_tilt_lifting_a_runner_lands_it_again() {
        let world = floor_world(false);
        let (mut controller, mut transform, mut probe, config) = grounded_with_residual_tilt(1.0);

        let reports = run(&mut controller, &mut transform, &mut probe, &config, &world, 90);

        assert!(reports.iter().any(|r| r.left_ground));
        assert!(controller.is_grounded());
        assert!((transform.translation.y - 0.5).abs() < 1.0e-5);
        assert_eq!(controller.tilt().current, 0.0);
        assert!(transform.translation.x > 0.0);
    }

    #[test]
    fn stepping_off_a_ledge_lands_on_the_floor_below() {
        let mut world = floor_world(false);
        // A 0.3 high ledge under the start position, ending at x = 1.
        world.insert(
            Entity::from_raw(2),
            OrientedBox::axis_aligned(Vec3::new(0.0, 0.15, -5.0), Vec3::new(1.0, 0.15, 1.0)),
            false,
        );
        let config = ControllerConfig::default();
        let mut controller = controller();
        let mut probe = ray_probe();
        let mut transform = Transform::from_xyz(0.0, 1.5, -5.0);

        run(&mut controller, &mut transform, &mut probe, &config, &world, 60);
        assert!(controller.is_grounded());
        assert!((transform.translation.y - 0.8).abs() < 1.0e-5);

        let mut intent = MovementIntent::new();
        intent.set_horizontal(1.0);
        controller.apply_intent(&intent, &config, &mut probe);
        let reports = run(&mut controller, &mut transform, &mut probe, &config, &world, 60);

        assert!(reports.iter().any(|r| r.left_ground));
        assert_eq!(
            reports.iter().filter_map(|r| r.landed_on).last().and_then(|floor| floor.entity),
            Some(FLOOR)
        );
        assert!(controller.is_grounded());
        assert!((transform.translation.y - 0.5).abs() < 1.0e-5);
    }

    #[test]
    fn overlap_probe_lands_through_correction() {
        let world = floor_world(false);
        let config = ControllerConfig::default();
        let mut controller = controller();
        let mut probe = CollisionProbe::Overlap(OverlapCollisionProbe::new());
        // Sunk 0.1 into the floor.
        let mut transform = Transform::from_xyz(5.0, 0.4, 0.0);
        probe.push_event(OverlapEvent::Enter(FLOOR));

        let report = controller
            .step(ACTOR, &mut transform, &mut probe, &config, &world, 1.0 / 60.0)
            .unwrap();

        assert!(report.landed_on.is_some());
        assert!((transform.translation.y - 0.5).abs() < 1.0e-5);
        assert!(controller.is_grounded());
    }
}

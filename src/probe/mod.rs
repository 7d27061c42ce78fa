//! Collision probes.
//!
//! A probe turns the world around the actor into a [`CollisionState`] once per
//! fixed step. Two strategies are provided:
//!
//! - [`RayCollisionProbe`]: casts short rays from anchor points in the four
//!   directions every step.
//! - [`OverlapCollisionProbe`]: reacts to volume overlap enter/exit events,
//!   classifies the touched face and latches floor and wall contacts.
//!
//! Both sit behind [`CollisionSource`] and are selected per actor with the
//! [`CollisionProbe`] component.

mod overlap;
mod ray;

pub use overlap::{OverlapCollisionProbe, OverlapEvent};
pub use ray::{RayAnchors, RayCollisionProbe};

use bevy::prelude::*;

use crate::backend::SpatialQuery;
use crate::collision::CollisionState;
use crate::config::ClosestPointMode;
use crate::geometry::OrientedBox;
use crate::intent::MovementDirection;

/// Everything a probe knows about the actor for one step.
#[derive(Debug, Clone, Copy)]
pub struct ProbeContext {
    /// The actor entity, excluded from every query.
    pub actor: Entity,
    /// Actor position.
    pub position: Vec3,
    /// Actor rotation (heading plus optional tilt).
    pub rotation: Quat,
    /// Half extents of the actor's box.
    pub half_extents: Vec3,
    /// Current horizontal direction.
    pub direction: MovementDirection,
    /// Face normal classification tolerance.
    pub normal_tolerance: f32,
    /// Closest-point strategy for the overlap probe.
    pub closest_point_mode: ClosestPointMode,
}

impl ProbeContext {
    /// The heading part of the actor's rotation (rotation about up only).
    pub fn heading(&self) -> Quat {
        let (yaw, _, _) = self.rotation.to_euler(EulerRot::YXZ);
        Quat::from_rotation_y(yaw)
    }

    /// The actor's box in world space.
    pub fn actor_box(&self) -> OrientedBox {
        OrientedBox::new(self.position, self.half_extents, self.rotation)
    }
}

/// A strategy that senses the world around the actor.
pub trait CollisionSource {
    /// Query the world and return this step's collision state.
    fn probe<Q: SpatialQuery + ?Sized>(&mut self, world: &Q, ctx: &ProbeContext) -> CollisionState;

    /// Forget any latched in-front contact. Called when the movement direction
    /// changes.
    fn release_front_latch(&mut self) {}
}

/// Per-actor choice of collision source.
#[derive(Component, Debug, Clone)]
pub enum CollisionProbe {
    /// Continuous directional rays.
    Ray(RayCollisionProbe),
    /// Overlap events with latched contacts.
    Overlap(OverlapCollisionProbe),
}

impl Default for CollisionProbe {
    fn default() -> Self {
        Self::Ray(RayCollisionProbe::default())
    }
}

impl CollisionProbe {
    /// Queue an overlap event. Ignored by ray probes.
    pub fn push_event(&mut self, event: OverlapEvent) {
        if let Self::Overlap(probe) = self {
            probe.push_event(event);
        }
    }

    /// Fit the probe to the actor's bounds, if it still needs it.
    pub(crate) fn fit_to_bounds(&mut self, half_extents: Vec3) {
        if let Self::Ray(probe) = self {
            probe.fit_to_bounds(half_extents);
        }
    }
}

impl CollisionSource for CollisionProbe {
    fn probe<Q: SpatialQuery + ?Sized>(&mut self, world: &Q, ctx: &ProbeContext) -> CollisionState {
        match self {
            Self::Ray(probe) => probe.probe(world, ctx),
            Self::Overlap(probe) => probe.probe(world, ctx),
        }
    }

    fn release_front_latch(&mut self) {
        match self {
            Self::Ray(probe) => probe.release_front_latch(),
            Self::Overlap(probe) => probe.release_front_latch(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_context(position: Vec3) -> ProbeContext {
    ProbeContext {
        actor: Entity::from_raw(1000),
        position,
        rotation: Quat::IDENTITY,
        half_extents: Vec3::splat(0.5),
        direction: MovementDirection::Right,
        normal_tolerance: 1.0e-3,
        closest_point_mode: ClosestPointMode::Exact,
    }
}

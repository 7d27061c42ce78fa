use bevy::prelude::*;

use crate::backend::{RaycastRequest, SpatialQuery};
use crate::collision::{CollisionData, CollisionState};

use super::{CollisionSource, ProbeContext};

/// Fraction of the half extent that face anchors are pulled in from the edges.
const FACE_ANCHOR_INSET: f32 = 0.1;

/// Ray origins for each probe direction, as offsets in the actor's local frame.
///
/// Anchors are iterated in order. A direction with no anchors never reports a
/// collision.
#[derive(Reflect, Debug, Clone, Default, PartialEq)]
pub struct RayAnchors {
    /// Origins of upward rays.
    pub up: Vec<Vec3>,
    /// Origins of downward rays.
    pub down: Vec<Vec3>,
    /// Origins of rays cast to the actor's left.
    pub left: Vec<Vec3>,
    /// Origins of rays cast to the actor's right.
    pub right: Vec<Vec3>,
}

impl RayAnchors {
    /// One anchor at the actor's center for every direction.
    ///
    /// Rays start inside the actor, so ray distances must cover the half
    /// extents.
    pub fn centered() -> Self {
        Self {
            up: vec![Vec3::ZERO],
            down: vec![Vec3::ZERO],
            left: vec![Vec3::ZERO],
            right: vec![Vec3::ZERO],
        }
    }

    /// Three anchors on each face of a box: one in the middle and two pulled in
    /// by `inset` from the face's edges.
    ///
    /// Rays start on the surface, so ray distances are measured from the faces.
    pub fn box_faces(half_extents: Vec3, inset: f32) -> Self {
        let Vec3 { x: hx, y: hy, .. } = half_extents;
        let ix = (hx - inset).max(0.0);
        let iy = (hy - inset).max(0.0);

        Self {
            up: vec![Vec3::new(-ix, hy, 0.0), Vec3::new(0.0, hy, 0.0), Vec3::new(ix, hy, 0.0)],
            down: vec![Vec3::new(-ix, -hy, 0.0), Vec3::new(0.0, -hy, 0.0), Vec3::new(ix, -hy, 0.0)],
            left: vec![Vec3::new(-hx, -iy, 0.0), Vec3::new(-hx, 0.0, 0.0), Vec3::new(-hx, iy, 0.0)],
            right: vec![Vec3::new(hx, -iy, 0.0), Vec3::new(hx, 0.0, 0.0), Vec3::new(hx, iy, 0.0)],
        }
    }

    /// Whether no direction has any anchor.
    pub fn is_empty(&self) -> bool {
        self.up.is_empty() && self.down.is_empty() && self.left.is_empty() && self.right.is_empty()
    }
}

/// Probe that casts rays from fixed anchors every step.
///
/// Vertical rays always point along world up/down; horizontal rays follow the
/// actor's heading.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use arc_character_controller::prelude::*;
///
/// let probe = RayCollisionProbe::new(RayAnchors::box_faces(Vec3::splat(0.5), 0.05))
///     .with_ray_distances(0.4, 0.1);
/// assert_eq!(probe.anchors.down.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RayCollisionProbe {
    /// Ray origins per direction.
    pub anchors: RayAnchors,
    /// Length of upward and downward rays.
    pub vertical_ray_distance: f32,
    /// Length of left and right rays.
    pub horizontal_ray_distance: f32,
}

impl Default for RayCollisionProbe {
    /// An unfitted probe: anchors are placed on the actor's faces when the
    /// controller initializes.
    fn default() -> Self {
        Self::new(RayAnchors::default())
    }
}

impl RayCollisionProbe {
    /// Create a probe with the given anchors and default ray distances.
    pub fn new(anchors: RayAnchors) -> Self {
        Self {
            anchors,
            vertical_ray_distance: 0.5,
            horizontal_ray_distance: 0.1,
        }
    }

    /// Builder: set ray distances.
    pub fn with_ray_distances(mut self, vertical: f32, horizontal: f32) -> Self {
        self.vertical_ray_distance = vertical;
        self.horizontal_ray_distance = horizontal;
        self
    }

    /// Place anchors on the faces of the actor's box, unless anchors were given.
    pub(crate) fn fit_to_bounds(&mut self, half_extents: Vec3) {
        if self.anchors.is_empty() {
            let inset = half_extents.x.min(half_extents.y) * FACE_ANCHOR_INSET;
            self.anchors = RayAnchors::box_faces(half_extents, inset);
        }
    }

    fn cast(
        &self,
        world: &(impl SpatialQuery + ?Sized),
        ctx: &ProbeContext,
        anchor: Vec3,
        direction: Vec3,
        distance: f32,
    ) -> Option<CollisionData> {
        let origin = ctx.position + ctx.rotation * anchor;
        world.cast_ray(&RaycastRequest::new(origin, direction, distance).excluding(ctx.actor))
    }
}

impl CollisionSource for RayCollisionProbe {
    fn probe<Q: SpatialQuery + ?Sized>(&mut self, world: &Q, ctx: &ProbeContext) -> CollisionState {
        let mut state = CollisionState::default();
        let heading = ctx.heading();

        // Lowest ceiling wins.
        for &anchor in &self.anchors.up {
            if let Some(hit) = self.cast(world, ctx, anchor, Vec3::Y, self.vertical_ray_distance) {
                if state.above.is_none_or(|above| above.point.y >= hit.point.y) {
                    state.above = Some(hit);
                }
            }
        }

        // Highest floor wins.
        for &anchor in &self.anchors.down {
            if let Some(hit) = self.cast(world, ctx, anchor, Vec3::NEG_Y, self.vertical_ray_distance) {
                if state.below.is_none_or(|below| below.point.y <= hit.point.y) {
                    state.below = Some(hit);
                }
            }
        }

        let right = heading * Vec3::X;
        state.right = self
            .anchors
            .right
            .iter()
            .find_map(|&anchor| self.cast(world, ctx, anchor, right, self.horizontal_ray_distance));

        let left = heading * Vec3::NEG_X;
        state.left = self
            .anchors
            .left
            .iter()
            .find_map(|&anchor| self.cast(world, ctx, anchor, left, self.horizontal_ray_distance));

        state
    }
}

//! Oriented box helpers.
//!
//! Everything the controller collides with, and the actor itself, is treated as
//! an oriented box. These helpers provide the few exact queries the controller
//! needs: ray intersection, nearest point and box-box overlap.

use bevy::prelude::*;

/// Rays and overlaps closer to parallel than this are treated as parallel.
const PARALLEL_EPSILON: f32 = 1.0e-6;

/// A box with a center, half extents and a rotation.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    /// World-space center.
    pub center: Vec3,
    /// Half size along each local axis.
    pub half_extents: Vec3,
    /// Rotation from local to world space.
    pub rotation: Quat,
}

/// Result of a ray hitting an [`OrientedBox`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxRayHit {
    /// Distance along the ray.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
    /// Face normal in the box's local frame.
    pub local_normal: Vec3,
    /// Face normal in world space.
    pub normal: Vec3,
}

impl OrientedBox {
    /// Create a box.
    pub fn new(center: Vec3, half_extents: Vec3, rotation: Quat) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
            rotation,
        }
    }

    /// Create an axis-aligned box.
    pub fn axis_aligned(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center, half_extents, Quat::IDENTITY)
    }

    /// Build a box from a transform, ignoring its scale.
    pub fn from_transform(transform: &Transform, half_extents: Vec3) -> Self {
        Self::new(transform.translation, half_extents, transform.rotation)
    }

    /// Build a box from a global transform, folding its scale into the extents.
    pub fn from_global(transform: &GlobalTransform, half_extents: Vec3) -> Self {
        let (scale, rotation, translation) = transform.to_scale_rotation_translation();
        Self::new(translation, half_extents * scale, rotation)
    }

    /// The three local axes expressed in world space.
    #[inline]
    pub fn axes(&self) -> [Vec3; 3] {
        [
            self.rotation * Vec3::X,
            self.rotation * Vec3::Y,
            self.rotation * Vec3::Z,
        ]
    }

    /// Convert a world point into the box's local frame.
    #[inline]
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.center)
    }

    /// Convert a local point into world space.
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.center + self.rotation * local
    }

    /// Whether the point lies inside or on the box.
    pub fn contains(&self, point: Vec3) -> bool {
        let local = self.to_local(point).abs();
        local.cmple(self.half_extents + Vec3::splat(PARALLEL_EPSILON)).all()
    }

    /// The point on or in the box nearest to `point`.
    ///
    /// Returns `point` itself when it is inside the box.
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let local = self.to_local(point);
        self.to_world(local.clamp(-self.half_extents, self.half_extents))
    }

    /// Half of the box's width measured along a world direction.
    pub fn projected_extent(&self, direction: Vec3) -> f32 {
        let [x, y, z] = self.axes();
        self.half_extents.x * x.dot(direction).abs()
            + self.half_extents.y * y.dot(direction).abs()
            + self.half_extents.z * z.dot(direction).abs()
    }

    /// Cast a ray against the box using the slab method.
    ///
    /// `direction` must be normalized. A ray starting inside the box reports a
    /// hit at distance zero with the normal facing back along the ray.
    pub fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<BoxRayHit> {
        let local_origin = self.to_local(origin);
        let local_dir = self.rotation.inverse() * direction;

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut enter_normal = Vec3::ZERO;

        for axis in 0..3 {
            let o = local_origin[axis];
            let d = local_dir[axis];
            let h = self.half_extents[axis];

            if d.abs() < PARALLEL_EPSILON {
                if o.abs() > h {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let t1 = (-h - o) * inv;
            let t2 = (h - o) * inv;
            let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };

            if near > t_enter {
                t_enter = near;
                let mut normal = Vec3::ZERO;
                normal[axis] = -d.signum();
                enter_normal = normal;
            }
            t_exit = t_exit.min(far);

            if t_enter > t_exit {
                return None;
            }
        }

        if t_exit < 0.0 {
            return None;
        }

        if t_enter < 0.0 {
            // Started inside the box.
            let local_normal = -local_dir.normalize_or_zero();
            return Some(BoxRayHit {
                distance: 0.0,
                point: origin,
                local_normal,
                normal: -direction,
            });
        }

        if t_enter > max_distance {
            return None;
        }

        Some(BoxRayHit {
            distance: t_enter,
            point: origin + direction * t_enter,
            local_normal: enter_normal,
            normal: self.rotation * enter_normal,
        })
    }

    /// Separating-axis overlap test.
    ///
    /// Boxes closer than `skin` count as overlapping, so that two boxes resting
    /// exactly against each other stay in contact.
    pub fn intersects(&self, other: &OrientedBox, skin: f32) -> bool {
        let a = self.axes();
        let b = other.axes();
        let offset = other.center - self.center;

        let edge_axes = a
            .into_iter()
            .flat_map(|ea| b.map(|eb| ea.cross(eb)))
            .filter(|cross| cross.length_squared() > PARALLEL_EPSILON)
            .map(Vec3::normalize);

        a.into_iter().chain(b).chain(edge_axes).all(|axis| {
            let distance = offset.dot(axis).abs();
            distance <= self.projected_extent(axis) + other.projected_extent(axis) + skin
        })
    }
}

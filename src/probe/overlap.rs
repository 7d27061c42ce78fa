use bevy::prelude::*;

use crate::backend::{RaycastRequest, SpatialQuery};
use crate::collision::{CollisionData, CollisionState};
use crate::config::ClosestPointMode;
use crate::intent::MovementDirection;

use super::{CollisionSource, ProbeContext};

/// Closest points nearer to the actor center than this cannot give a normal.
const MIN_CONTACT_OFFSET: f32 = 1.0e-5;

/// Wall contacts must lie at least this far inside the actor's vertical extent.
const WALL_CONTACT_MARGIN: f32 = 1.0e-3;

/// Overlap transition reported by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapEvent {
    /// The actor started overlapping the volume.
    Enter(Entity),
    /// The actor stopped overlapping the volume.
    Exit(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Contact {
    Floor,
    Wall(MovementDirection),
    Ceiling,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LatchedContact {
    volume: Entity,
    side: Contact,
    data: CollisionData,
}

/// Probe driven by overlap events.
///
/// Each entered volume is classified by the face of the actor it touches:
/// the bottom face makes it a floor, the face in the movement direction makes
/// it a wall and the top face makes it a ceiling. Floors and walls are latched
/// until the volume exits; a ceiling only affects the step it is seen on.
///
/// A volume that cannot be classified (no closest point found, or a face that
/// matches nothing) is retried every step until it exits.
#[derive(Debug, Clone, Default)]
pub struct OverlapCollisionProbe {
    pending: Vec<OverlapEvent>,
    overlapping: Vec<Entity>,
    unresolved: Vec<Entity>,
    contacts: Vec<LatchedContact>,
}

impl OverlapCollisionProbe {
    /// Create a probe with no overlaps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an overlap event for the next probe.
    pub fn push_event(&mut self, event: OverlapEvent) {
        self.pending.push(event);
    }

    /// Events queued since the last probe.
    pub fn pending_events(&self) -> &[OverlapEvent] {
        &self.pending
    }

    /// Queue enter/exit events from the full set of volumes overlapped this step.
    pub fn sync_overlaps(&mut self, current: &[Entity]) {
        for &volume in &self.overlapping {
            if !current.contains(&volume) {
                self.pending.push(OverlapEvent::Exit(volume));
            }
        }
        for &volume in current {
            if !self.overlapping.contains(&volume) {
                self.pending.push(OverlapEvent::Enter(volume));
            }
        }
        self.overlapping.clear();
        self.overlapping.extend_from_slice(current);
    }

    /// Whether a wall in front of the actor is latched.
    pub fn front_latched(&self) -> bool {
        self.contacts
            .iter()
            .any(|contact| matches!(contact.side, Contact::Wall(_)))
    }

    /// Number of volumes latched as floors.
    pub fn floor_contacts(&self) -> usize {
        self.contacts
            .iter()
            .filter(|contact| contact.side == Contact::Floor)
            .count()
    }

    fn enter(&mut self, volume: Entity) {
        let known = self.unresolved.contains(&volume)
            || self.contacts.iter().any(|contact| contact.volume == volume);
        if !known {
            self.unresolved.push(volume);
        }
    }

    fn exit(&mut self, volume: Entity) {
        self.unresolved.retain(|&other| other != volume);
        self.contacts.retain(|contact| contact.volume != volume);
    }

    /// Point of `volume` nearest to the actor center.
    fn closest_point<Q: SpatialQuery + ?Sized>(
        world: &Q,
        ctx: &ProbeContext,
        volume: Entity,
    ) -> Option<CollisionData> {
        if ctx.closest_point_mode == ClosestPointMode::Exact {
            if let Some(info) = world.volume(volume) {
                let point = info.bounds.closest_point(ctx.position);
                let offset = ctx.position - point;
                let data = CollisionData::new(offset.length(), offset.normalize_or_zero(), point, Some(volume));
                return Some(data.with_surface(info.surface));
            }
        }
        Self::ray_fan(world, ctx, volume)
    }

    /// First hit on `volume` among rays cast down, right, left and up from the center.
    fn ray_fan<Q: SpatialQuery + ?Sized>(
        world: &Q,
        ctx: &ProbeContext,
        volume: Entity,
    ) -> Option<CollisionData> {
        let heading = ctx.heading();
        let reach = ctx.half_extents.length() * 2.0;

        [Vec3::NEG_Y, heading * Vec3::X, heading * Vec3::NEG_X, Vec3::Y]
            .into_iter()
            .filter_map(|direction| {
                world.cast_ray(&RaycastRequest::new(ctx.position, direction, reach).excluding(ctx.actor))
            })
            .find(|hit| hit.entity == Some(volume))
    }

    /// Which face of the actor the contact touches, and that face's normal.
    fn classify(ctx: &ProbeContext, contact: &CollisionData) -> Option<(Contact, Vec3)> {
        let center = ctx.position;
        let point = contact.point;
        if (point - center).length() < MIN_CONTACT_OFFSET {
            return None;
        }

        // Cast back at the actor from the far side of the contact point.
        let actor = ctx.actor_box();
        let outside = point + (point - center);
        let toward = center - outside;
        let hit = actor.cast_ray(outside, toward.normalize(), toward.length())?;
        let normal = hit.local_normal;

        let threshold = 1.0 - ctx.normal_tolerance;
        if normal.dot(Vec3::NEG_Y) > threshold {
            return Some((Contact::Floor, normal));
        }

        if let Some(forward) = ctx.direction.local_forward() {
            let height = actor.to_local(point).y.abs();
            if normal.dot(forward) > threshold && height < ctx.half_extents.y - WALL_CONTACT_MARGIN {
                return Some((Contact::Wall(ctx.direction), normal));
            }
        }

        if normal.dot(Vec3::Y) > threshold {
            return Some((Contact::Ceiling, normal));
        }

        None
    }

    /// Translation that moves the actor out of the volume along the face normal.
    fn fix_overlap(ctx: &ProbeContext, contact: &CollisionData, local_normal: Vec3) -> Vec3 {
        let normal = ctx.rotation * local_normal;
        let depth = (contact.point - ctx.position).dot(normal);
        let extent = ctx.actor_box().projected_extent(normal);
        normal * (depth - extent)
    }
}

impl CollisionSource for OverlapCollisionProbe {
    fn probe<Q: SpatialQuery + ?Sized>(&mut self, world: &Q, ctx: &ProbeContext) -> CollisionState {
        let mut state = CollisionState::default();

        for event in std::mem::take(&mut self.pending) {
            match event {
                OverlapEvent::Enter(volume) => self.enter(volume),
                OverlapEvent::Exit(volume) => self.exit(volume),
            }
        }

        let mut still_unresolved = Vec::new();
        for volume in std::mem::take(&mut self.unresolved) {
            let classified = Self::closest_point(world, ctx, volume)
                .and_then(|contact| Self::classify(ctx, &contact).map(|found| (contact, found)));

            let Some((data, (side, normal))) = classified else {
                debug!("overlap with {volume} could not be classified, retrying next step");
                still_unresolved.push(volume);
                continue;
            };

            match side {
                Contact::Floor => {
                    state.correction += Self::fix_overlap(ctx, &data, normal);
                    self.contacts.push(LatchedContact { volume, side, data });
                }
                Contact::Wall(_) => {
                    self.contacts.push(LatchedContact { volume, side, data });
                }
                Contact::Ceiling => {
                    if state.above.is_none_or(|above| above.point.y >= data.point.y) {
                        state.above = Some(data);
                    }
                    still_unresolved.push(volume);
                }
            }
        }
        self.unresolved = still_unresolved;

        for contact in &self.contacts {
            match contact.side {
                Contact::Floor => {
                    if state.below.is_none_or(|below| below.point.y <= contact.data.point.y) {
                        state.below = Some(contact.data);
                    }
                }
                Contact::Wall(MovementDirection::Left) if state.left.is_none() => {
                    state.left = Some(contact.data);
                }
                Contact::Wall(MovementDirection::Right) if state.right.is_none() => {
                    state.right = Some(contact.data);
                }
                Contact::Wall(_) | Contact::Ceiling => {}
            }
        }

        state
    }

    fn release_front_latch(&mut self) {
        // Released walls are still overlapped; they get classified again
        // against the new direction.
        let (walls, kept): (Vec<_>, Vec<_>) = self
            .contacts
            .drain(..)
            .partition(|contact| matches!(contact.side, Contact::Wall(_)));
        self.contacts = kept;
        self.unresolved.extend(walls.into_iter().map(|contact| contact.volume));
    }
}

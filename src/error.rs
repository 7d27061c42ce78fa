//! Controller errors.

use bevy::prelude::*;
use thiserror::Error;

/// Errors raised by the character controller.
///
/// Only configuration errors are fatal: an actor that fails initialization is
/// tagged with [`ControllerFault`] and never stepped. Geometry problems met
/// during a step are recovered locally and only logged.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ControllerError {
    /// The actor has no [`ActorBounds`](crate::config::ActorBounds) to collide with.
    #[error("entity {0} has no ActorBounds; the controller cannot run without a bounding box")]
    MissingBounds(Entity),

    /// The actor's bounding box has a zero, negative or non-finite extent.
    #[error("entity {entity} has invalid bounds {half_extents}")]
    InvalidBounds {
        /// The offending actor.
        entity: Entity,
        /// The half extents that were rejected.
        half_extents: Vec3,
    },

    /// The actor sits on the column axis, so no arc can be followed.
    #[error("actor is {radius} from the column axis; arc motion needs a positive radius")]
    DegenerateRadius {
        /// Horizontal distance to the column axis.
        radius: f32,
    },
}

/// Marker for actors whose initialization failed.
#[derive(Component, Debug, Clone, Copy)]
pub struct ControllerFault(pub ControllerError);

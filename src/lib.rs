//! # `arc_character_controller`
//!
//! A kinematic character controller for 2.5D runners played on the outside of
//! a cylinder, with physics backend abstraction.
//!
//! The actor is an oriented box that:
//! - Probes the world with rays or overlap volumes to find floors, ceilings and walls
//! - Falls under its own gravity, snaps onto floors and under ceilings
//! - Jumps from a fixed budget that refills on landing
//! - Moves horizontally only along an arc around a vertical column, so its
//!   distance to the column never changes
//! - Optionally tilts to match the platform it stands on
//! - Reports landings on falling platforms and falls out of the level as events
//!
//! ## Architecture
//!
//! Every fixed step runs three chained system sets:
//! 1. [`CharacterControllerSet::Preparation`]: bounds are resolved and
//!    [`MovementIntent`](intent::MovementIntent) is folded into the controller
//! 2. [`CharacterControllerSet::Motion`]: the backend builds a
//!    [`SpatialQuery`](backend::SpatialQuery) and steps each controller
//! 3. [`CharacterControllerSet::Sync`]: state markers are updated
//!
//! Actors are oriented so that their local X axis is tangent to the orbit:
//! "right" is local +X.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use arc_character_controller::prelude::*;
//!
//! // An actor 5 units in front of the column at the origin.
//! let actor = (
//!     Transform::from_xyz(0.0, 2.0, -5.0),
//!     CharacterController::new(),
//!     ActorBounds::cube(1.0),
//!     ControllerConfig::runner(),
//!     CollisionProbe::Ray(RayCollisionProbe::default()),
//! );
//! ```

use bevy::prelude::*;

pub mod arc;
pub mod backend;
pub mod box_world;
pub mod collision;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod geometry;
pub mod intent;
pub mod jump;
pub mod probe;
pub mod state;
pub mod systems;
pub mod tilt;
pub mod vertical;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{CharacterPhysicsBackend, SpatialQuery};
    pub use crate::box_world::{BoxWorldBackend, StaticBox};
    pub use crate::collision::{CollisionData, CollisionState, FallingPlatform};
    pub use crate::config::{ActorBounds, CharacterController, ClosestPointMode, ControllerConfig};
    pub use crate::error::{ControllerError, ControllerFault};
    pub use crate::events::{RestartLevel, StartFalling};
    pub use crate::intent::{MovementDirection, MovementIntent};
    pub use crate::probe::{CollisionProbe, OverlapCollisionProbe, RayAnchors, RayCollisionProbe};
    pub use crate::state::{Airborne, Grounded, VerticalState};
    pub use crate::{CharacterControllerPlugin, CharacterControllerSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dCharacterBundle};
}

/// System sets for the controller's fixed step, run in this order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterControllerSet {
    /// Bounds resolution and input folding.
    Preparation,
    /// Backend motion system: probe, vertical, jump, tilt and arc motion.
    Motion,
    /// State marker updates.
    Sync,
}

/// Main plugin for the character controller system.
///
/// This plugin is generic over a physics backend `B` which provides the
/// world queries the controller steps against.
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `BoxWorldBackend`)
///
/// # Examples
///
/// With the box world backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use arc_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(CharacterControllerPlugin::<BoxWorldBackend>::default())
///     .run();
/// ```
pub struct CharacterControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for CharacterControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for CharacterControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::CharacterController>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<config::ActorBounds>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<collision::FallingPlatform>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();

        app.add_event::<events::StartFalling>();
        app.add_event::<events::RestartLevel>();

        app.configure_sets(
            FixedUpdate,
            (
                CharacterControllerSet::Preparation,
                CharacterControllerSet::Motion,
                CharacterControllerSet::Sync,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                systems::initialize_controllers,
                systems::apply_movement_intent,
            )
                .chain()
                .in_set(CharacterControllerSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            systems::sync_state_markers.in_set(CharacterControllerSet::Sync),
        );
    }
}

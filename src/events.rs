//! Events emitted by the controller.
//!
//! The controller never changes the world itself. Landing on a falling platform
//! and dropping out of the level are reported as events for the game to act on.

use bevy::prelude::*;

/// The actor landed on a platform tagged [`FallingPlatform`](crate::collision::FallingPlatform).
///
/// Sent at most once per landing transition.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartFalling {
    /// The actor that landed.
    pub actor: Entity,
    /// The platform that should start falling.
    pub platform: Entity,
}

/// The actor fell below its configured restart height.
///
/// Sent once per fall; re-armed once the actor is above the restart height
/// again.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartLevel {
    /// The actor that fell out of the level.
    pub actor: Entity,
}

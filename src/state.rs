//! State marker components.
//!
//! These components indicate the current vertical state of a character
//! controller. They are added/removed by the controller systems after every
//! fixed step, mirroring [`CharacterController::vertical_state`](crate::config::CharacterController::vertical_state).

use bevy::prelude::*;

/// Vertical state of the actor.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VerticalState {
    /// Falling or rising under gravity.
    #[default]
    Airborne,
    /// Resting on a floor. Left only when the floor probe stops reporting a
    /// floor below, or when a jump is granted.
    Grounded,
}

/// Marker component indicating the character is grounded.
///
/// This is a marker component - it has no data, just indicates state.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use arc_character_controller::prelude::*;
///
/// // Grounded is a marker component - just use it in queries
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

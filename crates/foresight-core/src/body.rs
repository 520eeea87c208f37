//! Body kinematic state.

use glam::Vec3;

/// An absolute (world-space) position.
pub type Position = Vec3;

/// The zero vector.
///
/// Doubles as the "no further meaningful position" sentinel written by
/// collision-truncated predictions, so consumers must treat an exact
/// zero entry as a gap rather than the world origin.
pub const ZERO: Position = Vec3::ZERO;

/// Position and velocity of a body, in world coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BodyState {
    /// World-space position.
    pub position: Position,
    /// World-space velocity, in units per second.
    pub velocity: Vec3,
}

impl BodyState {
    /// A body with the given position and velocity.
    pub fn new(position: Position, velocity: Vec3) -> Self {
        Self { position, velocity }
    }

    /// A body at rest at `position`.
    pub fn at_rest(position: Position) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
        }
    }
}

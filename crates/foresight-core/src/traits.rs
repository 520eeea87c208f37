//! The host-scene access trait.

use crate::body::BodyState;
use crate::detector::ForceDetector;
use crate::id::BodyId;

/// Read-only view of the host scene.
///
/// Implemented by the host (game engine, test harness). The engine only
/// calls it on the coordinating thread while opening a frame, copying
/// everything it needs into per-predictor snapshots, so implementations
/// need not be thread-safe.
pub trait SceneAccess {
    /// Current position and velocity of `body`.
    ///
    /// Returns `None` if the body is unknown to the scene.
    fn body_state(&self, body: BodyId) -> Option<BodyState>;

    /// The force detector attached to `body`, if it has one.
    ///
    /// Bodies without a detector are inert: no motion is predicted for them.
    fn force_detector(&self, body: BodyId) -> Option<ForceDetector>;
}

//! Reusable scene fixtures.
//!
//! - [`constant_pull`]: a law with the same magnitude at every distance,
//!   for hand-checkable integration arithmetic.
//! - [`planet`]: a source owned by a body, with linear falloff.
//! - [`orbital_system`]: a static sun and a ship on a rough orbit.

use foresight_core::{
    BodyId, BodyState, ForceDetector, GravityLaw, GravitySource, PowerLaw, SourceId,
};
use glam::Vec3;

use crate::MockScene;

/// A law of fixed `magnitude`.
pub fn constant_pull(magnitude: f32) -> impl GravityLaw {
    move |_distance: f32| magnitude
}

/// A source `id` owned by `body`, with linear falloff giving
/// `surface_gravity` at `surface_radius` and a trigger radius of ten
/// surface radii.
pub fn planet(id: u32, body: u32, surface_radius: f32, surface_gravity: f32) -> GravitySource {
    GravitySource::new(
        SourceId(id),
        BodyId(body),
        surface_radius * 10.0,
        surface_radius,
        PowerLaw::from_surface_gravity(surface_gravity, surface_radius, 1.0),
    )
}

/// Body of the sun in [`orbital_system`].
pub const SUN: BodyId = BodyId(1);
/// Source owned by [`SUN`].
pub const SUN_SOURCE: SourceId = SourceId(1);
/// Body of the ship in [`orbital_system`].
pub const SHIP: BodyId = BodyId(2);

/// A sun at the origin and a ship 200 units out with roughly circular
/// velocity, inside the sun's field.
pub fn orbital_system() -> (GravitySource, MockScene) {
    let sun = planet(SUN_SOURCE.0, SUN.0, 20.0, 5.0);
    // Linear law: a = 100 / r, circular speed v = sqrt(a r) = 10.
    let scene = MockScene::new()
        .with_body(SUN, BodyState::at_rest(Vec3::ZERO))
        .with_body(
            SHIP,
            BodyState::new(Vec3::new(200.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 10.0)),
        )
        .with_detector(SHIP, ForceDetector::new([SUN_SOURCE]));
    (sun, scene)
}

//! Gravity sources and the gravity-law seam.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;

use crate::body::Position;
use crate::id::{BodyId, SourceId};

/// Maps a distance from a source's centre to an acceleration magnitude.
///
/// Supplied by the host; the engine only evaluates it. Implementations
/// must be deterministic, and are called from worker threads when
/// threaded prediction is enabled.
///
/// Any `Fn(f32) -> f32 + Send + Sync` closure is a gravity law:
///
/// ```
/// use foresight_core::GravityLaw;
///
/// let constant = |_distance: f32| 9.81_f32;
/// assert_eq!(constant.magnitude(100.0), 9.81);
/// ```
pub trait GravityLaw: Send + Sync + 'static {
    /// Acceleration magnitude at `distance` from the source centre.
    fn magnitude(&self, distance: f32) -> f32;
}

impl<F> GravityLaw for F
where
    F: Fn(f32) -> f32 + Send + Sync + 'static,
{
    fn magnitude(&self, distance: f32) -> f32 {
        self(distance)
    }
}

/// `gravitational_mass / distance^exponent`.
///
/// Exponent 1 gives the linear falloff used for small bodies, exponent 2
/// the physical inverse-square law.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerLaw {
    /// Numerator of the falloff (already includes the gravitational constant).
    pub gravitational_mass: f32,
    /// Falloff exponent.
    pub exponent: f32,
}

impl PowerLaw {
    /// Linear falloff: `mass / d`.
    pub fn linear(gravitational_mass: f32) -> Self {
        Self {
            gravitational_mass,
            exponent: 1.0,
        }
    }

    /// Inverse-square falloff: `mass / d²`.
    pub fn inverse_square(gravitational_mass: f32) -> Self {
        Self {
            gravitational_mass,
            exponent: 2.0,
        }
    }

    /// The law that yields `surface_gravity` at `surface_radius`.
    pub fn from_surface_gravity(surface_gravity: f32, surface_radius: f32, exponent: f32) -> Self {
        Self {
            gravitational_mass: surface_gravity * surface_radius.powf(exponent),
            exponent,
        }
    }
}

impl GravityLaw for PowerLaw {
    fn magnitude(&self, distance: f32) -> f32 {
        self.gravitational_mass / distance.powf(self.exponent)
    }
}

/// A body's gravity-affecting region.
///
/// The source's own motion is predicted by the trajectory of `body`;
/// the engine looks that trajectory up through the registry.
#[derive(Clone)]
pub struct GravitySource {
    /// Identity of this source.
    pub id: SourceId,
    /// The body that owns the source and whose trajectory it follows.
    pub body: BodyId,
    /// Distance within which the source is considered active during
    /// intersection prediction.
    pub trigger_radius: f32,
    /// Distance within which a travelling body is considered to have
    /// collided with the source.
    pub surface_radius: f32,
    /// Distance → acceleration magnitude.
    pub law: Arc<dyn GravityLaw>,
}

impl GravitySource {
    /// Create a source owned by `body`.
    pub fn new(
        id: SourceId,
        body: BodyId,
        trigger_radius: f32,
        surface_radius: f32,
        law: impl GravityLaw,
    ) -> Self {
        Self {
            id,
            body,
            trigger_radius,
            surface_radius,
            law: Arc::new(law),
        }
    }

    /// Acceleration at `point` due to this source centred at `centre`.
    ///
    /// Points toward `centre` with the law's magnitude at that distance.
    /// A point exactly at the centre has no defined direction and
    /// receives no acceleration.
    pub fn acceleration_at(&self, centre: Position, point: Position) -> Vec3 {
        let delta = centre - point;
        let distance = delta.length();
        if distance == 0.0 {
            return Vec3::ZERO;
        }
        delta / distance * self.law.magnitude(distance)
    }
}

impl fmt::Debug for GravitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GravitySource")
            .field("id", &self.id)
            .field("body", &self.body)
            .field("trigger_radius", &self.trigger_radius)
            .field("surface_radius", &self.surface_radius)
            .finish_non_exhaustive()
    }
}

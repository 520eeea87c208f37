//! Benchmark profiles and scenes for the Foresight trajectory predictor.
//!
//! Provides pre-built solar systems for benchmarking and examples:
//!
//! - [`reference_profile`]: a sun, 8 planets, 64 ships, one player marker
//! - [`stress_profile`]: a sun, 32 planets, 1024 ships, one player marker
//!
//! Planets start on circular orbits around the sun; each ship starts
//! beside a planet and feels both the sun and that planet.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::HashMap;
use std::error::Error;
use std::f32::consts::TAU;

use foresight_core::{
    BodyId, BodyState, ForceDetector, GravitySource, PowerLaw, SceneAccess, SourceId,
};
use foresight_engine::{PredictionConfig, PredictionWorld, TrackedBody};
use glam::Vec3;

/// Body of the sun in every profile.
pub const SUN: BodyId = BodyId(1);
/// Gravity source owned by [`SUN`].
pub const SUN_SOURCE: SourceId = SourceId(1);
/// Body of the player marker in every profile.
pub const PLAYER: BodyId = BodyId(9_000);

const SUN_MASS: f32 = 400.0;
const PLANET_BASE: u32 = 100;
const SHIP_BASE: u32 = 1_000;

/// A scene plus the bodies to register for it.
pub struct Profile {
    /// Configuration to build the world with.
    pub config: PredictionConfig,
    /// Spawn order.
    pub bodies: Vec<TrackedBody>,
    /// Host state at frame start.
    pub scene: ProfileScene,
}

impl Profile {
    /// Create a world and register every profile body.
    pub fn build(&self) -> Result<PredictionWorld, Box<dyn Error + Send + Sync>> {
        let mut world = PredictionWorld::new(self.config)?;
        for body in &self.bodies {
            world.on_body_spawned(body.clone())?;
        }
        Ok(world)
    }
}

/// Static host scene backing a [`Profile`].
#[derive(Clone, Debug, Default)]
pub struct ProfileScene {
    states: HashMap<BodyId, BodyState>,
    detectors: HashMap<BodyId, ForceDetector>,
}

impl ProfileScene {
    fn insert(&mut self, body: BodyId, state: BodyState, detector: Option<ForceDetector>) {
        self.states.insert(body, state);
        if let Some(detector) = detector {
            self.detectors.insert(body, detector);
        }
    }

    /// Number of bodies in the scene.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the scene has no bodies.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl SceneAccess for ProfileScene {
    fn body_state(&self, body: BodyId) -> Option<BodyState> {
        self.states.get(&body).copied()
    }

    fn force_detector(&self, body: BodyId) -> Option<ForceDetector> {
        self.detectors.get(&body).cloned()
    }
}

/// Reference profile: 8 planets, 64 ships.
pub fn reference_profile(config: PredictionConfig) -> Profile {
    solar_system(config, 8, 64)
}

/// Stress profile: 32 planets, 1024 ships.
pub fn stress_profile(config: PredictionConfig) -> Profile {
    solar_system(config, 32, 1024)
}

/// A sun, `planets` planets on circular orbits, and `ships` ships spread
/// across the planets.
pub fn solar_system(config: PredictionConfig, planets: u32, ships: u32) -> Profile {
    let mut scene = ProfileScene::default();
    let mut bodies = Vec::new();

    let sun = GravitySource::new(SUN_SOURCE, SUN, 50_000.0, 30.0, PowerLaw::linear(SUN_MASS));
    scene.insert(SUN, BodyState::at_rest(Vec3::ZERO), None);
    bodies.push(TrackedBody::Source(sun));

    // Linear law: a = m / r, so the circular speed is sqrt(m) at any radius.
    let orbital_speed = SUN_MASS.sqrt();
    let mut planet_positions = Vec::with_capacity(planets as usize);
    for i in 0..planets {
        let body = BodyId(PLANET_BASE + i);
        let radius = 300.0 * (i + 1) as f32;
        let angle = TAU * i as f32 / planets.max(1) as f32;
        let (sin, cos) = angle.sin_cos();
        let position = Vec3::new(radius * cos, 0.0, radius * sin);
        let velocity = Vec3::new(-sin, 0.0, cos) * orbital_speed;

        let source = GravitySource::new(
            SourceId(PLANET_BASE + i),
            body,
            120.0,
            8.0,
            PowerLaw::from_surface_gravity(2.0, 8.0, 1.0),
        );
        scene.insert(
            body,
            BodyState::new(position, velocity),
            Some(ForceDetector::new([SUN_SOURCE])),
        );
        bodies.push(TrackedBody::Source(source));
        planet_positions.push((SourceId(PLANET_BASE + i), position, velocity));
    }

    for j in 0..ships {
        let body = BodyId(SHIP_BASE + j);
        let (state, detector) = match planet_positions.get(j as usize % planet_positions.len().max(1)) {
            Some((planet, position, velocity)) => {
                let offset = Vec3::new(0.0, 20.0 + (j % 7) as f32 * 5.0, 40.0);
                (
                    BodyState::new(*position + offset, *velocity),
                    ForceDetector::new([SUN_SOURCE, *planet]),
                )
            }
            None => (
                BodyState::new(Vec3::new(500.0 + j as f32, 0.0, 0.0), Vec3::Z * orbital_speed),
                ForceDetector::new([SUN_SOURCE]),
            ),
        };
        scene.insert(body, state, Some(detector));
        bodies.push(TrackedBody::Body(body));
    }

    scene.insert(
        PLAYER,
        BodyState::new(Vec3::new(0.0, 0.0, 800.0), Vec3::new(-orbital_speed, 0.0, 0.0)),
        Some(ForceDetector::new([SUN_SOURCE])),
    );
    bodies.push(TrackedBody::Marker {
        id: PLAYER,
        category: "player".into(),
    });

    Profile {
        config,
        bodies,
        scene,
    }
}

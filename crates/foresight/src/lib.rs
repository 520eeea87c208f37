//! Foresight: trajectory prediction for gravitationally-coupled bodies.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Foresight sub-crates. For most hosts, adding `foresight` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use foresight::prelude::*;
//! use std::collections::HashMap;
//!
//! // The host exposes its bodies through `SceneAccess`.
//! struct Scene(HashMap<BodyId, (BodyState, Option<ForceDetector>)>);
//! impl SceneAccess for Scene {
//!     fn body_state(&self, body: BodyId) -> Option<BodyState> {
//!         self.0.get(&body).map(|(state, _)| *state)
//!     }
//!     fn force_detector(&self, body: BodyId) -> Option<ForceDetector> {
//!         self.0.get(&body).and_then(|(_, detector)| detector.clone())
//!     }
//! }
//!
//! let planet = GravitySource::new(SourceId(1), BodyId(1), 500.0, 50.0, PowerLaw::linear(100.0));
//! let mut bodies = HashMap::new();
//! bodies.insert(BodyId(1), (BodyState::at_rest(Position::ZERO), None));
//! bodies.insert(
//!     BodyId(2),
//!     (
//!         BodyState::at_rest(Position::new(200.0, 0.0, 0.0)),
//!         Some(ForceDetector::new([SourceId(1)])),
//!     ),
//! );
//! let scene = Scene(bodies);
//!
//! let config = PredictionConfig { seconds_to_predict: 10.0, ..Default::default() };
//! let mut world = PredictionWorld::new(config).unwrap();
//! world.on_body_spawned(TrackedBody::Source(planet)).unwrap();
//! let ship = world.on_body_spawned(TrackedBody::Body(BodyId(2))).unwrap();
//!
//! assert_eq!(world.tick(&scene).unwrap(), TickOutcome::Advanced);
//! assert_eq!(ship.future_position_cached(0), Some(Position::new(200.0, 0.0, 0.0)));
//! assert!(ship.future_position_cached(9).unwrap().x < 200.0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `foresight-core` | IDs, bodies, gravity sources and laws, detectors, scene trait |
//! | [`engine`] | `foresight-engine` | Integrator, predictors, registry, worker pool, coordinator |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`foresight-core`).
///
/// Contains body state, gravity sources and laws, force detectors, error
/// types, and the [`types::SceneAccess`] trait hosts implement.
pub use foresight_core as types;

/// Prediction engine (`foresight-engine`).
///
/// Provides [`engine::PredictionWorld`], the stepwise
/// [`engine::integrate`] function, and the predictor read API.
pub use foresight_engine as engine;

/// Common imports for typical usage.
///
/// ```rust
/// use foresight::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use foresight_core::{
        BodyId, BodyState, ConfigError, ForceDetector, FrameId, GravityLaw, GravitySource,
        InheritedDetector, Position, PowerLaw, SceneAccess, SourceId, ZERO,
    };

    // Engine
    pub use foresight_engine::{
        ConfigChange, FrameMetrics, MarkerCategory, PredictionConfig, PredictionWorld,
        PredictorHandle, PredictorKind, SpawnError, TickOutcome, TrackedBody, Trajectory,
    };
}

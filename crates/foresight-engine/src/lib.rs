//! Trajectory prediction engine for gravitationally-coupled bodies.
//!
//! Provides [`PredictionWorld`], which tracks one [`Predictor`] per body,
//! resolves their dependencies on each other's predicted trajectories
//! once per frame, and keeps a committed snapshot of every trajectory
//! that renderers can read at any time. Predictions run inline, or on a
//! worker pool behind a per-frame barrier.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod busy;
pub mod config;
pub(crate) mod context;
pub mod frame;
pub mod metrics;
pub(crate) mod pool;
pub mod predictor;
pub mod registry;
pub mod simulate;
pub mod world;

pub use config::{MarkerCategory, PredictionConfig, DEFAULT_TICK_DURATION};
pub use metrics::FrameMetrics;
pub use predictor::{Predictor, PredictorKind};
pub use registry::RegistryError;
pub use simulate::{integrate, Influences, InheritedInfluence, SourceTrack, StepMode, Trajectory};
pub use world::{
    ConfigChange, PredictionWorld, PredictorHandle, SpawnError, TickOutcome, TrackedBody,
};

//! Prediction configuration, validation, and marker categories.
//!
//! [`PredictionConfig`] is the input to
//! [`PredictionWorld::new`](crate::world::PredictionWorld::new) and
//! [`on_config_changed`](crate::world::PredictionWorld::on_config_changed).
//! Loading it from the host's settings is the host's job; this module
//! only checks structural invariants and derives the step count.

use std::fmt;
use std::str::FromStr;

use foresight_core::{ConfigError, Position};

/// Fixed physics tick used by high-precision mode when the host does not
/// override it (50 Hz).
pub const DEFAULT_TICK_DURATION: f32 = 0.02;

// ── PredictionConfig ───────────────────────────────────────────────

/// Global prediction settings.
///
/// All predictors share one horizon. Changing any field goes through
/// [`on_config_changed`](crate::world::PredictionWorld::on_config_changed),
/// which reallocates every predictor's buffers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PredictionConfig {
    /// Length of the prediction horizon in seconds. Default: 60.
    pub seconds_to_predict: f32,
    /// Sample the horizon at `tick_duration` resolution instead of one
    /// step per second. Default: false.
    pub high_precision: bool,
    /// Fixed physics tick in seconds, used by high-precision mode. Default: 0.02.
    pub tick_duration: f32,
    /// Run predictions requested by the coordinating thread on the
    /// worker pool. Default: false.
    pub multithreading: bool,
    /// Let dependency resolution dispatch to the worker pool even from
    /// inside a worker. Default: false.
    pub parallelization: bool,
    /// Recompute each step's active gravity sources from predicted
    /// proximity instead of the frame-constant detector set. Default: false.
    pub predict_intersections: bool,
    /// Number of worker threads. `None` = auto-detect
    /// (`available_parallelism / 2`, clamped to `[2, 16]`).
    pub worker_count: Option<usize>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            seconds_to_predict: 60.0,
            high_precision: false,
            tick_duration: DEFAULT_TICK_DURATION,
            multithreading: false,
            parallelization: false,
            predict_intersections: false,
            worker_count: None,
        }
    }
}

impl PredictionConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Horizon must be a finite, non-negative duration.
        if !self.seconds_to_predict.is_finite() || self.seconds_to_predict < 0.0 {
            return Err(ConfigError::InvalidHorizon {
                seconds: self.seconds_to_predict,
            });
        }
        // 2. Tick must be finite and positive, and its reciprocal finite
        //    (rejects subnormals where the step count would be infinite).
        let dt = self.tick_duration;
        if !dt.is_finite() || dt <= 0.0 || !(1.0 / dt).is_finite() {
            return Err(ConfigError::InvalidTickDuration { value: dt });
        }
        // 3. Derived step count must be addressable.
        let steps = self.raw_step_count();
        if steps > isize::MAX as f64 / std::mem::size_of::<Position>() as f64 {
            return Err(ConfigError::StepCountOverflow { value: steps });
        }
        Ok(())
    }

    /// Number of predicted positions per trajectory.
    ///
    /// One per second of horizon, or one per tick in high-precision mode.
    /// Callers are expected to have validated the configuration.
    pub fn step_count(&self) -> usize {
        self.raw_step_count() as usize
    }

    fn raw_step_count(&self) -> f64 {
        // Divided in f32 so that e.g. 2.0 / 0.1 yields 20 steps, not 19.
        let seconds = self.seconds_to_predict.max(0.0);
        let steps = if self.high_precision {
            seconds / self.tick_duration
        } else {
            seconds
        };
        f64::from(steps.floor())
    }

    /// Whether any flag routes work onto the worker pool.
    pub fn is_threaded(&self) -> bool {
        self.multithreading || self.parallelization
    }

    /// Resolve the actual worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 64),
            None => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                (cpus / 2).clamp(2, 16)
            }
        }
    }
}

// ── MarkerCategory ─────────────────────────────────────────────────

/// The kind of virtual body a marker predictor tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkerCategory {
    /// The player. Follows vehicle enter/exit events.
    Player,
    /// The player's ship.
    Ship,
    /// A launched probe.
    Probe,
}

impl MarkerCategory {
    /// Whether markers of this category re-target to the vehicle the
    /// player boards.
    pub fn follows_vehicle(self) -> bool {
        matches!(self, Self::Player)
    }
}

impl FromStr for MarkerCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(Self::Player),
            "ship" => Ok(Self::Ship),
            "probe" => Ok(Self::Probe),
            other => Err(ConfigError::UnrecognizedCategory {
                category: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for MarkerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Player => "player",
            Self::Ship => "ship",
            Self::Probe => "probe",
        };
        f.write_str(name)
    }
}

//! Error types for the Foresight trajectory predictor.
//!
//! Only structurally invalid configuration is an error. Degenerate
//! inputs (a body with no detector, an empty active set) and concurrent
//! duplicate requests are handled by explicit fallback paths in the
//! engine and never surface to callers.

use std::error::Error;
use std::fmt;

/// Errors detected while configuring the predictor or one of its
/// predictors.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A marker predictor was given a category the engine does not know.
    /// Fatal to that predictor's setup; there is no default category.
    UnrecognizedCategory {
        /// The category string supplied by the host.
        category: String,
    },
    /// `tick_duration` is NaN, infinite, zero, or negative.
    InvalidTickDuration {
        /// The invalid value.
        value: f32,
    },
    /// `seconds_to_predict` is NaN, infinite, or negative.
    InvalidHorizon {
        /// The invalid value.
        seconds: f32,
    },
    /// The derived step count does not fit in memory-addressable range.
    StepCountOverflow {
        /// The step count that overflowed, as computed in floating point.
        value: f64,
    },
    /// A worker thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of the spawn failure.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedCategory { category } => {
                write!(f, "unrecognized predictor category '{category}'")
            }
            Self::InvalidTickDuration { value } => {
                write!(f, "tick_duration must be finite and positive, got {value}")
            }
            Self::InvalidHorizon { seconds } => {
                write!(f, "seconds_to_predict must be finite and non-negative, got {seconds}")
            }
            Self::StepCountOverflow { value } => {
                write!(f, "step count {value} exceeds the addressable range")
            }
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "thread spawn failed: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

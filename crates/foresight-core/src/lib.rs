//! Core types and traits for the Foresight trajectory predictor.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the data model shared by the engine and its host: body and source
//! identifiers, gravity sources and laws, force detectors, the
//! [`SceneAccess`] trait through which the host exposes its bodies, and
//! the error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod body;
pub mod detector;
pub mod error;
pub mod gravity;
pub mod id;
pub mod traits;

pub use body::{BodyState, Position, ZERO};
pub use detector::{ForceDetector, InheritedDetector, SourceSet};
pub use error::ConfigError;
pub use gravity::{GravityLaw, GravitySource, PowerLaw};
pub use id::{BodyId, FrameId, SourceId};
pub use traits::SceneAccess;

//! Force detectors: which gravity sources currently act on a body.

use smallvec::SmallVec;

use crate::id::{BodyId, SourceId};

/// A set of active gravity sources.
///
/// Bodies are rarely inside more than a handful of overlapping fields,
/// so up to four ids stay inline.
pub type SourceSet = SmallVec<[SourceId; 4]>;

/// Per-body record of the gravity sources presently affecting it.
///
/// Produced by the host at every "begin frame" and copied into the
/// predictor's frame snapshot, so workers never read live host state.
#[derive(Clone, Debug, PartialEq)]
pub struct ForceDetector {
    /// Sources currently acting on the body, in host order.
    pub active_sources: SourceSet,
    /// Scalar applied to every contribution from `active_sources`.
    pub field_multiplier: f32,
    /// The detector of the frame the body is riding inside, if any.
    pub inherited: Option<InheritedDetector>,
}

impl Default for ForceDetector {
    fn default() -> Self {
        Self {
            active_sources: SourceSet::new(),
            field_multiplier: 1.0,
            inherited: None,
        }
    }
}

impl ForceDetector {
    /// A detector with the given active sources and a multiplier of 1.
    pub fn new(active_sources: impl IntoIterator<Item = SourceId>) -> Self {
        Self {
            active_sources: active_sources.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Set the field multiplier.
    pub fn with_multiplier(mut self, field_multiplier: f32) -> Self {
        self.field_multiplier = field_multiplier;
        self
    }

    /// Attach an inherited detector.
    pub fn with_inherited(mut self, inherited: InheritedDetector) -> Self {
        self.inherited = Some(inherited);
        self
    }

    /// Whether no source is currently active.
    pub fn is_empty(&self) -> bool {
        self.active_sources.is_empty()
    }
}

/// The field of a carrier the body rides inside.
///
/// Models "my carrier is itself inside another field", e.g. a moving
/// platform inside a planet's well. The inherited contribution is
/// evaluated at the carrier's predicted position, not the body's.
///
/// This is a non-owning, by-value description: the host guarantees the
/// carrier chain is acyclic.
#[derive(Clone, Debug, PartialEq)]
pub struct InheritedDetector {
    /// The body whose predicted trajectory the inherited field is
    /// evaluated along.
    pub carrier: BodyId,
    /// Sources acting on the carrier.
    pub active_sources: SourceSet,
    /// Scalar applied to the inherited contributions.
    pub field_multiplier: f32,
}

impl InheritedDetector {
    /// An inherited detector with a multiplier of 1.
    pub fn new(carrier: BodyId, active_sources: impl IntoIterator<Item = SourceId>) -> Self {
        Self {
            carrier,
            active_sources: active_sources.into_iter().collect(),
            field_multiplier: 1.0,
        }
    }

    /// Set the field multiplier.
    pub fn with_multiplier(mut self, field_multiplier: f32) -> Self {
        self.field_multiplier = field_multiplier;
        self
    }
}

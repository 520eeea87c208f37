//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a tracked body in the host scene.
///
/// Assigned by the host. Virtual bodies such as map markers get their
/// own `BodyId` even though they ride a physical body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BodyId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a gravity source (a body's gravity-affecting region).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SourceId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing prediction frame counter.
///
/// A new frame is opened at every "begin frame". Predictors compare the
/// frame they last simulated in against the current one instead of
/// carrying a flag that has to be reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

impl FrameId {
    /// The frame before any frame has been opened.
    pub const NONE: FrameId = FrameId(0);
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FrameId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

//! Frame generation primitives.
//!
//! Provides [`FrameCounter`] (the coordinator's monotonic frame id) and
//! [`FrameMemo`] (a predictor's "already updated in frame N" record).
//! Comparing against the current frame id replaces a per-frame boolean
//! that would otherwise have to be cleared at every frame start.

use std::sync::atomic::{AtomicU64, Ordering};

use foresight_core::FrameId;

/// Global frame counter, advanced by the coordinator at every "begin frame".
///
/// Monotonically increasing. Starts at [`FrameId::NONE`]; the first
/// opened frame is `FrameId(1)`.
pub struct FrameCounter {
    current: AtomicU64,
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::new()
    }
}

// Compile-time assertion: FrameCounter must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<FrameCounter>();
};

impl FrameCounter {
    /// Create a new counter with no frame opened.
    pub fn new() -> Self {
        Self {
            current: AtomicU64::new(FrameId::NONE.0),
        }
    }

    /// Open the next frame and return its id.
    pub fn advance(&self) -> FrameId {
        FrameId(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The most recently opened frame.
    pub fn current(&self) -> FrameId {
        FrameId(self.current.load(Ordering::Acquire))
    }
}

/// Per-predictor memo of the last frame its trajectory was updated in.
///
/// [`claim`](FrameMemo::claim) is the only way to mark a frame updated,
/// and succeeds at most once per frame even under concurrent callers
/// (a worker resolving a dependency racing the coordinator's own pass).
pub struct FrameMemo {
    last: AtomicU64,
}

impl Default for FrameMemo {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameMemo {
    /// A memo that has never been claimed.
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(FrameId::NONE.0),
        }
    }

    /// Claim `frame` for an update.
    ///
    /// Returns `true` for exactly one caller per frame. Returns `false`
    /// if `frame` (or a later frame) was already claimed, in which case
    /// the caller must use whatever trajectory is currently published.
    pub fn claim(&self, frame: FrameId) -> bool {
        frame != FrameId::NONE && self.last.fetch_max(frame.0, Ordering::AcqRel) < frame.0
    }

    /// The last claimed frame.
    pub fn last(&self) -> FrameId {
        FrameId(self.last.load(Ordering::Acquire))
    }

    /// Forget all claims. Used when buffers are reallocated.
    pub fn reset(&self) {
        self.last.store(FrameId::NONE.0, Ordering::Release);
    }
}

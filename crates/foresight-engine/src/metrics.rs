//! Prediction metrics.
//!
//! [`FrameMetrics`] is a point-in-time copy of the coordinator's
//! cumulative counters, for telemetry and for tests that need to observe
//! scheduling decisions (contention no-ops, inline fallbacks) that are
//! otherwise invisible to callers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative scheduling counters and the cost of the last committed frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameMetrics {
    /// Number of frames whose buffers were committed to the caches.
    pub frames_committed: u64,
    /// Number of simulation runs that completed and published a buffer.
    pub simulations_run: u64,
    /// Number of runs handed to the worker pool.
    pub runs_dispatched: u64,
    /// Number of threaded runs executed inline because the task queue was
    /// full or the pool was unavailable.
    pub inline_fallbacks: u64,
    /// Number of asynchronous requests rejected by the busy-set.
    pub contention_rejections: u64,
    /// Number of ticks that found the frame barrier still closed.
    pub barrier_waits: u64,
    /// Number of configuration changes deferred behind the barrier.
    pub deferred_reconfigurations: u64,
    /// Wall-clock time from "begin frame" to commit of the last committed
    /// frame, in microseconds.
    pub last_frame_us: u64,
}

/// Lock-free counters behind [`FrameMetrics`], shared with workers.
#[derive(Default)]
pub(crate) struct Counters {
    pub frames_committed: AtomicU64,
    pub simulations_run: AtomicU64,
    pub runs_dispatched: AtomicU64,
    pub inline_fallbacks: AtomicU64,
    pub contention_rejections: AtomicU64,
    pub barrier_waits: AtomicU64,
    pub deferred_reconfigurations: AtomicU64,
    pub last_frame_us: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FrameMetrics {
        FrameMetrics {
            frames_committed: self.frames_committed.load(Ordering::Relaxed),
            simulations_run: self.simulations_run.load(Ordering::Relaxed),
            runs_dispatched: self.runs_dispatched.load(Ordering::Relaxed),
            inline_fallbacks: self.inline_fallbacks.load(Ordering::Relaxed),
            contention_rejections: self.contention_rejections.load(Ordering::Relaxed),
            barrier_waits: self.barrier_waits.load(Ordering::Relaxed),
            deferred_reconfigurations: self.deferred_reconfigurations.load(Ordering::Relaxed),
            last_frame_us: self.last_frame_us.load(Ordering::Relaxed),
        }
    }
}

//! State shared between the coordinator and the worker pool, and the
//! per-run [`SimContext`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crossbeam_channel::Sender;
use foresight_core::{BodyId, FrameId};

use crate::busy::BusySet;
use crate::config::PredictionConfig;
use crate::frame::FrameCounter;
use crate::metrics::Counters;
use crate::pool::SimTask;
use crate::registry::Registry;
use crate::simulate::StepMode;

/// Where a trajectory update was requested from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Origin {
    /// The thread driving ticks.
    Coordinator,
    /// A pool worker, resolving dependencies of the run it executes.
    Worker,
}

/// Everything a simulation run needs beyond its own predictor.
///
/// Owned by [`PredictionWorld`](crate::world::PredictionWorld) and
/// borrowed by every queued task. Locks are only ever held for lookups
/// and swaps, never across a recursive update.
pub(crate) struct Shared {
    registry: RwLock<Registry>,
    config: RwLock<PredictionConfig>,
    reference_frame: RwLock<Option<BodyId>>,
    tasks: Mutex<Option<Sender<SimTask>>>,
    /// Dispatched runs not yet finished. A run dispatching a dependency
    /// counts it before uncounting itself, so zero means no work anywhere.
    in_flight: AtomicUsize,
    pub frames: FrameCounter,
    pub busy: Arc<BusySet>,
    pub counters: Counters,
}

// Compile-time assertion: Shared must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Shared>();
};

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("frame", &self.frames.current())
            .field("in_flight", &self.in_flight())
            .field("busy", &self.busy.len())
            .finish_non_exhaustive()
    }
}

impl Shared {
    pub fn new(config: PredictionConfig) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            config: RwLock::new(config),
            reference_frame: RwLock::new(None),
            tasks: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            frames: FrameCounter::new(),
            busy: Arc::new(BusySet::new()),
            counters: Counters::default(),
        }
    }

    // Poisoning only records that a worker panicked while holding a
    // guard; every guarded value is replaced wholesale, never left
    // half-written, so the inner value is still usable.

    pub fn registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn registry_mut(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn config(&self) -> PredictionConfig {
        *self.config.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_config(&self, config: PredictionConfig) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
    }

    pub fn reference_frame(&self) -> Option<BodyId> {
        *self.reference_frame.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_reference_frame(&self, body: Option<BodyId>) {
        *self.reference_frame.write().unwrap_or_else(|e| e.into_inner()) = body;
    }

    pub fn task_sender(&self) -> Option<Sender<SimTask>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn has_pool(&self) -> bool {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    pub fn install_pool(&self, tx: Sender<SimTask>) {
        *self.tasks.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn begin_run(&self) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    pub fn end_run(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    /// Drop the coordinator's sender so workers exit once the queue drains.
    pub fn close_pool(&self) {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}

/// The frame, origin, and settings one trajectory update runs under.
///
/// The configuration is copied in at construction; a run never observes
/// a configuration change (those are deferred until no run is in flight).
pub(crate) struct SimContext<'a> {
    pub shared: &'a Arc<Shared>,
    pub frame: FrameId,
    pub origin: Origin,
    pub config: PredictionConfig,
}

impl<'a> SimContext<'a> {
    pub fn new(shared: &'a Arc<Shared>, frame: FrameId, origin: Origin) -> Self {
        Self {
            shared,
            frame,
            origin,
            config: shared.config(),
        }
    }

    /// Whether an update requested under this context goes to the pool.
    ///
    /// Parallel dependency resolution dispatches from anywhere; plain
    /// multithreading only dispatches what the coordinator requests, and
    /// workers resolve their dependencies inline.
    pub fn dispatches_async(&self) -> bool {
        self.config.parallelization
            || (self.config.multithreading && self.origin == Origin::Coordinator)
    }

    pub fn step_mode(&self, stop_on_collision: bool, predict_intersections: bool) -> StepMode {
        StepMode {
            stop_on_collision,
            predict_intersections,
            high_precision: self.config.high_precision,
            tick_duration: self.config.tick_duration,
        }
    }
}

//! User-facing [`PredictionWorld`]: registry, frame hooks, and the tick
//! barrier.
//!
//! # Architecture
//!
//! ```text
//! Host Thread (coordinator)               Workers (N, threaded modes only)
//!     |                                        |
//!     |--tick(scene)                           |
//!     |   any predictor busy? -> Pending       |
//!     |   end frame: live -> cache             |
//!     |   apply deferred config                |
//!     |   begin frame: advance FrameId,        |
//!     |                snapshot scene          |
//!     |   update all predictors                |
//!     |     memo.claim(frame)                  |
//!     |     busy-set admit, busy = true        |
//!     |     [task_tx: bounded(N*4)] ------> task_rx.recv()
//!     |       full/closed: run inline          resolve dependencies
//!     |                                        integrate
//!     |                                        publish live (Arc swap)
//!     |                                        release admission
//!     |   <- Advanced                          busy = false
//! ```
//!
//! In synchronous mode the same tick runs begin, update, and end back to
//! back and always advances.

use std::error::Error;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Instant;

use foresight_core::{BodyId, ConfigError, FrameId, GravitySource, SceneAccess, SourceId};
use log::{debug, info, trace, warn};

use crate::config::PredictionConfig;
use crate::context::{Origin, Shared, SimContext};
use crate::metrics::{Counters, FrameMetrics};
use crate::pool::spawn_workers;
use crate::predictor::Predictor;
use crate::registry::RegistryError;

// ── Hook arguments and outcomes ────────────────────────────────────

/// A body announced by the host's spawn hook.
#[derive(Clone, Debug)]
pub enum TrackedBody {
    /// A physical body.
    Body(BodyId),
    /// A physical body that owns a gravity source. Tracked under
    /// `source.body`.
    Source(GravitySource),
    /// A virtual body. `category` must be `player`, `ship`, or `probe`.
    Marker {
        /// The marker's own body.
        id: BodyId,
        /// Marker category as configured by the host.
        category: String,
    },
}

/// Result of a [`PredictionWorld::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new frame was begun (and, in synchronous mode, committed).
    Advanced,
    /// Asynchronous runs are still in flight; nothing changed.
    Pending,
}

/// Result of [`PredictionWorld::on_config_changed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigChange {
    /// Buffers were reallocated immediately.
    Applied,
    /// Runs are in flight; the change applies on the first tick that
    /// passes the barrier.
    Deferred,
}

/// Error from [`PredictionWorld::on_body_spawned`].
#[derive(Clone, Debug, PartialEq)]
pub enum SpawnError {
    /// The marker category was not recognized.
    Config(ConfigError),
    /// The body or its source is already tracked.
    Registry(RegistryError),
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "cannot track body: {e}"),
            Self::Registry(e) => write!(f, "cannot track body: {e}"),
        }
    }
}

impl Error for SpawnError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Registry(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SpawnError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<RegistryError> for SpawnError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ── PredictorHandle ────────────────────────────────────────────────

/// A tracked body's predictor, as handed to renderers and gameplay code.
///
/// Dereferences to [`Predictor`] for the read API. Cheap to clone; does
/// not keep the world alive.
#[derive(Clone, Debug)]
pub struct PredictorHandle {
    predictor: Arc<Predictor>,
    shared: Weak<Shared>,
}

impl PredictorHandle {
    /// Bring this predictor (and its dependencies) up to date for the
    /// current frame, under the world's dispatch policy.
    ///
    /// Returns `false` if the world has been dropped.
    pub fn update_trajectory(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let ctx = SimContext::new(&shared, shared.frames.current(), Origin::Coordinator);
        self.predictor.update_trajectory(&ctx);
        true
    }
}

impl Deref for PredictorHandle {
    type Target = Predictor;

    fn deref(&self) -> &Predictor {
        &self.predictor
    }
}

// ── PredictionWorld ────────────────────────────────────────────────

/// Coordinator of every trajectory predictor in a scene.
///
/// Driven from one thread: the host calls [`tick`](Self::tick) once per
/// fixed update, or the individual frame hooks if it sequences frames
/// itself. Lifecycle hooks may be called between ticks.
pub struct PredictionWorld {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    pending_config: Option<PredictionConfig>,
    frame_open: bool,
    frame_started: Option<Instant>,
}

impl PredictionWorld {
    /// Create a world with `config`, spawning the worker pool if a
    /// threaded mode is enabled.
    pub fn new(config: PredictionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut world = Self {
            shared: Arc::new(Shared::new(config)),
            workers: Vec::new(),
            pending_config: None,
            frame_open: false,
            frame_started: None,
        };
        world.ensure_pool(&config)?;
        info!(
            "prediction world: {} steps, threaded={}",
            config.step_count(),
            config.is_threaded()
        );
        Ok(world)
    }

    // ── Lifecycle hooks ────────────────────────────────────────────

    /// Start tracking a body.
    ///
    /// The predictor's buffers are sized for the current configuration
    /// and hold zeros until its first update.
    pub fn on_body_spawned(&mut self, body: TrackedBody) -> Result<PredictorHandle, SpawnError> {
        let (predictor, source) = match body {
            TrackedBody::Body(id) => (Predictor::body(id), None),
            TrackedBody::Source(source) => (Predictor::body(source.body), Some(source)),
            TrackedBody::Marker { id, category } => {
                (Predictor::marker(id, category.parse()?), None)
            }
        };
        let predictor = Arc::new(predictor);
        predictor.apply_config(self.shared.config().step_count());
        self.shared
            .registry_mut()
            .insert(Arc::clone(&predictor), source)?;
        debug!("tracking body {} as {:?}", predictor.id(), predictor.kind());
        Ok(self.handle(predictor))
    }

    /// Stop tracking `body`. Returns whether it was tracked.
    ///
    /// An in-flight run for the body still completes, into buffers no
    /// one reads.
    pub fn on_body_destroyed(&mut self, body: BodyId) -> bool {
        let removed = self.shared.registry_mut().remove(body).is_some();
        if removed {
            debug!("stopped tracking body {body}");
        }
        removed
    }

    /// Change the global configuration.
    ///
    /// Applied at once when no run is in flight; otherwise stored and
    /// applied by the first [`tick`](Self::tick) that passes the barrier.
    /// A later change replaces a pending one.
    pub fn on_config_changed(
        &mut self,
        config: PredictionConfig,
    ) -> Result<ConfigChange, ConfigError> {
        config.validate()?;
        if self.is_idle() {
            self.apply_config(config)?;
            Ok(ConfigChange::Applied)
        } else {
            self.pending_config = Some(config);
            Counters::bump(&self.shared.counters.deferred_reconfigurations);
            debug!("runs in flight, deferring reconfiguration");
            Ok(ConfigChange::Deferred)
        }
    }

    /// The player entered `vehicle`: vehicle-following markers re-target to it.
    pub fn on_vehicle_entered(&mut self, vehicle: BodyId) {
        let boarded = self
            .predictors()
            .iter()
            .filter(|p| p.board(Some(vehicle)))
            .count();
        debug!("{boarded} marker(s) boarded vehicle {vehicle}");
    }

    /// The player left their vehicle: vehicle-following markers return to
    /// their own bodies.
    pub fn on_vehicle_exited(&mut self) {
        for predictor in self.predictors() {
            predictor.board(None);
        }
    }

    /// Select the body marker trajectories are framed against.
    pub fn set_reference_frame(&mut self, body: Option<BodyId>) {
        self.shared.set_reference_frame(body);
    }

    // ── Frame hooks ────────────────────────────────────────────────

    /// Open a new frame: snapshot every tracked body from `scene`.
    ///
    /// Advancing the frame id invalidates every predictor's per-frame
    /// memo at once.
    pub fn on_begin_frame(&mut self, scene: &dyn SceneAccess) -> FrameId {
        let frame = self.shared.frames.advance();
        for predictor in self.predictors() {
            predictor.begin_frame(scene);
        }
        self.frame_open = true;
        self.frame_started = Some(Instant::now());
        trace!("begin frame {frame}");
        frame
    }

    /// Update every tracked predictor for the current frame, in
    /// registration order, under the configured dispatch policy.
    pub fn update_all(&self) {
        let ctx = SimContext::new(&self.shared, self.shared.frames.current(), Origin::Coordinator);
        for predictor in self.predictors() {
            predictor.update_trajectory(&ctx);
        }
    }

    /// Commit every live trajectory to its cache.
    ///
    /// Returns `false`, committing nothing, while any run is in flight.
    pub fn on_end_frame(&mut self) -> bool {
        if !self.is_idle() {
            return false;
        }
        for predictor in self.predictors() {
            predictor.end_frame();
        }
        self.frame_open = false;
        Counters::bump(&self.shared.counters.frames_committed);
        if let Some(started) = self.frame_started.take() {
            let us = started.elapsed().as_micros().min(u128::from(u64::MAX)) as u64;
            self.shared.counters.last_frame_us.store(us, Ordering::Relaxed);
        }
        true
    }

    /// Run one fixed update.
    ///
    /// Synchronous: apply any deferred configuration, begin, update all,
    /// commit. Threaded: return [`TickOutcome::Pending`] while any run is
    /// in flight; otherwise commit the open frame, apply any deferred
    /// configuration, begin the next frame, and dispatch its updates.
    ///
    /// Fails only if a deferred configuration needs a worker pool that
    /// cannot be spawned; the configuration stays pending.
    pub fn tick(&mut self, scene: &dyn SceneAccess) -> Result<TickOutcome, ConfigError> {
        if self.shared.config().is_threaded() {
            if !self.is_idle() {
                Counters::bump(&self.shared.counters.barrier_waits);
                return Ok(TickOutcome::Pending);
            }
            if self.frame_open {
                self.on_end_frame();
            }
            self.apply_pending()?;
            self.on_begin_frame(scene);
            self.update_all();
        } else {
            self.apply_pending()?;
            self.on_begin_frame(scene);
            self.update_all();
            self.on_end_frame();
        }
        Ok(TickOutcome::Advanced)
    }

    // ── Queries ────────────────────────────────────────────────────

    /// The predictor tracking `body`.
    pub fn trajectory_for_body(&self, body: BodyId) -> Option<PredictorHandle> {
        let predictor = self.shared.registry().predictor(body).cloned()?;
        Some(self.handle(predictor))
    }

    /// The predictor of the body owning gravity source `source`.
    pub fn trajectory_for_source(&self, source: SourceId) -> Option<PredictorHandle> {
        let predictor = self.shared.registry().source_predictor(source).cloned()?;
        Some(self.handle(predictor))
    }

    /// Whether no asynchronous run is in flight.
    pub fn is_idle(&self) -> bool {
        self.shared.in_flight() == 0 && self.predictors().iter().all(|p| !p.is_busy())
    }

    /// The active configuration.
    pub fn config(&self) -> PredictionConfig {
        self.shared.config()
    }

    /// A configuration waiting for the barrier, if any.
    pub fn pending_config(&self) -> Option<&PredictionConfig> {
        self.pending_config.as_ref()
    }

    /// The current frame id. [`FrameId::NONE`] before the first frame.
    pub fn current_frame(&self) -> FrameId {
        self.shared.frames.current()
    }

    /// The selected reference-frame body.
    pub fn reference_frame(&self) -> Option<BodyId> {
        self.shared.reference_frame()
    }

    /// Number of tracked bodies.
    pub fn tracked_count(&self) -> usize {
        self.shared.registry().len()
    }

    /// Number of spawned worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Scheduling counters since the world was created.
    pub fn metrics(&self) -> FrameMetrics {
        self.shared.counters.snapshot()
    }

    // ── Internals ──────────────────────────────────────────────────

    fn handle(&self, predictor: Arc<Predictor>) -> PredictorHandle {
        PredictorHandle {
            predictor,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Registered predictors, cloned out so no registry guard is held
    /// while they run.
    fn predictors(&self) -> Vec<Arc<Predictor>> {
        self.shared.registry().predictors().cloned().collect()
    }

    fn apply_pending(&mut self) -> Result<(), ConfigError> {
        match self.pending_config {
            Some(config) => self.apply_config(config),
            None => Ok(()),
        }
    }

    /// Reallocate every predictor for `config`. Callers guarantee no run
    /// is in flight.
    fn apply_config(&mut self, config: PredictionConfig) -> Result<(), ConfigError> {
        self.ensure_pool(&config)?;
        let steps = config.step_count();
        self.shared.set_config(config);
        self.shared.busy.clear();
        for predictor in self.predictors() {
            predictor.apply_config(steps);
        }
        self.pending_config = None;
        self.frame_open = false;
        self.frame_started = None;
        info!(
            "prediction reconfigured: {steps} steps, high_precision={}, threaded={}",
            config.high_precision,
            config.is_threaded()
        );
        Ok(())
    }

    /// Spawn the worker pool the first time a threaded mode is enabled.
    /// The pool then lives as long as the world.
    fn ensure_pool(&mut self, config: &PredictionConfig) -> Result<(), ConfigError> {
        if !config.is_threaded() || self.shared.has_pool() {
            return Ok(());
        }
        let count = config.resolved_worker_count();
        let (task_tx, workers) = spawn_workers(count)?;
        self.shared.install_pool(task_tx);
        self.workers = workers;
        info!("spawned {count} prediction workers");
        Ok(())
    }
}

impl fmt::Debug for PredictionWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictionWorld")
            .field("shared", &self.shared)
            .field("workers", &self.workers.len())
            .field("pending_config", &self.pending_config)
            .field("frame_open", &self.frame_open)
            .finish()
    }
}

impl Drop for PredictionWorld {
    fn drop(&mut self) {
        // Queued runs still complete; workers exit once the queue drains.
        self.shared.close_pool();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("prediction worker panicked during shutdown");
            }
        }
    }
}

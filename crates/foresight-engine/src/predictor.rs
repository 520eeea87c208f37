//! Trajectory predictors.
//!
//! One [`Predictor`] per tracked body. It owns two buffers of
//! `step_count` positions:
//!
//! - the **live** trajectory, replaced wholesale each time a simulation
//!   run publishes, and read by dependents resolving later in the frame;
//! - the **cache**, a pointer copy of the live trajectory taken at
//!   "end frame", for renderers that must never see a half-finished
//!   frame.
//!
//! Both are `Arc<[Position]>`: a run fills a private buffer and publishes
//! it with one pointer swap, so no reader ever observes a partial write.
//!
//! Two variants share the update logic:
//!
//! - **Body** predictors follow their own body and integrate without
//!   collision truncation.
//! - **Marker** predictors follow a virtual body (the player, their ship,
//!   a probe). A `player` marker re-targets to the vehicle the player
//!   boards. Markers stop at the first collision and are framed by the
//!   coordinator's reference body.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crossbeam_channel::TrySendError;
use foresight_core::{BodyId, BodyState, FrameId, ForceDetector, Position, SceneAccess, ZERO};
use log::{debug, trace, warn};

use crate::busy::Admission;
use crate::config::MarkerCategory;
use crate::context::{Shared, SimContext};
use crate::frame::FrameMemo;
use crate::metrics::Counters;
use crate::pool::{SimTask, Work};
use crate::simulate::{simulate, SimRequest, Trajectory};

/// Which kind of body a predictor tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredictorKind {
    /// A physical body.
    Body,
    /// A virtual body of the given category.
    Marker(MarkerCategory),
}

enum Variant {
    Body,
    Marker {
        category: MarkerCategory,
        vehicle: Mutex<Option<BodyId>>,
    },
}

/// What the predictor captured from the scene at "begin frame".
#[derive(Clone, Debug)]
struct Snapshot {
    body: BodyId,
    state: BodyState,
    detector: Option<ForceDetector>,
}

struct Buffers {
    live: Trajectory,
    cache: Trajectory,
    /// Bumped on every reallocation; runs planned under an older
    /// generation are discarded at publish.
    generation: u64,
}

/// How a trajectory update will be produced.
enum Plan {
    /// Every step at one position, computed inline.
    Constant(Position),
    /// All-zero buffer, produced asynchronously.
    Blank,
    /// A simulation run.
    Simulate(SimRequest),
}

/// Predicted trajectory of one tracked body.
pub struct Predictor {
    id: BodyId,
    variant: Variant,
    snapshot: Mutex<Option<Snapshot>>,
    buffers: RwLock<Buffers>,
    busy: AtomicBool,
    memo: FrameMemo,
}

// Compile-time assertion: Predictor must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Predictor>();
};

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("step_count", &self.step_count())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl Predictor {
    pub(crate) fn body(id: BodyId) -> Self {
        Self::with_variant(id, Variant::Body)
    }

    pub(crate) fn marker(id: BodyId, category: MarkerCategory) -> Self {
        Self::with_variant(
            id,
            Variant::Marker {
                category,
                vehicle: Mutex::new(None),
            },
        )
    }

    fn with_variant(id: BodyId, variant: Variant) -> Self {
        let empty: Trajectory = Vec::new().into();
        Self {
            id,
            variant,
            snapshot: Mutex::new(None),
            buffers: RwLock::new(Buffers {
                live: Arc::clone(&empty),
                cache: empty,
                generation: 0,
            }),
            busy: AtomicBool::new(false),
            memo: FrameMemo::new(),
        }
    }

    // ── Read API ───────────────────────────────────────────────────

    /// The tracked body.
    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Body or marker, and the marker's category.
    pub fn kind(&self) -> PredictorKind {
        match &self.variant {
            Variant::Body => PredictorKind::Body,
            Variant::Marker { category, .. } => PredictorKind::Marker(*category),
        }
    }

    /// The physical body whose state drives this predictor: the boarded
    /// vehicle for a `player` marker inside one, otherwise its own body.
    pub fn physical_body(&self) -> BodyId {
        match &self.variant {
            Variant::Body => self.id,
            Variant::Marker { vehicle, .. } => {
                lock(vehicle).unwrap_or(self.id)
            }
        }
    }

    /// Number of positions in each buffer.
    pub fn step_count(&self) -> usize {
        self.read_buffers().live.len()
    }

    /// Whether an asynchronous run for this predictor is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// The frame this predictor last updated in.
    pub fn last_updated(&self) -> FrameId {
        self.memo.last()
    }

    /// Live predicted position at `step`.
    ///
    /// Negative steps clamp to step 0. Returns `None` past the horizon.
    pub fn future_position(&self, step: isize) -> Option<Position> {
        clamped(&self.read_buffers().live, step)
    }

    /// Committed predicted position at `step`, from the last frame that
    /// passed "end frame".
    ///
    /// Negative steps clamp to step 0. Returns `None` past the horizon.
    pub fn future_position_cached(&self, step: isize) -> Option<Position> {
        clamped(&self.read_buffers().cache, step)
    }

    /// Position captured at the last "begin frame", or the origin if the
    /// body has never been observed.
    pub fn current_position(&self) -> Position {
        lock(&self.snapshot)
            .as_ref()
            .map_or(ZERO, |snapshot| snapshot.state.position)
    }

    /// The live trajectory.
    pub fn trajectory(&self) -> Trajectory {
        Arc::clone(&self.read_buffers().live)
    }

    /// The committed trajectory.
    pub fn cached_trajectory(&self) -> Trajectory {
        Arc::clone(&self.read_buffers().cache)
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Re-target a vehicle-following marker. `None` returns it to its
    /// own body. Returns whether the predictor follows vehicles.
    pub(crate) fn board(&self, vehicle: Option<BodyId>) -> bool {
        match &self.variant {
            Variant::Marker { category, vehicle: slot } if category.follows_vehicle() => {
                *lock(slot) = vehicle;
                true
            }
            _ => false,
        }
    }

    /// Reallocate both buffers to `step_count` zeros and forget any
    /// in-flight state.
    ///
    /// Only called once no run is in flight; a run that somehow survives
    /// is discarded at publish by the generation check.
    pub(crate) fn apply_config(&self, step_count: usize) {
        let zeros: Trajectory = vec![ZERO; step_count].into();
        {
            let mut buffers = self.write_buffers();
            buffers.live = Arc::clone(&zeros);
            buffers.cache = zeros;
            buffers.generation += 1;
        }
        self.busy.store(false, Ordering::Release);
        self.memo.reset();
    }

    /// Copy the physical body's state and detector out of the scene.
    pub(crate) fn begin_frame(&self, scene: &dyn SceneAccess) {
        let body = self.physical_body();
        let mut snapshot = lock(&self.snapshot);
        match scene.body_state(body) {
            Some(state) => {
                *snapshot = Some(Snapshot {
                    body,
                    state,
                    detector: scene.force_detector(body),
                });
            }
            None => warn!(
                "predictor {}: body {body} missing from scene, keeping previous snapshot",
                self.id
            ),
        }
    }

    /// Commit the live trajectory to the cache.
    pub(crate) fn end_frame(&self) {
        let mut buffers = self.write_buffers();
        let live = Arc::clone(&buffers.live);
        buffers.cache = live;
    }

    // ── Update ─────────────────────────────────────────────────────

    /// Bring the live trajectory up to date for `ctx.frame`.
    ///
    /// A no-op if this frame was already claimed. Returns once the new
    /// trajectory is published, or once the run is queued when `ctx`
    /// dispatches asynchronously.
    pub(crate) fn update_trajectory(self: &Arc<Self>, ctx: &SimContext<'_>) {
        if !self.memo.claim(ctx.frame) {
            return;
        }
        let Some(snapshot) = lock(&self.snapshot).clone() else {
            debug!("predictor {}: no snapshot yet, skipping update", self.id);
            return;
        };
        let generation = self.read_buffers().generation;

        match self.plan(ctx, snapshot) {
            Plan::Constant(position) => {
                let steps = self.step_count();
                self.publish(generation, vec![position; steps]);
            }
            Plan::Blank => self.dispatch(ctx, generation, Work::Blank, None),
            Plan::Simulate(request) if ctx.dispatches_async() => {
                match ctx.shared.busy.try_admit(request.body) {
                    Some(admission) => {
                        self.dispatch(ctx, generation, Work::Simulate(request), Some(admission))
                    }
                    None => {
                        Counters::bump(&ctx.shared.counters.contention_rejections);
                        debug!(
                            "predictor {}: run for body {} already in flight, skipping",
                            self.id, request.body
                        );
                    }
                }
            }
            Plan::Simulate(request) => self.run(ctx, &request, generation),
        }
    }

    fn plan(&self, ctx: &SimContext<'_>, snapshot: Snapshot) -> Plan {
        let Snapshot { body, state, detector } = snapshot;
        match &self.variant {
            Variant::Body => match detector {
                None => Plan::Constant(state.position),
                Some(detector) => Plan::Simulate(SimRequest {
                    body,
                    start: state,
                    detector,
                    reference: None,
                    stop_on_collision: false,
                    predict_intersections: ctx.config.predict_intersections,
                }),
            },
            Variant::Marker { .. } => match detector {
                Some(detector) if !detector.is_empty() => {
                    Plan::Simulate(SimRequest {
                        body,
                        start: state,
                        detector,
                        reference: ctx.shared.reference_frame(),
                        stop_on_collision: true,
                        predict_intersections: ctx.config.predict_intersections,
                    })
                }
                _ if ctx.dispatches_async() => Plan::Blank,
                _ => Plan::Constant(state.position),
            },
        }
    }

    /// Run `request` on the calling thread and publish the result.
    pub(crate) fn run(&self, ctx: &SimContext<'_>, request: &SimRequest, generation: u64) {
        let mut out = vec![ZERO; self.step_count()];
        if let Some(step) = simulate(ctx, request, &mut out) {
            trace!("predictor {}: collision, truncated at step {step}", self.id);
        }
        if self.publish(generation, out) {
            Counters::bump(&ctx.shared.counters.simulations_run);
        }
    }

    /// Publish an all-zero trajectory.
    pub(crate) fn publish_blank(&self, generation: u64) {
        let steps = self.step_count();
        self.publish(generation, vec![ZERO; steps]);
    }

    /// Hand `work` to the pool, or run it inline if the pool cannot take it.
    fn dispatch(
        self: &Arc<Self>,
        ctx: &SimContext<'_>,
        generation: u64,
        work: Work,
        admission: Option<Admission>,
    ) {
        let task = SimTask {
            in_flight: InFlight::new(Arc::clone(self), Arc::clone(ctx.shared), admission),
            frame: ctx.frame,
            generation,
            work,
        };

        let Some(tx) = ctx.shared.task_sender() else {
            Counters::bump(&ctx.shared.counters.inline_fallbacks);
            task.execute(ctx.origin);
            return;
        };
        match tx.try_send(task) {
            Ok(()) => {
                Counters::bump(&ctx.shared.counters.runs_dispatched);
                trace!("predictor {}: dispatched frame {}", self.id, ctx.frame);
            }
            Err(TrySendError::Full(task)) | Err(TrySendError::Disconnected(task)) => {
                Counters::bump(&ctx.shared.counters.inline_fallbacks);
                debug!("predictor {}: task queue unavailable, running inline", self.id);
                task.execute(ctx.origin);
            }
        }
    }

    /// Swap in `positions` as the live trajectory.
    ///
    /// Returns `false`, leaving the buffers untouched, if the buffers were
    /// reallocated since the run was planned.
    fn publish(&self, generation: u64, positions: Vec<Position>) -> bool {
        let mut buffers = self.write_buffers();
        if buffers.generation != generation || buffers.live.len() != positions.len() {
            debug!(
                "predictor {}: discarding run planned for a previous configuration",
                self.id
            );
            return false;
        }
        buffers.live = positions.into();
        true
    }

    #[cfg(test)]
    pub(crate) fn busy_for_test(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
    }

    fn read_buffers(&self) -> RwLockReadGuard<'_, Buffers> {
        self.buffers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_buffers(&self) -> RwLockWriteGuard<'_, Buffers> {
        self.buffers.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Keeps a predictor marked busy, its body admitted, and the run counted
/// for the life of one dispatched run. Released on drop, including when
/// the run unwinds or the task is dropped unexecuted.
pub(crate) struct InFlight {
    predictor: Arc<Predictor>,
    shared: Arc<Shared>,
    admission: Option<Admission>,
}

impl InFlight {
    fn new(predictor: Arc<Predictor>, shared: Arc<Shared>, admission: Option<Admission>) -> Self {
        shared.begin_run();
        predictor.busy.store(true, Ordering::Release);
        Self {
            predictor,
            shared,
            admission,
        }
    }

    pub fn predictor(&self) -> &Arc<Predictor> {
        &self.predictor
    }

    pub fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        // Release the body before the flag, so a coordinator that sees
        // the predictor idle can immediately re-admit it.
        drop(self.admission.take());
        self.predictor.busy.store(false, Ordering::Release);
        self.shared.end_run();
    }
}

fn clamped(trajectory: &[Position], step: isize) -> Option<Position> {
    trajectory.get(step.max(0) as usize).copied()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PredictionConfig;
    use crate::context::{Origin, Shared};
    use foresight_core::{GravitySource, PowerLaw, SourceId};
    use foresight_test_utils::MockScene;
    use glam::Vec3;

    fn shared(config: PredictionConfig) -> Arc<Shared> {
        Arc::new(Shared::new(config))
    }

    fn frame_ctx(shared: &Arc<Shared>, origin: Origin) -> SimContext<'_> {
        SimContext::new(shared, shared.frames.advance(), origin)
    }

    #[test]
    fn negative_steps_clamp_and_overflow_is_none() {
        let predictor = Predictor::body(BodyId(1));
        predictor.apply_config(4);
        assert_eq!(predictor.future_position(-3), Some(ZERO));
        assert_eq!(predictor.future_position(3), Some(ZERO));
        assert_eq!(predictor.future_position(4), None);
        assert_eq!(predictor.future_position_cached(-1), Some(ZERO));
    }

    #[test]
    fn apply_config_reallocates_both_buffers() {
        let predictor = Predictor::body(BodyId(1));
        predictor.apply_config(10);
        assert_eq!(predictor.trajectory().len(), 10);
        assert_eq!(predictor.cached_trajectory().len(), 10);
        predictor.apply_config(3);
        assert_eq!(predictor.step_count(), 3);
        assert_eq!(predictor.cached_trajectory().len(), 3);
        assert!(!predictor.is_busy());
    }

    #[test]
    fn body_without_detector_is_constant() {
        let shared = shared(PredictionConfig::default());
        let predictor = Arc::new(Predictor::body(BodyId(1)));
        predictor.apply_config(5);
        let scene = MockScene::new().with_body(
            BodyId(1),
            BodyState::new(Vec3::new(3.0, 4.0, 5.0), Vec3::X),
        );
        predictor.begin_frame(&scene);
        predictor.update_trajectory(&frame_ctx(&shared, Origin::Coordinator));

        let here = predictor.current_position();
        assert_eq!(here, Vec3::new(3.0, 4.0, 5.0));
        for step in -1..5 {
            assert_eq!(predictor.future_position(step), Some(here));
        }
    }

    #[test]
    fn update_is_idempotent_within_a_frame() {
        let shared = shared(PredictionConfig::default());
        let predictor = Arc::new(Predictor::body(BodyId(1)));
        predictor.apply_config(3);
        let mut scene = MockScene::new().with_body(BodyId(1), BodyState::at_rest(Vec3::ONE));
        predictor.begin_frame(&scene);

        let ctx = frame_ctx(&shared, Origin::Coordinator);
        predictor.update_trajectory(&ctx);
        let first = predictor.trajectory();

        // The scene moves, but the same frame must not recompute.
        scene.set_state(BodyId(1), BodyState::at_rest(Vec3::splat(9.0)));
        predictor.begin_frame(&scene);
        predictor.update_trajectory(&ctx);
        assert!(Arc::ptr_eq(&first, &predictor.trajectory()));
        assert_eq!(predictor.last_updated(), ctx.frame);

        // The next frame does.
        predictor.update_trajectory(&frame_ctx(&shared, Origin::Coordinator));
        assert_eq!(predictor.future_position(0), Some(Vec3::splat(9.0)));
    }

    #[test]
    fn end_frame_commits_live_to_cache() {
        let shared = shared(PredictionConfig::default());
        let predictor = Arc::new(Predictor::body(BodyId(1)));
        predictor.apply_config(3);
        let scene = MockScene::new().with_body(BodyId(1), BodyState::at_rest(Vec3::Y));
        predictor.begin_frame(&scene);
        predictor.update_trajectory(&frame_ctx(&shared, Origin::Coordinator));

        assert_eq!(predictor.future_position_cached(0), Some(ZERO));
        predictor.end_frame();
        assert!(Arc::ptr_eq(&predictor.trajectory(), &predictor.cached_trajectory()));
        assert_eq!(predictor.future_position_cached(2), Some(Vec3::Y));
    }

    #[test]
    fn missing_body_keeps_previous_snapshot() {
        let predictor = Predictor::body(BodyId(1));
        let scene = MockScene::new().with_body(BodyId(1), BodyState::at_rest(Vec3::X));
        predictor.begin_frame(&scene);
        predictor.begin_frame(&MockScene::new());
        assert_eq!(predictor.current_position(), Vec3::X);
    }

    #[test]
    fn never_observed_body_is_not_updated() {
        let shared = shared(PredictionConfig::default());
        let predictor = Arc::new(Predictor::body(BodyId(1)));
        predictor.apply_config(2);
        predictor.begin_frame(&MockScene::new());
        predictor.update_trajectory(&frame_ctx(&shared, Origin::Coordinator));
        assert_eq!(predictor.current_position(), ZERO);
        assert_eq!(shared.counters.snapshot().simulations_run, 0);
    }

    #[test]
    fn marker_without_sources_sync_is_constant() {
        let shared = shared(PredictionConfig::default());
        let marker = Arc::new(Predictor::marker(BodyId(2), MarkerCategory::Probe));
        marker.apply_config(4);
        let scene = MockScene::new()
            .with_body(BodyId(2), BodyState::at_rest(Vec3::new(7.0, 0.0, 0.0)))
            .with_detector(BodyId(2), ForceDetector::default());
        marker.begin_frame(&scene);
        marker.update_trajectory(&frame_ctx(&shared, Origin::Coordinator));
        assert_eq!(marker.future_position(3), Some(Vec3::new(7.0, 0.0, 0.0)));
    }

    #[test]
    fn marker_without_sources_async_is_blank() {
        // No pool installed: the blank run executes inline, but through
        // the asynchronous path.
        let shared = shared(PredictionConfig {
            multithreading: true,
            ..Default::default()
        });
        let marker = Arc::new(Predictor::marker(BodyId(2), MarkerCategory::Probe));
        marker.apply_config(4);
        let scene = MockScene::new().with_body(BodyId(2), BodyState::at_rest(Vec3::new(7.0, 0.0, 0.0)));
        marker.begin_frame(&scene);
        marker.update_trajectory(&frame_ctx(&shared, Origin::Coordinator));

        assert!(marker.trajectory().iter().all(|p| *p == ZERO));
        assert!(!marker.is_busy());
        assert_eq!(shared.counters.snapshot().inline_fallbacks, 1);
    }

    #[test]
    fn player_marker_follows_vehicle() {
        let player = Predictor::marker(BodyId(2), MarkerCategory::Player);
        let probe = Predictor::marker(BodyId(3), MarkerCategory::Probe);
        assert!(player.board(Some(BodyId(9))));
        assert!(!probe.board(Some(BodyId(9))));
        assert_eq!(player.physical_body(), BodyId(9));
        assert_eq!(probe.physical_body(), BodyId(3));

        let scene = MockScene::new()
            .with_body(BodyId(2), BodyState::at_rest(Vec3::X))
            .with_body(BodyId(9), BodyState::at_rest(Vec3::Z));
        player.begin_frame(&scene);
        assert_eq!(player.current_position(), Vec3::Z);

        player.board(None);
        player.begin_frame(&scene);
        assert_eq!(player.current_position(), Vec3::X);
    }

    #[test]
    fn contention_completes_immediately() {
        let shared = shared(PredictionConfig {
            multithreading: true,
            ..Default::default()
        });
        let sun = Arc::new(Predictor::body(BodyId(1)));
        let ship = Arc::new(Predictor::body(BodyId(2)));
        shared
            .registry_mut()
            .insert(
                Arc::clone(&sun),
                Some(GravitySource::new(
                    SourceId(1),
                    BodyId(1),
                    1000.0,
                    1.0,
                    PowerLaw::linear(10.0),
                )),
            )
            .unwrap();
        for p in [&sun, &ship] {
            p.apply_config(4);
        }
        let scene = MockScene::new()
            .with_body(BodyId(1), BodyState::at_rest(ZERO))
            .with_body(BodyId(2), BodyState::at_rest(Vec3::new(50.0, 0.0, 0.0)))
            .with_detector(BodyId(2), ForceDetector::new([SourceId(1)]));
        sun.begin_frame(&scene);
        ship.begin_frame(&scene);

        let held = shared.busy.try_admit(BodyId(2)).unwrap();
        ship.update_trajectory(&frame_ctx(&shared, Origin::Coordinator));

        assert!(!ship.is_busy());
        let metrics = shared.counters.snapshot();
        assert_eq!(metrics.contention_rejections, 1);
        assert_eq!(metrics.runs_dispatched, 0);
        assert!(ship.trajectory().iter().all(|p| *p == ZERO));
        drop(held);
    }

    #[test]
    fn stale_generation_is_discarded() {
        let predictor = Predictor::body(BodyId(1));
        predictor.apply_config(2);
        let generation = predictor.read_buffers().generation;
        predictor.apply_config(2);
        assert!(!predictor.publish(generation, vec![Vec3::ONE; 2]));
        assert_eq!(predictor.future_position(1), Some(ZERO));
    }

    #[test]
    fn in_flight_guard_clears_busy() {
        let predictor = Arc::new(Predictor::body(BodyId(4)));
        let shared = shared(PredictionConfig::default());
        let guard = InFlight::new(
            Arc::clone(&predictor),
            Arc::clone(&shared),
            shared.busy.try_admit(BodyId(4)),
        );
        assert!(predictor.is_busy());
        assert!(shared.busy.contains(BodyId(4)));
        assert_eq!(shared.in_flight(), 1);
        drop(guard);
        assert!(!predictor.is_busy());
        assert!(shared.busy.is_empty());
        assert_eq!(shared.in_flight(), 0);
    }
}

//! The simulation engine.
//!
//! Two halves:
//!
//! - [`integrate`] is the pure stepwise integrator. It takes a start
//!   state, the trajectories of everything that pulls on the body, and a
//!   step mode, and fills a caller-owned buffer. No locks, no registry,
//!   no allocation inside the step loop.
//! - `simulate` (crate-private) resolves a request against the registry:
//!   it brings every dependency's trajectory up to date for the current
//!   frame (depth-first, memoized per predictor), gathers immutable
//!   snapshots of those trajectories, then calls [`integrate`].
//!
//! Dependencies form an implicit DAG. A cycle terminates because each
//! predictor claims the frame before resolving its own dependencies; the
//! side resolved later in a cycle reads the other side's previous-frame
//! trajectory.

use std::sync::Arc;

use foresight_core::{BodyId, BodyState, ForceDetector, GravitySource, Position, ZERO};
use glam::Vec3;
use smallvec::SmallVec;

use crate::context::SimContext;
use crate::predictor::Predictor;
use crate::registry::Registry;

/// An immutable predicted trajectory: `trajectory[i]` is the position at
/// step `i`, step 0 being the frame the prediction started from.
pub type Trajectory = Arc<[Position]>;

/// Position at `step`, or the last position if the trajectory is shorter.
fn position_at(trajectory: &[Position], step: usize) -> Option<Position> {
    trajectory.get(step).or_else(|| trajectory.last()).copied()
}

// ── Influences ─────────────────────────────────────────────────────

/// A gravity source paired with the predicted trajectory it follows.
#[derive(Clone, Debug)]
pub struct SourceTrack {
    /// Geometry and law of the source.
    pub source: GravitySource,
    /// Where the source will be at each step.
    pub trajectory: Trajectory,
}

impl SourceTrack {
    /// Pair `source` with `trajectory`.
    pub fn new(source: GravitySource, trajectory: Trajectory) -> Self {
        Self { source, trajectory }
    }

    /// A source that stays at `centre` for `steps` steps.
    pub fn stationary(source: GravitySource, centre: Position, steps: usize) -> Self {
        Self::new(source, vec![centre; steps.max(1)].into())
    }

    fn position_at(&self, step: usize) -> Option<Position> {
        position_at(&self.trajectory, step)
    }
}

/// The contribution of the frame a body is riding inside.
///
/// Evaluated at the carrier's predicted position, not the body's: a
/// ship inside a moon's field feels the planet's pull as the moon does.
#[derive(Clone, Debug)]
pub struct InheritedInfluence {
    /// Predicted trajectory of the carrier body.
    pub carrier: Trajectory,
    /// Sources acting on the carrier.
    pub sources: SmallVec<[SourceTrack; 4]>,
    /// Scalar applied to every inherited contribution.
    pub field_multiplier: f32,
}

/// Everything that accelerates a body over one simulation run.
#[derive(Clone, Debug)]
pub struct Influences {
    /// Sources acting on the body directly. In intersection mode this is
    /// every tracked source, filtered per step by trigger radius.
    pub sources: SmallVec<[SourceTrack; 4]>,
    /// Scalar applied to every direct contribution.
    pub field_multiplier: f32,
    /// Contribution inherited from a carrier, if any.
    pub inherited: Option<InheritedInfluence>,
}

impl Influences {
    /// No sources, a multiplier of 1.
    pub fn none() -> Self {
        Self {
            sources: SmallVec::new(),
            field_multiplier: 1.0,
            inherited: None,
        }
    }

    /// Direct influence of `sources` under `field_multiplier`.
    pub fn from_sources(
        sources: impl IntoIterator<Item = SourceTrack>,
        field_multiplier: f32,
    ) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            field_multiplier,
            inherited: None,
        }
    }

    /// Add an inherited contribution.
    pub fn with_inherited(mut self, inherited: InheritedInfluence) -> Self {
        self.inherited = Some(inherited);
        self
    }
}

// ── Integrator ─────────────────────────────────────────────────────

/// How one simulation run steps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepMode {
    /// Truncate the trajectory with zero sentinels after a collision.
    pub stop_on_collision: bool,
    /// Recompute the active sources at every step from trigger radii.
    pub predict_intersections: bool,
    /// Step at `tick_duration` resolution instead of one second.
    pub high_precision: bool,
    /// Physics tick in seconds. Only read in high-precision mode.
    pub tick_duration: f32,
}

impl Default for StepMode {
    fn default() -> Self {
        Self {
            stop_on_collision: false,
            predict_intersections: false,
            high_precision: false,
            tick_duration: crate::config::DEFAULT_TICK_DURATION,
        }
    }
}

/// Fill `out` with the trajectory starting at `start`.
///
/// `out[0]` is the start position. Each later step applies semi-implicit
/// Euler: the velocity takes the step's acceleration, then the position
/// takes the new velocity. In high-precision mode the start velocity is
/// scaled by the tick and accelerations by its square, so one step spans
/// one tick.
///
/// A collision is detected from the position before the step against
/// each source's previous-step position. The detecting step still
/// receives its integrated position; with `stop_on_collision` every step
/// after it is written as [`ZERO`]. Returns the index of the first
/// sentinel, if any.
pub fn integrate(
    start: BodyState,
    influences: &Influences,
    mode: StepMode,
    out: &mut [Position],
) -> Option<usize> {
    let first = out.first_mut()?;
    *first = start.position;

    let (mut velocity, accel_scale) = if mode.high_precision {
        let dt = mode.tick_duration;
        (start.velocity * dt, dt * dt)
    } else {
        (start.velocity, 1.0)
    };
    let mut position = start.position;
    let mut collided = false;
    let mut truncated_at = None;
    let mut active: SmallVec<[usize; 8]> = SmallVec::new();

    for step in 1..out.len() {
        if collided && mode.stop_on_collision {
            truncated_at.get_or_insert(step);
            out[step] = ZERO;
            continue;
        }

        let mut acceleration = if mode.predict_intersections {
            active.clear();
            active.extend(
                influences
                    .sources
                    .iter()
                    .enumerate()
                    .filter(|(_, track)| {
                        track.position_at(step).is_some_and(|centre| {
                            position.distance(centre) < track.source.trigger_radius
                        })
                    })
                    .map(|(i, _)| i),
            );
            accumulate(
                active.iter().map(|&i| &influences.sources[i]),
                position,
                step,
                influences.field_multiplier,
                Some(&mut collided),
            )
        } else {
            accumulate(
                &influences.sources,
                position,
                step,
                influences.field_multiplier,
                Some(&mut collided),
            )
        };

        if let Some(inherited) = &influences.inherited {
            if let Some(carrier) = position_at(&inherited.carrier, step) {
                acceleration += accumulate(
                    &inherited.sources,
                    carrier,
                    step,
                    inherited.field_multiplier,
                    None,
                );
            }
        }

        velocity += acceleration * accel_scale;
        position += velocity;
        out[step] = position;
    }

    truncated_at
}

/// Sum of the pulls of `tracks` on `point` at `step`.
///
/// Sources without a trajectory contribute nothing. When `collision` is
/// given, it is raised if `point` lies inside a source's surface at the
/// previous step.
fn accumulate<'a>(
    tracks: impl IntoIterator<Item = &'a SourceTrack>,
    point: Position,
    step: usize,
    field_multiplier: f32,
    mut collision: Option<&mut bool>,
) -> Vec3 {
    let mut acceleration = Vec3::ZERO;
    for track in tracks {
        let Some(centre) = track.position_at(step) else {
            continue;
        };
        if let Some(flag) = collision.as_deref_mut() {
            if let Some(previous) = track.position_at(step - 1) {
                if point.distance(previous) < track.source.surface_radius {
                    *flag = true;
                }
            }
        }
        acceleration += track.source.acceleration_at(centre, point) * field_multiplier;
    }
    acceleration
}

// ── Request resolution ─────────────────────────────────────────────

/// One simulation run, as planned by a predictor from its frame snapshot.
#[derive(Clone, Debug)]
pub(crate) struct SimRequest {
    /// The physical body being simulated. Keys the busy-set.
    pub body: BodyId,
    pub start: BodyState,
    pub detector: ForceDetector,
    /// Brought up to date before the run; frames the prediction.
    pub reference: Option<BodyId>,
    pub stop_on_collision: bool,
    pub predict_intersections: bool,
}

/// Resolve dependencies, gather influences, and integrate into `out`.
pub(crate) fn simulate(
    ctx: &SimContext<'_>,
    request: &SimRequest,
    out: &mut [Position],
) -> Option<usize> {
    let deps = dependencies(&ctx.shared.registry(), request);
    for dependency in deps {
        dependency.update_trajectory(ctx);
    }
    let influences = gather_influences(&ctx.shared.registry(), request);
    let mode = ctx.step_mode(request.stop_on_collision, request.predict_intersections);
    integrate(request.start, &influences, mode, out)
}

/// Predictors whose trajectories `request` reads, in resolution order.
///
/// Collected under the registry read guard and returned owned, so the
/// guard is released before any recursive update runs.
fn dependencies(registry: &Registry, request: &SimRequest) -> SmallVec<[Arc<Predictor>; 8]> {
    let mut deps: SmallVec<[Arc<Predictor>; 8]> = SmallVec::new();
    if let Some(reference) = request.reference {
        deps.extend(registry.predictor(reference).cloned());
    }
    if request.predict_intersections {
        deps.extend(
            registry
                .sources()
                .filter(|entry| entry.source.body != request.body)
                .map(|entry| Arc::clone(&entry.predictor)),
        );
    } else {
        deps.extend(
            request
                .detector
                .active_sources
                .iter()
                .filter_map(|id| registry.source_predictor(*id))
                .cloned(),
        );
    }
    if let Some(inherited) = &request.detector.inherited {
        deps.extend(registry.predictor(inherited.carrier).cloned());
        deps.extend(
            inherited
                .active_sources
                .iter()
                .filter_map(|id| registry.source_predictor(*id))
                .cloned(),
        );
    }
    deps
}

/// Snapshot the trajectories `request` integrates against.
///
/// Unknown source and carrier ids are skipped. In intersection mode a
/// body never pulls on itself.
fn gather_influences(registry: &Registry, request: &SimRequest) -> Influences {
    let track = |entry: &crate::registry::SourceEntry| {
        SourceTrack::new(entry.source.clone(), entry.predictor.trajectory())
    };
    let detector = &request.detector;

    let sources = if request.predict_intersections {
        registry
            .sources()
            .filter(|entry| entry.source.body != request.body)
            .map(track)
            .collect()
    } else {
        detector
            .active_sources
            .iter()
            .filter_map(|id| registry.source(*id))
            .map(track)
            .collect()
    };

    let inherited = detector.inherited.as_ref().and_then(|inherited| {
        let carrier = registry.predictor(inherited.carrier)?.trajectory();
        Some(InheritedInfluence {
            carrier,
            sources: inherited
                .active_sources
                .iter()
                .filter_map(|id| registry.source(*id))
                .map(track)
                .collect(),
            field_multiplier: inherited.field_multiplier,
        })
    });

    Influences {
        sources,
        field_multiplier: detector.field_multiplier,
        inherited,
    }
}

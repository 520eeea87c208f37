//! Marker predictors: collision truncation, reference frames, vehicle
//! events, and the sourceless fallbacks.

use std::time::{Duration, Instant};

use foresight_core::{BodyId, BodyState, ForceDetector, GravitySource, SourceId, ZERO};
use foresight_engine::{
    MarkerCategory, PredictionConfig, PredictionWorld, PredictorKind, SpawnError, TickOutcome,
    TrackedBody,
};
use foresight_test_utils::fixtures::constant_pull;
use foresight_test_utils::MockScene;
use glam::Vec3;

const SUN: BodyId = BodyId(1);
const PROBE: BodyId = BodyId(2);

fn marker(id: BodyId, category: &str) -> TrackedBody {
    TrackedBody::Marker {
        id,
        category: category.into(),
    }
}

fn sun() -> GravitySource {
    GravitySource::new(SourceId(1), SUN, 1_000.0, 95.0, constant_pull(2.0))
}

fn falling_probe_scene() -> MockScene {
    MockScene::new()
        .with_body(SUN, BodyState::at_rest(ZERO))
        .with_body(PROBE, BodyState::at_rest(Vec3::new(100.0, 0.0, 0.0)))
        .with_detector(PROBE, ForceDetector::new([SourceId(1)]))
}

fn config(seconds: f32) -> PredictionConfig {
    PredictionConfig {
        seconds_to_predict: seconds,
        ..Default::default()
    }
}

#[test]
fn marker_trajectory_stops_at_collision() {
    let mut world = PredictionWorld::new(config(8.0)).unwrap();
    world.on_body_spawned(TrackedBody::Source(sun())).unwrap();
    let probe = world.on_body_spawned(marker(PROBE, "probe")).unwrap();
    world.tick(&falling_probe_scene()).unwrap();

    // 100 → 98 → 94 → 88 (step 3 starts inside the surface) → sentinels.
    assert_eq!(probe.future_position_cached(2), Some(Vec3::new(94.0, 0.0, 0.0)));
    assert_eq!(probe.future_position_cached(3), Some(Vec3::new(88.0, 0.0, 0.0)));
    for step in 4..8 {
        assert_eq!(probe.future_position_cached(step), Some(ZERO));
    }
}

#[test]
fn body_trajectory_passes_through_surface() {
    let mut world = PredictionWorld::new(config(8.0)).unwrap();
    world.on_body_spawned(TrackedBody::Source(sun())).unwrap();
    let body = world.on_body_spawned(TrackedBody::Body(PROBE)).unwrap();
    world.tick(&falling_probe_scene()).unwrap();

    assert_eq!(body.future_position(4), Some(Vec3::new(80.0, 0.0, 0.0)));
    assert!((4..8).all(|step| body.future_position(step) != Some(ZERO)));
}

#[test]
fn sourceless_marker_holds_position_synchronously() {
    let mut world = PredictionWorld::new(config(6.0)).unwrap();
    let probe = world.on_body_spawned(marker(PROBE, "probe")).unwrap();
    let scene = MockScene::new().with_body(PROBE, BodyState::new(Vec3::X, Vec3::Y));
    world.tick(&scene).unwrap();

    for step in 0..6 {
        assert_eq!(probe.future_position_cached(step), Some(Vec3::X));
    }
}

#[test]
fn sourceless_marker_is_blank_when_threaded() {
    let mut world = PredictionWorld::new(PredictionConfig {
        multithreading: true,
        worker_count: Some(1),
        ..config(6.0)
    })
    .unwrap();
    let probe = world.on_body_spawned(marker(PROBE, "probe")).unwrap();
    let scene = MockScene::new()
        .with_body(PROBE, BodyState::new(Vec3::X, Vec3::Y))
        .with_detector(PROBE, ForceDetector::default());

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut begun = 0;
    while begun < 2 {
        if world.tick(&scene).unwrap() == TickOutcome::Advanced {
            begun += 1;
        }
        assert!(Instant::now() < deadline);
    }
    assert!(probe.cached_trajectory().iter().all(|p| *p == ZERO));
    assert_eq!(probe.current_position(), Vec3::X);
}

#[test]
fn reference_frame_is_resolved_before_marker() {
    let mut world = PredictionWorld::new(config(4.0)).unwrap();
    world.on_body_spawned(TrackedBody::Source(sun())).unwrap();
    let probe = world.on_body_spawned(marker(PROBE, "probe")).unwrap();
    let station = world.on_body_spawned(TrackedBody::Body(BodyId(8))).unwrap();
    world.set_reference_frame(Some(BodyId(8)));
    assert_eq!(world.reference_frame(), Some(BodyId(8)));

    let scene = falling_probe_scene().with_body(BodyId(8), BodyState::at_rest(Vec3::Y));
    let frame = world.on_begin_frame(&scene);
    assert!(probe.update_trajectory());

    assert_eq!(station.last_updated(), frame);
    assert_eq!(station.future_position(3), Some(Vec3::Y));
    assert!(world.on_end_frame());
}

#[test]
fn player_marker_rides_vehicle() {
    let player_body = BodyId(20);
    let ship_body = BodyId(21);
    let mut world = PredictionWorld::new(config(4.0)).unwrap();
    let player = world.on_body_spawned(marker(player_body, "player")).unwrap();
    let ship_marker = world.on_body_spawned(marker(BodyId(22), "ship")).unwrap();
    assert_eq!(player.kind(), PredictorKind::Marker(MarkerCategory::Player));

    let scene = MockScene::new()
        .with_body(player_body, BodyState::at_rest(Vec3::X))
        .with_body(ship_body, BodyState::at_rest(Vec3::Z))
        .with_body(BodyId(22), BodyState::at_rest(Vec3::Y));

    world.on_vehicle_entered(ship_body);
    world.tick(&scene).unwrap();
    assert_eq!(player.future_position_cached(0), Some(Vec3::Z));
    assert_eq!(ship_marker.physical_body(), BodyId(22));

    world.on_vehicle_exited();
    world.tick(&scene).unwrap();
    assert_eq!(player.future_position_cached(0), Some(Vec3::X));
}

#[test]
fn unknown_category_is_not_registered() {
    let mut world = PredictionWorld::new(config(4.0)).unwrap();
    let err = world.on_body_spawned(marker(PROBE, "asteroid")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot track body: unrecognized predictor category 'asteroid'"
    );
    assert!(matches!(err, SpawnError::Config(_)));
    assert!(world.trajectory_for_body(PROBE).is_none());
}

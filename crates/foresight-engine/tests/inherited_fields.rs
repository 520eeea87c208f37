//! Inherited force fields resolved through the world: the carrier is a
//! dependency, and its field is evaluated along the carrier's trajectory.

use std::time::{Duration, Instant};

use foresight_core::{BodyId, BodyState, ForceDetector, GravitySource, InheritedDetector, SourceId, ZERO};
use foresight_engine::{PredictionConfig, PredictionWorld, TickOutcome, TrackedBody};
use foresight_test_utils::fixtures::constant_pull;
use foresight_test_utils::MockScene;
use glam::Vec3;

const SUN: BodyId = BodyId(1);
const MOON: BodyId = BodyId(3);
const SHIP: BodyId = BodyId(5);

fn config(multithreading: bool) -> PredictionConfig {
    PredictionConfig {
        seconds_to_predict: 4.0,
        multithreading,
        worker_count: Some(2),
        ..Default::default()
    }
}

/// Sun at the origin pulling with a constant 2; the moon falls from x=100;
/// the ship rides the moon and feels half the sun's pull on the moon.
fn scene(carrier: BodyId) -> MockScene {
    MockScene::new()
        .with_body(SUN, BodyState::at_rest(ZERO))
        .with_body(MOON, BodyState::at_rest(Vec3::new(100.0, 0.0, 0.0)))
        .with_detector(MOON, ForceDetector::new([SourceId(1)]))
        .with_body(SHIP, BodyState::at_rest(Vec3::new(0.0, 50.0, 0.0)))
        .with_detector(
            SHIP,
            ForceDetector::default()
                .with_inherited(InheritedDetector::new(carrier, [SourceId(1)]).with_multiplier(0.5)),
        )
}

/// The ship first, the moon last: resolution must not depend on order.
fn world(multithreading: bool) -> PredictionWorld {
    let mut world = PredictionWorld::new(config(multithreading)).unwrap();
    world.on_body_spawned(TrackedBody::Body(SHIP)).unwrap();
    world
        .on_body_spawned(TrackedBody::Source(GravitySource::new(
            SourceId(1),
            SUN,
            10_000.0,
            1.0,
            constant_pull(2.0),
        )))
        .unwrap();
    world.on_body_spawned(TrackedBody::Body(MOON)).unwrap();
    world
}

fn expected_ship() -> Vec<Vec3> {
    vec![
        Vec3::new(0.0, 50.0, 0.0),
        Vec3::new(-1.0, 50.0, 0.0),
        Vec3::new(-3.0, 50.0, 0.0),
        Vec3::new(-6.0, 50.0, 0.0),
    ]
}

#[test]
fn carrier_registered_later_is_resolved_first() {
    let mut world = world(false);
    let scene = scene(MOON);
    let frame = world.on_begin_frame(&scene);
    let ship = world.trajectory_for_body(SHIP).unwrap();
    assert!(ship.update_trajectory());

    let moon = world.trajectory_for_body(MOON).unwrap();
    assert_eq!(moon.last_updated(), frame);
    assert_eq!(
        moon.trajectory().to_vec(),
        vec![
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::new(98.0, 0.0, 0.0),
            Vec3::new(94.0, 0.0, 0.0),
            Vec3::new(88.0, 0.0, 0.0),
        ]
    );
    assert!(world.on_end_frame());
}

#[test]
fn ship_follows_pull_evaluated_at_carrier() {
    let mut world = world(false);
    world.tick(&scene(MOON)).unwrap();

    let ship = world.trajectory_for_body(SHIP).unwrap();
    assert_eq!(ship.cached_trajectory().to_vec(), expected_ship());
}

#[test]
fn threaded_inherited_field_matches_synchronous() {
    let mut world = world(true);
    let scene = scene(MOON);
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut begun = 0;
    while begun < 2 {
        if world.tick(&scene).unwrap() == TickOutcome::Advanced {
            begun += 1;
        }
        assert!(Instant::now() < deadline, "barrier never opened");
    }

    // Frame 1 is committed; workers resolve their dependencies inline.
    let ship = world.trajectory_for_body(SHIP).unwrap();
    assert_eq!(ship.cached_trajectory().to_vec(), expected_ship());
}

#[test]
fn unknown_carrier_is_ignored() {
    let mut world = world(false);
    world.tick(&scene(BodyId(99))).unwrap();

    let ship = world.trajectory_for_body(SHIP).unwrap();
    assert!(ship.cached_trajectory().iter().all(|p| *p == Vec3::new(0.0, 50.0, 0.0)));
}

//! End-to-end prediction loop example.
//!
//! Demonstrates: build profile → PredictionWorld → tick → read committed
//! trajectories → reconfigure → tick again. Run with `RUST_LOG=debug` to
//! see scheduling decisions.

use foresight_bench::{reference_profile, PLAYER, SUN_SOURCE};
use foresight_engine::{ConfigChange, PredictionConfig, TickOutcome};
use log::info;

fn main() {
    env_logger::init();
    println!("=== Foresight Orbit Demo ===\n");

    let profile = reference_profile(PredictionConfig {
        seconds_to_predict: 30.0,
        multithreading: true,
        ..Default::default()
    });
    let mut world = profile.build().unwrap();
    world.set_reference_frame(Some(foresight_bench::SUN));

    // --- Threaded: each frame commits when the next one begins ---
    let mut advanced = 0;
    while advanced < 3 {
        if world.tick(&profile.scene).unwrap() == TickOutcome::Advanced {
            advanced += 1;
        }
    }

    let player = world.trajectory_for_body(PLAYER).unwrap();
    println!("Player trajectory ({} steps):", player.step_count());
    for step in (0..player.step_count() as isize).step_by(5) {
        println!("  t+{step:>3}s  {:?}", player.future_position_cached(step));
    }
    let sun = world.trajectory_for_source(SUN_SOURCE).unwrap();
    println!("Sun stays at {:?}", sun.future_position_cached(0));

    // --- Reconfigure to high precision ---
    let change = world
        .on_config_changed(PredictionConfig {
            seconds_to_predict: 5.0,
            high_precision: true,
            multithreading: true,
            ..Default::default()
        })
        .unwrap();
    info!("reconfiguration: {change:?}");
    if change == ConfigChange::Deferred {
        println!("Runs in flight; reconfiguration deferred to the next open barrier");
    }
    while world.tick(&profile.scene).unwrap() == TickOutcome::Pending {}
    while world.tick(&profile.scene).unwrap() == TickOutcome::Pending {}

    println!(
        "\nHigh precision: {} steps, player at t+1 tick = {:?}",
        player.step_count(),
        player.future_position_cached(1)
    );
    println!("\nMetrics: {:#?}", world.metrics());
}

//! Criterion benchmarks for the bare integrator.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use foresight_core::{BodyId, BodyState, GravitySource, PowerLaw, Position, SourceId};
use foresight_engine::{integrate, Influences, SourceTrack, StepMode};
use glam::Vec3;

const STEPS: usize = 3_000;

fn ring_of_sources(n: u32) -> Influences {
    let tracks = (0..n).map(|i| {
        let angle = std::f32::consts::TAU * i as f32 / n as f32;
        let centre = Vec3::new(angle.cos(), 0.0, angle.sin()) * 1_000.0;
        let source = GravitySource::new(
            SourceId(i),
            BodyId(i),
            400.0,
            10.0,
            PowerLaw::inverse_square(50_000.0),
        );
        SourceTrack::stationary(source, centre, STEPS)
    });
    Influences::from_sources(tracks, 1.0)
}

fn start() -> BodyState {
    BodyState::new(Vec3::new(0.0, 50.0, 0.0), Vec3::new(3.0, 0.0, 1.0))
}

fn bench_fixed_sources(c: &mut Criterion) {
    let influences = ring_of_sources(4);
    let mut out = vec![Position::ZERO; STEPS];
    c.bench_function("integrate_3k_steps_4_sources", |b| {
        b.iter(|| {
            integrate(start(), &influences, StepMode::default(), &mut out);
            black_box(&out);
        });
    });
}

fn bench_intersections(c: &mut Criterion) {
    let influences = ring_of_sources(32);
    let mode = StepMode {
        predict_intersections: true,
        ..Default::default()
    };
    let mut out = vec![Position::ZERO; STEPS];
    c.bench_function("integrate_3k_steps_32_sources_intersections", |b| {
        b.iter(|| {
            integrate(start(), &influences, mode, &mut out);
            black_box(&out);
        });
    });
}

criterion_group!(benches, bench_fixed_sources, bench_intersections);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use plant_emulator::config::SimParams;
use plant_emulator::controller::PIDController;
use plant_emulator::disturbance::DisturbanceGenerator;
use plant_emulator::protocol;
use plant_emulator::sim::{Simulation, DT};

fn benchmark_pid_update(c: &mut Criterion) {
    let mut pid = PIDController::new(1.5, 1.5, 0.01);
    c.bench_function("pid_update", |b| {
        b.iter(|| pid.update(black_box(1.0), black_box(0.8), DT))
    });
}

fn benchmark_disturbance_apply(c: &mut Criterion) {
    let params = SimParams::default();
    let mut gen = DisturbanceGenerator::new(42);
    c.bench_function("disturbance_apply", |b| {
        b.iter(|| gen.apply(black_box(1.0), &params, DT))
    });
}

fn benchmark_full_tick(c: &mut Criterion) {
    let params = SimParams::default();
    let mut sim = Simulation::new(42);
    c.bench_function("simulation_tick", |b| {
        b.iter(|| sim.tick(&params, black_box(1.0)))
    });
}

fn benchmark_sample_encode(c: &mut Criterion) {
    c.bench_function("sample_encode", |b| {
        b.iter(|| protocol::encode_sample(black_box(123_456), black_box(1.25)))
    });
}

criterion_group!(
    benches,
    benchmark_pid_update,
    benchmark_disturbance_apply,
    benchmark_full_tick,
    benchmark_sample_encode
);
criterion_main!(benches);

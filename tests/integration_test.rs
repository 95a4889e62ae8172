//! Integration tests for the plant emulator core: controller, plant,
//! disturbances, and the shared state between the loop and the front end

use plant_emulator::{
    spawn_simulation_thread, EventLog, SharedState, SimParams, Simulation, TimingMetrics,
};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

fn clean_params() -> SimParams {
    SimParams {
        noise_enabled: false,
        outlier_enabled: false,
        ..SimParams::default()
    }
}

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

// ============================================================================
// CONTROLLER + PLANT TESTS
// ============================================================================

#[test]
fn test_pid_converges_on_setpoint() {
    let params = clean_params();
    let mut sim = Simulation::new(42);

    for _ in 0..2000 {
        sim.tick(&params, 2.0);
    }

    let final_error = (sim.true_value() - 2.0).abs();
    assert!(final_error < 0.01, "PID should settle near the setpoint, error {final_error}");
}

#[test]
fn test_pid_recovers_after_setpoint_reversal() {
    let params = clean_params();
    let mut sim = Simulation::new(42);

    // Drive up to 2.0, then command a drop back to 0.5
    for _ in 0..1000 {
        sim.tick(&params, 2.0);
    }
    for _ in 0..2000 {
        sim.tick(&params, 0.5);
    }

    let final_error = (sim.true_value() - 0.5).abs();
    assert!(final_error < 0.01, "PID should correct the reversal, error {final_error}");
}

#[test]
fn test_gain_hot_swap_keeps_history() {
    let mut soft = clean_params();
    soft.kp = 0.5;
    soft.ki = 0.2;

    let stiff = clean_params();
    let mut sim = Simulation::new(42);

    // Soft gains make partial progress, then the stiff defaults take over
    for _ in 0..500 {
        sim.tick(&soft, 1.0);
    }
    let partial = sim.true_value();
    assert!(partial > 0.0 && partial < 1.0, "soft gains should leave the plant en route");

    for _ in 0..2000 {
        sim.tick(&stiff, 1.0);
    }

    let final_error = (sim.true_value() - 1.0).abs();
    assert!(final_error < 0.01, "loop should stay stable across a gain swap, error {final_error}");
}

// ============================================================================
// LOOP THREAD + SHARED STATE TESTS
// ============================================================================

#[test]
fn test_loop_publishes_state_and_honors_shutdown() {
    let state = SharedState::new(clean_params());
    let events = EventLog::new(64);
    let metrics = TimingMetrics::new();
    let (handle, stats) = spawn_simulation_thread(state.clone(), events, metrics, None, 1);

    state.set_setpoint(1.0);
    wait_until("the plant to move", || state.snapshot().true_value > 0.1);

    stats.shutdown.store(true, Ordering::Relaxed);
    handle.join().expect("loop thread should exit cleanly");

    assert!(stats.ticks.load(Ordering::Relaxed) > 0, "loop should have ticked");
}

#[test]
fn test_noise_toggle_applies_after_wholesale_push() {
    let mut noisy = clean_params();
    noisy.noise_enabled = true;
    noisy.noise_amplitude = 1.2;

    let state = SharedState::new(noisy);
    let events = EventLog::new(64);
    let metrics = TimingMetrics::new();
    let (handle, stats) = spawn_simulation_thread(state.clone(), events, metrics, None, 7);

    wait_until("noise on the signal", || {
        let snap = state.snapshot();
        snap.noisy_value != snap.true_value
    });

    state.update_params(clean_params());
    wait_until("a clean signal", || {
        let snap = state.snapshot();
        snap.noisy_value == snap.true_value
    });

    stats.shutdown.store(true, Ordering::Relaxed);
    handle.join().expect("loop thread should exit cleanly");
}

#[test]
fn test_outlier_flag_reaches_the_snapshot() {
    let mut params = clean_params();
    params.outlier_enabled = true;
    params.outlier_frequency = 200.0;
    params.outlier_max_duration = 0.5;

    let state = SharedState::new(params);
    let events = EventLog::new(64);
    let metrics = TimingMetrics::new();
    let (handle, stats) =
        spawn_simulation_thread(state.clone(), events.clone(), metrics, None, 3);

    wait_until("an outlier to start", || state.snapshot().outlier_active);

    stats.shutdown.store(true, Ordering::Relaxed);
    handle.join().expect("loop thread should exit cleanly");

    let lines = events.drain();
    assert!(
        lines.iter().any(|line| line.contains("outlier started")),
        "expected an outlier observation, got {lines:?}"
    );
}

// ============================================================================
// DETERMINISM TESTS
// ============================================================================

#[test]
fn test_identical_seeds_identical_trajectories() {
    let params = SimParams::default();
    let mut a = Simulation::new(1234);
    let mut b = Simulation::new(1234);

    for _ in 0..1000 {
        let (out_a, out_b) = (a.tick(&params, 1.5), b.tick(&params, 1.5));
        assert_eq!(out_a.true_value, out_b.true_value);
        assert_eq!(out_a.noisy_value, out_b.noisy_value);
        assert_eq!(out_a.outlier_active, out_b.outlier_active);
    }
}

#[test]
fn test_different_seeds_diverge_in_noise() {
    let params = SimParams::default();
    let mut a = Simulation::new(1);
    let mut b = Simulation::new(2);

    let mut diverged = false;
    for _ in 0..100 {
        if a.tick(&params, 1.5).noisy_value != b.tick(&params, 1.5).noisy_value {
            diverged = true;
        }
    }

    assert!(diverged, "different seeds should produce different noise");
}

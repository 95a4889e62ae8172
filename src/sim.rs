use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::warn;

use crate::config::SimParams;
use crate::controller::PIDController;
use crate::disturbance::DisturbanceGenerator;
use crate::metrics::TimingMetrics;
use crate::net::telemetry::TelemetrySender;
use crate::state::{EventLog, SharedState};

// Logical integration step. Fixed at 10 ms no matter how long a tick really
// took; the telemetry cadence below runs on the wall clock instead, and the
// two clocks drift apart freely.
pub const DT: f64 = 0.010;
pub const TICK: Duration = Duration::from_millis(10);

// The controlled plant: a bare integrator. Correction in, value out.
#[derive(Debug, Default)]
pub struct FirstOrderPlant {
    value: f64,
}

impl FirstOrderPlant {
    pub fn integrate(&mut self, correction: f64, dt: f64) {
        self.value += correction * dt;
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

// What one tick produced.
#[derive(Debug, Clone, Copy)]
pub struct TickOutput {
    pub true_value: f64,
    pub noisy_value: f64,
    pub outlier_active: bool,
}

// The per-tick state machine with no I/O or timing attached: controller,
// plant, disturbance layer. The thread wrapper below owns the clocks and the
// telemetry socket.
pub struct Simulation {
    pid: PIDController,
    plant: FirstOrderPlant,
    disturbance: DisturbanceGenerator,
}

impl Simulation {
    pub fn new(seed: u64) -> Self {
        Self {
            pid: PIDController::new(0.0, 0.0, 0.0),
            plant: FirstOrderPlant::default(),
            disturbance: DisturbanceGenerator::new(seed),
        }
    }

    // One fixed-dt step: snapshot gains take effect here, the PID correction
    // is integrated into the plant, then disturbances go on top of the
    // result.
    pub fn tick(&mut self, params: &SimParams, setpoint: f64) -> TickOutput {
        self.pid.set_gains(params.kp, params.ki, params.kd);
        let correction = self.pid.update(setpoint, self.plant.value(), DT);
        self.plant.integrate(correction, DT);

        let (noisy_value, outlier_active) =
            self.disturbance.apply(self.plant.value(), params, DT);

        TickOutput {
            true_value: self.plant.value(),
            noisy_value,
            outlier_active,
        }
    }

    pub fn true_value(&self) -> f64 {
        self.plant.value()
    }

    pub fn outlier_details(&self) -> Option<(f64, f64)> {
        self.disturbance.active_outlier()
    }
}

pub struct SimStats {
    pub ticks: AtomicU64,
    pub samples_sent: AtomicU64,
    pub samples_suppressed: AtomicU64,
    pub send_failures: AtomicU64,
    pub shutdown: AtomicBool,
}

impl SimStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ticks: AtomicU64::new(0),
            samples_sent: AtomicU64::new(0),
            samples_suppressed: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        })
    }
}

// Runs the control loop at ~100 Hz until the shutdown flag is raised. The
// telemetry socket is owned by this thread for its whole life; None means
// the loop runs dark, with no telemetry.
pub fn spawn_simulation_thread(
    state: SharedState,
    events: EventLog,
    metrics: TimingMetrics,
    mut sender: Option<TelemetrySender>,
    seed: u64,
) -> (thread::JoinHandle<()>, Arc<SimStats>) {
    let stats = SimStats::new();
    let stats_clone = stats.clone();

    let handle = thread::spawn(move || {
        let mut sim = Simulation::new(seed);
        let loop_start = Instant::now();
        let mut last_send = Instant::now();
        let mut prev_cycle: Option<Instant> = None;
        let mut outlier_was_active = false;

        loop {
            if stats_clone.shutdown.load(Ordering::Relaxed) {
                break;
            }
            let cycle_start = Instant::now();
            if let Some(prev) = prev_cycle {
                metrics.record_period(cycle_start - prev);
            }
            prev_cycle = Some(cycle_start);

            // 1. Snapshot the tunables and setpoint in one critical section
            let (params, setpoint) = state.control_inputs();

            // 2. Advance the plant one logical step
            let out = sim.tick(&params, setpoint);

            // 3. Publish the results for the front-end and the status path
            state.publish(out.true_value, out.noisy_value, out.outlier_active);

            if out.outlier_active && !outlier_was_active {
                if let Some((magnitude, remaining)) = sim.outlier_details() {
                    events.push(format!(
                        "[SIM] outlier started: magnitude {:+.3}, {:.0} ms left",
                        magnitude,
                        remaining * 1000.0
                    ));
                }
            }
            outlier_was_active = out.outlier_active;

            // 4. Telemetry on its own wall-clock cadence, decoupled from dt
            if last_send.elapsed().as_secs_f64() >= params.send_period {
                if let Some(sender) = &mut sender {
                    let timestamp_ms = loop_start.elapsed().as_millis() as u32;
                    let send_start = Instant::now();
                    match sender.send(params.send_addr, timestamp_ms, out.noisy_value as f32) {
                        Ok(()) => {
                            // The sender holds the authoritative sent/suppressed split
                            stats_clone
                                .samples_sent
                                .store(sender.sent(), Ordering::Relaxed);
                            stats_clone
                                .samples_suppressed
                                .store(sender.suppressed(), Ordering::Relaxed);
                        }
                        Err(e) => {
                            stats_clone.send_failures.fetch_add(1, Ordering::Relaxed);
                            warn!("{e}");
                        }
                    }
                    metrics.record_send(send_start.elapsed());
                }
                last_send = Instant::now();
            }

            metrics.record_tick(cycle_start.elapsed());
            stats_clone.ticks.fetch_add(1, Ordering::Relaxed);

            // Sleep out the rest of the tick
            let elapsed = cycle_start.elapsed();
            if elapsed < TICK {
                thread::sleep(TICK - elapsed);
            }
        }
    });

    (handle, stats)
}

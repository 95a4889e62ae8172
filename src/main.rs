use std::sync::atomic::Ordering;
use std::time::{Duration, Instant, SystemTime};

use log::{info, warn};

use plant_emulator::config::{self, SimParams};
use plant_emulator::metrics::TimingMetrics;
use plant_emulator::net::command::spawn_receiver_thread;
use plant_emulator::net::telemetry::TelemetrySender;
use plant_emulator::sim::spawn_simulation_thread;
use plant_emulator::state::{EventLog, SharedState};

const CONFIG_PATH: &str = "config/emulator.toml";

// Cadence of the front-end stand-in below: parameter pushes, event draining,
// status output.
const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

fn file_mtime(path: &str) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("===========================================");
    println!("Starting PID Plant Emulator");
    println!("===========================================\n");

    // Load runtime config from file
    let mut file_cfg = config::load_config(CONFIG_PATH);
    let mut mtime = file_mtime(CONFIG_PATH);
    let mut params = file_cfg.to_params(&SimParams::default());

    let state = SharedState::new(params);
    let events = EventLog::new(200);
    let metrics = TimingMetrics::new();

    let sender = match TelemetrySender::bind() {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("{e}; running without telemetry");
            None
        }
    };

    let (sim_handle, sim_stats) = spawn_simulation_thread(
        state.clone(),
        events.clone(),
        metrics.clone(),
        sender,
        file_cfg.seed,
    );
    let (rx_handle, rx_stats) = spawn_receiver_thread(state.clone(), events.clone());

    info!(
        "telemetry to {} every {:.0} ms, setpoint commands on {}",
        params.send_addr,
        params.send_period * 1000.0,
        params.listen_addr
    );
    if file_cfg.run_duration > 0.0 {
        info!("running for {:.1} s", file_cfg.run_duration);
    }

    // Front-end stand-in: push the parameter snapshot, drain observations,
    // show the current state. Config edits are picked up while running.
    let run_start = Instant::now();
    let mut cycle = 0u64;
    loop {
        if file_cfg.run_duration > 0.0
            && run_start.elapsed().as_secs_f64() >= file_cfg.run_duration
        {
            break;
        }

        let current_mtime = file_mtime(CONFIG_PATH);
        if current_mtime != mtime {
            mtime = current_mtime;
            match config::read_config(CONFIG_PATH) {
                Ok(cfg) => {
                    // A bad edit keeps the previous endpoint values
                    params = cfg.to_params(&params);
                    file_cfg = cfg;
                    info!("configuration reloaded");
                }
                Err(e) => warn!("{e}; keeping previous configuration"),
            }
        }
        state.update_params(params);

        for line in events.drain() {
            info!("{line}");
        }

        if cycle % 10 == 0 {
            let snap = state.snapshot();
            info!(
                "t {:7.1}s  true {:+9.4}  noisy {:+9.4}  setpoint {:+9.4}{}",
                run_start.elapsed().as_secs_f64(),
                snap.true_value,
                snap.noisy_value,
                snap.setpoint,
                if snap.outlier_active { "  [outlier]" } else { "" }
            );
        }

        cycle += 1;
        std::thread::sleep(REFRESH_INTERVAL);
    }

    // Signal shutdown
    println!("\n===========================================");
    println!("Run complete - initiating shutdown");
    sim_stats.shutdown.store(true, Ordering::Relaxed);
    rx_stats.shutdown.store(true, Ordering::Relaxed);

    let _ = sim_handle.join();
    let _ = rx_handle.join();

    for line in events.drain() {
        info!("{line}");
    }

    let elapsed = run_start.elapsed().as_secs_f64();
    let ticks = sim_stats.ticks.load(Ordering::Relaxed);
    let sent = sim_stats.samples_sent.load(Ordering::Relaxed);
    let suppressed = sim_stats.samples_suppressed.load(Ordering::Relaxed);
    let failures = sim_stats.send_failures.load(Ordering::Relaxed);
    let accepted = rx_stats.accepted.load(Ordering::Relaxed);
    let discarded = rx_stats.discarded.load(Ordering::Relaxed);

    println!("===========================================");
    println!("FINAL EMULATOR RESULTS");
    println!("===========================================");
    println!("Ticks: {} ({:.1}/sec)", ticks, ticks as f64 / elapsed);
    println!(
        "Telemetry samples sent: {} ({} suppressed, {} failed)",
        sent, suppressed, failures
    );
    println!(
        "Setpoint commands: {} accepted, {} discarded",
        accepted, discarded
    );

    let report = metrics.report();
    println!("\n=== Timing Metrics ===");
    println!(
        "Tick busy P50: {:?}, P99: {:?}, max: {:?} ({} ticks)",
        report.tick_p50, report.tick_p99, report.tick_max, report.ticks_recorded
    );
    println!(
        "Period jitter P50: {:?}, P99: {:?}",
        report.jitter_p50, report.jitter_p99
    );
    println!("Send P50: {:?}, P99: {:?}", report.send_p50, report.send_p99);
}

use std::net::SocketAddr;

use log::warn;
use serde::Deserialize;
use thiserror::Error;

// Telemetry can never be asked to send faster than this.
pub const MIN_SEND_PERIOD: f64 = 0.010;

/// Shape of the continuous measurement noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseKind {
    Gaussian,
    Uniform,
}

/// File-level configuration. Every field has a default, so a partial file
/// (or no file at all) still yields a runnable emulator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Master switch for the continuous noise layer.
    pub noise_enabled: bool,
    /// Standard deviation (gaussian) or half-range (uniform).
    pub noise_amplitude: f64,
    pub noise_kind: NoiseKind,
    /// Master switch for transient outliers.
    pub outlier_enabled: bool,
    /// Outlier magnitudes are drawn from +/- this value.
    pub outlier_amplitude: f64,
    /// Longest outlier that will be scheduled, in seconds.
    pub outlier_max_duration: f64,
    /// Expected outlier arrivals per second.
    pub outlier_frequency: f64,
    /// Seconds between telemetry samples, floored to MIN_SEND_PERIOD.
    pub send_period: f64,
    /// Telemetry destination.
    pub send_ip: String,
    pub send_port: u16,
    /// Setpoint command listener.
    pub receive_ip: String,
    pub receive_port: u16,
    /// Seed for the disturbance RNG; identical seeds reproduce identical runs.
    pub seed: u64,
    /// Wall-clock run length in seconds. Zero runs until the process is killed.
    pub run_duration: f64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            kp: 1.5,
            ki: 1.5,
            kd: 0.01,
            noise_enabled: true,
            noise_amplitude: 1.2,
            noise_kind: NoiseKind::Gaussian,
            outlier_enabled: true,
            outlier_amplitude: 5.0,
            outlier_max_duration: 0.5,
            outlier_frequency: 1.0,
            send_period: 0.02,
            send_ip: "127.0.0.1".to_string(),
            send_port: 50006,
            receive_ip: "127.0.0.1".to_string(),
            receive_port: 50005,
            seed: 42,
            run_duration: 0.0,
        }
    }
}

impl EmulatorConfig {
    // Validated snapshot for the running system. Endpoint fields that fail
    // to parse keep their previous values so one bad edit cannot take the
    // network path down.
    pub fn to_params(&self, previous: &SimParams) -> SimParams {
        let send_addr = parse_endpoint(&self.send_ip, self.send_port, previous.send_addr);
        let listen_addr = parse_endpoint(&self.receive_ip, self.receive_port, previous.listen_addr);

        SimParams {
            kp: self.kp,
            ki: self.ki,
            kd: self.kd,
            noise_enabled: self.noise_enabled,
            noise_amplitude: self.noise_amplitude,
            noise_kind: self.noise_kind,
            outlier_enabled: self.outlier_enabled,
            outlier_amplitude: self.outlier_amplitude,
            outlier_max_duration: self.outlier_max_duration,
            outlier_frequency: self.outlier_frequency,
            send_period: self.send_period.max(MIN_SEND_PERIOD),
            send_addr,
            listen_addr,
        }
    }
}

fn parse_endpoint(ip: &str, port: u16, previous: SocketAddr) -> SocketAddr {
    match format!("{ip}:{port}").parse() {
        Ok(addr) => addr,
        Err(_) => {
            warn!("invalid endpoint {ip}:{port}, keeping {previous}");
            previous
        }
    }
}

/// One consistent copy of every tunable the running system reads. Pushed
/// wholesale into the shared state; the loop and the receiver copy it out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub noise_enabled: bool,
    pub noise_amplitude: f64,
    pub noise_kind: NoiseKind,
    pub outlier_enabled: bool,
    pub outlier_amplitude: f64,
    pub outlier_max_duration: f64,
    pub outlier_frequency: f64,
    pub send_period: f64,
    pub send_addr: SocketAddr,
    pub listen_addr: SocketAddr,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            kp: 1.5,
            ki: 1.5,
            kd: 0.01,
            noise_enabled: true,
            noise_amplitude: 1.2,
            noise_kind: NoiseKind::Gaussian,
            outlier_enabled: true,
            outlier_amplitude: 5.0,
            outlier_max_duration: 0.5,
            outlier_frequency: 1.0,
            send_period: 0.02,
            send_addr: SocketAddr::from(([127, 0, 0, 1], 50006)),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 50005)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// Strict variant for the reload path: the caller decides what to keep on
// failure.
pub fn read_config(path: &str) -> Result<EmulatorConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

// Startup variant: any failure falls back to the built-in defaults.
pub fn load_config(path: &str) -> EmulatorConfig {
    match read_config(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("{e}; using defaults");
            EmulatorConfig::default()
        }
    }
}

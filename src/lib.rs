pub mod config;
pub mod controller;
pub mod disturbance;
pub mod metrics;
pub mod net;
pub mod protocol;
pub mod sim;
pub mod state;

pub use config::{load_config, read_config, EmulatorConfig, NoiseKind, SimParams};
pub use controller::PIDController;
pub use disturbance::DisturbanceGenerator;
pub use metrics::TimingMetrics;
pub use net::command::{spawn_receiver_thread, ReceiverStats};
pub use net::telemetry::TelemetrySender;
pub use net::NetworkError;
pub use sim::{spawn_simulation_thread, SimStats, Simulation};
pub use state::{EventLog, SharedState, StateSnapshot};

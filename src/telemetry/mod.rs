//! Process-wide `tracing` subscriber setup.

pub mod config;
pub mod subscriber;

pub use config::TelemetryConfig;
pub use subscriber::init_telemetry;

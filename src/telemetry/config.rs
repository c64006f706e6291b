/// Configuration for the telemetry subsystem.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Fallback filter when `RUST_LOG` is unset (e.g. "info", "solana_tx_collector=debug,warn").
    pub log_filter: String,
    /// Whether to enable ANSI-colored console output.
    pub enable_console_colors: bool,
    /// Whether to include target module in output.
    pub show_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: "info,sqlx=warn".into(),
            enable_console_colors: true,
            show_target: true,
        }
    }
}

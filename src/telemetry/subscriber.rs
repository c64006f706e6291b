use super::config::TelemetryConfig;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TELEMETRY_INIT: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise `config.log_filter`. Later calls are no-ops.
pub fn init_telemetry(config: TelemetryConfig) {
    TELEMETRY_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

        let fmt_layer = fmt::layer()
            .with_target(config.show_target)
            .with_ansi(config.enable_console_colors);

        // Another subscriber may already be installed (e.g. by a test harness).
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    });
}

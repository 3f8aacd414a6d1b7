//! Logging for speechgate
//!
//! Installs a `tracing-subscriber` formatter driven by the `[telemetry]`
//! config section and `RUST_LOG`

use speechgate_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Held for the lifetime of the application
///
/// Dropping it logs a final line so shutdown is visible in the output.
pub struct TelemetryGuard {
    format: LogFormat,
}

impl TelemetryGuard {
    /// Format the subscriber was installed with
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!("telemetry shut down");
    }
}

/// Initialize logging from configuration
///
/// `RUST_LOG` wins over the configured filter, which wins over
/// `default_filter`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: Option<&TelemetryConfig>, default_filter: &str) -> anyhow::Result<TelemetryGuard> {
    let configured = config.and_then(|c| c.filter.as_deref()).unwrap_or(default_filter);
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), configured);
    let format = config.map(|c| c.format).unwrap_or_default();

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);

            registry
                .with(fmt_layer)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true);

            registry
                .with(fmt_layer)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;
        }
    }

    Ok(TelemetryGuard { format })
}

fn build_filter(env: Option<&str>, configured: &str) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

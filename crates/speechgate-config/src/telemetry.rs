use serde::Deserialize;

/// Logging configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Log filter directive, e.g. `info` or `speechgate_tts=debug,info`
    ///
    /// `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub filter: Option<String>,
    /// Output format for log lines
    #[serde(default)]
    pub format: LogFormat,
}

/// Log line format
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable single-line output
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

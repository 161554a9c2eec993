//! Structured logging setup
//!
//! Logs go to stderr so stdout stays reserved for payloads. The filter comes
//! from `AWQAT_LOG`, then `RUST_LOG`, then defaults to `info`;
//! `AWQAT_LOG_FORMAT=json` switches to JSON lines.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

const DEFAULT_FILTER: &str = "info";

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Initializes the global subscriber once; later calls are no-ops
pub fn init() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = filter_directive(
            std::env::var("AWQAT_LOG").ok(),
            std::env::var("RUST_LOG").ok(),
        );
        let format = LogFormat::from_env_value(std::env::var("AWQAT_LOG_FORMAT").ok().as_deref());

        let layer = match format {
            LogFormat::Text => fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .json()
                .boxed(),
        };

        let subscriber = tracing_subscriber::registry()
            .with(layer.with_filter(EnvFilter::new(&filter)));

        // Another subscriber (e.g. from a test harness) may already be installed
        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }

        tracing::debug!(filter = %filter, ?format, "logging initialized");
    });
}

fn filter_directive(own: Option<String>, rust_log: Option<String>) -> String {
    own.filter(|v| !v.trim().is_empty())
        .or_else(|| rust_log.filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_prefers_own_variable() {
        assert_eq!(
            filter_directive(Some("debug".to_string()), Some("warn".to_string())),
            "debug"
        );
        assert_eq!(filter_directive(None, Some("warn".to_string())), "warn");
        assert_eq!(filter_directive(Some("  ".to_string()), None), "info");
        assert_eq!(filter_directive(None, None), "info");
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_env_value(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some(" JSON ")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("pretty")), LogFormat::Text);
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Text);
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }
}

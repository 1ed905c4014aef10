//! Tracing setup and the spans shared by the callback and queue paths.

use serde::{Deserialize, Serialize};
use tracing::Span;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::config::LoggingConfig;

/// Log line encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line, with the enclosing span's fields.
    Json,
}

/// Filter directives for a configured level.
///
/// At `debug` and `trace` the HTTP client and server libraries stay at
/// `info`; their connection chatter drowns the service's own events.
pub fn filter_directives(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    match level.as_str() {
        "debug" | "trace" => format!("{level},hyper=info,hyper_util=info,reqwest=info,h2=info"),
        _ => level,
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
/// Later calls are ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(filter_directives(&config.level)));

    let output = match config.format {
        LogFormat::Text => fmt::layer().with_target(true).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init();
}

/// Span around one queue message; every event logged while handling it
/// carries the listener and message id.
#[must_use]
pub fn message_span(listener: &str, message_id: &str) -> Span {
    tracing::info_span!("queue.message", listener = listener, message_id = message_id)
}

/// Span around one callback dispatch.
#[must_use]
pub fn callback_span(phase: &str, event: &str, case_id: i64) -> Span {
    tracing::info_span!("callback", phase = phase, event = event, case_id = case_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_libraries_at_debug() {
        assert_eq!(filter_directives("info"), "info");
        assert_eq!(filter_directives(" WARN "), "warn");

        let debug = filter_directives("debug");
        assert!(debug.starts_with("debug,"));
        assert!(debug.contains("hyper=info"));
        assert!(debug.contains("reqwest=info"));
    }

    #[test]
    fn test_format_parses_lowercase() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert!(serde_json::from_str::<LogFormat>("\"yaml\"").is_err());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        init_tracing(&config);
        init_tracing(&config);

        let span = message_span("case-events", "m-1");
        let _guard = span.enter();
        tracing::info!("inside message span");
    }
}

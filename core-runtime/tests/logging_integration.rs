//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[test]
fn test_global_init_forwards_to_sink_and_rejects_second_init() {
    // Only one global subscriber per process; this is the sole test that installs one.
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Info)
        .with_filter("logging_integration=info")
        .with_logger_sink(sink.clone());

    init_logging(config).expect("first init succeeds");

    tracing::info!(phase = "scanning_catalog", scanned = 500u64, "page read");
    tracing::debug!("filtered out");

    let entries = sink.entries.lock().unwrap().clone();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "page read");
    assert_eq!(
        entries[0].fields.get("phase"),
        Some(&"scanning_catalog".to_string())
    );
    assert_eq!(entries[0].fields.get("scanned"), Some(&"500".to_string()));

    let second = init_logging(LoggingConfig::default());
    assert!(second.is_err());
}

#[test]
fn test_invalid_filter_is_a_config_error() {
    let config = LoggingConfig::default().with_filter("core_sync=loud");
    let err = init_logging(config).unwrap_err();
    assert!(err.to_string().contains("Invalid log filter"));
}

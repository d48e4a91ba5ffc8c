//! # Core Configuration Module
//!
//! Provides configuration management for the catalog synchronization core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the database location, the scan sizing knobs and the
//! optional host logging sink. It enforces fail-fast validation so a scan never
//! starts with a zero page size or an empty database path.
//!
//! ## Scan sizing
//!
//! | Setting              | Default | Meaning                                      |
//! |----------------------|---------|----------------------------------------------|
//! | `page_size`          | 500     | Tracks requested per catalog page            |
//! | `lookup_batch_size`  | 1000    | Queued tracks per enrichment batch           |
//! | `delete_chunk_size`  | 500     | Remote ids per orphan delete statement       |
//! | `resolver_max_ids`   | 1000    | Identifiers per single resolver request      |
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/var/lib/catalog/library.db")
//!     .page_size(250)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ### From the environment
//!
//! ```ignore
//! // DATABASE_PATH=/data/library.db SCAN_PAGE_SIZE=200 ...
//! let config = CoreConfig::from_env()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Missing database path
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing database path");
//! ```

use crate::error::{Error, Result};
use bridge_traits::LoggerSink;
use std::path::PathBuf;
use std::sync::Arc;

/// Default number of tracks requested per catalog page
pub const DEFAULT_PAGE_SIZE: usize = 500;
/// Default number of queued tracks per enrichment batch
pub const DEFAULT_LOOKUP_BATCH_SIZE: usize = 1000;
/// Default number of remote ids per orphan delete
pub const DEFAULT_DELETE_CHUNK_SIZE: usize = 500;
/// Default number of identifiers per single resolver request
pub const DEFAULT_RESOLVER_MAX_IDS: usize = 1000;
/// Default capacity of the event bus
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Upper bound shared by every size knob
const MAX_SIZE: usize = 100_000;

/// Core configuration for the catalog synchronization core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Scan sizing knobs
    pub scan: ScanSettings,

    /// Capacity of the broadcast event bus
    pub event_buffer_size: usize,

    /// Custom log filter directive (e.g. "core_sync=debug")
    pub log_filter: Option<String>,

    /// Optional sink mirroring logs into a host pipeline
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Features flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("scan", &self.scan)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("log_filter", &self.log_filter)
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("features", &self.features)
            .finish()
    }
}

/// Sizes that bound request volume and statement size during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    pub page_size: usize,
    pub lookup_batch_size: usize,
    pub delete_chunk_size: usize,
    pub resolver_max_ids: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            lookup_batch_size: DEFAULT_LOOKUP_BATCH_SIZE,
            delete_chunk_size: DEFAULT_DELETE_CHUNK_SIZE,
            resolver_max_ids: DEFAULT_RESOLVER_MAX_IDS,
        }
    }
}

impl ScanSettings {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("page_size", self.page_size),
            ("lookup_batch_size", self.lookup_batch_size),
            ("delete_chunk_size", self.delete_chunk_size),
            ("resolver_max_ids", self.resolver_max_ids),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be greater than 0")));
            }
            if value > MAX_SIZE {
                return Err(Error::Config(format!(
                    "{name} exceeds maximum of {MAX_SIZE}"
                )));
            }
        }
        Ok(())
    }
}

/// Feature flags control optional scan phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Reconcile the remote artist index before scanning tracks
    pub enable_artist_index: bool,

    /// Run tag enrichment when a tag resolver is provided
    pub enable_secondary_enrichment: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_artist_index: true,
            enable_secondary_enrichment: true,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Builds a configuration from process environment variables.
    ///
    /// Reads `DATABASE_PATH` (required), `SCAN_PAGE_SIZE`, `LOOKUP_BATCH_SIZE`,
    /// `DELETE_CHUNK_SIZE`, `RESOLVER_MAX_IDS` and `LOG_FILTER`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = CoreConfig::builder();

        if let Some(path) = lookup("DATABASE_PATH") {
            builder = builder.database_path(path);
        }
        if let Some(size) = parse_size(&lookup, "SCAN_PAGE_SIZE")? {
            builder = builder.page_size(size);
        }
        if let Some(size) = parse_size(&lookup, "LOOKUP_BATCH_SIZE")? {
            builder = builder.lookup_batch_size(size);
        }
        if let Some(size) = parse_size(&lookup, "DELETE_CHUNK_SIZE")? {
            builder = builder.delete_chunk_size(size);
        }
        if let Some(size) = parse_size(&lookup, "RESOLVER_MAX_IDS")? {
            builder = builder.resolver_max_ids(size);
        }
        if let Some(filter) = lookup("LOG_FILTER") {
            builder = builder.log_filter(filter);
        }

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - Scan sizes are within (0, 100000]
    /// - Event buffer is not empty
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        self.scan.validate()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_size<F>(lookup: &F, key: &str) -> Result<Option<usize>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{key} is not a valid size ({raw}): {e}"))),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    scan: ScanSettings,
    event_buffer_size: Option<usize>,
    log_filter: Option<String>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .database_path("/path/to/library.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the catalog page size.
    ///
    /// Default: 500
    pub fn page_size(mut self, size: usize) -> Self {
        self.scan.page_size = size;
        self
    }

    /// Sets the number of queued tracks per enrichment batch.
    ///
    /// Default: 1000
    pub fn lookup_batch_size(mut self, size: usize) -> Self {
        self.scan.lookup_batch_size = size;
        self
    }

    /// Sets the number of remote ids per orphan delete.
    ///
    /// Default: 500
    pub fn delete_chunk_size(mut self, size: usize) -> Self {
        self.scan.delete_chunk_size = size;
        self
    }

    /// Sets the maximum number of identifiers sent in one resolver request.
    pub fn resolver_max_ids(mut self, size: usize) -> Self {
        self.scan.resolver_max_ids = size;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets a custom log filter directive.
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Sets the logger sink used to mirror logs into the host.
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Enables or disables artist index reconciliation.
    pub fn enable_artist_index(mut self, enabled: bool) -> Self {
        self.features.enable_artist_index = enabled;
        self
    }

    /// Enables or disables tag enrichment.
    pub fn enable_secondary_enrichment(mut self, enabled: bool) -> Self {
        self.features.enable_secondary_enrichment = enabled;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the database path is missing or any size
    /// is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let config = CoreConfig {
            database_path,
            scan: self.scan,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            log_filter: self.log_filter,
            logger_sink: self.logger_sink,
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}

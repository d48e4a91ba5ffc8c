//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided collaborators (remote catalog reader,
//! metadata resolver, optional tag resolver) into the catalog sync core and
//! exposes the small surface a web layer needs: submit a scan, poll its
//! state, subscribe to events and read the library summary.

pub mod error;

pub use error::{CoreError, Result};

pub use core_library::query::LibrarySummary;
pub use core_runtime::config::CoreConfig;
pub use core_sync::{ScanPhase, ScanState};

use std::sync::Arc;

use bridge_traits::{
    catalog::CatalogReader,
    metadata::{MetadataResolver, TagResolver},
    time::Clock,
};
use core_library::db::{create_pool, DatabaseConfig};
use core_library::query::LibraryQueryService;
use core_runtime::events::{EventBus, EventStream};
use core_runtime::logging::{init_logging, LoggingConfig};
use core_sync::{SyncConfig, SyncCoordinator};
use sqlx::SqlitePool;
use tracing::info;

/// Aggregated handle to all collaborators the core requires.
pub struct CoreDependencies {
    pub catalog_reader: Arc<dyn CatalogReader>,
    pub metadata_resolver: Arc<dyn MetadataResolver>,
    /// Enables secondary tag enrichment when present
    pub tag_resolver: Option<Arc<dyn TagResolver>>,
    /// Overrides the system clock used for recording timestamps
    pub clock: Option<Arc<dyn Clock>>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from the two required collaborators.
    pub fn new(
        catalog_reader: Arc<dyn CatalogReader>,
        metadata_resolver: Arc<dyn MetadataResolver>,
    ) -> Self {
        Self {
            catalog_reader,
            metadata_resolver,
            tag_resolver: None,
            clock: None,
        }
    }

    pub fn with_tag_resolver(mut self, tag_resolver: Arc<dyn TagResolver>) -> Self {
        self.tag_resolver = Some(tag_resolver);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    pool: SqlitePool,
    coordinator: SyncCoordinator,
    event_bus: EventBus,
}

impl CoreService {
    /// Open (and migrate) the library database named by the configuration
    /// and build the service on top of it.
    pub async fn new(config: CoreConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;
        let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
        Self::with_pool(config, deps, pool)
    }

    /// Build the service over an already migrated pool.
    pub fn with_pool(config: CoreConfig, deps: CoreDependencies, pool: SqlitePool) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let sync_config = SyncConfig::from(&config);
        sync_config.validate()?;

        let mut coordinator = SyncCoordinator::new(
            sync_config,
            pool.clone(),
            deps.catalog_reader,
            deps.metadata_resolver,
            event_bus.clone(),
        );
        if let Some(tag_resolver) = deps.tag_resolver {
            coordinator = coordinator.with_tag_resolver(tag_resolver);
        }
        if let Some(clock) = deps.clock {
            coordinator = coordinator.with_clock(clock);
        }

        info!(
            database = %config.database_path.display(),
            page_size = config.scan.page_size,
            lookup_batch_size = config.scan.lookup_batch_size,
            "Core service ready"
        );

        Ok(Self {
            config: Arc::new(config),
            pool,
            coordinator,
            event_bus,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Request a background scan.
    ///
    /// Returns `false` if a scan is already running. Must be called from
    /// within a tokio runtime.
    pub fn submit_scan(&self, full: bool) -> bool {
        self.coordinator.submit_scan(full)
    }

    /// Current scan state.
    pub fn get_state(&self) -> ScanState {
        self.coordinator.get_state()
    }

    /// Current scan state as JSON, for status endpoints.
    pub fn get_state_json(&self) -> Result<String> {
        Ok(self.get_state().to_json()?)
    }

    /// Subscribe to scan and library events. Past events are not replayed.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// Artists and tags currently in the library, with usage counts.
    pub async fn library_summary(&self) -> Result<LibrarySummary> {
        Ok(LibraryQueryService::new(self.pool.clone()).summary().await?)
    }
}

/// Initialize logging from the configuration, then open the service.
///
/// Hosts that install their own `tracing` subscriber should call
/// [`CoreService::new`] instead.
pub async fn bootstrap(config: CoreConfig, deps: CoreDependencies) -> Result<CoreService> {
    let mut logging = LoggingConfig::default();
    if let Some(filter) = &config.log_filter {
        logging = logging.with_filter(filter.clone());
    }
    if let Some(sink) = &config.logger_sink {
        logging = logging.with_logger_sink(Arc::clone(sink));
    }
    init_logging(logging).map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

    CoreService::new(config, deps).await
}

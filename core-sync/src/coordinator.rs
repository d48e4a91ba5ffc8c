//! # Sync Coordinator
//!
//! Orchestrates one catalog scan from the first remote page to the final
//! orphan cleanup.
//!
//! ## Overview
//!
//! The `SyncCoordinator` wires the scan components together:
//! - Loads the [`KnownStateSnapshot`] once per run
//! - Reconciles the remote artist index, when the server exposes one
//! - Pages through the remote catalog and classifies every track
//! - Groups queued tracks into lookup batches and resolves them
//! - Writes each batch in one transaction
//! - Tags recordings through the optional tag resolver
//! - Reaps recordings, artists and tags no longer referenced
//! - Keeps the shared [`ProgressTracker`] and the event bus up to date
//!
//! ## Workflow
//!
//! ### Incremental scan
//! 1. Tracks whose canonical id matches the snapshot are marked seen and skipped
//! 2. New tracks and tracks whose canonical id changed are resolved and written
//! 3. Recordings inserted by a batch are tagged right after it commits
//! 4. Remote ids that vanished upstream, or whose new canonical id did not
//!    resolve, are deleted
//!
//! ### Full scan
//! 1. Every track with a canonical id is resolved and written again
//! 2. All recordings of the source are tagged in the `EnrichingSecondary` phase
//! 3. Remote ids that vanished upstream are deleted
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncConfig, SyncCoordinator};
//! use std::sync::Arc;
//!
//! # async fn example(pool: sqlx::SqlitePool, reader: Arc<dyn CatalogReader>,
//! #     resolver: Arc<dyn MetadataResolver>, bus: EventBus) {
//! let coordinator = SyncCoordinator::new(SyncConfig::default(), pool, reader, resolver, bus);
//!
//! // Start a background scan; `false` means one is already running
//! let accepted = coordinator.submit_scan(false);
//!
//! // Poll from anywhere
//! let state = coordinator.get_state();
//! println!("{}: {}/{}", state.phase, state.enriched_count, state.enrich_total);
//! # }
//! ```

use crate::{
    artist_index::ArtistIndexReconciler,
    batcher::EnrichmentBatcher,
    classifier::{Classification, DiffClassifier, SeenRemoteIds},
    progress::{ProgressTracker, ScanId, ScanPhase, ScanState},
    reaper::OrphanReaper,
    resolver::ResolverAdapter,
    secondary::{TagEnricher, TagTarget},
    snapshot::KnownStateSnapshot,
    writer::{UpsertWriter, WriteContext},
    Result, SyncError,
};
use bridge_traits::catalog::CatalogReader;
use bridge_traits::metadata::{MetadataResolver, TagResolver};
use bridge_traits::time::{Clock, SystemClock};
use core_library::repositories::{
    ArtistRepository, RecordingRepository, SqliteArtistRepository, SqliteRecordingRepository,
    SqliteTagRepository, TagRepository,
};
use core_runtime::config::{
    CoreConfig, DEFAULT_DELETE_CHUNK_SIZE, DEFAULT_LOOKUP_BATCH_SIZE, DEFAULT_PAGE_SIZE,
    DEFAULT_RESOLVER_MAX_IDS,
};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, ScanEvent};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Sync coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Tracks requested per remote catalog page
    pub page_size: usize,

    /// Maximum distinct canonical ids per lookup batch
    pub lookup_batch_size: usize,

    /// Remote ids per orphan delete statement
    pub delete_chunk_size: usize,

    /// Maximum ids in a single resolver call
    pub resolver_max_ids: usize,

    /// Reconcile the remote artist index before the catalog pass
    pub enable_artist_index: bool,

    /// Run tag enrichment when a tag resolver is configured
    pub enable_secondary_enrichment: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            lookup_batch_size: DEFAULT_LOOKUP_BATCH_SIZE,
            delete_chunk_size: DEFAULT_DELETE_CHUNK_SIZE,
            resolver_max_ids: DEFAULT_RESOLVER_MAX_IDS,
            enable_artist_index: true,
            enable_secondary_enrichment: true,
        }
    }
}

impl From<&CoreConfig> for SyncConfig {
    fn from(config: &CoreConfig) -> Self {
        Self {
            page_size: config.scan.page_size,
            lookup_batch_size: config.scan.lookup_batch_size,
            delete_chunk_size: config.scan.delete_chunk_size,
            resolver_max_ids: config.scan.resolver_max_ids,
            enable_artist_index: config.features.enable_artist_index,
            enable_secondary_enrichment: config.features.enable_secondary_enrichment,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("page_size", self.page_size),
            ("lookup_batch_size", self.lookup_batch_size),
            ("delete_chunk_size", self.delete_chunk_size),
            ("resolver_max_ids", self.resolver_max_ids),
        ] {
            if value == 0 {
                return Err(SyncError::Config(format!("{name} must be greater than 0")));
            }
        }
        Ok(())
    }
}

/// Counters describing a finished scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: String,
    pub full: bool,
    pub pages_read: u64,
    pub tracks_scanned: u64,
    /// Tracks without a canonical recording id
    pub skipped_no_id: u64,
    /// Tracks whose stored canonical id was already current
    pub already_current: u64,
    pub queued: u64,
    pub lookup_batches: u64,
    /// Resolver calls issued
    pub lookups_issued: u64,
    /// Canonical ids the resolver did not return
    pub unresolved: u64,
    pub inserted: u64,
    pub replaced: u64,
    pub artists_index_updated: u64,
    pub recordings_deleted: u64,
    pub artists_deleted: u64,
    pub tags_deleted: u64,
    /// Recordings processed by tag enrichment
    pub secondary: u64,
    pub duration_ms: u64,
}

/// Orchestrates catalog scans
#[derive(Clone)]
pub struct SyncCoordinator {
    config: SyncConfig,
    pool: SqlitePool,
    reader: Arc<dyn CatalogReader>,
    resolver: Arc<ResolverAdapter>,
    tag_resolver: Option<Arc<dyn TagResolver>>,
    recordings: Arc<dyn RecordingRepository>,
    artists: Arc<dyn ArtistRepository>,
    tags: Arc<dyn TagRepository>,
    tracker: Arc<ProgressTracker>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
}

impl SyncCoordinator {
    /// Create a coordinator over a migrated library pool
    pub fn new(
        config: SyncConfig,
        pool: SqlitePool,
        reader: Arc<dyn CatalogReader>,
        resolver: Arc<dyn MetadataResolver>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            resolver: Arc::new(ResolverAdapter::new(resolver, config.resolver_max_ids)),
            recordings: Arc::new(SqliteRecordingRepository::new(pool.clone())),
            artists: Arc::new(SqliteArtistRepository::new(pool.clone())),
            tags: Arc::new(SqliteTagRepository::new(pool.clone())),
            config,
            pool,
            reader,
            tag_resolver: None,
            tracker: Arc::new(ProgressTracker::new()),
            event_bus,
            clock: Arc::new(SystemClock),
        }
    }

    /// Enable secondary enrichment through a tag resolver
    pub fn with_tag_resolver(mut self, tag_resolver: Arc<dyn TagResolver>) -> Self {
        self.tag_resolver = Some(tag_resolver);
        self
    }

    /// Replace the clock used for recording timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Shared tracker, for callers that poll without holding the coordinator
    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn get_state(&self) -> ScanState {
        self.tracker.snapshot()
    }

    /// Start a scan on a background task
    ///
    /// Returns `false` without side effects if a scan is already running.
    /// Must be called from within a tokio runtime.
    pub fn submit_scan(&self, full: bool) -> bool {
        let scan_id = ScanId::new();
        if !self.tracker.try_begin(&scan_id, full) {
            debug!(full, "Scan submission rejected, another scan is running");
            return false;
        }

        let coordinator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = coordinator.run_claimed(scan_id, full).await {
                error!(scan_id = %scan_id, error = %e, "Background scan failed");
            }
        });

        info!(scan_id = %scan_id, full, "Scan submitted");
        true
    }

    /// Run a scan to completion on the current task
    ///
    /// # Errors
    ///
    /// `SyncError::ScanInProgress` if another scan holds the tracker, or the
    /// error that ended the run. The tracker is in `Done` either way.
    pub async fn run_scan(&self, full: bool) -> Result<ScanReport> {
        let scan_id = ScanId::new();
        if !self.tracker.try_begin(&scan_id, full) {
            return Err(SyncError::ScanInProgress);
        }
        self.run_claimed(scan_id, full).await
    }

    /// Run a scan whose tracker slot is already claimed
    #[instrument(skip(self, scan_id), fields(scan_id = %scan_id))]
    async fn run_claimed(&self, scan_id: ScanId, full: bool) -> Result<ScanReport> {
        self.emit(ScanEvent::Started {
            scan_id: scan_id.to_string(),
            full,
        });

        match self.execute_scan(scan_id, full).await {
            Ok(report) => {
                info!(
                    inserted = report.inserted,
                    replaced = report.replaced,
                    deleted = report.recordings_deleted,
                    unresolved = report.unresolved,
                    duration_ms = report.duration_ms,
                    "Scan completed"
                );
                self.emit(ScanEvent::Completed {
                    scan_id: scan_id.to_string(),
                    inserted: report.inserted,
                    replaced: report.replaced,
                    deleted: report.recordings_deleted,
                    unresolved: report.unresolved,
                    duration_ms: report.duration_ms,
                });
                Ok(report)
            }
            Err(e) => {
                let phase = self.tracker.phase();
                let batch_index = e.batch_index();
                error!(
                    phase = %phase,
                    batch_index = ?batch_index,
                    error = %e,
                    "Scan failed"
                );
                self.tracker.fail(e.to_string());
                self.emit(ScanEvent::Failed {
                    scan_id: scan_id.to_string(),
                    phase: phase.to_string(),
                    batch_index,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute_scan(&self, scan_id: ScanId, full: bool) -> Result<ScanReport> {
        self.config.validate()?;

        let started = Instant::now();
        let source_type = self.reader.source_type();
        let mut report = ScanReport {
            scan_id: scan_id.to_string(),
            full,
            ..ScanReport::default()
        };

        let snapshot =
            KnownStateSnapshot::load(source_type, self.recordings.as_ref(), self.artists.as_ref())
                .await?;

        let pending_artist_fields = if self.config.enable_artist_index {
            let index = self
                .reader
                .list_artists()
                .await
                .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?;
            let outcome = ArtistIndexReconciler::new(Arc::clone(&self.artists))
                .reconcile(&index, &snapshot)
                .await?;
            report.artists_index_updated = outcome.updated;
            outcome.pending
        } else {
            HashMap::new()
        };

        // Catalog pass
        let classifier = DiffClassifier::new(full);
        let mut seen = SeenRemoteIds::new();
        let mut batcher = EnrichmentBatcher::new(self.config.lookup_batch_size);
        let mut offset = 0;

        loop {
            let page = self
                .reader
                .list(self.config.page_size, offset)
                .await
                .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?;
            let page_len = page.len();
            report.pages_read += 1;
            report.tracks_scanned += page_len as u64;

            for track in page {
                match classifier.classify(&track, &snapshot) {
                    Classification::Skip => report.skipped_no_id += 1,
                    Classification::Current => {
                        report.already_current += 1;
                        seen.mark(track.id);
                    }
                    Classification::Enqueue => batcher.push(track),
                }
            }

            offset += page_len;
            self.tracker.record_scanned(page_len as u64);
            self.emit_progress(&scan_id);

            if page_len < self.config.page_size {
                break;
            }
        }

        report.queued = batcher.queued_tracks() as u64;
        debug!(
            pages = report.pages_read,
            scanned = report.tracks_scanned,
            queued = report.queued,
            distinct = batcher.distinct_ids(),
            "Catalog pass finished"
        );

        // Enrichment
        let batches = batcher.into_batches();
        report.lookup_batches = batches.len() as u64;
        self.tracker
            .begin_enrichment(report.queued, report.lookup_batches)?;
        self.emit_phase(&scan_id, ScanPhase::EnrichingMetadata);

        let writer = UpsertWriter::new(self.pool.clone(), source_type, Arc::clone(&self.clock));
        let tag_enricher = self.tag_enricher();
        let mut inserted_artists: HashSet<String> = HashSet::new();

        for batch in &batches {
            let resolution = match self.resolver.resolve(&batch.ids).await {
                Ok(resolution) => resolution,
                Err(e) => {
                    warn!(batch_index = batch.index, error = %e, "Lookup batch failed to resolve");
                    return Err(e);
                }
            };
            report.lookups_issued += resolution.requests;
            report.unresolved += resolution.unresolved.len() as u64;

            let outcome = writer
                .write_batch(
                    batch,
                    &resolution,
                    &WriteContext {
                        snapshot: &snapshot,
                        inserted_artists: &inserted_artists,
                        pending_artist_fields: &pending_artist_fields,
                    },
                )
                .await?;

            if outcome.written.len() < batch.track_count() {
                debug!(
                    batch_index = batch.index,
                    written = outcome.written.len(),
                    tracks = batch.track_count(),
                    "Unresolved tracks stay unseen"
                );
            }
            seen.extend(outcome.written.iter().cloned());
            inserted_artists.extend(outcome.new_artists.iter().cloned());
            report.inserted += outcome.inserted.len() as u64;
            report.replaced += outcome.replaced;

            self.tracker.record_batch(batch.track_count() as u64);
            self.emit_library(LibraryEvent::BatchCommitted {
                batch_index: batch.index,
                inserted: outcome.inserted.len() as u64,
                replaced: outcome.replaced,
            });
            self.emit_progress(&scan_id);

            if let (false, Some(enricher)) = (full, &tag_enricher) {
                let targets: Vec<TagTarget> = outcome
                    .inserted
                    .into_iter()
                    .map(|r| TagTarget {
                        id: r.id,
                        canonical_id: r.canonical_id,
                    })
                    .collect();
                report.secondary += enricher
                    .enrich(&targets, |n| self.tracker.record_secondary(n))
                    .await?;
            }
        }

        // Secondary enrichment of the whole source
        if let (true, Some(enricher)) = (full, &tag_enricher) {
            let targets: Vec<TagTarget> = self
                .recordings
                .list_known(source_type)
                .await?
                .into_iter()
                .map(|k| TagTarget {
                    id: k.id,
                    canonical_id: k.canonical_id,
                })
                .collect();

            self.tracker.begin_secondary(targets.len() as u64)?;
            self.emit_phase(&scan_id, ScanPhase::EnrichingSecondary);
            report.secondary += enricher
                .enrich(&targets, |n| self.tracker.record_secondary(n))
                .await?;
        }

        // Orphans
        let unseen = seen.unseen(&snapshot);
        let reaped = OrphanReaper::new(
            Arc::clone(&self.recordings),
            Arc::clone(&self.artists),
            Arc::clone(&self.tags),
            self.config.delete_chunk_size,
        )
        .reap(source_type, &unseen)
        .await?;
        report.recordings_deleted = reaped.recordings;
        report.artists_deleted = reaped.artists;
        report.tags_deleted = reaped.tags;
        self.emit_library(LibraryEvent::OrphansReaped {
            recordings: reaped.recordings,
            artists: reaped.artists,
            tags: reaped.tags,
        });

        self.tracker.finish()?;
        self.emit_phase(&scan_id, ScanPhase::Done);

        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }

    fn tag_enricher(&self) -> Option<TagEnricher> {
        if !self.config.enable_secondary_enrichment {
            return None;
        }
        self.tag_resolver.as_ref().map(|resolver| {
            TagEnricher::new(
                self.pool.clone(),
                Arc::clone(resolver),
                self.config.lookup_batch_size,
            )
        })
    }

    fn emit(&self, event: ScanEvent) {
        self.event_bus.emit(CoreEvent::Scan(event)).ok();
    }

    fn emit_library(&self, event: LibraryEvent) {
        self.event_bus.emit(CoreEvent::Library(event)).ok();
    }

    fn emit_phase(&self, scan_id: &ScanId, phase: ScanPhase) {
        self.emit(ScanEvent::PhaseChanged {
            scan_id: scan_id.to_string(),
            phase: phase.to_string(),
        });
    }

    fn emit_progress(&self, scan_id: &ScanId) {
        let state = self.tracker.snapshot();
        self.emit(ScanEvent::Progress {
            scan_id: scan_id.to_string(),
            phase: state.phase.to_string(),
            scanned: state.scanned_count,
            enriched: state.enriched_count,
            enrich_total: state.enrich_total,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_runtime::config::CoreConfig;

    #[test]
    fn test_sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.page_size, 500);
        assert_eq!(config.lookup_batch_size, 1000);
        assert_eq!(config.delete_chunk_size, 500);
        assert_eq!(config.resolver_max_ids, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sync_config_from_core_config() {
        let core = CoreConfig::builder()
            .database_path("/tmp/catalog.db")
            .page_size(50)
            .lookup_batch_size(20)
            .delete_chunk_size(10)
            .resolver_max_ids(5)
            .enable_artist_index(false)
            .build()
            .unwrap();

        let config = SyncConfig::from(&core);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.lookup_batch_size, 20);
        assert_eq!(config.delete_chunk_size, 10);
        assert_eq!(config.resolver_max_ids, 5);
        assert!(!config.enable_artist_index);
        assert!(config.enable_secondary_enrichment);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let config = SyncConfig {
            page_size: 0,
            ..SyncConfig::default()
        };
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }
}

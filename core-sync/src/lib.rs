//! # Catalog Sync Module
//!
//! Reconciles a remote media server's track listing with the local catalog
//! library.
//!
//! ## Overview
//!
//! This module runs catalog scans, including:
//! - Diffing the remote listing against the previously persisted state
//! - Resolving canonical metadata in bounded, deduplicated lookup batches
//! - Writing each batch atomically, with remote fallbacks for missing fields
//! - Removing recordings, artists and tags no longer referenced upstream
//! - Exposing live progress to concurrent status queries
//!
//! ## Components
//!
//! - **Progress Tracker** (`progress`): Scan state machine with validated transitions
//! - **Known-State Snapshot** (`snapshot`): Prior local mappings loaded once per run
//! - **Diff Classifier** (`classifier`): Per-track enrichment decision and seen-id set
//! - **Enrichment Batcher** (`batcher`): Lookup batches keyed by canonical id
//! - **Resolver Adapter** (`resolver`): Request splitting and miss accounting
//! - **Upsert Writer** (`writer`): Transactional batch materialization
//! - **Artist Index** (`artist_index`): Remote artist index reconciliation
//! - **Tag Enricher** (`secondary`): Secondary tag enrichment
//! - **Orphan Reaper** (`reaper`): Chunked removal of unseen and unreferenced rows
//! - **Sync Coordinator** (`coordinator`): Orchestrates incremental and full scans

pub mod artist_index;
pub mod batcher;
pub mod classifier;
pub mod coordinator;
pub mod error;
pub mod progress;
pub mod reaper;
pub mod resolver;
pub mod secondary;
pub mod snapshot;
pub mod writer;

pub use batcher::{EnrichmentBatcher, LookupBatch};
pub use classifier::{Classification, DiffClassifier, SeenRemoteIds};
pub use coordinator::{ScanReport, SyncConfig, SyncCoordinator};
pub use error::{Result, SyncError};
pub use progress::{ProgressTracker, ScanId, ScanPhase, ScanState};
pub use reaper::{OrphanReaper, ReapOutcome};
pub use snapshot::KnownStateSnapshot;

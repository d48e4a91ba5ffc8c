//! # Scan Progress Tracker
//!
//! Concurrency-safe state machine describing the scan that is running (or
//! last ran) in the background.
//!
//! ## State Machine
//!
//! ```text
//! Idle → ScanningCatalog → EnrichingMetadata → [EnrichingSecondary] → Done → Idle
//!              ↓                  ↓                      ↓
//!              └──────────────────┴──────────────────────┴──→ Done (failure)
//! ```
//!
//! A new scan is accepted only from `Idle` or `Done`. Failures always land in
//! `Done` with the error message recorded, so the tracker never stays busy
//! after a crashed run.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let tracker = ProgressTracker::new();
//! let scan_id = ScanId::new();
//! assert!(tracker.try_begin(&scan_id, false));
//! tracker.record_scanned(500);
//! tracker.begin_enrichment(1200, 2)?;
//! tracker.record_batch(1000);
//! tracker.finish()?;
//! ```

use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a scan run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanId(Uuid);

impl ScanId {
    /// Create a new random scan ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a scan ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidScanId(e.to_string()))?,
        ))
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Phases
// ============================================================================

/// Phase of the scan state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    /// No scan has run since startup, or the last one was acknowledged
    #[default]
    Idle,
    /// Paging through the remote catalog and classifying tracks
    ScanningCatalog,
    /// Resolving and writing lookup batches
    EnrichingMetadata,
    /// Resolving tag data for persisted recordings
    EnrichingSecondary,
    /// Last scan finished, successfully or not
    Done,
}

impl ScanPhase {
    /// Whether a new scan may be submitted in this phase
    pub fn accepts_submission(&self) -> bool {
        matches!(self, ScanPhase::Idle | ScanPhase::Done)
    }

    /// Whether a scan is currently running
    pub fn is_active(&self) -> bool {
        !self.accepts_submission()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanPhase::Idle => "idle",
            ScanPhase::ScanningCatalog => "scanning_catalog",
            ScanPhase::EnrichingMetadata => "enriching_metadata",
            ScanPhase::EnrichingSecondary => "enriching_secondary",
            ScanPhase::Done => "done",
        }
    }
}

impl FromStr for ScanPhase {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(ScanPhase::Idle),
            "scanning_catalog" => Ok(ScanPhase::ScanningCatalog),
            "enriching_metadata" => Ok(ScanPhase::EnrichingMetadata),
            "enriching_secondary" => Ok(ScanPhase::EnrichingSecondary),
            "done" => Ok(ScanPhase::Done),
            _ => Err(SyncError::InvalidStateTransition {
                from: s.to_string(),
                to: s.to_string(),
                reason: format!("Unknown scan phase: {s}"),
            }),
        }
    }
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn validate_transition(from: ScanPhase, to: ScanPhase) -> Result<()> {
    let valid = match (from, to) {
        (ScanPhase::Idle, ScanPhase::ScanningCatalog) => true,

        (ScanPhase::ScanningCatalog, ScanPhase::EnrichingMetadata) => true,

        (ScanPhase::EnrichingMetadata, ScanPhase::EnrichingSecondary) => true,

        // Success from the last phase, or failure from any running phase
        (
            ScanPhase::ScanningCatalog
            | ScanPhase::EnrichingMetadata
            | ScanPhase::EnrichingSecondary,
            ScanPhase::Done,
        ) => true,

        (ScanPhase::Done, ScanPhase::Idle) => true,

        _ => false,
    };

    if !valid {
        return Err(SyncError::InvalidStateTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
            reason: format!(
                "Cannot transition from {} to {}",
                from.as_str(),
                to.as_str()
            ),
        });
    }

    Ok(())
}

// ============================================================================
// State
// ============================================================================

/// Point-in-time view of the tracker, returned to status queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanState {
    pub phase: ScanPhase,
    /// Identifier of the current or last scan
    pub scan_id: Option<String>,
    /// Whether the current or last scan is a full resync
    pub full: bool,
    /// Tracks read from the remote catalog
    pub scanned_count: u64,
    /// Queued tracks processed by enrichment
    pub enriched_count: u64,
    /// Tracks queued for enrichment
    pub enrich_total: u64,
    pub batches_completed: u64,
    pub batch_total: u64,
    /// Recordings processed by tag enrichment
    pub secondary_count: u64,
    pub secondary_total: u64,
    /// Message of the failure that ended the last scan
    pub last_error: Option<String>,
}

impl ScanState {
    /// Serialize for status endpoints
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Shared scan state behind a mutex
///
/// All methods take `&self` and hold the lock only for the duration of the
/// update, so status queries never wait on scan I/O.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: Mutex<ScanState>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScanState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ScanState {
        self.lock().clone()
    }

    pub fn phase(&self) -> ScanPhase {
        self.lock().phase
    }

    /// Claim the tracker for a new scan
    ///
    /// Returns `false` without touching the state when a scan is already
    /// running. A `Done` tracker passes through `Idle` and all counters reset.
    pub fn try_begin(&self, scan_id: &ScanId, full: bool) -> bool {
        let mut state = self.lock();
        if !state.phase.accepts_submission() {
            return false;
        }

        *state = ScanState {
            phase: ScanPhase::ScanningCatalog,
            scan_id: Some(scan_id.as_str()),
            full,
            ..ScanState::default()
        };
        true
    }

    /// Add freshly read tracks to the scanned counter
    pub fn record_scanned(&self, tracks: u64) {
        self.lock().scanned_count += tracks;
    }

    /// Enter `EnrichingMetadata` with the number of queued tracks and batches
    pub fn begin_enrichment(&self, enrich_total: u64, batch_total: u64) -> Result<()> {
        let mut state = self.lock();
        validate_transition(state.phase, ScanPhase::EnrichingMetadata)?;
        state.phase = ScanPhase::EnrichingMetadata;
        state.enrich_total = enrich_total;
        state.batch_total = batch_total;
        Ok(())
    }

    /// Count one committed lookup batch covering `tracks` queued tracks
    pub fn record_batch(&self, tracks: u64) {
        let mut state = self.lock();
        state.batches_completed += 1;
        state.enriched_count = (state.enriched_count + tracks).min(state.enrich_total);
    }

    /// Enter `EnrichingSecondary` with the number of recordings to tag
    pub fn begin_secondary(&self, secondary_total: u64) -> Result<()> {
        let mut state = self.lock();
        validate_transition(state.phase, ScanPhase::EnrichingSecondary)?;
        state.phase = ScanPhase::EnrichingSecondary;
        state.secondary_total = secondary_total;
        Ok(())
    }

    /// Add recordings processed by tag enrichment
    pub fn record_secondary(&self, recordings: u64) {
        self.lock().secondary_count += recordings;
    }

    /// Finish the running scan successfully
    pub fn finish(&self) -> Result<()> {
        let mut state = self.lock();
        validate_transition(state.phase, ScanPhase::Done)?;
        state.phase = ScanPhase::Done;
        Ok(())
    }

    /// Finish the running scan with an error
    ///
    /// Always leaves the tracker in `Done`, even when called from a phase
    /// that would not normally transition there.
    pub fn fail(&self, message: impl Into<String>) {
        let mut state = self.lock();
        state.phase = ScanPhase::Done;
        state.last_error = Some(message.into());
    }

    /// Acknowledge a finished scan and return to `Idle`
    pub fn reset(&self) -> Result<()> {
        let mut state = self.lock();
        validate_transition(state.phase, ScanPhase::Idle)?;
        *state = ScanState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_id_from_string() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id = ScanId::from_string(uuid_str).unwrap();
        assert_eq!(id.as_str(), uuid_str);
        assert!(ScanId::from_string("not-a-uuid").is_err());
        assert_ne!(ScanId::new(), ScanId::new());
    }

    #[test]
    fn test_phase_round_trip_through_str() {
        for phase in [
            ScanPhase::Idle,
            ScanPhase::ScanningCatalog,
            ScanPhase::EnrichingMetadata,
            ScanPhase::EnrichingSecondary,
            ScanPhase::Done,
        ] {
            assert_eq!(ScanPhase::from_str(phase.as_str()).unwrap(), phase);
        }
        assert!(ScanPhase::from_str("paused").is_err());
    }

    #[test]
    fn test_full_lifecycle() {
        let tracker = ProgressTracker::new();
        let scan_id = ScanId::new();

        assert!(tracker.try_begin(&scan_id, true));
        assert_eq!(tracker.phase(), ScanPhase::ScanningCatalog);

        tracker.record_scanned(500);
        tracker.record_scanned(200);
        tracker.begin_enrichment(700, 1).unwrap();
        tracker.record_batch(700);
        tracker.begin_secondary(650).unwrap();
        tracker.record_secondary(650);
        tracker.finish().unwrap();

        let state = tracker.snapshot();
        assert_eq!(state.phase, ScanPhase::Done);
        assert_eq!(state.scan_id, Some(scan_id.as_str()));
        assert!(state.full);
        assert_eq!(state.scanned_count, 700);
        assert_eq!(state.enriched_count, 700);
        assert_eq!(state.batches_completed, 1);
        assert_eq!(state.secondary_count, 650);
        assert!(state.last_error.is_none());

        tracker.reset().unwrap();
        assert_eq!(tracker.snapshot(), ScanState::default());
    }

    #[test]
    fn test_submission_rejected_while_running() {
        let tracker = ProgressTracker::new();
        assert!(tracker.try_begin(&ScanId::new(), false));
        tracker.record_scanned(10);

        assert!(!tracker.try_begin(&ScanId::new(), true));
        let state = tracker.snapshot();
        assert!(!state.full);
        assert_eq!(state.scanned_count, 10);
    }

    #[test]
    fn test_submission_accepted_after_done_resets_counters() {
        let tracker = ProgressTracker::new();
        assert!(tracker.try_begin(&ScanId::new(), false));
        tracker.record_scanned(10);
        tracker.fail("remote catalog unavailable");

        assert!(tracker.try_begin(&ScanId::new(), true));
        let state = tracker.snapshot();
        assert_eq!(state.phase, ScanPhase::ScanningCatalog);
        assert_eq!(state.scanned_count, 0);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_failure_always_lands_in_done() {
        let tracker = ProgressTracker::new();
        assert!(tracker.try_begin(&ScanId::new(), false));
        tracker.begin_enrichment(3, 1).unwrap();
        tracker.fail("batch 0 failed");

        let state = tracker.snapshot();
        assert_eq!(state.phase, ScanPhase::Done);
        assert_eq!(state.last_error.as_deref(), Some("batch 0 failed"));
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let tracker = ProgressTracker::new();

        let err = tracker.begin_enrichment(1, 1).unwrap_err();
        assert!(matches!(err, SyncError::InvalidStateTransition { .. }));
        assert!(tracker.finish().is_err());
        assert!(tracker.reset().is_err());

        assert!(tracker.try_begin(&ScanId::new(), false));
        assert!(tracker.begin_secondary(1).is_err());
        assert_eq!(tracker.phase(), ScanPhase::ScanningCatalog);
    }

    #[test]
    fn test_enriched_count_never_exceeds_total() {
        let tracker = ProgressTracker::new();
        assert!(tracker.try_begin(&ScanId::new(), false));
        tracker.begin_enrichment(1500, 2).unwrap();
        tracker.record_batch(1000);
        tracker.record_batch(1000);

        let state = tracker.snapshot();
        assert_eq!(state.enriched_count, 1500);
        assert_eq!(state.batches_completed, 2);
    }

    #[test]
    fn test_state_serializes_to_json() {
        let tracker = ProgressTracker::new();
        assert!(tracker.try_begin(&ScanId::new(), true));

        let json = tracker.snapshot().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["phase"], "scanning_catalog");
        assert_eq!(value["full"], true);
        assert_eq!(value["scanned_count"], 0);
    }
}

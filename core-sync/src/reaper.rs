//! # Orphan Reaper
//!
//! Runs once after the catalog pass and every lookup batch have committed.
//!
//! 1. Recordings whose remote id was known before the run but never seen by
//!    it are deleted, `chunk_size` ids per statement.
//! 2. Artists left without any recording association are deleted.
//! 3. Tags left without any recording reference are deleted.
//!
//! Step 1 always precedes 2 and 3, since deleting recordings cascades their
//! associations. Chunks are independent statements; an interrupted reap
//! leaves a consistent library and the next run finishes the job.

use crate::Result;
use bridge_traits::catalog::SourceType;
use core_library::repositories::{ArtistRepository, RecordingRepository, TagRepository};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReapOutcome {
    pub recordings: u64,
    pub artists: u64,
    pub tags: u64,
    /// Delete statements issued for recordings
    pub chunks: u64,
}

pub struct OrphanReaper {
    recordings: Arc<dyn RecordingRepository>,
    artists: Arc<dyn ArtistRepository>,
    tags: Arc<dyn TagRepository>,
    chunk_size: usize,
}

impl OrphanReaper {
    pub fn new(
        recordings: Arc<dyn RecordingRepository>,
        artists: Arc<dyn ArtistRepository>,
        tags: Arc<dyn TagRepository>,
        chunk_size: usize,
    ) -> Self {
        Self {
            recordings,
            artists,
            tags,
            chunk_size: chunk_size.max(1),
        }
    }

    pub async fn reap(&self, source_type: SourceType, unseen: &[&str]) -> Result<ReapOutcome> {
        let mut outcome = ReapOutcome::default();

        for chunk in unseen.chunks(self.chunk_size) {
            let remote_ids: Vec<String> = chunk.iter().map(|id| id.to_string()).collect();
            let deleted = self
                .recordings
                .delete_by_remote_ids(source_type, &remote_ids)
                .await?;
            outcome.recordings += deleted;
            outcome.chunks += 1;
            debug!(chunk = chunk.len(), deleted, "Deleted unseen recordings");
        }

        outcome.artists = self.artists.delete_orphans().await?;
        outcome.tags = self.tags.delete_orphans().await?;

        info!(
            recordings = outcome.recordings,
            artists = outcome.artists,
            tags = outcome.tags,
            chunks = outcome.chunks,
            "Reaped orphaned entries"
        );

        Ok(outcome)
    }
}

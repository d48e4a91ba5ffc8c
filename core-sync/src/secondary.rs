//! Secondary enrichment: tag lookups for persisted recordings.
//!
//! Recordings are processed in chunks. Each chunk issues one tag lookup for
//! its distinct canonical ids and replaces the tag associations of every
//! recording the resolver answered for, inside one transaction. Recordings
//! the resolver did not answer for keep their existing tags.

use crate::{Result, SyncError};
use bridge_traits::metadata::TagResolver;
use core_library::models::{RecordingId, TagAssignment};
use core_library::LibraryTransaction;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A recording to tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTarget {
    pub id: RecordingId,
    pub canonical_id: String,
}

pub struct TagEnricher {
    pool: SqlitePool,
    resolver: Arc<dyn TagResolver>,
    chunk_size: usize,
}

impl TagEnricher {
    pub fn new(pool: SqlitePool, resolver: Arc<dyn TagResolver>, chunk_size: usize) -> Self {
        Self {
            pool,
            resolver,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Tag the given recordings, calling `on_chunk` with the size of every
    /// committed chunk
    ///
    /// # Returns
    /// Number of recordings processed
    pub async fn enrich<F>(&self, targets: &[TagTarget], mut on_chunk: F) -> Result<u64>
    where
        F: FnMut(u64),
    {
        let mut processed = 0;

        for chunk in targets.chunks(self.chunk_size) {
            let mut seen = HashSet::new();
            let ids: Vec<String> = chunk
                .iter()
                .filter(|t| seen.insert(t.canonical_id.as_str()))
                .map(|t| t.canonical_id.clone())
                .collect();

            let resolved = self
                .resolver
                .lookup_tags(&ids)
                .await
                .map_err(|e| SyncError::Resolver(e.to_string()))?;

            let by_id: HashMap<String, Vec<TagAssignment>> = resolved
                .into_iter()
                .map(|entry| {
                    let assignments = entry
                        .tags
                        .into_iter()
                        .map(|tag| TagAssignment::new(tag.name, tag.entity.as_str(), tag.count))
                        .collect();
                    (entry.canonical_id, assignments)
                })
                .collect();

            let mut tx = LibraryTransaction::begin(&self.pool).await?;
            for target in chunk {
                if let Some(tags) = by_id.get(&target.canonical_id) {
                    tx.replace_recording_tags(target.id, tags).await?;
                }
            }
            tx.commit().await?;

            processed += chunk.len() as u64;
            on_chunk(chunk.len() as u64);
            debug!(
                chunk = chunk.len(),
                answered = by_id.len(),
                processed,
                "Committed tag chunk"
            );
        }

        Ok(processed)
    }
}

//! # Enrichment Batcher
//!
//! Groups tracks queued for enrichment into bounded lookup batches.
//!
//! Tracks are keyed by canonical recording id (first-seen order preserved).
//! Every batch holds at most `batch_size` distinct ids and the resolver only
//! ever sees those ids, so lookup volume is bounded by the number of distinct
//! recordings rather than the number of tracks. An id is assigned to exactly
//! one batch, so tracks sharing a recording are resolved by one request even
//! when they were listed far apart.

use bridge_traits::catalog::RemoteTrack;
use std::collections::HashMap;

/// One bounded lookup unit
#[derive(Debug, Clone, PartialEq)]
pub struct LookupBatch {
    /// Zero-based position among the run's batches
    pub index: u64,
    /// Distinct canonical ids, in first-seen order
    pub ids: Vec<String>,
    /// Originating tracks of each canonical id
    pub tracks: HashMap<String, Vec<RemoteTrack>>,
}

impl LookupBatch {
    /// Number of tracks covered by the batch
    pub fn track_count(&self) -> usize {
        self.tracks.values().map(Vec::len).sum()
    }

    pub fn tracks_for(&self, canonical_id: &str) -> &[RemoteTrack] {
        self.tracks
            .get(canonical_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Accumulates queued tracks and splits them into lookup batches
#[derive(Debug)]
pub struct EnrichmentBatcher {
    batch_size: usize,
    order: Vec<String>,
    tracks: HashMap<String, Vec<RemoteTrack>>,
    queued: usize,
}

impl EnrichmentBatcher {
    /// Create a batcher; a zero batch size is treated as one
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            order: Vec::new(),
            tracks: HashMap::new(),
            queued: 0,
        }
    }

    /// Queue a track; tracks without a canonical id are ignored
    pub fn push(&mut self, track: RemoteTrack) {
        let Some(canonical_id) = track.canonical_id().map(str::to_string) else {
            return;
        };

        self.queued += 1;
        match self.tracks.get_mut(&canonical_id) {
            Some(tracks) => tracks.push(track),
            None => {
                self.order.push(canonical_id.clone());
                self.tracks.insert(canonical_id, vec![track]);
            }
        }
    }

    /// Number of queued tracks
    pub fn queued_tracks(&self) -> usize {
        self.queued
    }

    pub fn distinct_ids(&self) -> usize {
        self.order.len()
    }

    /// Number of batches [`into_batches`](Self::into_batches) will produce
    pub fn batch_count(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }

    pub fn into_batches(mut self) -> Vec<LookupBatch> {
        let batch_size = self.batch_size;
        self.order
            .chunks(batch_size)
            .enumerate()
            .map(|(index, ids)| {
                let tracks = ids
                    .iter()
                    .filter_map(|id| self.tracks.remove_entry(id))
                    .collect();
                LookupBatch {
                    index: index as u64,
                    ids: ids.to_vec(),
                    tracks,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, canonical: &str) -> RemoteTrack {
        RemoteTrack {
            id: id.to_string(),
            canonical_recording_id: Some(canonical.to_string()),
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            duration_secs: 60,
            track_number: None,
            disc_number: None,
        }
    }

    #[test]
    fn test_duplicate_rips_share_one_id() {
        let mut batcher = EnrichmentBatcher::new(1000);
        batcher.push(track("s1", "r1"));
        batcher.push(track("s2", "r2"));
        batcher.push(track("s3", "r1"));
        batcher.push(track("s4", " r1 "));

        assert_eq!(batcher.queued_tracks(), 4);
        assert_eq!(batcher.distinct_ids(), 2);

        let batches = batcher.into_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].ids, vec!["r1".to_string(), "r2".to_string()]);
        assert_eq!(batches[0].track_count(), 4);

        let remote_ids: Vec<_> = batches[0]
            .tracks_for("r1")
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(remote_ids, vec!["s1", "s3", "s4"]);
    }

    #[test]
    fn test_batches_bounded_by_distinct_ids() {
        let mut batcher = EnrichmentBatcher::new(1000);
        for i in 0..1500 {
            batcher.push(track(&format!("s{i}"), &format!("r{i}")));
        }
        // A late duplicate of an id from the first batch does not open a new request
        batcher.push(track("late", "r3"));
        assert_eq!(batcher.batch_count(), 2);

        let batches = batcher.into_batches();
        let sizes: Vec<_> = batches.iter().map(|b| b.ids.len()).collect();
        assert_eq!(sizes, vec![1000, 500]);
        assert_eq!(batches[0].index, 0);
        assert_eq!(batches[1].index, 1);
        assert_eq!(batches[0].track_count(), 1001);
        assert_eq!(batches[0].tracks_for("r3").len(), 2);
    }

    #[test]
    fn test_tracks_without_canonical_id_ignored() {
        let mut batcher = EnrichmentBatcher::new(10);
        let mut bare = track("s1", "r1");
        bare.canonical_recording_id = None;
        batcher.push(bare);

        assert_eq!(batcher.queued_tracks(), 0);
        assert!(batcher.into_batches().is_empty());
    }

    #[test]
    fn test_tracks_follow_id_order() {
        let mut batcher = EnrichmentBatcher::new(2);
        batcher.push(track("s1", "r1"));
        batcher.push(track("s2", "r2"));
        batcher.push(track("s3", "r1"));
        batcher.push(track("s4", "r3"));

        let batches = batcher.into_batches();
        let remote_ids = |batch: &LookupBatch| -> Vec<String> {
            batch
                .ids
                .iter()
                .flat_map(|id| batch.tracks_for(id))
                .map(|track| track.id.clone())
                .collect()
        };
        assert_eq!(remote_ids(&batches[0]), vec!["s1", "s3", "s2"]);
        assert_eq!(remote_ids(&batches[1]), vec!["s4"]);
    }
}

//! Diff classification of remote tracks against the known-state snapshot.

use crate::snapshot::KnownStateSnapshot;
use bridge_traits::catalog::RemoteTrack;
use std::collections::HashSet;

/// Outcome of classifying one remote track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Track has no canonical recording id; it is neither written nor marked seen
    Skip,
    /// Incremental mode and the snapshot already holds the same canonical id
    Current,
    /// Track must be resolved and written
    Enqueue,
}

/// Decides per track whether it needs enrichment
#[derive(Debug, Clone, Copy)]
pub struct DiffClassifier {
    full: bool,
}

impl DiffClassifier {
    pub fn new(full: bool) -> Self {
        Self { full }
    }

    pub fn classify(&self, track: &RemoteTrack, snapshot: &KnownStateSnapshot) -> Classification {
        let Some(canonical_id) = track.canonical_id() else {
            return Classification::Skip;
        };

        if !self.full && snapshot.canonical_for(&track.id) == Some(canonical_id) {
            return Classification::Current;
        }

        Classification::Enqueue
    }
}

/// Remote ids observed by one run
///
/// Owned by a single scan and handed to the orphan reaper once all batches
/// have committed. Current tracks are inserted during classification;
/// enqueued tracks only after their batch commits.
#[derive(Debug, Clone, Default)]
pub struct SeenRemoteIds {
    ids: HashSet<String>,
}

impl SeenRemoteIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, remote_id: impl Into<String>) {
        self.ids.insert(remote_id.into());
    }

    pub fn extend<I, S>(&mut self, remote_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.extend(remote_ids.into_iter().map(Into::into));
    }

    pub fn contains(&self, remote_id: &str) -> bool {
        self.ids.contains(remote_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Remote ids known before the run but never observed, in sorted order
    pub fn unseen<'a>(&self, snapshot: &'a KnownStateSnapshot) -> Vec<&'a str> {
        let mut unseen: Vec<&str> = snapshot
            .remote_ids()
            .filter(|remote_id| !self.contains(remote_id))
            .collect();
        unseen.sort_unstable();
        unseen
    }
}

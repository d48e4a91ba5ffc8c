//! # Upsert Writer
//!
//! Materializes one resolved lookup batch inside a single library
//! transaction.
//!
//! ## Field fallbacks
//!
//! | Field                | Resolved value            | Fallback                          |
//! |----------------------|---------------------------|-----------------------------------|
//! | title                | canonical title           | remote title                      |
//! | release name         | canonical release name    | remote album, release id null     |
//! | artist name, credits | canonical artist credit   | remote artist, no credits         |
//! | duration             | canonical milliseconds    | remote seconds × 1000             |
//! | track / disc number  | -                         | remote value, else 1              |
//!
//! ## Target row
//!
//! 1. The snapshot holds the exact (remote id, canonical id) pair: replace that row.
//! 2. The snapshot holds the remote id under another canonical id: replace
//!    that row in place.
//! 3. Otherwise insert.
//!
//! Replacing a row deletes its artist associations before the new credit
//! list is linked. Any failure rolls the whole batch back.

use crate::batcher::LookupBatch;
use crate::resolver::Resolution;
use crate::snapshot::{ArtistRemoteFields, KnownStateSnapshot};
use crate::{Result, SyncError};
use bridge_traits::catalog::{RemoteTrack, SourceType};
use bridge_traits::metadata::{CreditedArtist, ResolvedRecording};
use bridge_traits::time::Clock;
use core_library::models::{Artist, RecordingDraft, RecordingId};
use core_library::{LibraryError, LibraryTransaction};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Run-scoped lookups the writer needs besides the batch itself
pub struct WriteContext<'a> {
    pub snapshot: &'a KnownStateSnapshot,
    /// Artists inserted by earlier batches of this run
    pub inserted_artists: &'a HashSet<String>,
    /// Remote fields learned from the artist index for artists not yet persisted
    pub pending_artist_fields: &'a HashMap<String, ArtistRemoteFields>,
}

/// A recording row created by a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedRecording {
    pub id: RecordingId,
    pub canonical_id: String,
}

/// What a committed batch wrote
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub inserted: Vec<InsertedRecording>,
    pub replaced: u64,
    /// Canonical ids of artists created by the batch
    pub new_artists: Vec<String>,
    /// Remote ids written by the batch
    pub written: Vec<String>,
}

pub struct UpsertWriter {
    pool: SqlitePool,
    source_type: SourceType,
    clock: Arc<dyn Clock>,
}

impl UpsertWriter {
    pub fn new(pool: SqlitePool, source_type: SourceType, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            source_type,
            clock,
        }
    }

    /// Write every resolved record of the batch in one transaction
    ///
    /// # Errors
    ///
    /// `SyncError::BatchWrite` carrying the batch index. Nothing from the
    /// batch is committed in that case.
    pub async fn write_batch(
        &self,
        batch: &LookupBatch,
        resolution: &Resolution,
        ctx: &WriteContext<'_>,
    ) -> Result<BatchOutcome> {
        let to_batch_error = |source: LibraryError| SyncError::BatchWrite {
            batch_index: batch.index,
            source,
        };

        let mut tx = LibraryTransaction::begin(&self.pool)
            .await
            .map_err(to_batch_error)?;

        match self.write_records(&mut tx, batch, resolution, ctx).await {
            Ok(outcome) => {
                tx.commit().await.map_err(to_batch_error)?;
                debug!(
                    batch_index = batch.index,
                    inserted = outcome.inserted.len(),
                    replaced = outcome.replaced,
                    new_artists = outcome.new_artists.len(),
                    "Committed lookup batch"
                );
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        batch_index = batch.index,
                        error = %rollback_err,
                        "Rollback after failed batch write also failed"
                    );
                }
                Err(to_batch_error(e))
            }
        }
    }

    async fn write_records(
        &self,
        tx: &mut LibraryTransaction,
        batch: &LookupBatch,
        resolution: &Resolution,
        ctx: &WriteContext<'_>,
    ) -> std::result::Result<BatchOutcome, LibraryError> {
        let now = self.clock.unix_timestamp();
        let mut outcome = BatchOutcome::default();
        let mut linked_artists: HashSet<String> = HashSet::new();
        let mut inserted_ids: HashSet<RecordingId> = HashSet::new();

        for canonical_id in &batch.ids {
            let Some(record) = resolution.records.get(canonical_id) else {
                continue;
            };

            for track in batch.tracks_for(canonical_id) {
                let (draft, credits) = build_draft(track, record, self.source_type, now);

                for artist in &credits {
                    if ctx.snapshot.knows_artist(&artist.id)
                        || ctx.inserted_artists.contains(&artist.id)
                        || linked_artists.contains(&artist.id)
                    {
                        continue;
                    }
                    let fields = ctx
                        .pending_artist_fields
                        .get(&artist.id)
                        .cloned()
                        .unwrap_or_default();
                    let row = Artist::new(&artist.id, &artist.name)
                        .with_remote(fields.remote_name, fields.remote_id);
                    if tx.insert_artist_if_absent(&row).await? {
                        outcome.new_artists.push(artist.id.clone());
                    }
                    linked_artists.insert(artist.id.clone());
                }

                let target = ctx
                    .snapshot
                    .surrogate_for(&track.id, &draft.canonical_id)
                    .or_else(|| ctx.snapshot.surrogate_for_remote(&track.id));

                let recording_id = match target {
                    Some(id) => {
                        tx.replace_recording(id, &draft).await?;
                        outcome.replaced += 1;
                        id
                    }
                    None => {
                        // A remote id listed twice upserts onto the same row
                        let id = tx.insert_recording(&draft).await?;
                        if inserted_ids.insert(id) {
                            outcome.inserted.push(InsertedRecording {
                                id,
                                canonical_id: draft.canonical_id.clone(),
                            });
                        }
                        id
                    }
                };

                let artist_ids: Vec<String> = credits.into_iter().map(|a| a.id).collect();
                tx.replace_recording_artists(recording_id, &artist_ids)
                    .await?;
                outcome.written.push(track.id.clone());
            }
        }

        Ok(outcome)
    }
}

/// Column values for one track, plus the canonical artist credits to link
pub fn build_draft(
    track: &RemoteTrack,
    record: &ResolvedRecording,
    source_type: SourceType,
    now: i64,
) -> (RecordingDraft, Vec<CreditedArtist>) {
    let (release_name, canonical_release_id) = match &record.release {
        Some(release) => (release.name.clone(), Some(release.id.clone())),
        None => (track.album.clone(), None),
    };

    let (artist_name, credits) = match &record.artist_credit {
        Some(credit) => (credit.name.clone(), credit.artists.clone()),
        None => (track.artist.clone(), Vec::new()),
    };

    let duration_ms = match record.duration_ms {
        Some(ms) if ms > 0 => ms,
        _ => i64::from(track.duration_secs) * 1000,
    };

    let draft = RecordingDraft {
        remote_id: track.id.clone(),
        source_type,
        canonical_id: record.canonical_id.clone(),
        title: record.title.clone().unwrap_or_else(|| track.title.clone()),
        artist_name,
        release_name,
        canonical_artist_id: credits.first().map(|a| a.id.clone()),
        canonical_release_id,
        duration_ms,
        track_number: i64::from(track.track_number.unwrap_or(1)),
        disc_number: i64::from(track.disc_number.unwrap_or(1)),
        updated_at: now,
    };

    (draft, credits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::metadata::{ArtistCredit, ReleaseRef};

    fn track() -> RemoteTrack {
        RemoteTrack {
            id: "s1".to_string(),
            canonical_recording_id: Some("r1".to_string()),
            title: "Remote Title".to_string(),
            artist: "Remote Artist".to_string(),
            album: "Remote Album".to_string(),
            duration_secs: 215,
            track_number: Some(4),
            disc_number: None,
        }
    }

    #[test]
    fn test_bare_record_uses_remote_fallbacks() {
        let (draft, credits) = build_draft(
            &track(),
            &ResolvedRecording::bare("r1"),
            SourceType::Subsonic,
            1_700_000_000,
        );

        assert!(credits.is_empty());
        assert_eq!(draft.canonical_id, "r1");
        assert_eq!(draft.title, "Remote Title");
        assert_eq!(draft.release_name, "Remote Album");
        assert_eq!(draft.canonical_release_id, None);
        assert_eq!(draft.artist_name, "Remote Artist");
        assert_eq!(draft.canonical_artist_id, None);
        assert_eq!(draft.duration_ms, 215_000);
        assert_eq!(draft.track_number, 4);
        assert_eq!(draft.disc_number, 1);
        assert_eq!(draft.updated_at, 1_700_000_000);
    }

    #[test]
    fn test_resolved_record_wins() {
        let record = ResolvedRecording {
            canonical_id: "r1".to_string(),
            title: Some("Canonical Title".to_string()),
            duration_ms: Some(214_533),
            release: Some(ReleaseRef {
                id: "rel-1".to_string(),
                name: "Canonical Release".to_string(),
            }),
            artist_credit: Some(ArtistCredit {
                name: "A feat. B".to_string(),
                artists: vec![
                    CreditedArtist {
                        id: "a".to_string(),
                        name: "A".to_string(),
                    },
                    CreditedArtist {
                        id: "b".to_string(),
                        name: "B".to_string(),
                    },
                ],
            }),
        };

        let (draft, credits) = build_draft(&track(), &record, SourceType::Subsonic, 0);

        assert_eq!(draft.title, "Canonical Title");
        assert_eq!(draft.release_name, "Canonical Release");
        assert_eq!(draft.canonical_release_id.as_deref(), Some("rel-1"));
        assert_eq!(draft.artist_name, "A feat. B");
        assert_eq!(draft.canonical_artist_id.as_deref(), Some("a"));
        assert_eq!(draft.duration_ms, 214_533);
        assert_eq!(credits.len(), 2);
    }

    #[test]
    fn test_zero_duration_falls_back_to_remote() {
        let mut record = ResolvedRecording::bare("r1");
        record.duration_ms = Some(0);
        let (draft, _) = build_draft(&track(), &record, SourceType::Subsonic, 0);
        assert_eq!(draft.duration_ms, 215_000);
    }

    #[test]
    fn test_credit_without_artists_has_no_canonical_artist() {
        let mut record = ResolvedRecording::bare("r1");
        record.artist_credit = Some(ArtistCredit {
            name: "Various".to_string(),
            artists: Vec::new(),
        });
        let (draft, credits) = build_draft(&track(), &record, SourceType::Subsonic, 0);
        assert_eq!(draft.artist_name, "Various");
        assert_eq!(draft.canonical_artist_id, None);
        assert!(credits.is_empty());
    }
}

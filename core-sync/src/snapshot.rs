//! Known-state snapshot
//!
//! Prior local mappings for one source type, loaded once per scan before any
//! track is classified. The snapshot is never mutated during the run; tracks
//! observed by the run are tracked separately in
//! [`SeenRemoteIds`](crate::classifier::SeenRemoteIds).

use crate::Result;
use bridge_traits::catalog::SourceType;
use core_library::models::RecordingId;
use core_library::repositories::{ArtistRepository, RecordingRepository};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Remote fields stored on a persisted artist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistRemoteFields {
    pub remote_name: Option<String>,
    pub remote_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct KnownStateSnapshot {
    source_type: Option<SourceType>,
    canonical_by_remote: HashMap<String, String>,
    surrogate_by_pair: HashMap<(String, String), RecordingId>,
    artists: HashMap<String, ArtistRemoteFields>,
}

impl KnownStateSnapshot {
    /// Load the snapshot for one source type
    pub async fn load(
        source_type: SourceType,
        recordings: &dyn RecordingRepository,
        artists: &dyn ArtistRepository,
    ) -> Result<Self> {
        let known = recordings.list_known(source_type).await?;
        let persisted_artists = artists.list_all().await?;

        let mut snapshot = Self {
            source_type: Some(source_type),
            ..Self::default()
        };

        for recording in known {
            snapshot.surrogate_by_pair.insert(
                (recording.remote_id.clone(), recording.canonical_id.clone()),
                recording.id,
            );
            snapshot
                .canonical_by_remote
                .insert(recording.remote_id, recording.canonical_id);
        }

        for artist in persisted_artists {
            snapshot.artists.insert(
                artist.id,
                ArtistRemoteFields {
                    remote_name: artist.remote_name,
                    remote_id: artist.remote_id,
                },
            );
        }

        debug!(
            source_type = %source_type,
            recordings = snapshot.canonical_by_remote.len(),
            artists = snapshot.artists.len(),
            "Loaded known-state snapshot"
        );

        Ok(snapshot)
    }

    pub fn source_type(&self) -> Option<SourceType> {
        self.source_type
    }

    /// Last-known canonical recording id of a remote track
    pub fn canonical_for(&self, remote_id: &str) -> Option<&str> {
        self.canonical_by_remote.get(remote_id).map(String::as_str)
    }

    /// Surrogate id of the row mirroring this exact (remote id, canonical id) pair
    pub fn surrogate_for(&self, remote_id: &str, canonical_id: &str) -> Option<RecordingId> {
        self.surrogate_by_pair
            .get(&(remote_id.to_string(), canonical_id.to_string()))
            .copied()
    }

    /// Surrogate id of the row mirroring a remote track, whatever its canonical id
    pub fn surrogate_for_remote(&self, remote_id: &str) -> Option<RecordingId> {
        let canonical_id = self.canonical_for(remote_id)?;
        self.surrogate_for(remote_id, canonical_id)
    }

    pub fn knows_artist(&self, artist_id: &str) -> bool {
        self.artists.contains_key(artist_id)
    }

    pub fn artist_remote_fields(&self, artist_id: &str) -> Option<&ArtistRemoteFields> {
        self.artists.get(artist_id)
    }

    /// Every remote id persisted before the run
    pub fn remote_ids(&self) -> impl Iterator<Item = &str> {
        self.canonical_by_remote.keys().map(String::as_str)
    }

    pub fn recording_count(&self) -> usize {
        self.canonical_by_remote.len()
    }

    #[cfg(test)]
    pub(crate) fn with_recording(
        mut self,
        id: RecordingId,
        remote_id: &str,
        canonical_id: &str,
    ) -> Self {
        self.surrogate_by_pair
            .insert((remote_id.to_string(), canonical_id.to_string()), id);
        self.canonical_by_remote
            .insert(remote_id.to_string(), canonical_id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::db::create_test_pool;
    use core_library::models::{Artist, RecordingDraft};
    use core_library::repositories::{SqliteArtistRepository, SqliteRecordingRepository};
    use core_library::LibraryTransaction;

    fn draft(remote_id: &str, canonical_id: &str, source_type: SourceType) -> RecordingDraft {
        RecordingDraft {
            remote_id: remote_id.to_string(),
            source_type,
            canonical_id: canonical_id.to_string(),
            title: "T".to_string(),
            artist_name: "A".to_string(),
            release_name: "R".to_string(),
            canonical_artist_id: None,
            canonical_release_id: None,
            duration_ms: 1,
            track_number: 1,
            disc_number: 1,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn test_load_maps_only_requested_source() {
        let pool = create_test_pool().await.unwrap();
        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        let s1 = tx
            .insert_recording(&draft("s1", "r1", SourceType::Subsonic))
            .await
            .unwrap();
        tx.insert_recording(&draft("/a.flac", "r2", SourceType::FilePath))
            .await
            .unwrap();
        tx.insert_artist_if_absent(
            &Artist::new("a1", "Alpha").with_remote(Some("alpha".to_string()), None),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let snapshot = KnownStateSnapshot::load(
            SourceType::Subsonic,
            &SqliteRecordingRepository::new(pool.clone()),
            &SqliteArtistRepository::new(pool),
        )
        .await
        .unwrap();

        assert_eq!(snapshot.source_type(), Some(SourceType::Subsonic));
        assert_eq!(snapshot.recording_count(), 1);
        assert_eq!(snapshot.canonical_for("s1"), Some("r1"));
        assert_eq!(snapshot.surrogate_for("s1", "r1"), Some(s1));
        assert_eq!(snapshot.surrogate_for("s1", "r2"), None);
        assert_eq!(snapshot.surrogate_for_remote("s1"), Some(s1));
        assert_eq!(snapshot.canonical_for("/a.flac"), None);

        assert!(snapshot.knows_artist("a1"));
        assert_eq!(
            snapshot
                .artist_remote_fields("a1")
                .and_then(|f| f.remote_name.as_deref()),
            Some("alpha")
        );
        assert!(!snapshot.knows_artist("a2"));
    }
}

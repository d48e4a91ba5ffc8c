//! Reconciliation of the remote artist index with persisted artists.
//!
//! Some servers report a canonical id for each entry of their artist index.
//! Persisted artists get the server's name and id stored next to their
//! canonical name; artists that do not exist yet are remembered so the
//! upsert writer can stamp the same fields when it creates them.

use crate::snapshot::{ArtistRemoteFields, KnownStateSnapshot};
use crate::Result;
use bridge_traits::catalog::RemoteArtist;
use core_library::models::Artist;
use core_library::repositories::ArtistRepository;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ArtistIndexOutcome {
    /// Persisted artists whose remote fields changed
    pub updated: u64,
    /// Remote fields for artists not persisted yet, keyed by canonical id
    pub pending: HashMap<String, ArtistRemoteFields>,
}

pub struct ArtistIndexReconciler {
    artists: Arc<dyn ArtistRepository>,
}

impl ArtistIndexReconciler {
    pub fn new(artists: Arc<dyn ArtistRepository>) -> Self {
        Self { artists }
    }

    pub async fn reconcile(
        &self,
        index: &[RemoteArtist],
        snapshot: &KnownStateSnapshot,
    ) -> Result<ArtistIndexOutcome> {
        let mut outcome = ArtistIndexOutcome::default();
        let mut updates = Vec::new();

        for entry in index {
            let Some(canonical_id) = entry
                .canonical_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
            else {
                continue;
            };

            let fields = ArtistRemoteFields {
                remote_name: Some(entry.name.clone()),
                remote_id: Some(entry.id.clone()),
            };

            match snapshot.artist_remote_fields(canonical_id) {
                Some(stored) if *stored == fields => {}
                Some(_) => updates.push(
                    Artist::new(canonical_id, &entry.name)
                        .with_remote(fields.remote_name, fields.remote_id),
                ),
                None => {
                    outcome.pending.insert(canonical_id.to_string(), fields);
                }
            }
        }

        outcome.updated = self.artists.update_remote_fields(&updates).await?;

        debug!(
            index_entries = index.len(),
            updated = outcome.updated,
            pending = outcome.pending.len(),
            "Reconciled remote artist index"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::catalog::SourceType;
    use core_library::db::create_test_pool;
    use core_library::repositories::{SqliteArtistRepository, SqliteRecordingRepository};
    use core_library::LibraryTransaction;

    fn entry(id: &str, name: &str, canonical: Option<&str>) -> RemoteArtist {
        RemoteArtist {
            id: id.to_string(),
            name: name.to_string(),
            canonical_id: canonical.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_reconcile_updates_changed_and_remembers_new() {
        let pool = create_test_pool().await.unwrap();
        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        tx.insert_artist_if_absent(&Artist::new("a1", "Alpha"))
            .await
            .unwrap();
        tx.insert_artist_if_absent(
            &Artist::new("a2", "Beta")
                .with_remote(Some("beta".to_string()), Some("ar-2".to_string())),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let artists = Arc::new(SqliteArtistRepository::new(pool.clone()));
        let snapshot = KnownStateSnapshot::load(
            SourceType::Subsonic,
            &SqliteRecordingRepository::new(pool.clone()),
            artists.as_ref(),
        )
        .await
        .unwrap();

        let reconciler = ArtistIndexReconciler::new(artists.clone());
        let outcome = reconciler
            .reconcile(
                &[
                    entry("ar-1", "alpha (remote)", Some("a1")),
                    entry("ar-2", "beta", Some("a2")),
                    entry("ar-3", "gamma", Some("a3")),
                    entry("ar-4", "no id", None),
                    entry("ar-5", "blank id", Some(" ")),
                ],
                &snapshot,
            )
            .await
            .unwrap();

        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.pending.len(), 1);
        assert_eq!(
            outcome.pending.get("a3"),
            Some(&ArtistRemoteFields {
                remote_name: Some("gamma".to_string()),
                remote_id: Some("ar-3".to_string()),
            })
        );

        let a1 = artists.find_by_id("a1").await.unwrap().unwrap();
        assert_eq!(a1.name, "Alpha");
        assert_eq!(a1.remote_name.as_deref(), Some("alpha (remote)"));
        assert_eq!(a1.remote_id.as_deref(), Some("ar-1"));
    }

    #[tokio::test]
    async fn test_empty_index_writes_nothing() {
        let pool = create_test_pool().await.unwrap();
        let artists = Arc::new(SqliteArtistRepository::new(pool));
        let outcome = ArtistIndexReconciler::new(artists)
            .reconcile(&[], &KnownStateSnapshot::default())
            .await
            .unwrap();
        assert_eq!(outcome.updated, 0);
        assert!(outcome.pending.is_empty());
    }
}

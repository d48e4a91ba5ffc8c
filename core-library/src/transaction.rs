//! # Library Transaction
//!
//! Groups the writes of one enrichment batch so they commit or roll back
//! together.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut tx = LibraryTransaction::begin(&pool).await?;
//! let id = tx.insert_recording(&draft).await?;
//! tx.insert_artist_if_absent(&artist).await?;
//! tx.replace_recording_artists(id, &[artist.id.clone()]).await?;
//! tx.commit().await?;
//! ```
//!
//! Dropping a `LibraryTransaction` without calling [`commit`](LibraryTransaction::commit)
//! rolls it back.

use crate::error::{LibraryError, Result};
use crate::models::{Artist, RecordingDraft, RecordingId, TagAssignment};
use sqlx::{query, query_as, Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;

/// An open write transaction on the library database
pub struct LibraryTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl LibraryTransaction {
    /// Open a transaction on the pool
    pub async fn begin(pool: &SqlitePool) -> Result<Self> {
        let tx = pool.begin().await?;
        Ok(Self { tx })
    }

    /// Insert a recording, or overwrite the row already mirroring the same
    /// remote track
    ///
    /// # Returns
    /// Surrogate id of the written row
    pub async fn insert_recording(&mut self, draft: &RecordingDraft) -> Result<RecordingId> {
        validate_draft(draft)?;

        let (id,): (RecordingId,) = query_as(
            r#"
            INSERT INTO recordings (
                remote_id, source_type, canonical_id, title, artist_name, release_name,
                canonical_artist_id, canonical_release_id, duration_ms, track_number,
                disc_number, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (remote_id, source_type) DO UPDATE SET
                canonical_id = excluded.canonical_id,
                title = excluded.title,
                artist_name = excluded.artist_name,
                release_name = excluded.release_name,
                canonical_artist_id = excluded.canonical_artist_id,
                canonical_release_id = excluded.canonical_release_id,
                duration_ms = excluded.duration_ms,
                track_number = excluded.track_number,
                disc_number = excluded.disc_number,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(&draft.remote_id)
        .bind(draft.source_type.as_str())
        .bind(&draft.canonical_id)
        .bind(&draft.title)
        .bind(&draft.artist_name)
        .bind(&draft.release_name)
        .bind(&draft.canonical_artist_id)
        .bind(&draft.canonical_release_id)
        .bind(draft.duration_ms)
        .bind(draft.track_number)
        .bind(draft.disc_number)
        .bind(draft.updated_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    /// Replace every column of an existing recording in place
    ///
    /// # Errors
    /// `LibraryError::NotFound` if no row has the given id
    pub async fn replace_recording(
        &mut self,
        id: RecordingId,
        draft: &RecordingDraft,
    ) -> Result<()> {
        validate_draft(draft)?;

        let result = query(
            r#"
            UPDATE recordings
            SET remote_id = ?, source_type = ?, canonical_id = ?, title = ?,
                artist_name = ?, release_name = ?, canonical_artist_id = ?,
                canonical_release_id = ?, duration_ms = ?, track_number = ?,
                disc_number = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&draft.remote_id)
        .bind(draft.source_type.as_str())
        .bind(&draft.canonical_id)
        .bind(&draft.title)
        .bind(&draft.artist_name)
        .bind(&draft.release_name)
        .bind(&draft.canonical_artist_id)
        .bind(&draft.canonical_release_id)
        .bind(draft.duration_ms)
        .bind(draft.track_number)
        .bind(draft.disc_number)
        .bind(draft.updated_at)
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Recording".to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }

    /// Insert an artist unless one with the same canonical id exists
    ///
    /// # Returns
    /// `true` if a row was inserted
    pub async fn insert_artist_if_absent(&mut self, artist: &Artist) -> Result<bool> {
        artist.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Artist".to_string(),
            message: e,
        })?;

        let result = query(
            r#"
            INSERT INTO artists (id, name, remote_name, remote_id)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&artist.id)
        .bind(&artist.name)
        .bind(&artist.remote_name)
        .bind(&artist.remote_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the artist associations of a recording
    ///
    /// Existing associations are deleted before the new set is inserted.
    /// Duplicate ids keep their first credit position.
    pub async fn replace_recording_artists(
        &mut self,
        recording_id: RecordingId,
        artist_ids: &[String],
    ) -> Result<()> {
        query("DELETE FROM recording_artists WHERE recording_id = ?")
            .bind(recording_id)
            .execute(&mut *self.tx)
            .await?;

        let mut linked = HashSet::new();
        for (position, artist_id) in artist_ids.iter().enumerate() {
            if !linked.insert(artist_id.as_str()) {
                continue;
            }

            query(
                "INSERT INTO recording_artists (recording_id, artist_id, position) VALUES (?, ?, ?)",
            )
            .bind(recording_id)
            .bind(artist_id)
            .bind(position as i64)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    /// Replace the tag associations of a recording, creating missing tags
    pub async fn replace_recording_tags(
        &mut self,
        recording_id: RecordingId,
        tags: &[TagAssignment],
    ) -> Result<()> {
        query("DELETE FROM recording_tags WHERE recording_id = ?")
            .bind(recording_id)
            .execute(&mut *self.tx)
            .await?;

        for tag in tags {
            let name = tag.name.trim();
            if name.is_empty() {
                continue;
            }

            let (tag_id,): (i64,) = query_as(
                r#"
                INSERT INTO tags (name) VALUES (?)
                ON CONFLICT (name) DO UPDATE SET name = excluded.name
                RETURNING id
                "#,
            )
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await?;

            query(
                r#"
                INSERT INTO recording_tags (recording_id, tag_id, entity, vote_count)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (recording_id, tag_id, entity) DO UPDATE SET
                    vote_count = excluded.vote_count
                "#,
            )
            .bind(recording_id)
            .bind(tag_id)
            .bind(&tag.entity)
            .bind(tag.vote_count)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    /// Commit all writes
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Discard all writes
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn validate_draft(draft: &RecordingDraft) -> Result<()> {
    draft.validate().map_err(|e| LibraryError::InvalidInput {
        field: "Recording".to_string(),
        message: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::repositories::{RecordingRepository, SqliteRecordingRepository};
    use bridge_traits::catalog::SourceType;

    fn draft(canonical_id: &str, track_number: i64) -> RecordingDraft {
        RecordingDraft {
            remote_id: "s1".to_string(),
            source_type: SourceType::Subsonic,
            canonical_id: canonical_id.to_string(),
            title: "Title".to_string(),
            artist_name: "A & B".to_string(),
            release_name: "Release".to_string(),
            canonical_artist_id: Some("a".to_string()),
            canonical_release_id: None,
            duration_ms: 1_000,
            track_number,
            disc_number: 1,
            updated_at: 10,
        }
    }

    #[tokio::test]
    async fn test_insert_is_keyed_by_remote_track() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteRecordingRepository::new(pool.clone());

        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        let first = tx.insert_recording(&draft("r1", 1)).await.unwrap();
        let second = tx.insert_recording(&draft("r2", 2)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first, second);
        let stored = repo.find_by_id(first).await.unwrap().unwrap();
        assert_eq!(stored.canonical_id, "r2");
        assert_eq!(stored.track_number, 2);
        assert_eq!(repo.count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_recording_in_place() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteRecordingRepository::new(pool.clone());

        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        let id = tx.insert_recording(&draft("r1", 1)).await.unwrap();
        tx.replace_recording(id, &draft("r9", 7)).await.unwrap();
        tx.commit().await.unwrap();

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.canonical_id, "r9");
        assert_eq!(stored.track_number, 7);
    }

    #[tokio::test]
    async fn test_replace_missing_recording_fails() {
        let pool = create_test_pool().await.unwrap();
        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        let err = tx.replace_recording(42, &draft("r1", 1)).await.unwrap_err();
        assert!(matches!(err, LibraryError::NotFound { .. }));
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_replace_artists_deletes_previous_links() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteRecordingRepository::new(pool.clone());

        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        let id = tx.insert_recording(&draft("r1", 1)).await.unwrap();
        for artist_id in ["a", "b", "c"] {
            assert!(tx
                .insert_artist_if_absent(&Artist::new(artist_id, artist_id))
                .await
                .unwrap());
        }
        assert!(!tx
            .insert_artist_if_absent(&Artist::new("a", "again"))
            .await
            .unwrap());
        tx.replace_recording_artists(id, &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        tx.replace_recording_artists(
            id,
            &["c".to_string(), "a".to_string(), "c".to_string()],
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            repo.artist_ids(id).await.unwrap(),
            vec!["c".to_string(), "a".to_string()]
        );
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteRecordingRepository::new(pool.clone());

        {
            let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
            tx.insert_recording(&draft("r1", 1)).await.unwrap();
        }

        assert_eq!(repo.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_draft_rejected() {
        let pool = create_test_pool().await.unwrap();
        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        let err = tx.insert_recording(&draft("", 1)).await.unwrap_err();
        assert!(matches!(err, LibraryError::InvalidInput { .. }));
    }
}

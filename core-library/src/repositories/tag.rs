//! Tag repository trait and implementation

use crate::error::Result;
use crate::models::{RecordingId, TagAssignment};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Tag repository interface
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Tags attached to a recording, ordered by entity then name
    async fn tags_for_recording(&self, recording_id: RecordingId) -> Result<Vec<TagAssignment>>;

    /// Delete every tag that no recording references
    async fn delete_orphans(&self) -> Result<u64>;

    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of TagRepository
pub struct SqliteTagRepository {
    pool: SqlitePool,
}

impl SqliteTagRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for SqliteTagRepository {
    async fn tags_for_recording(&self, recording_id: RecordingId) -> Result<Vec<TagAssignment>> {
        let tags = query_as::<_, TagAssignment>(
            r#"
            SELECT t.name AS name, rt.entity AS entity, rt.vote_count AS vote_count
            FROM recording_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recording_id = ?
            ORDER BY rt.entity, t.name
            "#,
        )
        .bind(recording_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    async fn delete_orphans(&self) -> Result<u64> {
        let result = query(
            r#"
            DELETE FROM tags
            WHERE NOT EXISTS (
                SELECT 1 FROM recording_tags rt WHERE rt.tag_id = tags.id
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM tags")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::RecordingDraft;
    use crate::transaction::LibraryTransaction;
    use bridge_traits::catalog::SourceType;

    fn draft(remote_id: &str) -> RecordingDraft {
        RecordingDraft {
            remote_id: remote_id.to_string(),
            source_type: SourceType::Subsonic,
            canonical_id: format!("rec-{remote_id}"),
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
    async fn test_tags_for_recording_and_orphan_cleanup() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTagRepository::new(pool.clone());

        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        let id = tx.insert_recording(&draft("s1")).await.unwrap();
        tx.replace_recording_tags(
            id,
            &[
                TagAssignment::new("rock", "recording", 3),
                TagAssignment::new("indie", "artist", 1),
            ],
        )
        .await
        .unwrap();
        tx.replace_recording_tags(id, &[TagAssignment::new("rock", "recording", 5)])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let tags = repo.tags_for_recording(id).await.unwrap();
        assert_eq!(tags, vec![TagAssignment::new("rock", "recording", 5)]);

        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.delete_orphans().await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}

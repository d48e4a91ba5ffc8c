//! Recording repository trait and implementation

use crate::error::Result;
use crate::models::{KnownRecording, Recording, RecordingId};
use async_trait::async_trait;
use bridge_traits::catalog::SourceType;
use sqlx::{query_as, QueryBuilder, Sqlite, SqlitePool};

/// Recording repository interface for data access operations
#[async_trait]
pub trait RecordingRepository: Send + Sync {
    /// Find a recording by its surrogate id
    async fn find_by_id(&self, id: RecordingId) -> Result<Option<Recording>>;

    /// Find the recording mirroring a remote track
    async fn find_by_remote_id(
        &self,
        source_type: SourceType,
        remote_id: &str,
    ) -> Result<Option<Recording>>;

    /// Keys of every recording of a source type
    ///
    /// Used once per scan to build the known-state snapshot.
    async fn list_known(&self, source_type: SourceType) -> Result<Vec<KnownRecording>>;

    /// Canonical artist ids credited on a recording, in credit order
    async fn artist_ids(&self, recording_id: RecordingId) -> Result<Vec<String>>;

    /// Delete the recordings of the given remote ids in a single statement
    ///
    /// Callers bound the list size; associations cascade.
    ///
    /// # Returns
    /// Number of recordings removed
    async fn delete_by_remote_ids(
        &self,
        source_type: SourceType,
        remote_ids: &[String],
    ) -> Result<u64>;

    /// Count recordings, optionally restricted to one source type
    async fn count(&self, source_type: Option<SourceType>) -> Result<i64>;
}

/// SQLite implementation of RecordingRepository
pub struct SqliteRecordingRepository {
    pool: SqlitePool,
}

impl SqliteRecordingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordingRepository for SqliteRecordingRepository {
    async fn find_by_id(&self, id: RecordingId) -> Result<Option<Recording>> {
        let recording = query_as::<_, Recording>("SELECT * FROM recordings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(recording)
    }

    async fn find_by_remote_id(
        &self,
        source_type: SourceType,
        remote_id: &str,
    ) -> Result<Option<Recording>> {
        let recording = query_as::<_, Recording>(
            "SELECT * FROM recordings WHERE source_type = ? AND remote_id = ?",
        )
        .bind(source_type.as_str())
        .bind(remote_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(recording)
    }

    async fn list_known(&self, source_type: SourceType) -> Result<Vec<KnownRecording>> {
        let known = query_as::<_, KnownRecording>(
            "SELECT id, remote_id, canonical_id FROM recordings WHERE source_type = ? ORDER BY id",
        )
        .bind(source_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(known)
    }

    async fn artist_ids(&self, recording_id: RecordingId) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = query_as(
            "SELECT artist_id FROM recording_artists WHERE recording_id = ? ORDER BY position",
        )
        .bind(recording_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn delete_by_remote_ids(
        &self,
        source_type: SourceType,
        remote_ids: &[String],
    ) -> Result<u64> {
        if remote_ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("DELETE FROM recordings WHERE source_type = ");
        builder.push_bind(source_type.as_str());
        builder.push(" AND remote_id IN (");
        {
            let mut separated = builder.separated(", ");
            for remote_id in remote_ids {
                separated.push_bind(remote_id.as_str());
            }
        }
        builder.push(")");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn count(&self, source_type: Option<SourceType>) -> Result<i64> {
        let (count,): (i64,) = match source_type {
            Some(source_type) => {
                query_as("SELECT COUNT(*) FROM recordings WHERE source_type = ?")
                    .bind(source_type.as_str())
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                query_as("SELECT COUNT(*) FROM recordings")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(count)
    }
}

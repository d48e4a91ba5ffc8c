//! Artist repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Artist;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};
use tracing::debug;

/// Artist repository interface for data access operations
#[async_trait]
pub trait ArtistRepository: Send + Sync {
    /// Find an artist by its canonical id
    ///
    /// # Returns
    /// - `Ok(Some(artist))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: &str) -> Result<Option<Artist>>;

    /// All persisted artists
    async fn list_all(&self) -> Result<Vec<Artist>>;

    /// Overwrite the remote name and remote id of existing artists
    ///
    /// All updates are applied in one transaction. Unknown ids are skipped.
    ///
    /// # Returns
    /// Number of artists updated
    async fn update_remote_fields(&self, artists: &[Artist]) -> Result<u64>;

    /// Delete every artist without a recording association
    ///
    /// # Returns
    /// Number of artists removed
    async fn delete_orphans(&self) -> Result<u64>;

    /// Count total artists
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of ArtistRepository
pub struct SqliteArtistRepository {
    pool: SqlitePool,
}

impl SqliteArtistRepository {
    /// Create a new SqliteArtistRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Artist>> {
        let artist = query_as::<_, Artist>("SELECT * FROM artists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(artist)
    }

    async fn list_all(&self) -> Result<Vec<Artist>> {
        let artists = query_as::<_, Artist>("SELECT * FROM artists ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(artists)
    }

    async fn update_remote_fields(&self, artists: &[Artist]) -> Result<u64> {
        if artists.is_empty() {
            return Ok(0);
        }

        for artist in artists {
            artist.validate().map_err(|e| LibraryError::InvalidInput {
                field: "Artist".to_string(),
                message: e,
            })?;
        }

        let mut tx = self.pool.begin().await?;
        let mut updated = 0;

        for artist in artists {
            let result = query("UPDATE artists SET remote_name = ?, remote_id = ? WHERE id = ?")
                .bind(&artist.remote_name)
                .bind(&artist.remote_id)
                .bind(&artist.id)
                .execute(&mut *tx)
                .await?;
            updated += result.rows_affected();
        }

        tx.commit().await?;
        debug!(updated, "Updated remote artist fields");

        Ok(updated)
    }

    async fn delete_orphans(&self) -> Result<u64> {
        let result = query(
            r#"
            DELETE FROM artists
            WHERE NOT EXISTS (
                SELECT 1 FROM recording_artists ra WHERE ra.artist_id = artists.id
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM artists")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

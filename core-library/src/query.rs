//! Read-side aggregates over the catalog library.
//!
//! Status pages show which artists were resolved and which tags were found;
//! this module computes those views in a few grouped queries.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::{query_as, FromRow, SqlitePool};

/// Artist with the number of recordings credited to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    pub remote_name: Option<String>,
    pub recording_count: i64,
}

/// Tag with the number of recordings carrying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TagSummary {
    pub name: String,
    pub recording_count: i64,
}

/// Library overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySummary {
    pub artists: Vec<ArtistSummary>,
    pub tags: Vec<TagSummary>,
    pub resolved_recordings: i64,
}

/// Aggregate queries over the library
pub struct LibraryQueryService {
    pool: SqlitePool,
}

impl LibraryQueryService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Artists with at least one recording, tags ordered by usage
    pub async fn summary(&self) -> Result<LibrarySummary> {
        let artists = query_as::<_, ArtistSummary>(
            r#"
            SELECT a.id AS id, a.name AS name, a.remote_name AS remote_name,
                   COUNT(ra.recording_id) AS recording_count
            FROM artists a
            JOIN recording_artists ra ON ra.artist_id = a.id
            GROUP BY a.id
            ORDER BY a.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let tags = query_as::<_, TagSummary>(
            r#"
            SELECT t.name AS name, COUNT(DISTINCT rt.recording_id) AS recording_count
            FROM tags t
            JOIN recording_tags rt ON rt.tag_id = t.id
            GROUP BY t.id
            ORDER BY recording_count DESC, t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let (resolved_recordings,): (i64,) = query_as("SELECT COUNT(*) FROM recordings")
            .fetch_one(&self.pool)
            .await?;

        Ok(LibrarySummary {
            artists,
            tags,
            resolved_recordings,
        })
    }
}

//! Domain models for the catalog library
//!
//! This module contains the persisted entities with validation and database
//! mapping. Recordings are keyed by a local integer surrogate; artists are
//! keyed by their canonical identifier.

use bridge_traits::catalog::SourceType;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Local surrogate key of a recording
pub type RecordingId = i64;

// =============================================================================
// Recording
// =============================================================================

/// A remote track materialized with resolved metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub id: RecordingId,
    /// Remote track identifier
    pub remote_id: String,
    pub source_type: SourceType,
    /// Canonical recording identifier
    pub canonical_id: String,
    pub title: String,
    /// Artist credit as displayed
    pub artist_name: String,
    /// Release name as displayed
    pub release_name: String,
    /// First credited canonical artist, if any
    pub canonical_artist_id: Option<String>,
    pub canonical_release_id: Option<String>,
    pub duration_ms: i64,
    pub track_number: i64,
    pub disc_number: i64,
    /// Unix seconds of the last write
    pub updated_at: i64,
}

impl<'r> FromRow<'r, SqliteRow> for Recording {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let source_type: String = row.try_get("source_type")?;
        let source_type = source_type
            .parse::<SourceType>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Self {
            id: row.try_get("id")?,
            remote_id: row.try_get("remote_id")?,
            source_type,
            canonical_id: row.try_get("canonical_id")?,
            title: row.try_get("title")?,
            artist_name: row.try_get("artist_name")?,
            release_name: row.try_get("release_name")?,
            canonical_artist_id: row.try_get("canonical_artist_id")?,
            canonical_release_id: row.try_get("canonical_release_id")?,
            duration_ms: row.try_get("duration_ms")?,
            track_number: row.try_get("track_number")?,
            disc_number: row.try_get("disc_number")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Column values of a recording about to be inserted or replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingDraft {
    pub remote_id: String,
    pub source_type: SourceType,
    pub canonical_id: String,
    pub title: String,
    pub artist_name: String,
    pub release_name: String,
    pub canonical_artist_id: Option<String>,
    pub canonical_release_id: Option<String>,
    pub duration_ms: i64,
    pub track_number: i64,
    pub disc_number: i64,
    pub updated_at: i64,
}

impl RecordingDraft {
    /// Validate draft data
    pub fn validate(&self) -> Result<(), String> {
        if self.remote_id.trim().is_empty() {
            return Err("Remote id cannot be empty".to_string());
        }

        if self.canonical_id.trim().is_empty() {
            return Err("Canonical recording id cannot be empty".to_string());
        }

        if self.duration_ms < 0 {
            return Err("Duration cannot be negative".to_string());
        }

        Ok(())
    }
}

/// Keys of a persisted recording, used to diff a scan against local state
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct KnownRecording {
    pub id: RecordingId,
    pub remote_id: String,
    pub canonical_id: String,
}

// =============================================================================
// Artist
// =============================================================================

/// Canonical artist, optionally matched to the remote artist index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Artist {
    /// Canonical artist identifier
    pub id: String,
    /// Canonical display name
    pub name: String,
    /// Name used by the remote artist index
    pub remote_name: Option<String>,
    /// Identifier in the remote artist index
    pub remote_id: Option<String>,
}

impl Artist {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            remote_name: None,
            remote_id: None,
        }
    }

    pub fn with_remote(mut self, remote_name: Option<String>, remote_id: Option<String>) -> Self {
        self.remote_name = remote_name;
        self.remote_id = remote_id;
        self
    }

    /// Validate artist data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Artist id cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Association between a recording and one credited artist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RecordingArtist {
    pub recording_id: RecordingId,
    pub artist_id: String,
    /// Position in the artist credit
    pub position: i64,
}

// =============================================================================
// Tags
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// One tag vote to attach to a recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TagAssignment {
    pub name: String,
    /// Upstream entity the tag belongs to (recording, artist, release-group)
    pub entity: String,
    pub vote_count: i64,
}

impl TagAssignment {
    pub fn new(name: impl Into<String>, entity: impl Into<String>, vote_count: i64) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            vote_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> RecordingDraft {
        RecordingDraft {
            remote_id: "song-1".to_string(),
            source_type: SourceType::Subsonic,
            canonical_id: "rec-1".to_string(),
            title: "Title".to_string(),
            artist_name: "Artist".to_string(),
            release_name: "Release".to_string(),
            canonical_artist_id: None,
            canonical_release_id: None,
            duration_ms: 1000,
            track_number: 1,
            disc_number: 1,
            updated_at: 0,
        }
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft().validate().is_ok());

        let mut missing_canonical = draft();
        missing_canonical.canonical_id = " ".to_string();
        assert!(missing_canonical.validate().is_err());

        let mut missing_remote = draft();
        missing_remote.remote_id = String::new();
        assert!(missing_remote.validate().is_err());

        let mut negative = draft();
        negative.duration_ms = -1;
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_artist_builder() {
        let artist = Artist::new("art-1", "Name")
            .with_remote(Some("Remote Name".to_string()), Some("ar-9".to_string()));
        assert_eq!(artist.remote_name.as_deref(), Some("Remote Name"));
        assert_eq!(artist.remote_id.as_deref(), Some("ar-9"));
        assert!(artist.validate().is_ok());
        assert!(Artist::new("", "x").validate().is_err());
    }
}

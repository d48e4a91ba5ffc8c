//! Remote Catalog Abstractions
//!
//! Provides the paginated track listing and artist index exposed by a remote
//! media server. Implementations own the wire protocol, authentication and
//! timeouts; the core only sees the records defined here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Identifies where a remote track identifier comes from.
///
/// The pair (remote identifier, source type) is unique in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Identifier is a path on a locally mounted collection
    FilePath,
    /// Identifier is a Subsonic-compatible song id
    Subsonic,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::FilePath => "file_path",
            SourceType::Subsonic => "subsonic",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file_path" => Ok(SourceType::FilePath),
            "subsonic" => Ok(SourceType::Subsonic),
            other => Err(BridgeError::InvalidResponse(format!(
                "unknown source type: {other}"
            ))),
        }
    }
}

/// A raw track record as listed by the remote server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTrack {
    /// Remote track identifier, unique per source type
    pub id: String,
    /// Canonical recording identifier embedded in the file tags, if any
    pub canonical_recording_id: Option<String>,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Duration in whole seconds as reported by the server
    pub duration_secs: u32,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
}

impl RemoteTrack {
    /// Canonical id with surrounding whitespace removed; blank ids count as absent.
    pub fn canonical_id(&self) -> Option<&str> {
        self.canonical_recording_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// An entry of the remote server's artist index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArtist {
    /// Remote artist identifier
    pub id: String,
    /// Display name used by the remote server
    pub name: String,
    /// Canonical artist identifier, when the server reports one
    pub canonical_id: Option<String>,
}

/// Paginated reader over a remote catalog
///
/// # Pagination
///
/// `list` returns at most `page_size` tracks starting at `offset`. A page with
/// fewer than `page_size` tracks is the only end-of-stream signal; a trailing
/// empty page is valid.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::catalog::CatalogReader;
///
/// async fn count_tracks(reader: &dyn CatalogReader) -> Result<usize> {
///     let mut offset = 0;
///     loop {
///         let page = reader.list(500, offset).await?;
///         offset += page.len();
///         if page.len() < 500 {
///             return Ok(offset);
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// List one page of tracks
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Unreachable` (or another variant) when the server
    /// cannot be reached or answers with an error.
    async fn list(&self, page_size: usize, offset: usize) -> Result<Vec<RemoteTrack>>;

    /// Source type tag stamped on every recording read through this reader
    fn source_type(&self) -> SourceType {
        SourceType::Subsonic
    }

    /// List the remote artist index
    ///
    /// Servers that do not expose canonical artist identifiers may keep the
    /// default, which reports an empty index.
    async fn list_artists(&self) -> Result<Vec<RemoteArtist>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(canonical: Option<&str>) -> RemoteTrack {
        RemoteTrack {
            id: "song-1".to_string(),
            canonical_recording_id: canonical.map(str::to_string),
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            duration_secs: 180,
            track_number: None,
            disc_number: None,
        }
    }

    #[test]
    fn test_canonical_id_trims_and_drops_blank() {
        assert_eq!(track(Some(" abc ")).canonical_id(), Some("abc"));
        assert_eq!(track(Some("   ")).canonical_id(), None);
        assert_eq!(track(None).canonical_id(), None);
    }

    #[test]
    fn test_source_type_round_trip() {
        for source in [SourceType::FilePath, SourceType::Subsonic] {
            assert_eq!(source.as_str().parse::<SourceType>().unwrap(), source);
        }
        assert!("ftp".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_source_type_serializes_snake_case() {
        let json = serde_json::to_string(&SourceType::FilePath).unwrap();
        assert_eq!(json, "\"file_path\"");
    }

    struct EmptyReader;

    #[async_trait]
    impl CatalogReader for EmptyReader {
        async fn list(&self, _page_size: usize, _offset: usize) -> Result<Vec<RemoteTrack>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_default_artist_index_is_empty() {
        let reader = EmptyReader;
        assert!(reader.list_artists().await.unwrap().is_empty());
        assert_eq!(reader.source_type(), SourceType::Subsonic);
    }
}

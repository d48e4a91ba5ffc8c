//! Metadata Resolution Abstractions
//!
//! The core never resolves canonical identifiers itself. It hands batches of
//! recording identifiers to a [`MetadataResolver`] and, optionally, to a
//! [`TagResolver`] for secondary enrichment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Canonical release reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRef {
    pub id: String,
    pub name: String,
}

/// One artist of a credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditedArtist {
    /// Canonical artist identifier
    pub id: String,
    pub name: String,
}

/// Artist credit of a recording
///
/// `name` is the joined display credit (e.g. "A feat. B"); `artists` lists the
/// credited artists in credit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistCredit {
    pub name: String,
    pub artists: Vec<CreditedArtist>,
}

/// Metadata resolved for one canonical recording identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRecording {
    pub canonical_id: String,
    pub title: Option<String>,
    pub duration_ms: Option<i64>,
    pub release: Option<ReleaseRef>,
    pub artist_credit: Option<ArtistCredit>,
}

impl ResolvedRecording {
    /// Record with only the identifier set
    pub fn bare(canonical_id: impl Into<String>) -> Self {
        Self {
            canonical_id: canonical_id.into(),
            title: None,
            duration_ms: None,
            release: None,
            artist_credit: None,
        }
    }
}

/// Resolves canonical recording identifiers to metadata
///
/// Identifiers that cannot be resolved are simply absent from the result.
/// Returning fewer records than requested is not an error.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::metadata::MetadataResolver;
///
/// async fn titles(resolver: &dyn MetadataResolver, ids: &[String]) -> Result<Vec<String>> {
///     let records = resolver.resolve(ids).await?;
///     Ok(records.into_iter().filter_map(|r| r.title).collect())
/// }
/// ```
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolve the given ordered list of distinct canonical identifiers
    async fn resolve(&self, canonical_ids: &[String]) -> Result<Vec<ResolvedRecording>>;
}

/// Entity a tag was attached to upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagEntity {
    Recording,
    Artist,
    ReleaseGroup,
}

impl TagEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagEntity::Recording => "recording",
            TagEntity::Artist => "artist",
            TagEntity::ReleaseGroup => "release-group",
        }
    }
}

/// A single tag vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTag {
    pub name: String,
    pub entity: TagEntity,
    pub count: i64,
}

/// All tags resolved for one canonical recording identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingTags {
    pub canonical_id: String,
    pub tags: Vec<ResolvedTag>,
}

/// Looks up tags for canonical recording identifiers
#[async_trait]
pub trait TagResolver: Send + Sync {
    async fn lookup_tags(&self, canonical_ids: &[String]) -> Result<Vec<RecordingTags>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_entity_names() {
        assert_eq!(TagEntity::Recording.as_str(), "recording");
        assert_eq!(TagEntity::ReleaseGroup.as_str(), "release-group");
        let json = serde_json::to_string(&TagEntity::ReleaseGroup).unwrap();
        assert_eq!(json, "\"release-group\"");
    }

    #[test]
    fn test_bare_record_has_no_metadata() {
        let record = ResolvedRecording::bare("rec-1");
        assert_eq!(record.canonical_id, "rec-1");
        assert!(record.release.is_none());
        assert!(record.artist_credit.is_none());
        assert!(record.duration_ms.is_none());
    }
}

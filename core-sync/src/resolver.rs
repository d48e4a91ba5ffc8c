//! Adapter around the external metadata resolver.
//!
//! Splits requests so no single call exceeds the resolver's id limit, drops
//! records for ids that were never requested and reports the ids that came
//! back unresolved. A missing id is a normal outcome; a failed call is not.

use crate::{Result, SyncError};
use bridge_traits::metadata::{MetadataResolver, ResolvedRecording};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of resolving one lookup batch
#[derive(Debug, Default)]
pub struct Resolution {
    pub records: HashMap<String, ResolvedRecording>,
    /// Requested ids the resolver did not return
    pub unresolved: Vec<String>,
    /// Number of resolver calls issued
    pub requests: u64,
}

pub struct ResolverAdapter {
    resolver: Arc<dyn MetadataResolver>,
    max_ids: usize,
}

impl ResolverAdapter {
    pub fn new(resolver: Arc<dyn MetadataResolver>, max_ids: usize) -> Self {
        Self {
            resolver,
            max_ids: max_ids.max(1),
        }
    }

    /// Resolve an ordered list of distinct canonical ids
    ///
    /// # Errors
    ///
    /// `SyncError::Resolver` if any underlying call fails. Records from
    /// earlier calls are discarded in that case.
    pub async fn resolve(&self, ids: &[String]) -> Result<Resolution> {
        let mut resolution = Resolution::default();
        let requested: HashSet<&str> = ids.iter().map(String::as_str).collect();

        for chunk in ids.chunks(self.max_ids) {
            let records = self
                .resolver
                .resolve(chunk)
                .await
                .map_err(|e| SyncError::Resolver(e.to_string()))?;
            resolution.requests += 1;

            for record in records {
                if !requested.contains(record.canonical_id.as_str()) {
                    warn!(
                        canonical_id = %record.canonical_id,
                        "Resolver returned an id that was not requested"
                    );
                    continue;
                }
                resolution
                    .records
                    .entry(record.canonical_id.clone())
                    .or_insert(record);
            }
        }

        resolution.unresolved = ids
            .iter()
            .filter(|id| !resolution.records.contains_key(id.as_str()))
            .cloned()
            .collect();

        debug!(
            requested = ids.len(),
            resolved = resolution.records.len(),
            unresolved = resolution.unresolved.len(),
            requests = resolution.requests,
            "Resolved lookup batch"
        );

        Ok(resolution)
    }
}

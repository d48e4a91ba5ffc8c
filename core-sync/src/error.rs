use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote catalog unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Metadata resolver failed: {0}")]
    Resolver(String),

    #[error("Failed to write lookup batch {batch_index}: {source}")]
    BatchWrite {
        batch_index: u64,
        #[source]
        source: LibraryError,
    },

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("A scan is already running")]
    ScanInProgress,

    #[error("Invalid scan ID: {0}")]
    InvalidScanId(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Index of the lookup batch the error belongs to, if any
    pub fn batch_index(&self) -> Option<u64> {
        match self {
            SyncError::BatchWrite { batch_index, .. } => Some(*batch_index),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

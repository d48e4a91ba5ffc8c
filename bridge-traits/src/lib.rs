//! # Host Bridge Traits
//!
//! Collaborator traits that the synchronization core depends on but never
//! implements itself.
//!
//! ## Overview
//!
//! This crate defines the contract between the core and the services around
//! it. Each trait represents a capability that is supplied by the host: the
//! remote media server, the metadata resolution service, and the host's time
//! and logging facilities.
//!
//! ## Traits
//!
//! ### Remote catalog
//! - [`CatalogReader`](catalog::CatalogReader) - Paginated track listing and artist index
//!
//! ### Metadata
//! - [`MetadataResolver`](metadata::MetadataResolver) - Canonical identifier resolution
//! - [`TagResolver`](metadata::TagResolver) - Tag lookups for secondary enrichment
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations should:
//!
//! - Map connection failures and non-success answers to `BridgeError::Unreachable`
//! - Map undecodable payloads to `BridgeError::InvalidResponse`
//! - Leave timeouts and retries inside the implementation
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so a scan can run on a
//! background task while status queries are answered elsewhere.
//!
//! ## Examples
//!
//! ### Implementing MetadataResolver
//!
//! ```ignore
//! use bridge_traits::metadata::{MetadataResolver, ResolvedRecording};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct LookupService {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl MetadataResolver for LookupService {
//!     async fn resolve(&self, ids: &[String]) -> Result<Vec<ResolvedRecording>> {
//!         // Implementation
//!         todo!()
//!     }
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod metadata;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{CatalogReader, RemoteArtist, RemoteTrack, SourceType};
pub use metadata::{
    ArtistCredit, CreditedArtist, MetadataResolver, RecordingTags, ReleaseRef, ResolvedRecording,
    ResolvedTag, TagEntity, TagResolver,
};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};

//! # Repository Pattern Implementation
//!
//! This module provides repository traits and implementations for data access.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository so the sync engine can
//!   be tested against mocks
//! - SQLite implementations use sqlx for async database access
//! - Writes that must be atomic with other writes go through
//!   [`LibraryTransaction`](crate::transaction::LibraryTransaction) instead
//!
//! ## Available Repositories
//!
//! - `RecordingRepository` - Mirrored remote tracks and their chunked removal
//! - `ArtistRepository` - Canonical artists, remote index fields, orphan cleanup
//! - `TagRepository` - Tag lookups and orphan cleanup

pub mod artist;
pub mod recording;
pub mod tag;

pub use artist::{ArtistRepository, SqliteArtistRepository};
pub use recording::{RecordingRepository, SqliteRecordingRepository};
pub use tag::{SqliteTagRepository, TagRepository};

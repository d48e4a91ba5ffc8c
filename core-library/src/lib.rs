//! # Library Management Module
//!
//! Owns the catalog library database and provides repository patterns for
//! data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Repositories for recordings, artists and tags
//! - The per-batch write transaction used by the sync engine
//! - Aggregate queries for status pages

pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod repositories;
pub mod transaction;

pub use error::{LibraryError, Result};
pub use transaction::LibraryTransaction;

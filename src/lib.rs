//! Workspace placeholder crate.
//!
//! Host applications depend on `catalog-sync-workspace` to pull in the
//! catalog synchronization façade without wiring each workspace crate
//! individually.

pub use core_service::*;

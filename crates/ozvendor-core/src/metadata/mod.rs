//! Local persistence for the vendored library.
//!
//! This module provides:
//! - Atomic JSON and byte writes
//! - The `project.json` record of installed assets
//! - A directory-scoped lock serializing syncs

mod atomic;
mod lock;
mod project;

pub use atomic::{atomic_read_json, atomic_write_bytes, atomic_write_json};
pub use lock::LibraryLock;
pub use project::{LocalRecord, ProjectStateStore};

//! Per-node object storage for media segments.
//!
//! Objects are immutable byte blobs addressed by `(group_id, segment_name)`.
//! This crate provides:
//! - [`ObjectKey`] and its composite `group/segment` form
//! - The [`NodeStore`] trait every storage backend (local or remote) implements
//! - [`FsStore`]: directory-per-group layout on the local filesystem
//! - [`MemoryStore`]: concurrent in-memory backend

pub mod error;
pub mod fs;
pub mod key;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use fs::FsStore;
pub use key::ObjectKey;
pub use memory::MemoryStore;
pub use traits::NodeStore;

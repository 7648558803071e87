//! Tapedeck Storage
//!
//! This crate provides cassette persistence:
//! - Cassette sources (directory tree, in-memory)
//! - The read-only cassette store used for replay
//! - Atomic writes for newly recorded cassettes

pub mod atomic_writer;
pub mod error;
pub mod source;
pub mod store;
pub mod writer;

pub use atomic_writer::AtomicWriter;
pub use error::{StorageError, StorageResult};
pub use source::{CassetteSource, DirSource, MemorySource, validate_name};
pub use store::CassetteStore;
pub use writer::CassetteWriter;

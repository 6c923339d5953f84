//! crates/sw_io/src/lib.rs
//! Persistence collaborator for the survey weighting engine.
//!
//! - `Store`: the operations the service layer needs (keyed reads, upserts,
//!   deletes, group-by sums, submitted-row joins).
//! - `MemoryStore`: the one implementation, optionally backed by a canonical
//!   JSON file that is rewritten atomically after every mutation.
//! - Seed dataset and policy loading, canonical JSON, SHA-256.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for sw_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (create_dir_all, rename, fsync, etc.)
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON serialization/deserialization errors with a JSON Pointer hint.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    #[error("hash error: {0}")]
    Hash(String),

    #[error("not found: {kind} {id}")]
    NotFound { kind: &'static str, id: String },

    /// Uniqueness violations (duplicate id, duplicate email, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Referential or domain errors in loaded data.
    #[error("invalid: {0}")]
    Invalid(String),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json keeps line/column, not a pointer.
        IoError::Json { pointer: "/".to_string(), msg: e.to_string() }
    }
}

pub mod canonical_json;
pub mod hasher;
pub mod loader;
pub mod memory;
pub mod metadata;
pub mod store;

mod file_store;

pub use loader::{load_dataset, load_policy, Dataset};
pub use memory::MemoryStore;
pub use store::{Store, SubmittedRow};

pub mod prelude {
    pub use crate::{IoError, IoResult, MemoryStore, Store, SubmittedRow};
    pub use crate::canonical_json::{to_canonical_bytes, write_canonical_file};
    pub use crate::hasher::{sha256_canonical, sha256_hex};
    pub use crate::loader::{load_dataset, load_policy, Dataset};
}

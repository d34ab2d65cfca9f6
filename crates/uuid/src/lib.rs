//! Record identifiers and sharded-path utilities.
//!
//! Every persisted EPR entity (patients, observations, medications, export jobs) is keyed by
//! a UUID in *canonical* form: **32 lowercase hexadecimal characters**, no hyphens. The same
//! canonical string is used in HTTP responses, CLI output and on-disk directory names, so
//! there is exactly one spelling of every identifier.
//!
//! ## Sharded directory layout
//! For a canonical key `k`, records live under:
//! `parent_dir/<k[0..2]>/<k[2..4]>/<k>/`
//!
//! Example:
//! `epr_data/patients/55/0e/550e8400e29b41d4a716446655440000/`
//!
//! The same layout is reused for fingerprint index entries, which are also lowercase hex.

mod shardable;

pub use shardable::{sharded_path, ShardableUuid, Uuid};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("invalid identifier: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;

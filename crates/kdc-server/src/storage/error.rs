//! Storage error types.
//!
//! - `Io`: underlying database failures
//! - `Serialization`: a record failed to encode or decode
//! - `Poisoned`: a thread panicked while holding the in-memory lock

use kdc_core::KdcError;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// In-memory state is unusable after a panic
    #[error("storage lock poisoned")]
    Poisoned,
}

impl StorageError {
    /// Returns true if the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<StorageError> for KdcError {
    fn from(err: StorageError) -> Self {
        KdcError::Storage { transient: err.is_transient(), message: err.to_string() }
    }
}

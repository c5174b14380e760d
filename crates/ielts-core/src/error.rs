//! Store error types.
//!
//! Failures of the key-value stores that back exam sessions. The session
//! never propagates these; it logs them and carries on without persistence.

use thiserror::Error;

/// Errors that can occur when reading or writing a key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The store cannot be used at all (poisoned lock, disabled backend).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// The key the failing operation targeted, if known.
    pub fn key(&self) -> Option<&str> {
        match self {
            StoreError::Io { key, .. } => Some(key),
            StoreError::Unavailable(_) => None,
        }
    }
}

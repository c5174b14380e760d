//! Core trait definitions for session persistence.
//!
//! Exam sessions persist through a [`KeyValueStore`]; the concrete stores
//! live in [`crate::store`].

use crate::error::StoreError;

/// String key-value storage backing exam sessions.
///
/// Implementations report failures; callers in this crate treat every
/// failure as "nothing stored" or "save skipped".
pub trait KeyValueStore: Send + Sync {
    /// Human-readable store name (e.g. "file").
    fn name(&self) -> &str;

    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

//! Key-value store port (driven/secondary port)
//!
//! A small synchronous string store used for best-effort persistence, such
//! as resolved site/list identifiers and the identity provider's account
//! cache. Callers treat write failures as non-fatal.

use thiserror::Error;

/// Errors from a key-value store adapter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing storage could not be read or written
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// The backing storage exists but cannot be decoded
    #[error("Storage is corrupt: {0}")]
    Corrupt(String),
}

/// Port trait for persistent string key-value storage
pub trait IKeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`; removing a missing key is not an error
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

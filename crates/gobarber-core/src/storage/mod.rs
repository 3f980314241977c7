//! Durable key-value storage for the session.
//!
//! This module provides the `KeyValueStorage` trait and two backends:
//! - `FileStorage`: one file per key in a data directory, survives restarts
//! - `MemoryStorage`: in-process map for tests and throwaway runs
//!
//! Only the session store writes the session keys.

pub mod file;
pub mod memory;

use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Key holding the raw bearer token
pub const TOKEN_KEY: &str = "session:token";

/// Key holding the JSON-serialized user record
pub const USER_KEY: &str = "session:user";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// String-to-string storage that outlives the process (or pretends to).
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a key that is not present succeeds
    fn remove(&self, key: &str) -> Result<()>;
}

//! The key-value contract annotation data is persisted through.
//!
//! Any backend that can load, save and remove a byte value by string key
//! satisfies it. [`MemoryStore`] is the in-process implementation; the
//! `annotator-storage` crate provides one backed by files.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub trait KeyValueStore {
    /// Returns the stored bytes, or `None` when the key was never written.
    fn load(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>>;

    fn save(&self, key: &str, bytes: &[u8]) -> PersistenceResult<()>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> PersistenceResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn load(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, bytes: &[u8]) -> PersistenceResult<()> {
        (**self).save(key, bytes)
    }

    fn remove(&self, key: &str) -> PersistenceResult<()> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn load(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, bytes: &[u8]) -> PersistenceResult<()> {
        (**self).save(key, bytes)
    }

    fn remove(&self, key: &str) -> PersistenceResult<()> {
        (**self).remove(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> PersistenceResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> PersistenceResult<()> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
        Ok(())
    }
}

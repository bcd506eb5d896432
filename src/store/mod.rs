//! Durable key-value store boundary
//!
//! The response cache never touches storage directly. It talks to a
//! [`KeyValueStore`]: a synchronous, string-keyed, string-valued store that
//! can enumerate its keys and may refuse writes when it runs out of room.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Errors raised by a key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file could not be encoded or decoded
    #[error("Storage file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The write would exceed the store's capacity
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} bytes allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    /// The store refused the operation for another reason
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A synchronous, enumerable string store
///
/// Operations on a single key are atomic with respect to each other.
/// Implementations use interior mutability so a store can be shared by
/// several in-flight requests on the same runtime.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Lists every key currently in the store
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Every key and value in one read
    ///
    /// The default walks [`keys`](Self::keys) and reads each one; stores
    /// that load everything at once should override it.
    fn entries(&self) -> Result<Vec<(String, String)>, StoreError> {
        let mut out = Vec::new();
        for key in self.keys()? {
            if let Some(value) = self.get(&key)? {
                out.push((key, value));
            }
        }
        Ok(out)
    }

    /// Removes several keys; missing keys are skipped
    fn remove_many(&self, keys: &[String]) -> Result<(), StoreError> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }

    fn entries(&self) -> Result<Vec<(String, String)>, StoreError> {
        (**self).entries()
    }

    fn remove_many(&self, keys: &[String]) -> Result<(), StoreError> {
        (**self).remove_many(keys)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }

    fn entries(&self) -> Result<Vec<(String, String)>, StoreError> {
        (**self).entries()
    }

    fn remove_many(&self, keys: &[String]) -> Result<(), StoreError> {
        (**self).remove_many(keys)
    }
}

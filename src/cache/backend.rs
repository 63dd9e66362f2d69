//! Key-value backend trait and the in-memory implementation.
//!
//! The [`CacheBackend`] trait is the only thing the content cache needs from
//! a store: single-key get/set/delete/exists plus a full flush, each of which
//! must be atomic for one key. The cache never takes its own locks across
//! keys.
//!
//! | Backend | Use |
//! |---|---|
//! | [`MemoryBackend`] | tests, `check`, single-process deployments |
//! | [`RedisBackend`](super::redis_backend::RedisBackend) | shared cache across processes |

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("Cache value encoding error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// String-keyed store holding serialized content records.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> CacheResult<()>;

    fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Drop every entry.
    fn flush(&self) -> CacheResult<()>;

    /// Backend name for log lines.
    fn name(&self) -> &'static str;
}

/// Process-local backend over a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Unavailable("memory cache lock poisoned".into()))
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.lock()?.contains_key(key))
    }

    fn flush(&self) -> CacheResult<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

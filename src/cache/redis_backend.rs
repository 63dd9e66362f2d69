//! Redis (or Valkey) cache backend.
//!
//! One connection is opened lazily and reused. Any command error drops it so
//! the next call reconnects; the content cache treats the error itself as
//! "cache unavailable" and reads from disk instead.

use super::backend::{CacheBackend, CacheError, CacheResult};
use std::sync::Mutex;

pub struct RedisBackend {
    client: redis::Client,
    connection: Mutex<Option<redis::Connection>>,
}

impl RedisBackend {
    /// Create a backend for a connection URL such as `redis://127.0.0.1:6379/0`
    /// or `redis+unix:///run/redis.sock?db=0`. No connection is made yet.
    pub fn open(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    fn with_connection<T>(
        &self,
        command: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    ) -> CacheResult<T> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| CacheError::Unavailable("redis connection lock poisoned".into()))?;
        if guard.is_none() {
            *guard = Some(self.client.get_connection().map_err(unavailable)?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(CacheError::Unavailable("no redis connection".into()));
        };
        match command(conn) {
            Ok(value) => Ok(value),
            Err(err) => {
                *guard = None;
                Err(unavailable(err))
            }
        }
    }
}

impl CacheBackend for RedisBackend {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.with_connection(|conn| redis::cmd("GET").arg(key).query(conn))
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.with_connection(|conn| redis::cmd("SET").arg(key).arg(value).query(conn))
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        self.with_connection(|conn| redis::cmd("DEL").arg(key).query(conn))
    }

    fn exists(&self, key: &str) -> CacheResult<bool> {
        self.with_connection(|conn| redis::cmd("EXISTS").arg(key).query(conn))
    }

    fn flush(&self) -> CacheResult<()> {
        self.with_connection(|conn| redis::cmd("FLUSHDB").query(conn))
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

fn unavailable(err: redis::RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

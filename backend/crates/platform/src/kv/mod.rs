//! Key-Value Store Infrastructure
//!
//! Minimal string key-value abstraction with per-key expiry, enough to
//! hold short-lived session records. Two backends:
//! - [`RedisStore`] for deployments
//! - [`MemoryStore`] for development and tests

mod memory_store;
mod redis_store;

use std::time::Duration;

use thiserror::Error;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend could not be reached (connection refused, dropped, timed out)
    #[error("Key-value store unavailable: {0}")]
    Unavailable(String),

    /// Backend answered with an error or an unexpected reply
    #[error("Key-value store command failed: {0}")]
    Command(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for key-value storage backends
///
/// All TTLs are whole seconds; sub-second parts are rounded up.
#[trait_variant::make(KeyValueStore: Send)]
pub trait LocalKeyValueStore {
    /// Read a live value
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Unconditionally write `value` with expiry
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Write only if `key` is absent. Returns whether the write happened.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Reset the expiry of an existing key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Delete `key` only while it still holds `expected`. Returns whether it was deleted.
    async fn delete_if_eq(&self, key: &str, expected: &str) -> StoreResult<bool>;
}

pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 { secs + 1 } else { secs.max(1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_secs_rounds_up() {
        assert_eq!(ttl_secs(Duration::from_secs(3600)), 3600);
        assert_eq!(ttl_secs(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_secs(Duration::ZERO), 1);
    }
}

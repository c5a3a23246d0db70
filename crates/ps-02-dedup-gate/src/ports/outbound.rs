//! # Outbound Ports (Driven Ports)
//!
//! Production: `RocksDbStore` (feature `rocksdb`), `SystemTimeSource`.
//! Testing: `InMemoryKVStore`, `ManualTimeSource`.

use crate::domain::errors::KVStoreError;

/// Single-namespace key-value store.
///
/// Shared by every worker without application-level locking, so both
/// operations take `&self`; every call is a single-key read or upsert.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key. Absent keys are `Ok(None)`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Insert or overwrite a value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        (**self).put(key, value)
    }
}

/// Wall clock in nanoseconds since the Unix epoch.
pub trait TimeSource: Send + Sync {
    fn now_nanos(&self) -> u64;
}

//! # Adapters
//!
//! - `memory` - `InMemoryKVStore` for tests and dry runs
//! - `rocksdb_store` - `RocksDbStore` (feature `rocksdb`)
//! - `clock` - system and manual time sources

pub mod clock;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;

//! # RocksDB Dedup Store
//!
//! Production implementation of [`KeyValueStore`] over a single `proxies`
//! column family.
//!
//! ## Configuration
//!
//! - Snappy compression
//! - Bloom filters (10 bits per key); every gate check is a point lookup
//! - `sync_writes` off by default: losing the newest marks on a crash only
//!   costs redundant probes
//!
//! Calls block on disk I/O. Async callers should run them on the blocking
//! pool (the proxy sink does when `offload_gate` is set).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamilyDescriptor, DBCompressionType, Options, WriteOptions, DB,
};
use tracing::info;

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::KeyValueStore;

/// Column family holding processed marks.
pub const CF_PROXIES: &str = "proxies";

/// RocksDB configuration.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: PathBuf,
    /// Block cache size in bytes (default: 32MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// fsync after each write
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/dedup"),
            block_cache_size: 32 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

impl RocksDbConfig {
    /// Small buffers for tests.
    pub fn for_testing(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            block_cache_size: 1024 * 1024,
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// RocksDB-backed dedup store.
pub struct RocksDbStore {
    db: Arc<DB>,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open or create the database, creating the `proxies` column family.
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(DBCompressionType::Snappy);

        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&Cache::new_lru_cache(config.block_cache_size));

        let mut cf_opts = Options::default();
        cf_opts.set_compression_type(DBCompressionType::Snappy);
        cf_opts.set_block_based_table_factory(&block_opts);

        let db = DB::open_cf_descriptors(
            &opts,
            &config.path,
            vec![ColumnFamilyDescriptor::new(CF_PROXIES, cf_opts)],
        )
        .map_err(|e| KVStoreError::IoError {
            message: format!("failed to open RocksDB at {}: {e}", config.path.display()),
        })?;

        info!(path = %config.path.display(), "opened dedup store");
        Ok(Self {
            db: Arc::new(db),
            config,
        })
    }

    /// Open at `path` with default tuning.
    pub fn open_default(path: impl AsRef<Path>) -> Result<Self, KVStoreError> {
        Self::open(RocksDbConfig {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        })
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        let cf = self
            .db
            .cf_handle(CF_PROXIES)
            .ok_or_else(|| KVStoreError::MissingNamespace(CF_PROXIES.into()))?;
        self.db.get_cf(cf, key).map_err(|e| KVStoreError::IoError {
            message: format!("RocksDB get failed: {e}"),
        })
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        let cf = self
            .db
            .cf_handle(CF_PROXIES)
            .ok_or_else(|| KVStoreError::MissingNamespace(CF_PROXIES.into()))?;
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db
            .put_cf_opt(cf, key, value, &write_opts)
            .map_err(|e| KVStoreError::IoError {
                message: format!("RocksDB put failed: {e}"),
            })
    }
}

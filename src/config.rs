//! Configuration for SortKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, SortKvError};

/// Main configuration for a SortKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Pool Configuration
    // -------------------------------------------------------------------------
    /// Root directory of the durable pool
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── pool.snap        (checkpoint image)
    ///     └── pool.log         (redo log of committed transactions)
    pub data_dir: PathBuf,

    /// Byte budget for stored keys and values
    pub pool_capacity: u64,

    /// Create an empty pool when `data_dir` holds none
    pub create_if_missing: bool,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the redo log
    pub sync_strategy: PoolSyncStrategy,

    /// Redo log size (in bytes) that triggers a checkpoint
    pub checkpoint_threshold: u64,
}

/// Pool sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolSyncStrategy {
    /// fsync after every committed transaction (safest, slowest)
    EveryCommit,

    /// fsync after N committed transactions (balanced durability/performance)
    EveryNCommits { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./sortkv_data"),
            pool_capacity: 64 * 1024 * 1024, // 64 MB
            create_if_missing: true,
            sync_strategy: PoolSyncStrategy::EveryCommit,
            checkpoint_threshold: 4 * 1024 * 1024, // 4 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the pool cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.pool_capacity == 0 {
            return Err(SortKvError::Config("pool_capacity must be > 0".into()));
        }
        if let PoolSyncStrategy::EveryNCommits { count: 0 } = self.sync_strategy {
            return Err(SortKvError::Config(
                "EveryNCommits count must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root of the pool)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the pool capacity (in bytes)
    pub fn pool_capacity(mut self, bytes: u64) -> Self {
        self.config.pool_capacity = bytes;
        self
    }

    /// Whether to create a pool when none exists
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.config.create_if_missing = create;
        self
    }

    /// Set the redo log sync strategy
    pub fn sync_strategy(mut self, strategy: PoolSyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the checkpoint threshold (in bytes of redo log)
    pub fn checkpoint_threshold(mut self, bytes: u64) -> Self {
        self.config.checkpoint_threshold = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

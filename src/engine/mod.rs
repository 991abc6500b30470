//! Engine Module
//!
//! The sorted dual-array storage engine.
//!
//! ## Responsibilities
//! - Reattach to (or create) the container on open
//! - Point lookups via binary search over the sorted keys
//! - Upsert/delete through pool transactions so keys and values move together
//! - Directional range scans driving a caller visitor
//!
//! ## Layout
//! ```text
//!   keys:   [ "a" ][ "c" ][ "f" ]      strictly ascending
//!   values: [ v_a ][ v_c ][ v_f ]      values[i] bound to keys[i]
//!
//!   put("d", v_d)  → lower_bound = 2 → insert at 2 in both sequences
//!   remove("c")    → exact_match = 1 → erase 1 in both sequences
//! ```

mod container;
mod scan;
pub mod search;

use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::pool::{FaultInjector, Pool, PoolStats, TxContext};

pub use container::{Container, Sequence};

/// Outcome of an engine operation that is not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    /// A scan visitor asked to stop early
    StoppedByCallback,
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    pub fn is_not_found(self) -> bool {
        self == Status::NotFound
    }
}

/// The storage engine
///
/// ## Access Model: single writer
///
/// Reads take `&self`, mutations take `&mut self`; callers sharing an
/// engine across threads serialize access themselves (see
/// [`crate::shared::SharedEngine`]). Every public operation first checks
/// the pool's execution-context flag and panics when invoked from inside
/// an open transaction.
pub struct Engine {
    /// Durable store handle; owns the container
    pool: Pool,
}

impl Engine {
    /// Name this engine registers under
    pub const NAME: &'static str = "svector";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open the pool (snapshot + redo log replay)
    /// 2. Reattach to the existing container, or create an empty one
    pub fn open(config: Config) -> Result<Self> {
        let pool = Pool::open(&config)?;
        let mut engine = Self { pool };
        engine.recover()?;

        tracing::info!(
            "Engine {} started with {} entries",
            Self::NAME,
            engine.container().len()
        );
        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    fn recover(&mut self) -> Result<()> {
        if self.pool.root().is_some() {
            tracing::debug!("Reattached to existing container");
        } else {
            // create_root snapshots the empty slot, so an abort leaves it empty
            self.pool.run_transaction(|tx| tx.create_root())?;
            tracing::info!("Created empty container");
        }

        debug_assert!(self.container().is_consistent());
        Ok(())
    }

    /// Working reference to the container
    ///
    /// # Panics
    /// If the root slot is empty, which `open` rules out.
    fn container(&self) -> &Container {
        self.pool
            .root()
            .expect("container is attached for as long as the engine is open")
    }

    // =========================================================================
    // Point Reads
    // =========================================================================

    /// Number of entries
    pub fn count_all(&self) -> usize {
        tracing::debug!("count_all");
        self.pool.check_outside_tx();
        self.container().len()
    }

    /// Hand the value bound to `key` to `visitor` without copying it
    pub fn get<F>(&self, key: &[u8], visitor: F) -> Status
    where
        F: FnOnce(&[u8]),
    {
        tracing::debug!(key = %String::from_utf8_lossy(key), "get");
        self.pool.check_outside_tx();

        let container = self.container();
        match search::exact_match(container.keys(), key) {
            Some(index) => {
                visitor(&container.values()[index]);
                Status::Ok
            }
            None => {
                tracing::debug!("key not found");
                Status::NotFound
            }
        }
    }

    /// Copy out the value bound to `key`
    pub fn get_value(&self, key: &[u8]) -> Option<Vec<u8>> {
        let mut out = None;
        self.get(key, |v| out = Some(v.to_vec()));
        out
    }

    /// Whether `key` is present
    pub fn exists(&self, key: &[u8]) -> Status {
        tracing::debug!(key = %String::from_utf8_lossy(key), "exists");
        self.pool.check_outside_tx();

        match search::exact_match(self.container().keys(), key) {
            Some(_) => Status::Ok,
            None => Status::NotFound,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert or overwrite `key`
    ///
    /// An existing key has its value replaced in place; a new key is
    /// inserted at its lower-bound position in both sequences. Either way
    /// the change commits as one transaction.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        tracing::debug!(
            key = %String::from_utf8_lossy(key),
            value_len = value.len(),
            "put"
        );
        self.pool.check_outside_tx();

        let keys = self.container().keys();
        let index = search::lower_bound(keys, key);
        let present = keys.get(index).is_some_and(|k| k.as_slice() == key);

        if present {
            self.pool.run_transaction(|tx| {
                tx.replace_at(Sequence::Values, index, value.to_vec())
            })?;
        } else {
            self.pool.run_transaction(|tx| {
                tx.insert_at(Sequence::Keys, index, key.to_vec())?;
                tx.insert_at(Sequence::Values, index, value.to_vec())
            })?;
        }

        debug_assert!(self.container().is_consistent());
        Ok(())
    }

    /// Delete `key`
    ///
    /// Returns `NotFound` (with no side effect) when the key is absent.
    pub fn remove(&mut self, key: &[u8]) -> Result<Status> {
        tracing::debug!(key = %String::from_utf8_lossy(key), "remove");
        self.pool.check_outside_tx();

        let Some(index) = search::exact_match(self.container().keys(), key) else {
            tracing::debug!("key not found");
            return Ok(Status::NotFound);
        };

        self.pool.run_transaction(|tx| {
            tx.erase_at(Sequence::Keys, index)?;
            tx.erase_at(Sequence::Values, index)
        })?;

        debug_assert!(self.container().is_consistent());
        Ok(Status::Ok)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Checkpoint and detach
    ///
    /// The durable container is left in place for the next open.
    pub fn close(self) -> Result<()> {
        tracing::info!("Engine {} stopping", Self::NAME);
        self.pool.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Arm a one-shot failure for the next mutation's transaction
    pub fn inject_fault(&mut self, fault: FaultInjector) {
        self.pool.inject_fault(fault);
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Shared handle to the execution-context flag
    pub fn tx_context(&self) -> TxContext {
        self.pool.context()
    }

    /// Read-only view of the container
    pub fn container_view(&self) -> &Container {
        self.container()
    }
}

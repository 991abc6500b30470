//! Pool handle
//!
//! Opens the pool directory, rebuilds the root from snapshot + redo log,
//! and runs transactions.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::engine::Container;
use crate::error::{Result, SortKvError};

use super::fault::FaultInjector;
use super::log::RedoLog;
use super::record::LogRecord;
use super::snapshot;
use super::transaction::Transaction;
use super::{LOG_FILENAME, SNAPSHOT_FILENAME};

/// Execution-context flag: set while a transaction closure runs
///
/// Clones share the flag, so any holder can tell whether it is being
/// called from inside an open transaction.
#[derive(Debug, Clone, Default)]
pub struct TxContext(Arc<AtomicBool>);

impl TxContext {
    /// Whether a transaction is open
    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// # Panics
    /// If a transaction is open. Nested writes would corrupt the
    /// shift-based layout, so this is never a recoverable error.
    pub fn check_outside_tx(&self) {
        assert!(
            !self.is_active(),
            "operation invoked inside an open transaction"
        );
    }

    fn enter(&self) -> TxGuard {
        self.0.store(true, Ordering::Release);
        TxGuard(self.clone())
    }
}

/// Clears the context flag on every exit path, unwinding included
struct TxGuard(TxContext);

impl Drop for TxGuard {
    fn drop(&mut self) {
        (self.0).0.store(false, Ordering::Release);
    }
}

/// Pool usage figures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Bytes held by keys and values
    pub used_bytes: u64,
    /// Configured byte budget
    pub capacity: u64,
    /// LSN of the last committed transaction
    pub lsn: u64,
    /// Current redo log size
    pub log_bytes: u64,
}

/// Durable store handle
///
/// Exclusively owns the root container. Readers borrow it through
/// [`Pool::root`]; writers go through [`Pool::run_transaction`].
pub struct Pool {
    /// Pool directory
    dir: PathBuf,

    /// Capacity, sync and checkpoint settings
    config: Config,

    /// Root slot (`None` until the first container is created)
    root: Option<Container>,

    /// Redo log of transactions committed since the last checkpoint
    log: RedoLog,

    /// LSN of the last committed transaction
    lsn: u64,

    /// Bytes held by the root's keys and values
    used_bytes: u64,

    /// Armed failure for the next transaction
    fault: Option<FaultInjector>,

    tx_context: TxContext,
}

impl Pool {
    /// Open a pool directory, creating it if allowed
    ///
    /// On startup:
    /// 1. Load the snapshot if present
    /// 2. Replay intact redo records newer than the snapshot
    /// 3. Cut any torn log tail
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;

        let dir = config.data_dir.clone();
        let snap_path = dir.join(SNAPSHOT_FILENAME);
        let log_path = dir.join(LOG_FILENAME);

        if !snap_path.exists() && !log_path.exists() {
            if !config.create_if_missing {
                return Err(SortKvError::Config(format!(
                    "no pool at {} and create_if_missing is off",
                    dir.display()
                )));
            }
            tracing::info!("Creating pool at {}", dir.display());
        }
        fs::create_dir_all(&dir)?;

        let body = if snap_path.exists() {
            snapshot::read(&snap_path)?
        } else {
            snapshot::SnapshotBody::default()
        };
        let mut root = body.root;
        let mut lsn = body.lsn;

        let (records, replay) = RedoLog::replay(&log_path)?;
        let mut applied = 0u64;
        for record in records {
            // Already folded into the snapshot (crash between rename and truncate)
            if record.lsn <= lsn {
                continue;
            }
            for op in &record.ops {
                op.redo(&mut root)?;
            }
            lsn = record.lsn;
            applied += 1;
        }

        if replay.was_truncated {
            tracing::warn!(
                "Discarded {} bytes of uncommitted redo log",
                replay.bytes_discarded
            );
        }

        let log = RedoLog::open(&log_path, config.sync_strategy)?;
        let used_bytes = root.as_ref().map(Container::byte_size).unwrap_or(0);

        tracing::info!(
            "Pool opened at {} (lsn={}, {} log records replayed, {} bytes used)",
            dir.display(),
            lsn,
            applied,
            used_bytes
        );

        Ok(Self {
            dir,
            config: config.clone(),
            root,
            log,
            lsn,
            used_bytes,
            fault: None,
            tx_context: TxContext::default(),
        })
    }

    /// The root container, or `None` on a fresh pool
    pub fn root(&self) -> Option<&Container> {
        self.root.as_ref()
    }

    /// Run `f` as one all-or-nothing transaction
    ///
    /// Every primitive `f` applies lands together or not at all. Any error
    /// (from `f`, the capacity check, an injected fault, or the log write)
    /// reverts the root and comes back as `TransactionAborted`.
    ///
    /// # Panics
    /// If called while another transaction is open.
    pub fn run_transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        self.tx_context.check_outside_tx();
        let guard = self.tx_context.enter();

        let fault = self.fault.take();
        let mut tx = Transaction::begin(
            &mut self.root,
            self.used_bytes,
            self.config.pool_capacity,
            fault,
        );

        let value = match f(&mut tx).and_then(|v| tx.check_commit_fault().map(|()| v)) {
            Ok(v) => v,
            Err(e) => {
                tx.abort();
                tracing::warn!("Transaction aborted: {}", e);
                return Err(into_aborted(e));
            }
        };

        let ops = tx.take_redo();
        if !ops.is_empty() {
            if let Some(FaultInjector::LogWrite { cut_back }) = fault {
                self.log.arm_torn_write(cut_back);
            }

            let record = LogRecord::new(self.lsn + 1, ops);
            if let Err(e) = self.log.append(&record) {
                tx.abort();
                drop(guard);
                tracing::warn!("Transaction aborted at commit: {}", e);
                self.heal_log();
                return Err(into_aborted(e));
            }
            self.lsn = record.lsn;
        }
        self.used_bytes = tx.commit();

        if self.log.size() >= self.config.checkpoint_threshold {
            drop(guard);
            if let Err(e) = self.checkpoint() {
                // The commit is already durable in the log
                tracing::warn!("Checkpoint failed, keeping redo log: {}", e);
            }
        }

        Ok(value)
    }

    /// Fold the redo log into a fresh snapshot
    pub fn checkpoint(&mut self) -> Result<()> {
        self.tx_context.check_outside_tx();

        self.log.sync()?;
        snapshot::write(
            &self.dir.join(SNAPSHOT_FILENAME),
            self.lsn,
            self.root.as_ref(),
        )?;
        self.log.truncate()?;

        tracing::info!("Checkpoint written at lsn={}", self.lsn);
        Ok(())
    }

    /// Replace a poisoned redo log with a checkpoint
    ///
    /// The root has already been rolled back, so the snapshot holds exactly
    /// the committed state and truncation clears the partial record.
    fn heal_log(&mut self) {
        if !self.log.is_poisoned() {
            return;
        }
        match self.checkpoint() {
            Ok(()) => tracing::info!("Redo log rebuilt after failed append"),
            Err(e) => tracing::error!("Redo log still unusable: {}", e),
        }
    }

    /// Arm a one-shot failure for the next transaction
    pub fn inject_fault(&mut self, fault: FaultInjector) {
        self.fault = Some(fault);
    }

    /// Shared handle to the execution-context flag
    pub fn context(&self) -> TxContext {
        self.tx_context.clone()
    }

    /// # Panics
    /// If a transaction is open.
    pub fn check_outside_tx(&self) {
        self.tx_context.check_outside_tx();
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            used_bytes: self.used_bytes,
            capacity: self.config.pool_capacity,
            lsn: self.lsn,
            log_bytes: self.log.size(),
        }
    }

    /// Checkpoint and release the handle; durable data is left in place
    pub fn close(mut self) -> Result<()> {
        self.checkpoint()?;
        tracing::info!("Pool closed at {}", self.dir.display());
        Ok(())
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        if let Err(e) = self.log.sync() {
            tracing::warn!("Redo log sync on drop failed: {}", e);
        }
    }
}

fn into_aborted(e: SortKvError) -> SortKvError {
    match e {
        SortKvError::TransactionAborted(_) => e,
        other => SortKvError::TransactionAborted(other.to_string()),
    }
}

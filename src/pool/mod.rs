//! Pool Module
//!
//! The durable store handle: owns the root container, runs scoped
//! all-or-nothing transactions against it, and keeps it across restarts.
//!
//! ## Responsibilities
//! - Locate (or lazily create) the root container
//! - Apply sequence primitives inside transactions with undo on abort
//! - Log committed transactions before they are acknowledged
//! - Checkpoint the root into a snapshot and truncate the log
//! - Allocation accounting against a fixed capacity
//!
//! ## On-disk Layout
//! ```text
//! {data_dir}/
//!   ├── pool.snap    checkpoint image (root + last folded LSN)
//!   └── pool.log     redo records committed since the checkpoint
//!
//! pool.log record:
//! ┌─────────┬─────────┬─────────┬──────────────────────┐
//! │ LSN (8) │ CRC (4) │ Len (4) │ Ops (bincode)        │
//! └─────────┴─────────┴─────────┴──────────────────────┘
//! ```

mod fault;
mod handle;
mod log;
mod record;
mod snapshot;
mod transaction;

pub use fault::FaultInjector;
pub use handle::{Pool, PoolStats, TxContext};
pub use log::{RedoLog, ReplayResult};
pub use record::{LogRecord, VecOp, HEADER_SIZE};
pub use transaction::Transaction;

/// Checkpoint image file name
pub const SNAPSHOT_FILENAME: &str = "pool.snap";

/// Redo log file name
pub const LOG_FILENAME: &str = "pool.log";

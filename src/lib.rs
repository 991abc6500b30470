//! # SortKV
//!
//! An embedded, ordered key-value store that survives restarts and
//! power loss:
//! - Sorted dual-array container (keys and values in parallel vectors)
//! - O(log n) point lookups and bound-finding
//! - Four directional range scans plus a full scan
//! - All-or-nothing upserts and deletes via scoped pool transactions
//! - Reattach-on-restart recovery
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Caller (single writer)                       │
//! │              SharedEngine / CLI / embedder                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │     search · scan · put/remove · recover-on-open             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ run_transaction
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Pool                                  │
//! │   root Container · undo on abort · redo log · checkpoint     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  pool.log   │          │  pool.snap  │
//!   │  (append)   │          │ (checkpoint)│
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//! ```no_run
//! use sortkv::{Config, Engine, Status};
//!
//! let config = Config::builder().data_dir("/tmp/sortkv-demo").build();
//! let mut engine = Engine::open(config).unwrap();
//!
//! engine.put(b"b", b"2").unwrap();
//! engine.put(b"a", b"1").unwrap();
//!
//! let mut seen = Vec::new();
//! let status = engine.get_equal_above(b"a", |k, _| {
//!     seen.push(k.to_vec());
//!     0
//! });
//! assert_eq!(status, Status::Ok);
//! assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec()]);
//!
//! engine.close().unwrap();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod pool;
pub mod engine;
pub mod shared;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{SortKvError, Result};
pub use config::{Config, PoolSyncStrategy};
pub use engine::{Engine, Status};
pub use pool::FaultInjector;
pub use shared::SharedEngine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SortKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Fault injection
//!
//! Armed on a pool, consumed by the next transaction it opens.

/// A one-shot failure for the next transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultInjector {
    /// Let `n` primitives succeed, then fail the next one
    AfterOps(usize),

    /// Fail once the closure has finished, before the redo record is written
    BeforeCommit,

    /// Tear the redo record mid-write; `cut_back: false` also leaves the
    /// partial bytes behind, poisoning the log
    LogWrite { cut_back: bool },
}

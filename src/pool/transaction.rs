//! Scoped transactions
//!
//! Primitives apply straight to the in-memory container and record an undo
//! entry plus a redo op. The pool appends the redo ops to the log on commit;
//! on any failure the undo entries are replayed newest-first. Dropping an
//! unfinished transaction (e.g. while unwinding) also rolls it back.

use crate::engine::{Container, Sequence};
use crate::error::{Result, SortKvError};

use super::fault::FaultInjector;
use super::record::VecOp;

/// Inverse of one applied primitive
#[derive(Debug)]
enum Undo {
    Insert { seq: Sequence, index: usize },
    Erase { seq: Sequence, index: usize, bytes: Vec<u8> },
    Replace { seq: Sequence, index: usize, bytes: Vec<u8> },
    Append { seq: Sequence },
    Root(Option<Box<Container>>),
}

/// An open all-or-nothing unit of writes against the pool root
pub struct Transaction<'p> {
    root: &'p mut Option<Container>,
    used_bytes: u64,
    capacity: u64,
    fault: Option<FaultInjector>,
    ops_applied: usize,
    undo: Vec<Undo>,
    redo: Vec<VecOp>,
    finished: bool,
}

impl<'p> Transaction<'p> {
    pub(super) fn begin(
        root: &'p mut Option<Container>,
        used_bytes: u64,
        capacity: u64,
        fault: Option<FaultInjector>,
    ) -> Self {
        Self {
            root,
            used_bytes,
            capacity,
            fault,
            ops_applied: 0,
            undo: Vec::new(),
            redo: Vec::new(),
            finished: false,
        }
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    /// Store a fresh, empty container in the root slot
    ///
    /// The previous slot content is snapshotted so an abort restores it.
    pub fn create_root(&mut self) -> Result<()> {
        self.before_op()?;

        let previous = self.root.replace(Container::new());
        self.undo.push(Undo::Root(previous.map(Box::new)));
        self.redo.push(VecOp::CreateRoot);
        self.used_bytes = 0;
        Ok(())
    }

    /// Insert `bytes` at `index`, shifting later elements right
    pub fn insert_at(&mut self, seq: Sequence, index: usize, bytes: Vec<u8>) -> Result<()> {
        self.before_op()?;
        let added = bytes.len() as u64;
        self.reserve(added, 0)?;

        let v = self.container_mut()?.sequence_mut(seq);
        if index > v.len() {
            return Err(out_of_range("insert_at", index, v.len()));
        }
        v.insert(index, bytes.clone());

        self.used_bytes += added;
        self.undo.push(Undo::Insert { seq, index });
        self.redo.push(VecOp::Insert { seq, index, bytes });
        Ok(())
    }

    /// Remove the element at `index`, shifting later elements left
    pub fn erase_at(&mut self, seq: Sequence, index: usize) -> Result<()> {
        self.before_op()?;

        let v = self.container_mut()?.sequence_mut(seq);
        if index >= v.len() {
            return Err(out_of_range("erase_at", index, v.len()));
        }
        let bytes = v.remove(index);

        self.used_bytes = self.used_bytes.saturating_sub(bytes.len() as u64);
        self.undo.push(Undo::Erase { seq, index, bytes });
        self.redo.push(VecOp::Erase { seq, index });
        Ok(())
    }

    /// Overwrite the element at `index`
    pub fn replace_at(&mut self, seq: Sequence, index: usize, bytes: Vec<u8>) -> Result<()> {
        self.before_op()?;

        let old_len = {
            let v = self.container_mut()?.sequence(seq);
            match v.get(index) {
                Some(old) => old.len() as u64,
                None => return Err(out_of_range("replace_at", index, v.len())),
            }
        };
        self.reserve(bytes.len() as u64, old_len)?;

        let v = self.container_mut()?.sequence_mut(seq);
        let old = std::mem::replace(&mut v[index], bytes.clone());

        self.used_bytes = self.used_bytes.saturating_sub(old_len) + bytes.len() as u64;
        self.undo.push(Undo::Replace {
            seq,
            index,
            bytes: old,
        });
        self.redo.push(VecOp::Replace { seq, index, bytes });
        Ok(())
    }

    /// Push `bytes` onto the end
    pub fn append(&mut self, seq: Sequence, bytes: Vec<u8>) -> Result<()> {
        self.before_op()?;
        let added = bytes.len() as u64;
        self.reserve(added, 0)?;

        self.container_mut()?.sequence_mut(seq).push(bytes.clone());

        self.used_bytes += added;
        self.undo.push(Undo::Append { seq });
        self.redo.push(VecOp::Append { seq, bytes });
        Ok(())
    }

    /// Read the root as it stands inside this transaction
    pub fn container(&self) -> Option<&Container> {
        self.root.as_ref()
    }

    // =========================================================================
    // Lifecycle (driven by the pool)
    // =========================================================================

    pub(super) fn check_commit_fault(&mut self) -> Result<()> {
        if self.fault == Some(FaultInjector::BeforeCommit) {
            self.fault = None;
            return Err(SortKvError::TransactionAborted(
                "injected fault before commit".into(),
            ));
        }
        Ok(())
    }

    /// Hand the redo ops to the pool; undo entries stay until commit/abort
    pub(super) fn take_redo(&mut self) -> Vec<VecOp> {
        std::mem::take(&mut self.redo)
    }

    /// Keep every applied change; returns the pool's new byte usage
    pub(super) fn commit(mut self) -> u64 {
        self.finished = true;
        self.undo.clear();
        self.used_bytes
    }

    /// Revert every applied change
    pub(super) fn abort(mut self) {
        self.rollback();
        self.finished = true;
    }

    fn rollback(&mut self) {
        while let Some(undo) = self.undo.pop() {
            if let Undo::Root(previous) = undo {
                *self.root = previous.map(|b| *b);
                continue;
            }

            let Some(container) = self.root.as_mut() else {
                continue;
            };
            match undo {
                Undo::Insert { seq, index } => {
                    container.sequence_mut(seq).remove(index);
                }
                Undo::Erase { seq, index, bytes } => {
                    container.sequence_mut(seq).insert(index, bytes);
                }
                Undo::Replace { seq, index, bytes } => {
                    container.sequence_mut(seq)[index] = bytes;
                }
                Undo::Append { seq } => {
                    container.sequence_mut(seq).pop();
                }
                Undo::Root(_) => {}
            }
        }
        self.redo.clear();
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn before_op(&mut self) -> Result<()> {
        if let Some(FaultInjector::AfterOps(n)) = self.fault {
            if self.ops_applied >= n {
                self.fault = None;
                return Err(SortKvError::TransactionAborted(format!(
                    "injected fault after {} ops",
                    n
                )));
            }
        }
        self.ops_applied += 1;
        Ok(())
    }

    fn reserve(&self, add: u64, release: u64) -> Result<()> {
        let needed = self.used_bytes.saturating_sub(release) + add;
        if needed > self.capacity {
            return Err(SortKvError::TransactionAborted(format!(
                "pool capacity exhausted: need {} bytes, capacity {}",
                needed, self.capacity
            )));
        }
        Ok(())
    }

    fn container_mut(&mut self) -> Result<&mut Container> {
        self.root
            .as_mut()
            .ok_or_else(|| SortKvError::TransactionAborted("pool has no root container".into()))
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.rollback();
        }
    }
}

fn out_of_range(op: &str, index: usize, len: usize) -> SortKvError {
    SortKvError::TransactionAborted(format!("{}: index {} out of range (len {})", op, index, len))
}

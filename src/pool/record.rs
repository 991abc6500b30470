//! Redo log records
//!
//! One record per committed transaction, carrying every sequence primitive
//! the transaction applied, in order.

use serde::{Deserialize, Serialize};

use crate::engine::{Container, Sequence};
use crate::error::{Result, SortKvError};

/// Size of the fixed frame header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A single primitive applied inside a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VecOp {
    /// Allocate a fresh, empty container and store it in the root slot
    CreateRoot,

    /// Insert `bytes` at `index`, shifting later elements right
    Insert {
        seq: Sequence,
        index: usize,
        bytes: Vec<u8>,
    },

    /// Remove the element at `index`, shifting later elements left
    Erase { seq: Sequence, index: usize },

    /// Overwrite the element at `index`
    Replace {
        seq: Sequence,
        index: usize,
        bytes: Vec<u8>,
    },

    /// Push `bytes` onto the end
    Append { seq: Sequence, bytes: Vec<u8> },
}

impl VecOp {
    /// Re-apply this op during log replay
    pub fn redo(&self, root: &mut Option<Container>) -> Result<()> {
        if let VecOp::CreateRoot = self {
            *root = Some(Container::new());
            return Ok(());
        }

        let container = root
            .as_mut()
            .ok_or_else(|| SortKvError::Corruption("log op before root creation".into()))?;

        match self {
            VecOp::CreateRoot => {}
            VecOp::Insert { seq, index, bytes } => {
                let v = container.sequence_mut(*seq);
                check_index(*index, v.len() + 1)?;
                v.insert(*index, bytes.clone());
            }
            VecOp::Erase { seq, index } => {
                let v = container.sequence_mut(*seq);
                check_index(*index, v.len())?;
                v.remove(*index);
            }
            VecOp::Replace { seq, index, bytes } => {
                let v = container.sequence_mut(*seq);
                check_index(*index, v.len())?;
                v[*index] = bytes.clone();
            }
            VecOp::Append { seq, bytes } => {
                container.sequence_mut(*seq).push(bytes.clone());
            }
        }

        Ok(())
    }
}

fn check_index(index: usize, bound: usize) -> Result<()> {
    if index < bound {
        Ok(())
    } else {
        Err(SortKvError::Corruption(format!(
            "log op index {} out of range (bound {})",
            index, bound
        )))
    }
}

/// A committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// Ops in application order
    pub ops: Vec<VecOp>,
}

impl LogRecord {
    pub fn new(lsn: u64, ops: Vec<VecOp>) -> Self {
        Self { lsn, ops }
    }

    /// Frame the record: `[LSN (8)][CRC (4)][Len (4)][Data]`, little endian
    ///
    /// The CRC covers the LSN bytes and the data.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(&self.ops)?;
        let len = u32::try_from(data.len()).map_err(|_| {
            SortKvError::Serialization(format!("log record too large: {} bytes", data.len()))
        })?;

        let lsn_bytes = self.lsn.to_le_bytes();
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn_bytes);
        hasher.update(&data);
        let crc = hasher.finalize();

        let mut buf = Vec::with_capacity(HEADER_SIZE + data.len());
        buf.extend_from_slice(&lsn_bytes);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&data);
        Ok(buf)
    }

    /// Decode one framed record from the front of `buf`
    ///
    /// Returns the record and the number of bytes it occupied. A short
    /// buffer or a checksum mismatch yields `Corruption`.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < HEADER_SIZE {
            return Err(SortKvError::Corruption(format!(
                "partial header: {} of {} bytes",
                buf.len(),
                HEADER_SIZE
            )));
        }

        let lsn = u64::from_le_bytes(field(buf, 0));
        let crc = u32::from_le_bytes(field(buf, 8));
        let len = u32::from_le_bytes(field(buf, 12)) as usize;

        let end = HEADER_SIZE + len;
        if buf.len() < end {
            return Err(SortKvError::Corruption(format!(
                "partial record at lsn {}: {} of {} bytes",
                lsn,
                buf.len(),
                end
            )));
        }

        let data = &buf[HEADER_SIZE..end];
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&buf[0..8]);
        hasher.update(data);
        if hasher.finalize() != crc {
            return Err(SortKvError::Corruption(format!("CRC mismatch at lsn {}", lsn)));
        }

        let ops = bincode::deserialize(data)?;
        Ok((Self { lsn, ops }, end))
    }
}

fn field<const N: usize>(buf: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[at..at + N]);
    out
}

//! Redo log
//!
//! Append-only file of committed transactions. A record is durable once it
//! is fully written; replay stops at the first torn or corrupt record and
//! cuts the file back to the last good one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::PoolSyncStrategy;
use crate::error::{Result, SortKvError};

use super::record::LogRecord;

/// Appends committed transactions to the redo log file
pub struct RedoLog {
    path: PathBuf,
    file: File,
    sync_strategy: PoolSyncStrategy,
    commits_since_sync: usize,
    /// Bytes of intact records on disk
    size: u64,
    /// Set when a failed append could not be cut back; later appends are refused
    poisoned: bool,
    /// Armed torn write for the next append: `Some(cut_back)`
    torn_write: Option<bool>,
}

/// Outcome of replaying a redo log
#[derive(Debug, Default)]
pub struct ReplayResult {
    /// Number of intact records read
    pub records_replayed: u64,

    /// Last valid LSN (0 if none)
    pub last_lsn: u64,

    /// Bytes cut from the tail (torn or corrupt records)
    pub bytes_discarded: u64,

    /// Whether the file was truncated
    pub was_truncated: bool,
}

impl RedoLog {
    /// Open or create a redo log for appending
    pub fn open(path: &Path, sync_strategy: PoolSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            sync_strategy,
            commits_since_sync: 0,
            size,
            poisoned: false,
            torn_write: None,
        })
    }

    /// Append a record; returns the log size afterwards
    ///
    /// On failure the file is cut back to its size before the call, so a
    /// half-written record never precedes later commits.
    pub fn append(&mut self, record: &LogRecord) -> Result<u64> {
        if self.poisoned {
            return Err(SortKvError::TransactionAborted(
                "redo log unusable after a failed append".into(),
            ));
        }

        let bytes = record.encode()?;
        let torn = self.torn_write.take();
        let written = match torn {
            Some(_) => self.write_torn(&bytes),
            None => self.write_and_sync(&bytes),
        };

        if let Err(e) = written {
            let cut = torn != Some(false) && self.file.set_len(self.size).is_ok();
            if !cut {
                tracing::error!("Redo log could not be cut back to {} bytes", self.size);
                self.poisoned = true;
            }
            return Err(e);
        }

        self.size += bytes.len() as u64;
        Ok(self.size)
    }

    /// Make the next append write half its record and fail
    ///
    /// With `cut_back` false the partial bytes stay on disk as if the
    /// cut-back itself had failed, leaving the log poisoned.
    pub fn arm_torn_write(&mut self, cut_back: bool) {
        self.torn_write = Some(cut_back);
    }

    /// Whether appends are refused until the next truncate
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn write_torn(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(&bytes[..bytes.len() / 2])?;
        self.file.flush()?;
        Err(SortKvError::Io(io::Error::new(
            io::ErrorKind::Other,
            "injected torn redo log write",
        )))
    }

    fn write_and_sync(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes)?;
        self.commits_since_sync += 1;

        match self.sync_strategy {
            PoolSyncStrategy::EveryCommit => self.sync()?,
            PoolSyncStrategy::EveryNCommits { count } => {
                if self.commits_since_sync >= count {
                    self.sync()?;
                }
            }
        }

        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        self.commits_since_sync = 0;
        Ok(())
    }

    /// Drop every record (after a checkpoint has captured them)
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.size = 0;
        self.commits_since_sync = 0;
        self.poisoned = false;
        Ok(())
    }

    /// Current size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every intact record, cutting any torn tail off the file
    ///
    /// A missing file replays as empty.
    pub fn replay(path: &Path) -> Result<(Vec<LogRecord>, ReplayResult)> {
        let mut result = ReplayResult::default();
        if !path.exists() {
            return Ok((Vec::new(), result));
        }

        let data = fs::read(path)?;
        let mut records = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            match LogRecord::decode(&data[offset..]) {
                Ok((record, used)) => {
                    if record.lsn <= result.last_lsn {
                        tracing::warn!(
                            "Redo log LSN went backwards ({} after {}), stopping replay",
                            record.lsn,
                            result.last_lsn
                        );
                        break;
                    }
                    result.last_lsn = record.lsn;
                    result.records_replayed += 1;
                    records.push(record);
                    offset += used;
                }
                Err(e) => {
                    tracing::warn!("Redo log tail discarded at offset {}: {}", offset, e);
                    break;
                }
            }
        }

        if offset < data.len() {
            result.bytes_discarded = (data.len() - offset) as u64;
            result.was_truncated = true;

            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(offset as u64)?;
            file.sync_all()?;
        }

        Ok((records, result))
    }
}

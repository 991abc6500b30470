//! Pool snapshot (checkpoint image)
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Header (18 bytes)                                        │
//! │   Magic: "SKVP" (4) | Version: u16 (2) | CRC: u32 (4)    │
//! │   BodyLen: u64 (8)                                       │
//! ├──────────────────────────────────────────────────────────┤
//! │ Body (bincode)                                           │
//! │   lsn: u64 | root: Option<Container>                     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Snapshots are replaced atomically: written to a temp file, synced,
//! then renamed over the old one.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::Container;
use crate::error::{Result, SortKvError};

/// Magic bytes identifying a SortKV pool snapshot
pub(crate) const MAGIC: &[u8; 4] = b"SKVP";

/// Snapshot format version
pub(crate) const VERSION: u16 = 1;

/// Header size: magic (4) + version (2) + crc (4) + body length (8)
pub(crate) const HEADER_SIZE: usize = 18;

/// Snapshot contents
#[derive(Debug, Default, Deserialize)]
pub struct SnapshotBody {
    /// Last LSN folded into this image
    pub lsn: u64,

    /// Root slot; `None` until the first container is created
    pub root: Option<Container>,
}

/// Borrowed view written at checkpoint time
#[derive(Serialize)]
struct SnapshotRef<'a> {
    lsn: u64,
    root: Option<&'a Container>,
}

/// Load a snapshot, verifying magic, version and checksum
pub fn read(path: &Path) -> Result<SnapshotBody> {
    let data = fs::read(path)?;
    if data.len() < HEADER_SIZE {
        return Err(SortKvError::Corruption(format!(
            "snapshot too short: {} bytes",
            data.len()
        )));
    }

    if &data[0..4] != MAGIC {
        return Err(SortKvError::Corruption("bad snapshot magic".into()));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != VERSION {
        return Err(SortKvError::Corruption(format!(
            "unsupported snapshot version {}",
            version
        )));
    }

    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&data[6..10]);
    let crc = u32::from_le_bytes(crc_bytes);

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&data[10..18]);
    let body_len = u64::from_le_bytes(len_bytes) as usize;

    let body = &data[HEADER_SIZE..];
    if body.len() != body_len {
        return Err(SortKvError::Corruption(format!(
            "snapshot body is {} bytes, header says {}",
            body.len(),
            body_len
        )));
    }

    if crc32fast::hash(body) != crc {
        return Err(SortKvError::Corruption("snapshot CRC mismatch".into()));
    }

    Ok(bincode::deserialize(body)?)
}

/// Atomically replace the snapshot at `path`
pub fn write(path: &Path, lsn: u64, root: Option<&Container>) -> Result<()> {
    let encoded = bincode::serialize(&SnapshotRef { lsn, root })?;
    let tmp_path = path.with_extension("snap.tmp");

    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        file.write_all(MAGIC)?;
        file.write_all(&VERSION.to_le_bytes())?;
        file.write_all(&crc32fast::hash(&encoded).to_le_bytes())?;
        file.write_all(&(encoded.len() as u64).to_le_bytes())?;
        file.write_all(&encoded)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;

    // Persist the rename itself; not every platform lets us open a directory
    if let Some(dir) = path.parent() {
        if let Ok(d) = File::open(dir) {
            let _ = d.sync_all();
        }
    }

    Ok(())
}

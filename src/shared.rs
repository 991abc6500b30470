//! Shared engine handle
//!
//! Thread-safe wrapper giving callers the single-writer discipline the
//! engine expects: reads hold the shared lock, mutations the exclusive one.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::engine::{Engine, Status};
use crate::error::Result;

/// Cloneable, lock-protected engine
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<RwLock<Engine>>,
}

impl SharedEngine {
    /// Open an engine and wrap it
    pub fn open(config: Config) -> Result<Self> {
        Ok(Self::new(Engine::open(config)?))
    }

    pub fn open_path(path: &Path) -> Result<Self> {
        Ok(Self::new(Engine::open_path(path)?))
    }

    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    // -------------------------------------------------------------------------
    // Reads (shared lock)
    // -------------------------------------------------------------------------

    pub fn count_all(&self) -> usize {
        self.inner.read().count_all()
    }

    pub fn get_value(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.read().get_value(key)
    }

    pub fn exists(&self, key: &[u8]) -> Status {
        self.inner.read().exists(key)
    }

    /// Collect every entry in ascending order
    pub fn entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut out = Vec::new();
        self.inner.read().get_all(|k, v| {
            out.push((k.to_vec(), v.to_vec()));
            0
        });
        out
    }

    // -------------------------------------------------------------------------
    // Writes (exclusive lock)
    // -------------------------------------------------------------------------

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.write().put(key, value)
    }

    pub fn remove(&self, key: &[u8]) -> Result<Status> {
        self.inner.write().remove(key)
    }

    /// Run `f` with shared access (e.g. for scans)
    pub fn with_read<T>(&self, f: impl FnOnce(&Engine) -> T) -> T {
        let guard = self.inner.read();
        f(&*guard)
    }

    /// Unwrap the engine and close it once this is the last handle
    ///
    /// Returns `self` back when other clones are still alive.
    pub fn try_close(self) -> std::result::Result<Result<()>, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(lock) => Ok(lock.into_inner().close()),
            Err(inner) => Err(Self { inner }),
        }
    }
}

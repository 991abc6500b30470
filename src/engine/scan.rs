//! Scan protocol
//!
//! Ascending visits over the whole container or one side of a boundary
//! key. A visitor returns `0` to continue; anything else stops the scan,
//! which then reports `StoppedByCallback`.
//!
//! | Scan              | Range          | Start                  |
//! |-------------------|----------------|------------------------|
//! | `get_above`       | `(key, +inf)`  | upper bound            |
//! | `get_equal_above` | `[key, +inf)`  | lower bound            |
//! | `get_equal_below` | `(-inf, key]`  | index 0, stop at `> key`  |
//! | `get_below`       | `(-inf, key)`  | index 0, stop at `>= key` |

use super::{search, Engine, Status};

impl Engine {
    /// Visit every entry in ascending key order
    pub fn get_all<F>(&self, visitor: F) -> Status
    where
        F: FnMut(&[u8], &[u8]) -> i32,
    {
        tracing::debug!("get_all");
        self.pool.check_outside_tx();
        self.visit_from(0, |_| true, visitor)
    }

    /// Visit entries with keys strictly greater than `key`
    pub fn get_above<F>(&self, key: &[u8], visitor: F) -> Status
    where
        F: FnMut(&[u8], &[u8]) -> i32,
    {
        tracing::debug!(key = %String::from_utf8_lossy(key), "get_above");
        self.pool.check_outside_tx();

        let start = search::upper_bound(self.container().keys(), key);
        self.visit_from(start, |_| true, visitor)
    }

    /// Visit entries with keys greater than or equal to `key`
    pub fn get_equal_above<F>(&self, key: &[u8], visitor: F) -> Status
    where
        F: FnMut(&[u8], &[u8]) -> i32,
    {
        tracing::debug!(key = %String::from_utf8_lossy(key), "get_equal_above");
        self.pool.check_outside_tx();

        let start = search::lower_bound(self.container().keys(), key);
        self.visit_from(start, |_| true, visitor)
    }

    /// Visit entries with keys less than or equal to `key`
    pub fn get_equal_below<F>(&self, key: &[u8], visitor: F) -> Status
    where
        F: FnMut(&[u8], &[u8]) -> i32,
    {
        tracing::debug!(key = %String::from_utf8_lossy(key), "get_equal_below");
        self.pool.check_outside_tx();
        self.visit_from(0, |k| k <= key, visitor)
    }

    /// Visit entries with keys strictly less than `key`
    pub fn get_below<F>(&self, key: &[u8], visitor: F) -> Status
    where
        F: FnMut(&[u8], &[u8]) -> i32,
    {
        tracing::debug!(key = %String::from_utf8_lossy(key), "get_below");
        self.pool.check_outside_tx();
        self.visit_from(0, |k| k < key, visitor)
    }

    /// Walk forward from `start` while `in_range` holds for the key
    fn visit_from<R, F>(&self, start: usize, in_range: R, mut visitor: F) -> Status
    where
        R: Fn(&[u8]) -> bool,
        F: FnMut(&[u8], &[u8]) -> i32,
    {
        let container = self.container();
        let len = container.len();
        let keys = container.keys();
        let values = container.values();

        for index in start..len {
            let key = keys[index].as_slice();
            if !in_range(key) {
                break;
            }
            if visitor(key, &values[index]) != 0 {
                return Status::StoppedByCallback;
            }
        }

        Status::Ok
    }
}

//! Sorted dual-array container
//!
//! The persistent aggregate root: two parallel sequences where `values[i]`
//! is bound to `keys[i]` and `keys` is strictly ascending.

use serde::{Deserialize, Serialize};

/// Selects one of the container's two sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sequence {
    Keys,
    Values,
}

/// Keys and values kept in separate vectors, keys in sorted order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    keys: Vec<Vec<u8>>,
    values: Vec<Vec<u8>>,
}

impl Container {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    ///
    /// # Panics
    /// If the two sequences have drifted apart in length.
    pub fn len(&self) -> usize {
        assert_eq!(
            self.keys.len(),
            self.values.len(),
            "container keys and values out of sync"
        );
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted keys
    pub fn keys(&self) -> &[Vec<u8>] {
        &self.keys
    }

    /// Values, index-aligned with `keys()`
    pub fn values(&self) -> &[Vec<u8>] {
        &self.values
    }

    /// Entry at `index`, if any
    pub fn entry(&self, index: usize) -> Option<(&[u8], &[u8])> {
        let key = self.keys.get(index)?;
        let value = self.values.get(index)?;
        Some((key, value))
    }

    /// Bytes held by keys and values (the pool's allocation accounting)
    pub fn byte_size(&self) -> u64 {
        self.keys
            .iter()
            .chain(self.values.iter())
            .map(|b| b.len() as u64)
            .sum()
    }

    /// Check every structural invariant: equal lengths, strictly ascending keys
    pub fn is_consistent(&self) -> bool {
        self.keys.len() == self.values.len() && self.keys.windows(2).all(|w| w[0] < w[1])
    }

    /// Raw access for the pool's transaction primitives
    pub(crate) fn sequence_mut(&mut self, seq: Sequence) -> &mut Vec<Vec<u8>> {
        match seq {
            Sequence::Keys => &mut self.keys,
            Sequence::Values => &mut self.values,
        }
    }

    pub(crate) fn sequence(&self, seq: Sequence) -> &[Vec<u8>] {
        match seq {
            Sequence::Keys => &self.keys,
            Sequence::Values => &self.values,
        }
    }
}

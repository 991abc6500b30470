//! Binary search over the sorted key sequence
//!
//! All three routines bracket a half-open window `[l, r)` and probe the
//! midpoint `m = l + (r - l) / 2`, so each runs in O(log n) comparisons.

use std::cmp::Ordering;

/// Index of `target` in `keys`, or `None` when absent
pub fn exact_match(keys: &[Vec<u8>], target: &[u8]) -> Option<usize> {
    let mut l = 0;
    let mut r = keys.len();

    while l < r {
        let m = l + (r - l) / 2;
        match keys[m].as_slice().cmp(target) {
            Ordering::Equal => return Some(m),
            Ordering::Less => l = m + 1,
            Ordering::Greater => r = m,
        }
    }

    None
}

/// Smallest index whose key is `>= target` (`keys.len()` if none)
pub fn lower_bound(keys: &[Vec<u8>], target: &[u8]) -> usize {
    let mut l = 0;
    let mut r = keys.len();

    while l < r {
        let m = l + (r - l) / 2;
        if keys[m].as_slice() < target {
            l = m + 1;
        } else {
            r = m;
        }
    }

    l
}

/// Smallest index whose key is `> target` (`keys.len()` if none)
pub fn upper_bound(keys: &[Vec<u8>], target: &[u8]) -> usize {
    let mut l = 0;
    let mut r = keys.len();

    while l < r {
        let m = l + (r - l) / 2;
        if keys[m].as_slice() <= target {
            l = m + 1;
        } else {
            r = m;
        }
    }

    l
}

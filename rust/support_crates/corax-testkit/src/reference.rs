//! Naive reference implementations used to check the optimized kernels.

use std::collections::BTreeSet;

/// Sorted, deduplicated intersection.
pub fn intersect(a: &[u64], b: &[u64]) -> Vec<u64> {
    let b: BTreeSet<u64> = b.iter().copied().collect();
    let set: BTreeSet<u64> = a.iter().copied().filter(|v| b.contains(v)).collect();
    set.into_iter().collect()
}

/// Sorted, deduplicated union.
pub fn union(a: &[u64], b: &[u64]) -> Vec<u64> {
    let set: BTreeSet<u64> = a.iter().chain(b.iter()).copied().collect();
    set.into_iter().collect()
}

/// Sorted, deduplicated union of any number of sets.
pub fn union_all<'a>(sets: impl IntoIterator<Item = &'a [u64]>) -> Vec<u64> {
    let set: BTreeSet<u64> = sets.into_iter().flatten().copied().collect();
    set.into_iter().collect()
}

pub fn sort_dedup(values: &[u64]) -> Vec<u64> {
    let set: BTreeSet<u64> = values.iter().copied().collect();
    set.into_iter().collect()
}

pub fn is_strictly_increasing(values: &[u64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

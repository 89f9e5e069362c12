//! Data generation utilities for testing.
//!
//! Every generator draws from the thread-local `fastrand` generator, so callers
//! get reproducible data by calling `fastrand::seed` first.

use std::collections::BTreeSet;

/// Generates `count` distinct ids in `[min, max)`, sorted ascending.
///
/// Panics if the range holds fewer than `count` values.
pub fn sorted_ids(count: usize, min: u64, max: u64) -> Vec<u64> {
    assert!(max > min && (max - min) as usize >= count);
    let mut set = BTreeSet::new();
    while set.len() < count {
        set.insert(fastrand::u64(min..max));
    }
    set.into_iter().collect()
}

/// Generates ascending ids where each gap is drawn from `1..=max_gap`.
pub fn dense_ids(count: usize, start: u64, max_gap: u64) -> Vec<u64> {
    assert!(max_gap > 0);
    let mut ids = Vec::with_capacity(count);
    let mut next = start;
    for _ in 0..count {
        ids.push(next);
        next += fastrand::u64(1..=max_gap);
    }
    ids
}

/// Picks roughly `ratio` of `ids`, preserving order.
pub fn sample_ids(ids: &[u64], ratio: f64) -> Vec<u64> {
    ids.iter().copied().filter(|_| fastrand::f64() < ratio).collect()
}

/// Random ASCII alphanumeric bytes of length `0..=max_len`.
pub fn ascii_value(max_len: usize) -> Vec<u8> {
    let len = fastrand::usize(0..=max_len);
    (0..len).map(|_| fastrand::alphanumeric() as u8).collect()
}

/// A single generated field value, shaped like the variants an index entry stores.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Absent,
    Raw(Vec<u8>),
    Tuple(Vec<u8>, i64, f64),
    List(Vec<Vec<u8>>),
    TupleList(Vec<(Vec<u8>, i64, f64)>),
}

/// Generates a document with one value per field. Roughly one field in six is
/// absent; the remaining shapes are drawn uniformly.
pub fn document(field_count: usize, max_value_len: usize, max_list_len: usize) -> Vec<GeneratedValue> {
    (0..field_count)
        .map(|_| match fastrand::u8(0..6) {
            0 => GeneratedValue::Absent,
            1 | 2 => GeneratedValue::Raw(ascii_value(max_value_len)),
            3 => GeneratedValue::Tuple(ascii_value(max_value_len), random_long(), random_double()),
            4 => GeneratedValue::List(
                (0..fastrand::usize(0..=max_list_len))
                    .map(|_| ascii_value(max_value_len))
                    .collect(),
            ),
            _ => GeneratedValue::TupleList(
                (0..fastrand::usize(0..=max_list_len))
                    .map(|_| (ascii_value(max_value_len), random_long(), random_double()))
                    .collect(),
            ),
        })
        .collect()
}

/// Longs spread across the small, medium and full 64-bit ranges.
pub fn random_long() -> i64 {
    match fastrand::u8(0..3) {
        0 => fastrand::i64(-100..100),
        1 => fastrand::i64(-1_000_000..1_000_000),
        _ => fastrand::i64(..),
    }
}

pub fn random_double() -> f64 {
    (fastrand::f64() - 0.5) * 1e6
}

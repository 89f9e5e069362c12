//! Ordered numeric term lookups: key to term id, iterated in either direction.

use std::{cmp::Ordering, fmt};

/// A numeric lookup key.
pub trait LookupKey: Copy + fmt::Debug + fmt::Display {
    const MIN: Self;
    const MAX: Self;

    fn compare(&self, other: &Self) -> Ordering;

    fn is_equal(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Int64LookupKey(pub i64);

impl LookupKey for Int64LookupKey {
    const MIN: Self = Int64LookupKey(i64::MIN);
    const MAX: Self = Int64LookupKey(i64::MAX);

    fn compare(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Int64LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Double key. `+0.0` and `-0.0` are the same key; NaN orders by its bit pattern.
#[derive(Debug, Clone, Copy)]
pub struct DoubleLookupKey(pub f64);

impl LookupKey for DoubleLookupKey {
    const MIN: Self = DoubleLookupKey(f64::MIN);
    const MAX: Self = DoubleLookupKey(f64::MAX);

    fn compare(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or_else(|| self.0.total_cmp(&other.0))
    }

    fn is_equal(&self, other: &Self) -> bool {
        if self.0 == 0.0 && other.0 == 0.0 {
            return true;
        }
        self.0.to_bits() == other.0.to_bits()
    }
}

impl fmt::Display for DoubleLookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Cursor over a lookup in a fixed direction.
pub trait LookupIterator<K: LookupKey> {
    fn is_forward(&self) -> bool;

    /// Positions the cursor on the first key at or after `key` in iteration order:
    /// the smallest key `>= key` going forward, the largest key `<= key` going
    /// backward.
    fn seek(&mut self, key: K);

    /// Returns the next key and its term id.
    fn move_next(&mut self) -> Option<(K, u64)>;

    /// Returns to the first key in iteration order.
    fn reset(&mut self);
}

/// In-memory lookup; keys are unique under [`LookupKey::compare`].
#[derive(Debug, Clone, Default)]
pub struct MemoryLookup<K> {
    entries: Vec<(K, u64)>,
}

impl<K: LookupKey> MemoryLookup<K> {
    pub fn new() -> MemoryLookup<K> {
        MemoryLookup {
            entries: Vec::new(),
        }
    }

    /// Maps `key` to `term_id`, replacing the term of an equal key.
    pub fn insert(&mut self, key: K, term_id: u64) {
        match self.entries.binary_search_by(|(k, _)| k.compare(&key)) {
            Ok(pos) => self.entries[pos] = (key, term_id),
            Err(pos) => self.entries.insert(pos, (key, term_id)),
        }
    }

    pub fn get(&self, key: K) -> Option<u64> {
        self.entries
            .binary_search_by(|(k, _)| k.compare(&key))
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iterate(&self, forward: bool) -> MemoryLookupIterator<'_, K> {
        let mut iter = MemoryLookupIterator {
            entries: &self.entries,
            forward,
            next: 0,
        };
        iter.reset();
        iter
    }
}

pub struct MemoryLookupIterator<'a, K> {
    entries: &'a [(K, u64)],
    forward: bool,
    /// Forward: index of the next entry. Backward: one past it.
    next: usize,
}

impl<K: LookupKey> LookupIterator<K> for MemoryLookupIterator<'_, K> {
    fn is_forward(&self) -> bool {
        self.forward
    }

    fn seek(&mut self, key: K) {
        self.next = if self.forward {
            self.entries
                .partition_point(|(k, _)| k.compare(&key) == Ordering::Less)
        } else {
            self.entries
                .partition_point(|(k, _)| k.compare(&key) != Ordering::Greater)
        };
    }

    fn move_next(&mut self) -> Option<(K, u64)> {
        if self.forward {
            let entry = self.entries.get(self.next)?;
            self.next += 1;
            Some(*entry)
        } else {
            if self.next == 0 {
                return None;
            }
            self.next -= 1;
            Some(self.entries[self.next])
        }
    }

    fn reset(&mut self) {
        self.next = if self.forward { 0 } else { self.entries.len() };
    }
}

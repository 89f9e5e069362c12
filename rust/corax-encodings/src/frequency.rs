//! Term frequency folding.
//!
//! Posting lists that feed a scorer store `entry_id << FREQUENCY_BITS | frequency`
//! so the occurrence count travels with the id. Ordering of folded values follows
//! the ordering of entry ids, which keeps folded posting lists sorted.

/// Number of low bits reserved for the frequency.
pub const FREQUENCY_BITS: u32 = 8;

/// Largest frequency stored without saturation.
pub const MAX_FREQUENCY: u16 = (1 << FREQUENCY_BITS) - 1;

/// Largest entry id that survives folding.
pub const MAX_ENTRY_ID: u64 = u64::MAX >> FREQUENCY_BITS;

const FREQUENCY_MASK: u64 = (1 << FREQUENCY_BITS) - 1;

/// Folds `frequency` into the low bits of `entry_id`. Frequencies above
/// [`MAX_FREQUENCY`] saturate.
#[inline]
pub fn add_frequency(entry_id: u64, frequency: u16) -> u64 {
    debug_assert!(entry_id <= MAX_ENTRY_ID, "entry id {entry_id} too large to fold");
    (entry_id << FREQUENCY_BITS) | frequency.min(MAX_FREQUENCY) as u64
}

#[inline]
pub fn remove_frequency(folded: u64) -> u64 {
    folded >> FREQUENCY_BITS
}

#[inline]
pub fn extract_frequency(folded: u64) -> u16 {
    (folded & FREQUENCY_MASK) as u16
}

#[inline]
pub fn split_frequency(folded: u64) -> (u64, u16) {
    (remove_frequency(folded), extract_frequency(folded))
}

/// Strips the frequency from every value in place.
pub fn remove_frequencies(values: &mut [u64]) {
    for value in values {
        *value = remove_frequency(*value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_round_trip() {
        fastrand::seed(0xf00d);
        for _ in 0..10_000 {
            let id = fastrand::u64(..=MAX_ENTRY_ID);
            let freq = fastrand::u16(..=MAX_FREQUENCY);
            let folded = add_frequency(id, freq);
            assert_eq!(remove_frequency(folded), id);
            assert_eq!(extract_frequency(folded), freq);
        }
        assert_eq!(split_frequency(add_frequency(MAX_ENTRY_ID, 0)), (MAX_ENTRY_ID, 0));
    }

    #[test]
    fn test_saturates_large_frequency() {
        let folded = add_frequency(42, 10_000);
        assert_eq!(split_frequency(folded), (42, MAX_FREQUENCY));
    }

    #[test]
    fn test_folding_preserves_order() {
        assert!(add_frequency(10, MAX_FREQUENCY) < add_frequency(11, 0));
        let mut values = vec![add_frequency(3, 1), add_frequency(9, 200)];
        remove_frequencies(&mut values);
        assert_eq!(values, vec![3, 9]);
    }
}

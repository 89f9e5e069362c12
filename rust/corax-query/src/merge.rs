//! Set algebra over ascending, deduplicated id sequences.
//!
//! The in-place kernels read candidates from a range of `buffer` and write the
//! result to the start of the same slice. Every written id consumes a candidate at
//! an index no lower than the write position, so the output never overtakes the
//! input.

use std::ops::Range;

/// Number of ids compared per step in the galloping intersection.
pub const LANES: usize = 4;

/// Two-pointer intersection of `buffer[candidates]` with `other`, written to the
/// start of `buffer`. Returns the result length.
pub fn and_in_place(buffer: &mut [u64], candidates: Range<usize>, other: &[u64]) -> usize {
    let mut written = 0;
    let mut i = candidates.start;
    let mut j = 0;
    while i < candidates.end && j < other.len() {
        let (l, r) = (buffer[i], other[j]);
        if l < r {
            i += 1;
        } else if l > r {
            j += 1;
        } else {
            buffer[written] = l;
            written += 1;
            i += 1;
            j += 1;
        }
    }
    written
}

/// Intersection of two sequences into `dst`, which must hold `min(left, right)`
/// ids. Returns the result length.
pub fn and(dst: &mut [u64], left: &[u64], right: &[u64]) -> usize {
    let mut written = 0;
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dst[written] = left[i];
                written += 1;
                i += 1;
                j += 1;
            }
        }
    }
    written
}

/// Union of two sequences, replacing the contents of `out`.
pub fn or_into(out: &mut Vec<u64>, left: &[u64], right: &[u64]) {
    out.clear();
    out.reserve(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => {
                out.push(left[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(right[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(left[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&left[i..]);
    out.extend_from_slice(&right[j..]);
}

/// Sorts `values` and moves the distinct ids to the front. Returns how many there are.
pub fn sort_dedup(values: &mut [u64]) -> usize {
    if values.is_empty() {
        return 0;
    }
    values.sort_unstable();
    let mut written = 1;
    for i in 1..values.len() {
        if values[i] != values[written - 1] {
            values[written] = values[i];
            written += 1;
        }
    }
    written
}

/// Galloping intersection of `buffer[candidates]` with `other`, written to the start
/// of `buffer`; equivalent to [`and_in_place`].
///
/// The shorter side drives the loop while the longer one is searched in blocks of
/// [`LANES`] ids: whole blocks below the sought id are skipped, ids below a block
/// are dropped, and otherwise the id is compared against every lane at once.
/// Fewer than [`LANES`] trailing ids are scanned one by one.
pub fn and_in_place_vectorized(buffer: &mut [u64], candidates: Range<usize>, other: &[u64]) -> usize {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if is_x86_feature_detected!("avx2") {
            return galloping_and::<Avx2Lanes>(buffer, candidates, other);
        }
    }

    galloping_and::<ScalarLanes>(buffer, candidates, other)
}

/// [`and_in_place_vectorized`] pinned to the portable lane comparison.
pub fn and_in_place_emulated(buffer: &mut [u64], candidates: Range<usize>, other: &[u64]) -> usize {
    galloping_and::<ScalarLanes>(buffer, candidates, other)
}

trait LaneSearch {
    /// `true` if any of the [`LANES`] ids in `lanes` equals `value`.
    fn contains(lanes: &[u64], value: u64) -> bool;
}

struct ScalarLanes;

impl LaneSearch for ScalarLanes {
    #[inline(always)]
    fn contains(lanes: &[u64], value: u64) -> bool {
        lanes[..LANES].iter().any(|&l| l == value)
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
struct Avx2Lanes;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl LaneSearch for Avx2Lanes {
    #[inline(always)]
    fn contains(lanes: &[u64], value: u64) -> bool {
        // Only instantiated by `and_in_place_vectorized` after the runtime feature check.
        unsafe { lanes_contain_avx2(lanes, value) }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx2")]
#[inline]
fn lanes_contain_avx2(lanes: &[u64], value: u64) -> bool {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::*;

    assert!(lanes.len() >= LANES);
    // SAFETY: the assertion above keeps the unaligned 256-bit load in bounds.
    let block = unsafe { _mm256_loadu_si256(lanes.as_ptr() as *const __m256i) };
    let needle = _mm256_set1_epi64x(value as i64);
    _mm256_movemask_epi8(_mm256_cmpeq_epi64(block, needle)) != 0
}

#[inline(always)]
fn galloping_and<P: LaneSearch>(buffer: &mut [u64], candidates: Range<usize>, other: &[u64]) -> usize {
    let mut written = 0;
    if candidates.len() <= other.len() {
        let mut j = 0;
        for i in candidates {
            let value = buffer[i];
            if seek_block::<P>(other, &mut j, value) {
                buffer[written] = value;
                written += 1;
            }
        }
    } else {
        let mut j = candidates.start;
        for &value in other {
            if seek_block::<P>(&buffer[..candidates.end], &mut j, value) {
                buffer[written] = value;
                written += 1;
            }
        }
    }
    written
}

/// Advances `*pos` over `large` up to `value` and reports whether it is present.
/// Successive lookups must be ascending.
#[inline(always)]
fn seek_block<P: LaneSearch>(large: &[u64], pos: &mut usize, value: u64) -> bool {
    let mut j = *pos;
    // Skip only while a complete block remains.
    while j + LANES <= large.len() && large[j + LANES - 1] < value {
        j += LANES;
    }
    let found = if j + LANES <= large.len() {
        value >= large[j] && P::contains(&large[j..j + LANES], value)
    } else {
        while j < large.len() && large[j] < value {
            j += 1;
        }
        j < large.len() && large[j] == value
    };
    *pos = j;
    found
}

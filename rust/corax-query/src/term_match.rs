//! Leaf matches over the postings of a single term.

use std::{borrow::Cow, ops::Range};

use corax_common::{Result, error::Error};
use corax_encodings::{frequency, varint};
use corax_storage::{
    posting_list::{PostingList, PostingListCursor, PostingListIterator},
    postings::{Postings, TermPostings, encode_small_set},
};

use crate::{
    buffers_pool::ID_POOL,
    config::QueryConfig,
    match_protocol::{Confidence, QueryInspectionNode, QueryMatch},
    merge,
    scoring::Bm25,
};

enum TermMatchKind<'a> {
    Empty,
    Once {
        id: u64,
        done: bool,
    },
    Small {
        blob: Cow<'a, [u8]>,
        /// Offset of the first delta, after the count.
        start: usize,
        offset: usize,
        previous: i64,
        returned: u64,
    },
    Set {
        cursor: PostingListCursor<'a>,
    },
}

/// Ids of one term, in one of the posting representations.
///
/// Postings that carry folded frequencies are recorded by a [`Bm25`] scorer as
/// they are produced and reach callers as plain entry ids.
pub struct TermMatch<'a> {
    kind: TermMatchKind<'a>,
    count: u64,
    scorer: Option<Bm25>,
    config: QueryConfig,
}

impl<'a> TermMatch<'a> {
    pub fn empty() -> TermMatch<'a> {
        TermMatch {
            kind: TermMatchKind::Empty,
            count: 0,
            scorer: None,
            config: QueryConfig::default(),
        }
    }

    /// Builds the match for the postings of a term. `total_entries` is the
    /// number of entries in the index and only matters for scoring.
    pub fn from_postings(
        postings: TermPostings<'a>,
        total_entries: u64,
        config: &QueryConfig,
    ) -> Result<TermMatch<'a>> {
        let mut scorer = postings
            .frequencies
            .then(|| Bm25::new(total_entries, postings.count));
        let (kind, count) = match postings.postings {
            Postings::Single(value) => {
                let id = match scorer.as_mut() {
                    Some(scorer) => scorer.add(value),
                    None => value,
                };
                (TermMatchKind::Once { id, done: false }, 1)
            }
            Postings::Small(blob) => {
                small_set_kind(Cow::Borrowed(blob), postings.count, postings.frequencies)?
            }
            Postings::List(list) => (
                TermMatchKind::Set {
                    cursor: list.iter(),
                },
                list.len() as u64,
            ),
        };
        Ok(TermMatch {
            kind,
            count,
            scorer,
            config: config.clone(),
        })
    }

    /// A match yielding `id` once.
    pub fn once(id: u64) -> TermMatch<'a> {
        TermMatch {
            kind: TermMatchKind::Once { id, done: false },
            count: 1,
            scorer: None,
            config: QueryConfig::default(),
        }
    }

    /// A match over a posting list without frequencies.
    pub fn set(list: &'a PostingList, config: &QueryConfig) -> TermMatch<'a> {
        TermMatch {
            kind: TermMatchKind::Set {
                cursor: list.iter(),
            },
            count: list.len() as u64,
            scorer: None,
            config: config.clone(),
        }
    }

    fn variant_name(&self) -> &'static str {
        match self.kind {
            TermMatchKind::Empty => "Empty",
            TermMatchKind::Once { .. } => "Once",
            TermMatchKind::Small { .. } => "SmallSet",
            TermMatchKind::Set { .. } => "Set",
        }
    }

    /// Smallest stored value that may hold entry `id`.
    fn lowest_raw(&self, id: u64) -> u64 {
        if self.scorer.is_some() {
            frequency::add_frequency(id.min(frequency::MAX_ENTRY_ID), 0)
        } else {
            id
        }
    }

    /// Largest stored value that may hold entry `id`.
    fn highest_raw(&self, id: u64) -> u64 {
        if self.scorer.is_some() {
            frequency::add_frequency(id.min(frequency::MAX_ENTRY_ID), frequency::MAX_FREQUENCY)
        } else {
            id
        }
    }

    fn and_with_small(&mut self, buffer: &mut [u64], matches: usize) -> Result<usize> {
        let TermMatchKind::Small { blob, start, .. } = &self.kind else {
            return Ok(0);
        };
        let blob: &[u8] = blob;
        let mut offset = *start;
        let mut previous = 0i64;
        let mut scanned = 0u64;
        let mut written = 0;
        let mut i = 0;
        while scanned < self.count && i < matches {
            let (delta, read) = varint::read::<i64>(blob, offset)?;
            offset += read;
            previous = previous.wrapping_add(delta);
            scanned += 1;
            let raw = previous as u64;
            let id = match self.scorer.as_mut() {
                Some(scorer) => scorer.add(raw),
                None => raw,
            };
            while i < matches && buffer[i] < id {
                i += 1;
            }
            if i < matches && buffer[i] == id {
                buffer[written] = id;
                written += 1;
                i += 1;
            } else if let Some(scorer) = self.scorer.as_mut() {
                scorer.remove();
            }
        }
        Ok(written)
    }

    fn and_with_set(&mut self, buffer: &mut [u64], matches: usize) -> Result<usize> {
        let first = self.lowest_raw(buffer[0]);
        let last_id = buffer[matches - 1];
        let folded = self.scorer.is_some();
        let TermMatchKind::Set { cursor } = &mut self.kind else {
            return Ok(0);
        };
        cursor.seek(first)?;
        let mut written = 0;
        let mut i = 0;
        while i < matches && cursor.move_next()? {
            let Some(raw) = cursor.current() else { break };
            let id = if folded {
                frequency::remove_frequency(raw)
            } else {
                raw
            };
            if id > last_id {
                break;
            }
            while buffer[i] < id {
                i += 1;
                if i >= matches {
                    return Ok(written);
                }
            }
            if buffer[i] == id {
                // Only postings that survive the intersection reach the scorer.
                if let Some(scorer) = self.scorer.as_mut() {
                    scorer.add(raw);
                }
                buffer[written] = id;
                written += 1;
                i += 1;
            }
        }
        Ok(written)
    }

    /// Block-galloping intersection: pulls the posting list in blocks of
    /// `and_block_size` ids, pruned at the last candidate, and intersects each
    /// block with the candidates it can cover.
    ///
    /// Folded blocks are stripped before the intersection; the folded values
    /// of the survivors are then handed to the scorer.
    fn and_with_set_vectorized(&mut self, buffer: &mut [u64], matches: usize) -> Result<usize> {
        let first = self.lowest_raw(buffer[0]);
        let hint = self.highest_raw(buffer[matches - 1]);
        let mut block = ID_POOL.get_buffer(self.config.and_block_size);
        let mut folded = self
            .scorer
            .is_some()
            .then(|| ID_POOL.get_buffer(self.config.and_block_size));
        let TermMatchKind::Set { cursor } = &mut self.kind else {
            return Ok(0);
        };
        cursor.seek(first)?;

        let mut written = 0;
        let mut next_candidate = 0;
        while next_candidate < matches {
            let read = cursor.fill(&mut block, Some(hint))?;
            if read == 0 {
                break;
            }
            let values = &mut block[..read];
            if let Some(folded) = folded.as_mut() {
                folded[..read].copy_from_slice(values);
                frequency::remove_frequencies(values);
            }
            let block_last = values[read - 1];
            let end = next_candidate
                + buffer[next_candidate..matches].partition_point(|&c| c <= block_last);
            if end > next_candidate {
                let matched = and_block(
                    &self.config,
                    buffer,
                    written,
                    next_candidate..end,
                    values,
                );
                if let (Some(scorer), Some(folded)) = (self.scorer.as_mut(), folded.as_ref()) {
                    for id in &buffer[written..written + matched] {
                        if let Ok(at) = values.binary_search(id) {
                            scorer.add(folded[at]);
                        }
                    }
                }
                written += matched;
            }
            next_candidate = end;
        }
        Ok(written)
    }
}

/// Intersects `buffer[candidates]` with `block`, appending survivors at
/// `buffer[written..]`. `written` never exceeds `candidates.start`.
fn and_block(
    config: &QueryConfig,
    buffer: &mut [u64],
    written: usize,
    candidates: Range<usize>,
    block: &[u64],
) -> usize {
    let shifted = (candidates.start - written)..(candidates.end - written);
    let target = &mut buffer[written..];
    if config.use_vectorized(shifted.len(), block.len()) {
        log::trace!(
            "galloping intersection of {} candidates with {} ids",
            shifted.len(),
            block.len()
        );
        merge::and_in_place_vectorized(target, shifted, block)
    } else {
        log::trace!(
            "scalar intersection of {} candidates with {} ids",
            shifted.len(),
            block.len()
        );
        merge::and_in_place(target, shifted, block)
    }
}

/// Validates a small set blob against the stored posting count and normalizes
/// blobs whose values are not strictly ascending.
fn small_set_kind(
    blob: Cow<'_, [u8]>,
    stored_count: u64,
    frequencies: bool,
) -> Result<(TermMatchKind<'_>, u64)> {
    let (declared, start) = varint::read::<i64>(&blob, 0)?;
    if declared < 0 || declared as u64 != stored_count {
        return Err(Error::invalid_format(
            "small set",
            format!("blob declares {declared} values, postings hold {stored_count}"),
        ));
    }

    let mut values = Vec::with_capacity(declared as usize);
    let mut offset = start;
    let mut previous = 0i64;
    for _ in 0..declared {
        let (delta, read) = varint::read::<i64>(&blob, offset)?;
        offset += read;
        previous = previous.wrapping_add(delta);
        values.push(previous as u64);
    }
    if offset != blob.len() {
        return Err(Error::invalid_format(
            "small set",
            format!("{} trailing bytes after {declared} values", blob.len() - offset),
        ));
    }

    let key = |v: &u64| {
        if frequencies {
            frequency::remove_frequency(*v)
        } else {
            *v
        }
    };
    if values.windows(2).all(|w| key(&w[0]) < key(&w[1])) {
        let kind = TermMatchKind::Small {
            blob,
            start,
            offset: start,
            previous: 0,
            returned: 0,
        };
        return Ok((kind, declared as u64));
    }

    log::warn!("small set of {declared} values is not ascending; normalizing");
    values.sort_unstable();
    values.dedup_by_key(|v| key(v));
    let normalized = encode_small_set(&values);
    let (_, start) = varint::read::<i64>(&normalized, 0)?;
    let kind = TermMatchKind::Small {
        blob: Cow::Owned(normalized),
        start,
        offset: start,
        previous: 0,
        returned: 0,
    };
    Ok((kind, values.len() as u64))
}

impl QueryMatch for TermMatch<'_> {
    fn count(&self) -> u64 {
        self.count
    }

    fn confidence(&self) -> Confidence {
        Confidence::High
    }

    fn fill(&mut self, matches: &mut [u64]) -> Result<usize> {
        if matches.is_empty() {
            return Ok(0);
        }
        match &mut self.kind {
            TermMatchKind::Empty => Ok(0),
            TermMatchKind::Once { id, done } => {
                if *done {
                    return Ok(0);
                }
                *done = true;
                matches[0] = *id;
                Ok(1)
            }
            TermMatchKind::Small {
                blob,
                offset,
                previous,
                returned,
                ..
            } => {
                let mut n = 0;
                while n < matches.len() && *returned < self.count {
                    let (delta, read) = varint::read::<i64>(blob, *offset)?;
                    *offset += read;
                    *previous = previous.wrapping_add(delta);
                    *returned += 1;
                    matches[n] = *previous as u64;
                    n += 1;
                }
                if let Some(scorer) = self.scorer.as_mut() {
                    scorer.process(&mut matches[..n]);
                }
                Ok(n)
            }
            TermMatchKind::Set { cursor } => {
                let n = cursor.fill(matches, None)?;
                if let Some(scorer) = self.scorer.as_mut() {
                    scorer.process(&mut matches[..n]);
                }
                Ok(n)
            }
        }
    }

    fn and_with(&mut self, buffer: &mut [u64], matches: usize) -> Result<usize> {
        if matches == 0 {
            return Ok(0);
        }
        match &self.kind {
            TermMatchKind::Empty => Ok(0),
            TermMatchKind::Once { id, .. } => {
                let id = *id;
                Ok(match buffer[..matches].binary_search(&id) {
                    Ok(_) => {
                        buffer[0] = id;
                        1
                    }
                    Err(_) => 0,
                })
            }
            TermMatchKind::Small { .. } => self.and_with_small(buffer, matches),
            TermMatchKind::Set { .. } => {
                if self.config.vectorized {
                    self.and_with_set_vectorized(buffer, matches)
                } else {
                    self.and_with_set(buffer, matches)
                }
            }
        }
    }

    fn score(&mut self, matches: &[u64], scores: &mut [f32]) -> Result<()> {
        match &self.scorer {
            Some(scorer) => scorer.score(matches, scores),
            None => Ok(()),
        }
    }

    fn inspect(&self) -> QueryInspectionNode {
        QueryInspectionNode::new(format!("TermMatch [{}]", self.variant_name()))
            .with_parameter("IsBoosting", self.scorer.is_some())
            .with_count(self.count, self.confidence())
    }
}

impl std::fmt::Debug for TermMatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermMatch")
            .field("kind", &self.variant_name())
            .field("count", &self.count)
            .field("scored", &self.scorer.is_some())
            .finish()
    }
}

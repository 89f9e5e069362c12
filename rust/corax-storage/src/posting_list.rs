//! Out-of-line posting lists.
//!
//! A posting list is an ascending, deduplicated sequence of 64-bit values split
//! into chunks. Each chunk keeps its first value as a base and stores the offsets
//! of its members from that base as a PFOR stream.

use corax_common::{Result, error::Error, verify_arg};
use corax_encodings::pfor::{self, MAX_RUN_LENGTH, PforDecoderState, PforEncoder};

/// Cursor over a posting list.
pub trait PostingListIterator {
    /// Positions the cursor so that the next value produced is the first one
    /// greater than or equal to `from`.
    fn seek(&mut self, from: u64) -> Result<()>;

    /// Advances to the next value; `false` once the list is exhausted.
    fn move_next(&mut self) -> Result<bool>;

    /// The value most recently produced by `move_next` or `fill`.
    fn current(&self) -> Option<u64>;

    /// Copies the following values into `matches` and returns how many were
    /// written; 0 means the list is exhausted.
    ///
    /// `prune_hint` is an optimization hint: values greater than it may be left
    /// out, in which case 0 means no value up to the hint remains.
    fn fill(&mut self, matches: &mut [u64], prune_hint: Option<u64>) -> Result<usize>;
}

#[derive(Debug, Clone)]
struct PostingChunk {
    base: u64,
    last: u64,
    count: usize,
    encoded: Box<[u8]>,
}

#[derive(Debug, Clone, Default)]
pub struct PostingList {
    chunks: Vec<PostingChunk>,
    len: usize,
}

impl PostingList {
    /// Most values a single chunk holds.
    pub const CHUNK_CAPACITY: usize = 256;

    /// Builds a posting list from strictly ascending values.
    pub fn from_sorted(values: &[u64]) -> Result<PostingList> {
        verify_arg!(values, values.windows(2).all(|w| w[0] < w[1]));

        let encoder = PforEncoder::new();
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < values.len() {
            let base = values[start];
            let span = values[start..]
                .iter()
                .take(Self::CHUNK_CAPACITY)
                .take_while(|&&v| v - base <= i32::MAX as u64)
                .count();
            let offsets: Vec<i32> = values[start..start + span]
                .iter()
                .map(|&v| (v - base) as i32)
                .collect();
            chunks.push(PostingChunk {
                base,
                last: values[start + span - 1],
                count: span,
                encoded: encoder.encode(&offsets)?.into_boxed_slice(),
            });
            start += span;
        }

        log::debug!(
            "built posting list of {} values in {} chunks",
            values.len(),
            chunks.len()
        );
        Ok(PostingList {
            chunks,
            len: values.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn first(&self) -> Option<u64> {
        self.chunks.first().map(|c| c.base)
    }

    pub fn last(&self) -> Option<u64> {
        self.chunks.last().map(|c| c.last)
    }

    pub fn iter(&self) -> PostingListCursor<'_> {
        PostingListCursor {
            list: self,
            next_chunk: 0,
            decoded: Vec::with_capacity(Self::CHUNK_CAPACITY),
            pos: 0,
            current: None,
            state: PforDecoderState::new(0),
            scratch: vec![0; MAX_RUN_LENGTH + 1],
        }
    }
}

/// [`PostingListIterator`] over a [`PostingList`]; decodes one chunk at a time.
pub struct PostingListCursor<'a> {
    list: &'a PostingList,
    next_chunk: usize,
    decoded: Vec<u64>,
    pos: usize,
    current: Option<u64>,
    state: PforDecoderState,
    scratch: Vec<i32>,
}

impl PostingListCursor<'_> {
    fn load_chunk(&mut self, index: usize) -> Result<()> {
        let chunk = &self.list.chunks[index];
        self.decoded.clear();
        self.state.reset(chunk.encoded.len());
        loop {
            let n = pfor::decode(&mut self.state, &chunk.encoded, &mut self.scratch)?;
            if n == 0 {
                break;
            }
            self.decoded
                .extend(self.scratch[..n].iter().map(|&offset| chunk.base + offset as u64));
        }
        if self.decoded.len() != chunk.count {
            return Err(Error::invalid_format(
                "posting list chunk",
                format!("decoded {} values, expected {}", self.decoded.len(), chunk.count),
            ));
        }
        self.next_chunk = index + 1;
        self.pos = 0;
        Ok(())
    }

    /// Makes sure unread values are buffered; `false` when the list is exhausted.
    fn ensure_buffered(&mut self) -> Result<bool> {
        while self.pos == self.decoded.len() {
            if self.next_chunk >= self.list.chunks.len() {
                return Ok(false);
            }
            self.load_chunk(self.next_chunk)?;
        }
        Ok(true)
    }
}

impl PostingListIterator for PostingListCursor<'_> {
    fn seek(&mut self, from: u64) -> Result<()> {
        let index = self.list.chunks.partition_point(|c| c.last < from);
        if index >= self.list.chunks.len() {
            self.next_chunk = index;
            self.decoded.clear();
            self.pos = 0;
            return Ok(());
        }
        if self.next_chunk != index + 1 || self.decoded.is_empty() {
            self.load_chunk(index)?;
        }
        self.pos = self.decoded.partition_point(|&v| v < from);
        Ok(())
    }

    fn move_next(&mut self) -> Result<bool> {
        if !self.ensure_buffered()? {
            return Ok(false);
        }
        self.current = Some(self.decoded[self.pos]);
        self.pos += 1;
        Ok(true)
    }

    fn current(&self) -> Option<u64> {
        self.current
    }

    fn fill(&mut self, matches: &mut [u64], prune_hint: Option<u64>) -> Result<usize> {
        let mut written = 0;
        while written < matches.len() {
            if self.pos == self.decoded.len() {
                let next = self.list.chunks.get(self.next_chunk);
                if let (Some(hint), Some(chunk)) = (prune_hint, next) {
                    if chunk.base > hint {
                        break;
                    }
                }
            }
            if !self.ensure_buffered()? {
                break;
            }
            let n = (matches.len() - written).min(self.decoded.len() - self.pos);
            matches[written..written + n].copy_from_slice(&self.decoded[self.pos..self.pos + n]);
            self.pos += n;
            written += n;
        }
        if written > 0 {
            self.current = Some(matches[written - 1]);
        }
        Ok(written)
    }
}

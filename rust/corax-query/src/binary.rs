//! Boolean combinations of two arbitrary matches.

use corax_common::Result;

use crate::{
    buffers_pool::{BufferPoolRef, ID_POOL},
    match_protocol::{Confidence, QueryInspectionNode, QueryMatch},
    merge,
};

/// Ids pulled from each side of a union per refill.
const UNION_BATCH: usize = 1024;

/// Entries produced by both sides.
///
/// `fill` pulls a batch from the side with the smaller count and intersects it
/// with the other side through `and_with`. Both sides must produce ascending
/// ids, so a sorting match can only sit at the root of a tree.
pub struct AndMatch<L, R> {
    left: L,
    right: R,
    drive_left: bool,
}

impl<L: QueryMatch, R: QueryMatch> AndMatch<L, R> {
    pub fn new(left: L, right: R) -> AndMatch<L, R> {
        let drive_left = left.count() <= right.count();
        AndMatch {
            left,
            right,
            drive_left,
        }
    }
}

impl<L: QueryMatch, R: QueryMatch> QueryMatch for AndMatch<L, R> {
    /// Upper bound: the smaller side.
    fn count(&self) -> u64 {
        self.left.count().min(self.right.count())
    }

    fn confidence(&self) -> Confidence {
        self.left
            .confidence()
            .min(self.right.confidence())
            .min(Confidence::Normal)
    }

    fn fill(&mut self, matches: &mut [u64]) -> Result<usize> {
        if matches.is_empty() {
            return Ok(0);
        }
        loop {
            let (read, survivors) = if self.drive_left {
                let read = self.left.fill(matches)?;
                (read, if read == 0 { 0 } else { self.right.and_with(matches, read)? })
            } else {
                let read = self.right.fill(matches)?;
                (read, if read == 0 { 0 } else { self.left.and_with(matches, read)? })
            };
            // A batch without survivors does not mean the driver is exhausted.
            if read == 0 || survivors > 0 {
                return Ok(survivors);
            }
        }
    }

    fn and_with(&mut self, buffer: &mut [u64], matches: usize) -> Result<usize> {
        let n = self.left.and_with(buffer, matches)?;
        if n == 0 {
            return Ok(0);
        }
        self.right.and_with(buffer, n)
    }

    fn score(&mut self, matches: &[u64], scores: &mut [f32]) -> Result<()> {
        self.left.score(matches, scores)?;
        self.right.score(matches, scores)
    }

    fn inspect(&self) -> QueryInspectionNode {
        QueryInspectionNode::new("BinaryMatch [And]")
            .with_count(self.count(), self.confidence())
            .with_child(self.left.inspect())
            .with_child(self.right.inspect())
    }
}

/// Ids of one side of a union that were pulled but not merged yet.
struct PendingIds {
    buffer: BufferPoolRef<'static, u64>,
    position: usize,
    len: usize,
    exhausted: bool,
}

impl PendingIds {
    fn new() -> PendingIds {
        PendingIds {
            buffer: ID_POOL.get_buffer(UNION_BATCH),
            position: 0,
            len: 0,
            exhausted: false,
        }
    }

    fn peek(&mut self, source: &mut impl QueryMatch) -> Result<Option<u64>> {
        if self.position == self.len && !self.exhausted {
            self.len = source.fill(&mut self.buffer)?;
            self.position = 0;
            self.exhausted = self.len == 0;
        }
        Ok((self.position < self.len).then(|| self.buffer[self.position]))
    }

    fn advance(&mut self) {
        self.position += 1;
    }
}

/// Entries produced by either side, merged lazily batch by batch.
pub struct OrMatch<L, R> {
    left: L,
    right: R,
    left_pending: PendingIds,
    right_pending: PendingIds,
}

impl<L: QueryMatch, R: QueryMatch> OrMatch<L, R> {
    pub fn new(left: L, right: R) -> OrMatch<L, R> {
        OrMatch {
            left,
            right,
            left_pending: PendingIds::new(),
            right_pending: PendingIds::new(),
        }
    }
}

impl<L: QueryMatch, R: QueryMatch> QueryMatch for OrMatch<L, R> {
    /// Upper bound: both sides added up.
    fn count(&self) -> u64 {
        self.left.count().saturating_add(self.right.count())
    }

    fn confidence(&self) -> Confidence {
        self.left
            .confidence()
            .min(self.right.confidence())
            .min(Confidence::Normal)
    }

    fn fill(&mut self, matches: &mut [u64]) -> Result<usize> {
        let mut n = 0;
        while n < matches.len() {
            let left = self.left_pending.peek(&mut self.left)?;
            let right = self.right_pending.peek(&mut self.right)?;
            let id = match (left, right) {
                (None, None) => break,
                (Some(l), None) => {
                    self.left_pending.advance();
                    l
                }
                (None, Some(r)) => {
                    self.right_pending.advance();
                    r
                }
                (Some(l), Some(r)) => {
                    if l <= r {
                        self.left_pending.advance();
                    }
                    if r <= l {
                        self.right_pending.advance();
                    }
                    l.min(r)
                }
            };
            matches[n] = id;
            n += 1;
        }
        Ok(n)
    }

    fn and_with(&mut self, buffer: &mut [u64], matches: usize) -> Result<usize> {
        if matches == 0 {
            return Ok(0);
        }
        let mut right_buffer = ID_POOL.get_buffer(matches);
        right_buffer[..matches].copy_from_slice(&buffer[..matches]);
        let left = self.left.and_with(buffer, matches)?;
        let right = self.right.and_with(&mut right_buffer, matches)?;

        let mut union = Vec::with_capacity(left + right);
        merge::or_into(&mut union, &buffer[..left], &right_buffer[..right]);
        buffer[..union.len()].copy_from_slice(&union);
        Ok(union.len())
    }

    fn score(&mut self, matches: &[u64], scores: &mut [f32]) -> Result<()> {
        self.left.score(matches, scores)?;
        self.right.score(matches, scores)
    }

    fn inspect(&self) -> QueryInspectionNode {
        QueryInspectionNode::new("BinaryMatch [Or]")
            .with_count(self.count(), self.confidence())
            .with_child(self.left.inspect())
            .with_child(self.right.inspect())
    }
}

//! Orders the ids of a match by the term each entry holds for a field.

pub mod alphanumeric;
pub mod comparers;
pub mod spatial;

use std::cmp::Ordering;

use corax_common::Result;

use crate::{
    buffers_pool::ID_POOL,
    config::QueryConfig,
    growable_buffer::GrowableBuffer,
    match_protocol::{Confidence, QueryInspectionNode, QueryMatch},
    merge,
    terms_reader::TermsReader,
};

use comparers::MatchComparer;

/// Produces the ids of the inner match in comparer order, at most `take` of them.
///
/// The inner match is drained and sorted on the first `fill` or `and_with`.
/// `fill` output is in comparer order, not ascending by id, so a sorting match
/// cannot drive an intersection; `and_with` keeps the candidates that made the
/// sorted output and returns them ascending.
pub struct SortingMatch<'a, M, C> {
    inner: M,
    reader: TermsReader<'a>,
    comparer: C,
    take: Option<usize>,
    config: QueryConfig,
    sorted: Option<Vec<u64>>,
    /// The sorted output in id order.
    by_id: Vec<u64>,
    position: usize,
}

impl<'a, M: QueryMatch, C: MatchComparer> SortingMatch<'a, M, C> {
    pub fn new(
        inner: M,
        reader: TermsReader<'a>,
        comparer: C,
        take: Option<usize>,
        config: &QueryConfig,
    ) -> Self {
        SortingMatch {
            inner,
            reader,
            comparer,
            take,
            config: config.clone(),
            sorted: None,
            by_id: Vec::new(),
            position: 0,
        }
    }

    fn sort(&mut self) -> Result<()> {
        let mut buffer = GrowableBuffer::new(self.config.memoization_size_hint);
        loop {
            let read = self.inner.fill(buffer.space())?;
            if read == 0 {
                break;
            }
            buffer.add_usage(read);
        }
        let mut ids = buffer.results().to_vec();

        // Surface unreadable values before sorting; the comparison below must
        // stay a total order.
        for &id in &ids {
            self.reader.compare_with(id, id, &self.comparer)?;
        }

        let mut failure = None;
        let reader = &mut self.reader;
        let comparer = &self.comparer;
        // Ties keep id order.
        ids.sort_by(|&x, &y| {
            if failure.is_some() {
                return Ordering::Equal;
            }
            match reader.compare_with(x, y, comparer) {
                Ok(ordering) => ordering,
                Err(err) => {
                    failure = Some(err);
                    Ordering::Equal
                }
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }

        if let Some(take) = self.take {
            ids.truncate(take);
        }
        log::trace!("sorted {} ids with {}", ids.len(), self.comparer.name());
        self.by_id = ids.clone();
        self.by_id.sort_unstable();
        self.sorted = Some(ids);
        Ok(())
    }
}

impl<M: QueryMatch, C: MatchComparer> QueryMatch for SortingMatch<'_, M, C> {
    fn count(&self) -> u64 {
        match self.take {
            Some(take) => self.inner.count().min(take as u64),
            None => self.inner.count(),
        }
    }

    fn confidence(&self) -> Confidence {
        self.inner.confidence()
    }

    fn fill(&mut self, matches: &mut [u64]) -> Result<usize> {
        if self.sorted.is_none() {
            self.sort()?;
        }
        let sorted = self.sorted.as_deref().unwrap_or_default();
        let remaining = &sorted[self.position.min(sorted.len())..];
        let n = matches.len().min(remaining.len());
        matches[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }

    fn and_with(&mut self, buffer: &mut [u64], matches: usize) -> Result<usize> {
        if self.sorted.is_none() {
            self.sort()?;
        }
        let mut scratch = ID_POOL.get_buffer(matches);
        let n = merge::and(&mut scratch, &buffer[..matches], &self.by_id);
        buffer[..n].copy_from_slice(&scratch[..n]);
        Ok(n)
    }

    fn score(&mut self, matches: &[u64], scores: &mut [f32]) -> Result<()> {
        self.inner.score(matches, scores)
    }

    fn inspect(&self) -> QueryInspectionNode {
        let mut node = QueryInspectionNode::new(format!("SortingMatch [{}]", self.comparer.name()))
            .with_parameter("FieldType", format!("{:?}", self.comparer.field_type()));
        if let Some(take) = self.take {
            node = node.with_parameter("Take", take);
        }
        node.with_count(self.count(), self.confidence())
            .with_child(self.inner.inspect())
    }
}

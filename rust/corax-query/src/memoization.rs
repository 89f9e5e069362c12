//! Replays one inner match through any number of independent cursors.

use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use corax_common::Result;

use crate::{
    buffers_pool::ID_POOL,
    config::QueryConfig,
    growable_buffer::GrowableBuffer,
    match_protocol::{Confidence, QueryInspectionNode, QueryMatch},
    merge,
};

struct MemoizedState<M> {
    inner: M,
    results: Option<GrowableBuffer>,
}

/// Owns the inner match and the ids it produced. The inner match is drained on
/// the first request from any cursor and never invoked for ids again.
pub struct MemoizationMatchProvider<M> {
    state: RefCell<MemoizedState<M>>,
    size_hint: usize,
}

impl<M: QueryMatch> MemoizationMatchProvider<M> {
    pub fn new(inner: M, config: &QueryConfig) -> Rc<MemoizationMatchProvider<M>> {
        Rc::new(MemoizationMatchProvider {
            state: RefCell::new(MemoizedState {
                inner,
                results: None,
            }),
            size_hint: config.memoization_size_hint,
        })
    }

    /// A new cursor positioned at the first id.
    pub fn replay(self: &Rc<Self>) -> MemoizationMatch<M> {
        MemoizationMatch {
            provider: Rc::clone(self),
            position: 0,
        }
    }

    /// Whether the inner match was drained already.
    pub fn is_materialized(&self) -> bool {
        self.state.borrow().results.is_some()
    }

    fn fill_and_retrieve(&self) -> Result<Ref<'_, [u64]>> {
        if !self.is_materialized() {
            let mut state = self.state.borrow_mut();
            let mut results = GrowableBuffer::new(self.size_hint);
            loop {
                let read = state.inner.fill(results.space())?;
                if read == 0 {
                    break;
                }
                results.add_usage(read);
            }
            log::trace!("memoized {} ids", results.len());
            state.results = Some(results);
        }
        Ok(Ref::map(self.state.borrow(), |s| {
            s.results.as_ref().map(|r| r.results()).unwrap_or_default()
        }))
    }

    fn buffer_size(&self) -> usize {
        self.state
            .borrow()
            .results
            .as_ref()
            .map_or(0, |r| r.size_in_bytes())
    }
}

/// A cursor over a [`MemoizationMatchProvider`].
pub struct MemoizationMatch<M> {
    provider: Rc<MemoizationMatchProvider<M>>,
    position: usize,
}

impl<M: QueryMatch> QueryMatch for MemoizationMatch<M> {
    fn count(&self) -> u64 {
        self.provider.state.borrow().inner.count()
    }

    fn confidence(&self) -> Confidence {
        self.provider.state.borrow().inner.confidence()
    }

    fn fill(&mut self, matches: &mut [u64]) -> Result<usize> {
        let memoized = self.provider.fill_and_retrieve()?;
        let remaining = &memoized[self.position.min(memoized.len())..];
        let n = matches.len().min(remaining.len());
        matches[..n].copy_from_slice(&remaining[..n]);
        drop(memoized);
        self.position += n;
        Ok(n)
    }

    fn and_with(&mut self, buffer: &mut [u64], matches: usize) -> Result<usize> {
        let memoized = self.provider.fill_and_retrieve()?;
        if memoized.is_empty() {
            return Ok(0);
        }
        let mut scratch = ID_POOL.get_buffer(matches);
        let n = merge::and(&mut scratch, &buffer[..matches], &memoized);
        buffer[..n].copy_from_slice(&scratch[..n]);
        Ok(n)
    }

    fn score(&mut self, matches: &[u64], scores: &mut [f32]) -> Result<()> {
        self.provider
            .state
            .borrow_mut()
            .inner
            .score(matches, scores)
    }

    fn inspect(&self) -> QueryInspectionNode {
        let state = self.provider.state.borrow();
        QueryInspectionNode::new("MemoizationMatch [Memoization]")
            .with_parameter("BufferSize", self.provider.buffer_size())
            .with_count(state.inner.count(), state.inner.confidence())
            .with_child(state.inner.inspect())
    }
}

use corax_common::Result;

use crate::{
    buffers_pool::ID_POOL,
    config::QueryConfig,
    growable_buffer::GrowableBuffer,
    match_protocol::{Confidence, QueryInspectionNode, QueryMatch},
    merge,
    term_match::TermMatch,
    term_provider::TermProvider,
};

/// Union of the term matches of a [`TermProvider`].
///
/// Terms overlap and are not ordered against each other, so the first `fill`
/// drains every term into one buffer and sorts it if more than one term
/// contributed. Later calls are served from that buffer.
///
/// An `and_with` that walks every term without materializing sets `count` to
/// the sum of the term counts with [`Confidence::High`]. Overlapping terms are
/// counted once per term, so that count bounds the union size from above; only
/// a materialized union reports its exact size.
pub struct MultiTermMatch<'a, P> {
    provider: P,
    count: u64,
    confidence: Confidence,
    materialized: Option<GrowableBuffer>,
    position: usize,
    config: QueryConfig,
    _terms: std::marker::PhantomData<TermMatch<'a>>,
}

impl<'a, P: TermProvider<'a>> MultiTermMatch<'a, P> {
    pub fn new(provider: P, config: &QueryConfig) -> MultiTermMatch<'a, P> {
        MultiTermMatch {
            provider,
            count: 0,
            confidence: Confidence::Low,
            materialized: None,
            position: 0,
            config: config.clone(),
            _terms: std::marker::PhantomData,
        }
    }

    /// Sets the estimate reported until the terms were exhausted.
    pub fn with_estimate(mut self, count: u64, confidence: Confidence) -> Self {
        self.count = count;
        self.confidence = confidence;
        self
    }

    fn materialize(&mut self) -> Result<&[u64]> {
        if self.materialized.is_none() {
            let mut buffer = GrowableBuffer::new(self.config.memoization_size_hint);
            self.provider.reset()?;
            let mut contributing = 0;
            while let Some(mut term) = self.provider.next()? {
                let before = buffer.len();
                loop {
                    let read = term.fill(buffer.space())?;
                    if read == 0 {
                        break;
                    }
                    buffer.add_usage(read);
                }
                if buffer.len() > before {
                    contributing += 1;
                }
            }
            if contributing > 1 {
                let unique = merge::sort_dedup(buffer.results_mut());
                buffer.truncate(unique);
            }
            log::trace!(
                "multi-term union of {contributing} terms materialized {} ids",
                buffer.len()
            );
            self.count = buffer.len() as u64;
            self.confidence = Confidence::High;
            self.materialized = Some(buffer);
        }
        Ok(self.materialized.as_ref().map(|b| b.results()).unwrap_or_default())
    }
}

impl<'a, P: TermProvider<'a>> QueryMatch for MultiTermMatch<'a, P> {
    fn count(&self) -> u64 {
        self.count
    }

    fn confidence(&self) -> Confidence {
        self.confidence
    }

    fn fill(&mut self, matches: &mut [u64]) -> Result<usize> {
        let position = self.position;
        let results = self.materialize()?;
        let n = matches.len().min(results.len() - position);
        matches[..n].copy_from_slice(&results[position..position + n]);
        self.position += n;
        Ok(n)
    }

    fn and_with(&mut self, buffer: &mut [u64], matches: usize) -> Result<usize> {
        if matches == 0 {
            return Ok(0);
        }
        if let Some(materialized) = &self.materialized {
            let mut scratch = ID_POOL.get_buffer(matches);
            let n = merge::and(&mut scratch, &buffer[..matches], materialized.results());
            buffer[..n].copy_from_slice(&scratch[..n]);
            return Ok(n);
        }

        let mut candidates = ID_POOL.get_buffer(buffer.len());
        let mut results = ID_POOL.get_buffer(matches);
        let mut merged = ID_POOL.get_buffer(matches);
        results.clear();

        self.provider.reset()?;
        let mut total = 0u64;
        let exhausted = loop {
            if results.len() >= matches {
                // Every candidate matched; only a further term tells if any remain.
                break self.provider.next()?.is_none();
            }
            let Some(mut term) = self.provider.next()? else {
                break true;
            };
            total += term.count();
            candidates[..matches].copy_from_slice(&buffer[..matches]);
            let read = term.and_with(&mut candidates, matches)?;
            if read > 0 {
                merged.clear();
                merge::or_into(&mut merged, &results, &candidates[..read]);
                std::mem::swap(&mut *results, &mut *merged);
            }
        };
        if exhausted {
            // Sum of term counts, not the deduplicated union size.
            self.count = total;
            self.confidence = Confidence::High;
        }

        buffer[..results.len()].copy_from_slice(&results);
        Ok(results.len())
    }

    fn inspect(&self) -> QueryInspectionNode {
        QueryInspectionNode::new("MultiTermMatch")
            .with_parameter("IsBoosting", false)
            .with_count(self.count, self.confidence)
            .with_child(self.provider.inspect())
    }
}

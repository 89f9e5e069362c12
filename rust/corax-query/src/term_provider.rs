//! Sources of term matches for [`crate::multi_term::MultiTermMatch`].

use std::ops::Bound;

use corax_common::Result;
use corax_storage::{
    lookup::{LookupIterator, LookupKey},
    postings::PostingStore,
};

use crate::{config::QueryConfig, match_protocol::QueryInspectionNode, term_match::TermMatch};

/// Produces the term matches of a multi-term query one at a time.
pub trait TermProvider<'a> {
    /// Restarts from the first term.
    fn reset(&mut self) -> Result<()>;

    /// The next term, or `None` once every term was produced.
    fn next(&mut self) -> Result<Option<TermMatch<'a>>>;

    fn inspect(&self) -> QueryInspectionNode;
}

/// The terms of an `IN (...)` list. Terms absent from the field are skipped.
pub struct InTermProvider<'a, S> {
    store: &'a S,
    field: String,
    terms: Vec<Vec<u8>>,
    position: usize,
    total_entries: u64,
    config: QueryConfig,
}

impl<'a, S: PostingStore> InTermProvider<'a, S> {
    pub fn new(
        store: &'a S,
        field: impl Into<String>,
        terms: Vec<Vec<u8>>,
        total_entries: u64,
        config: &QueryConfig,
    ) -> Self {
        InTermProvider {
            store,
            field: field.into(),
            terms,
            position: 0,
            total_entries,
            config: config.clone(),
        }
    }
}

impl<'a, S: PostingStore> TermProvider<'a> for InTermProvider<'a, S> {
    fn reset(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<TermMatch<'a>>> {
        while let Some(term) = self.terms.get(self.position) {
            self.position += 1;
            if let Some(term_id) = self.store.term_id(&self.field, term) {
                let postings = self.store.postings(term_id)?;
                return TermMatch::from_postings(postings, self.total_entries, &self.config).map(Some);
            }
        }
        Ok(None)
    }

    fn inspect(&self) -> QueryInspectionNode {
        let terms: Vec<String> = self
            .terms
            .iter()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .collect();
        QueryInspectionNode::new("InTermProvider")
            .with_parameter("Field", &self.field)
            .with_parameter("Terms", terms.join(", "))
    }
}

/// The terms of a numeric lookup whose keys fall between `low` and `high`.
///
/// Iterates forward from `low` or backward from `high` depending on the lookup
/// iterator. When the far end is unbounded the keys are not checked against it.
pub struct TermNumericRangeProvider<'a, S, K, I> {
    store: &'a S,
    field: String,
    iterator: I,
    low: Bound<K>,
    high: Bound<K>,
    skip_range_check: bool,
    done: bool,
    total_entries: u64,
    config: QueryConfig,
}

impl<'a, S, K, I> TermNumericRangeProvider<'a, S, K, I>
where
    S: PostingStore,
    K: LookupKey,
    I: LookupIterator<K>,
{
    pub fn new(
        store: &'a S,
        field: impl Into<String>,
        iterator: I,
        low: Bound<K>,
        high: Bound<K>,
        total_entries: u64,
        config: &QueryConfig,
    ) -> Self {
        let far_end = if iterator.is_forward() { &high } else { &low };
        let skip_range_check = match far_end {
            Bound::Unbounded => true,
            Bound::Included(key) if iterator.is_forward() => key.is_equal(&K::MAX),
            Bound::Included(key) => key.is_equal(&K::MIN),
            Bound::Excluded(_) => false,
        };
        let mut provider = TermNumericRangeProvider {
            store,
            field: field.into(),
            iterator,
            low,
            high,
            skip_range_check,
            done: false,
            total_entries,
            config: config.clone(),
        };
        provider.position_at_start();
        provider
    }

    fn position_at_start(&mut self) {
        self.iterator.reset();
        self.done = false;
        let start = if self.iterator.is_forward() {
            &self.low
        } else {
            &self.high
        };
        if let Bound::Included(key) | Bound::Excluded(key) = start {
            self.iterator.seek(*key);
        }
    }

    /// `true` if `key` lies before the start bound in iteration order.
    fn before_start(&self, key: &K) -> bool {
        use std::cmp::Ordering::*;
        let (bound, before) = if self.iterator.is_forward() {
            (&self.low, Less)
        } else {
            (&self.high, Greater)
        };
        match bound {
            Bound::Unbounded => false,
            Bound::Included(b) => key.compare(b) == before,
            Bound::Excluded(b) => key.compare(b) == before || key.is_equal(b),
        }
    }

    /// `true` if `key` lies past the far bound in iteration order.
    fn past_end(&self, key: &K) -> bool {
        use std::cmp::Ordering::*;
        if self.skip_range_check {
            return false;
        }
        let (bound, after) = if self.iterator.is_forward() {
            (&self.high, Greater)
        } else {
            (&self.low, Less)
        };
        match bound {
            Bound::Unbounded => false,
            Bound::Included(b) => key.compare(b) == after,
            Bound::Excluded(b) => key.compare(b) == after || key.is_equal(b),
        }
    }
}

impl<'a, S, K, I> TermProvider<'a> for TermNumericRangeProvider<'a, S, K, I>
where
    S: PostingStore,
    K: LookupKey,
    I: LookupIterator<K>,
{
    fn reset(&mut self) -> Result<()> {
        self.position_at_start();
        Ok(())
    }

    fn next(&mut self) -> Result<Option<TermMatch<'a>>> {
        while !self.done {
            let Some((key, term_id)) = self.iterator.move_next() else {
                self.done = true;
                break;
            };
            if self.past_end(&key) {
                self.done = true;
                break;
            }
            if self.before_start(&key) {
                continue;
            }
            let postings = self.store.postings(term_id)?;
            return TermMatch::from_postings(postings, self.total_entries, &self.config).map(Some);
        }
        Ok(None)
    }

    fn inspect(&self) -> QueryInspectionNode {
        let bound = |b: &Bound<K>| match b {
            Bound::Included(k) => format!("[{k}]"),
            Bound::Excluded(k) => format!("({k})"),
            Bound::Unbounded => "*".to_string(),
        };
        QueryInspectionNode::new("TermNumericRangeProvider")
            .with_parameter("Field", &self.field)
            .with_parameter("Low", bound(&self.low))
            .with_parameter("High", bound(&self.high))
            .with_parameter("Forward", self.iterator.is_forward())
    }
}

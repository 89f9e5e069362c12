//! Entry point for building match trees over one index.

use std::{ops::Bound, rc::Rc};

use corax_common::Result;
use corax_storage::{
    container::ContainerStore,
    lookup::{LookupIterator, LookupKey},
    postings::PostingStore,
};

use crate::{
    binary::{AndMatch, OrMatch},
    config::QueryConfig,
    match_protocol::QueryMatch,
    memoization::MemoizationMatchProvider,
    multi_term::MultiTermMatch,
    sorting::{SortingMatch, comparers::MatchComparer},
    term_match::TermMatch,
    term_provider::{InTermProvider, TermNumericRangeProvider},
    terms_reader::TermsReader,
    unary::{UnaryMatch, UnaryOperation, UnaryValue},
};

/// Builds matches over the postings and stored entries of one index.
///
/// `postings` resolves (field, term) pairs; `entries` holds the serialized
/// index entries addressed by entry id.
pub struct IndexSearcher<'a, S, C> {
    postings: &'a S,
    entries: &'a C,
    total_entries: u64,
    config: QueryConfig,
}

impl<'a, S: PostingStore, C: ContainerStore> IndexSearcher<'a, S, C> {
    pub fn new(
        postings: &'a S,
        entries: &'a C,
        total_entries: u64,
        config: QueryConfig,
    ) -> Result<IndexSearcher<'a, S, C>> {
        config.validate()?;
        Ok(IndexSearcher {
            postings,
            entries,
            total_entries,
            config,
        })
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Number of entries in the index.
    pub fn total_entries(&self) -> u64 {
        self.total_entries
    }

    /// The entries holding `term` in `field`; empty if the term is unknown.
    pub fn term_query(&self, field: &str, term: &[u8]) -> Result<TermMatch<'a>> {
        let Some(term_id) = self.postings.term_id(field, term) else {
            return Ok(TermMatch::empty());
        };
        let postings = self.postings.postings(term_id)?;
        TermMatch::from_postings(postings, self.total_entries, &self.config)
    }

    /// The entries holding any of `terms` in `field`.
    pub fn in_query(
        &self,
        field: &str,
        terms: Vec<Vec<u8>>,
    ) -> MultiTermMatch<'a, InTermProvider<'a, S>> {
        let provider = InTermProvider::new(
            self.postings,
            field,
            terms,
            self.total_entries,
            &self.config,
        );
        MultiTermMatch::new(provider, &self.config)
    }

    /// The entries whose numeric term in `field` lies between `low` and
    /// `high`. The direction of `iterator` decides which end is walked first.
    pub fn between_query<K, I>(
        &self,
        field: &str,
        iterator: I,
        low: Bound<K>,
        high: Bound<K>,
    ) -> MultiTermMatch<'a, TermNumericRangeProvider<'a, S, K, I>>
    where
        K: LookupKey,
        I: LookupIterator<K>,
    {
        let provider = TermNumericRangeProvider::new(
            self.postings,
            field,
            iterator,
            low,
            high,
            self.total_entries,
            &self.config,
        );
        MultiTermMatch::new(provider, &self.config)
    }

    /// Keeps the ids of `inner` whose stored `field` satisfies `field <op> value`.
    pub fn unary_query<M, V>(
        &self,
        inner: M,
        field: usize,
        operation: UnaryOperation,
        value: V,
    ) -> UnaryMatch<'a, M, C, V>
    where
        M: QueryMatch,
        V: UnaryValue,
    {
        UnaryMatch::new(inner, self.entries, field, operation, value, &self.config)
    }

    pub fn greater_than<M: QueryMatch, V: UnaryValue>(
        &self,
        inner: M,
        field: usize,
        value: V,
    ) -> UnaryMatch<'a, M, C, V> {
        self.unary_query(inner, field, UnaryOperation::GreaterThan, value)
    }

    pub fn greater_than_or_equal<M: QueryMatch, V: UnaryValue>(
        &self,
        inner: M,
        field: usize,
        value: V,
    ) -> UnaryMatch<'a, M, C, V> {
        self.unary_query(inner, field, UnaryOperation::GreaterThanOrEqual, value)
    }

    pub fn less_than<M: QueryMatch, V: UnaryValue>(
        &self,
        inner: M,
        field: usize,
        value: V,
    ) -> UnaryMatch<'a, M, C, V> {
        self.unary_query(inner, field, UnaryOperation::LessThan, value)
    }

    pub fn less_than_or_equal<M: QueryMatch, V: UnaryValue>(
        &self,
        inner: M,
        field: usize,
        value: V,
    ) -> UnaryMatch<'a, M, C, V> {
        self.unary_query(inner, field, UnaryOperation::LessThanOrEqual, value)
    }

    pub fn equals<M: QueryMatch, V: UnaryValue>(
        &self,
        inner: M,
        field: usize,
        value: V,
    ) -> UnaryMatch<'a, M, C, V> {
        self.unary_query(inner, field, UnaryOperation::Equals, value)
    }

    pub fn not_equals<M: QueryMatch, V: UnaryValue>(
        &self,
        inner: M,
        field: usize,
        value: V,
    ) -> UnaryMatch<'a, M, C, V> {
        self.unary_query(inner, field, UnaryOperation::NotEquals, value)
    }

    /// Entries produced by both `left` and `right`.
    pub fn and_query<L: QueryMatch, R: QueryMatch>(&self, left: L, right: R) -> AndMatch<L, R> {
        AndMatch::new(left, right)
    }

    /// Entries produced by `left` or `right`.
    pub fn or_query<L: QueryMatch, R: QueryMatch>(&self, left: L, right: R) -> OrMatch<L, R> {
        OrMatch::new(left, right)
    }

    /// Orders the ids of `inner` by the terms `reader` resolves, keeping the
    /// first `take`.
    pub fn order_by<M, Cmp>(
        &self,
        inner: M,
        reader: TermsReader<'a>,
        comparer: Cmp,
        take: Option<usize>,
    ) -> SortingMatch<'a, M, Cmp>
    where
        M: QueryMatch,
        Cmp: MatchComparer,
    {
        SortingMatch::new(inner, reader, comparer, take, &self.config)
    }

    /// Shares the ids of `inner` between several consumers.
    pub fn memoize<M: QueryMatch>(&self, inner: M) -> Rc<MemoizationMatchProvider<M>> {
        MemoizationMatchProvider::new(inner, &self.config)
    }
}

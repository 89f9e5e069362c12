//! Filters a match by comparing a stored field of each entry against a value.

use std::cmp::Ordering;

use corax_common::Result;
use corax_index_entry::{FieldIterator, IndexEntryReader};
use corax_storage::container::ContainerStore;

use crate::{
    buffers_pool::ID_POOL,
    config::QueryConfig,
    growable_buffer::GrowableBuffer,
    match_protocol::{Confidence, QueryInspectionNode, QueryMatch},
    merge,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperation {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Equals,
    NotEquals,
}

impl UnaryOperation {
    /// Whether a stored value ordered `ordering` against the query value passes.
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            UnaryOperation::GreaterThan => ordering == Ordering::Greater,
            UnaryOperation::GreaterThanOrEqual => ordering != Ordering::Less,
            UnaryOperation::LessThan => ordering == Ordering::Less,
            UnaryOperation::LessThanOrEqual => ordering != Ordering::Greater,
            UnaryOperation::Equals => ordering == Ordering::Equal,
            UnaryOperation::NotEquals => ordering != Ordering::Equal,
        }
    }
}

/// A value a stored field can be compared with.
///
/// Comparisons yield `None` when the stored value has no counterpart of this
/// kind (no numeric part, NaN), which rejects the entry.
pub trait UnaryValue: std::fmt::Debug {
    fn compare_scalar(&self, reader: &IndexEntryReader<'_>, field: usize) -> Result<Option<Ordering>>;

    fn compare_element(&self, element: &FieldIterator<'_>) -> Result<Option<Ordering>>;
}

impl UnaryValue for Vec<u8> {
    fn compare_scalar(&self, reader: &IndexEntryReader<'_>, field: usize) -> Result<Option<Ordering>> {
        Ok(reader.read(field)?.map(|stored| stored.cmp(self.as_slice())))
    }

    fn compare_element(&self, element: &FieldIterator<'_>) -> Result<Option<Ordering>> {
        Ok(Some(element.sequence()?.cmp(self.as_slice())))
    }
}

impl UnaryValue for i64 {
    fn compare_scalar(&self, reader: &IndexEntryReader<'_>, field: usize) -> Result<Option<Ordering>> {
        if !reader.field_type(field)?.is_tuple() {
            return Ok(None);
        }
        Ok(reader
            .read_numeric::<i64>(field)?
            .map(|(stored, _)| stored.cmp(self)))
    }

    fn compare_element(&self, element: &FieldIterator<'_>) -> Result<Option<Ordering>> {
        if !element.is_tuple() {
            return Ok(None);
        }
        Ok(Some(element.long()?.cmp(self)))
    }
}

impl UnaryValue for f64 {
    fn compare_scalar(&self, reader: &IndexEntryReader<'_>, field: usize) -> Result<Option<Ordering>> {
        if !reader.field_type(field)?.is_tuple() {
            return Ok(None);
        }
        Ok(reader
            .read_numeric::<f64>(field)?
            .and_then(|(stored, _)| stored.partial_cmp(self)))
    }

    fn compare_element(&self, element: &FieldIterator<'_>) -> Result<Option<Ordering>> {
        if !element.is_tuple() {
            return Ok(None);
        }
        Ok(element.double()?.partial_cmp(self))
    }
}

/// Keeps the ids of an inner match whose entry satisfies `field <op> value`.
///
/// Entries are fetched by id from a container store. For list fields every
/// element must satisfy the comparison; absent fields never do.
pub struct UnaryMatch<'a, M, C, V> {
    inner: M,
    entries: &'a C,
    field: usize,
    operation: UnaryOperation,
    value: V,
    config: QueryConfig,
    /// Every accepted id, collected by the first `and_with`.
    accepted: Option<GrowableBuffer>,
}

impl<'a, M, C, V> UnaryMatch<'a, M, C, V>
where
    M: QueryMatch,
    C: ContainerStore,
    V: UnaryValue,
{
    pub fn new(
        inner: M,
        entries: &'a C,
        field: usize,
        operation: UnaryOperation,
        value: V,
        config: &QueryConfig,
    ) -> Self {
        UnaryMatch {
            inner,
            entries,
            field,
            operation,
            value,
            config: config.clone(),
            accepted: None,
        }
    }

    fn accepts(&self, id: u64) -> Result<bool> {
        let item = self.entries.get(id)?;
        let reader = IndexEntryReader::new(item.data)?;
        let field_type = reader.field_type(self.field)?;
        if field_type.is_absent() {
            return Ok(false);
        }
        if !field_type.is_list() {
            let ordering = self.value.compare_scalar(&reader, self.field)?;
            return Ok(ordering.is_some_and(|o| self.operation.accepts(o)));
        }

        let mut elements = reader.read_many(self.field)?;
        while elements.read_next()? {
            let ordering = self.value.compare_element(&elements)?;
            if !ordering.is_some_and(|o| self.operation.accepts(o)) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Pulls from the inner match until enough of `matches` holds accepted ids
    /// or the inner match is exhausted.
    fn fill_filtered(&mut self, matches: &mut [u64]) -> Result<usize> {
        let max_unused = self.config.unused_slots.max_unused(matches.len());
        let mut stored = 0;
        while stored < matches.len() {
            let read = self.inner.fill(&mut matches[stored..])?;
            if read == 0 {
                break;
            }
            let mut kept = stored;
            for i in stored..stored + read {
                let id = matches[i];
                if self.accepts(id)? {
                    matches[kept] = id;
                    kept += 1;
                }
            }
            stored = kept;
            if stored > 0 && matches.len() - stored <= max_unused {
                break;
            }
        }
        Ok(stored)
    }
}

impl<M, C, V> QueryMatch for UnaryMatch<'_, M, C, V>
where
    M: QueryMatch,
    C: ContainerStore,
    V: UnaryValue,
{
    fn count(&self) -> u64 {
        self.inner.count()
    }

    fn confidence(&self) -> Confidence {
        self.inner.confidence().min(Confidence::Normal)
    }

    fn fill(&mut self, matches: &mut [u64]) -> Result<usize> {
        self.fill_filtered(matches)
    }

    fn and_with(&mut self, buffer: &mut [u64], matches: usize) -> Result<usize> {
        if self.accepted.is_none() {
            let mut accepted = GrowableBuffer::new(self.config.memoization_size_hint);
            loop {
                let read = self.fill_filtered(accepted.space())?;
                if read == 0 {
                    break;
                }
                accepted.add_usage(read);
            }
            self.accepted = Some(accepted);
        }
        let Some(accepted) = &self.accepted else {
            return Ok(0);
        };
        let mut scratch = ID_POOL.get_buffer(matches);
        let n = merge::and(&mut scratch, &buffer[..matches], accepted.results());
        buffer[..n].copy_from_slice(&scratch[..n]);
        Ok(n)
    }

    fn score(&mut self, matches: &[u64], scores: &mut [f32]) -> Result<()> {
        self.inner.score(matches, scores)
    }

    fn inspect(&self) -> QueryInspectionNode {
        QueryInspectionNode::new(format!("UnaryMatch [{:?}]", self.operation))
            .with_parameter("Field", self.field)
            .with_parameter("Value", format!("{:?}", self.value))
            .with_count(self.count(), self.confidence())
            .with_child(self.inner.inspect())
    }
}

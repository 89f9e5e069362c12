use ahash::AHashMap;
use corax_common::{Result, error::Error, verify_arg};
use corax_encodings::{frequency, varint};

use crate::posting_list::PostingList;

/// Terms with at most this many postings are stored inline as a small set.
pub const SMALL_SET_LIMIT: usize = 64;

/// Where the postings of one term live.
#[derive(Debug, Clone, Copy)]
pub enum Postings<'a> {
    /// Exactly one posting.
    Single(u64),
    /// Inline small set blob, see [`encode_small_set`].
    Small(&'a [u8]),
    List(&'a PostingList),
}

#[derive(Debug, Clone, Copy)]
pub struct TermPostings<'a> {
    pub postings: Postings<'a>,
    /// Number of postings.
    pub count: u64,
    /// Stored values carry a folded term frequency in their low bits.
    pub frequencies: bool,
}

/// Resolves terms and retrieves their postings.
pub trait PostingStore {
    fn term_id(&self, field: &str, term: &[u8]) -> Option<u64>;

    /// Fetches the postings of a term id obtained from this store or from a
    /// lookup. An unknown id is corruption.
    fn postings(&self, term_id: u64) -> Result<TermPostings<'_>>;
}

/// Encodes an inline small set: a zig-zag varint count followed by zig-zag varint
/// deltas between consecutive values (the first relative to zero).
pub fn encode_small_set(values: &[u64]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(values.len() * 2 + 1);
    varint::push(&mut blob, values.len() as i64);
    let mut prev = 0i64;
    for &value in values {
        varint::push(&mut blob, (value as i64).wrapping_sub(prev));
        prev = value as i64;
    }
    blob
}

#[derive(Debug)]
enum StoredPostings {
    Single(u64),
    Small(Box<[u8]>),
    List(PostingList),
}

#[derive(Debug)]
struct StoredTerm {
    postings: StoredPostings,
    count: u64,
    frequencies: bool,
}

#[derive(Debug, Default)]
pub struct MemoryPostingStore {
    terms: AHashMap<String, AHashMap<Vec<u8>, u64>>,
    postings: AHashMap<u64, StoredTerm>,
    next_term_id: u64,
}

impl MemoryPostingStore {
    pub fn new() -> MemoryPostingStore {
        MemoryPostingStore::default()
    }

    /// Registers `term` of `field` with the given strictly ascending entry ids.
    pub fn add_term(&mut self, field: &str, term: &[u8], ids: &[u64]) -> Result<u64> {
        let term_id = self.add_postings(ids)?;
        self.register(field, term, term_id);
        Ok(term_id)
    }

    /// Registers a term whose postings carry term frequencies.
    pub fn add_term_with_frequencies(
        &mut self,
        field: &str,
        term: &[u8],
        entries: &[(u64, u16)],
    ) -> Result<u64> {
        verify_arg!(entries, entries.iter().all(|&(id, _)| id <= frequency::MAX_ENTRY_ID));
        let folded: Vec<u64> = entries
            .iter()
            .map(|&(id, freq)| frequency::add_frequency(id, freq))
            .collect();
        let term_id = self.store(&folded, true)?;
        self.register(field, term, term_id);
        Ok(term_id)
    }

    /// Stores anonymous postings, e.g. the target of a numeric lookup key.
    pub fn add_postings(&mut self, ids: &[u64]) -> Result<u64> {
        self.store(ids, false)
    }

    /// Stores a raw small set blob as-is. Lets callers persist blobs produced by
    /// other writers, including unordered ones.
    pub fn add_small_set_blob(&mut self, field: &str, term: &[u8], blob: &[u8], count: u64) -> u64 {
        let term_id = self.next_id();
        log::debug!("stored raw small set blob of {} bytes as term {term_id}", blob.len());
        self.postings.insert(
            term_id,
            StoredTerm {
                postings: StoredPostings::Small(blob.into()),
                count,
                frequencies: false,
            },
        );
        self.register(field, term, term_id);
        term_id
    }

    fn store(&mut self, values: &[u64], frequencies: bool) -> Result<u64> {
        verify_arg!(values, !values.is_empty() && values.windows(2).all(|w| w[0] < w[1]));
        let postings = match values.len() {
            1 => StoredPostings::Single(values[0]),
            n if n <= SMALL_SET_LIMIT => StoredPostings::Small(encode_small_set(values).into()),
            _ => StoredPostings::List(PostingList::from_sorted(values)?),
        };
        let term_id = self.next_id();
        log::trace!(
            "stored term {term_id} with {} postings (frequencies: {frequencies})",
            values.len()
        );
        self.postings.insert(
            term_id,
            StoredTerm {
                postings,
                count: values.len() as u64,
                frequencies,
            },
        );
        Ok(term_id)
    }

    fn register(&mut self, field: &str, term: &[u8], term_id: u64) {
        self.terms
            .entry(field.to_string())
            .or_default()
            .insert(term.to_vec(), term_id);
    }

    fn next_id(&mut self) -> u64 {
        self.next_term_id += 1;
        self.next_term_id
    }
}

impl PostingStore for MemoryPostingStore {
    fn term_id(&self, field: &str, term: &[u8]) -> Option<u64> {
        self.terms.get(field)?.get(term).copied()
    }

    fn postings(&self, term_id: u64) -> Result<TermPostings<'_>> {
        let stored = self.postings.get(&term_id).ok_or_else(|| {
            Error::invalid_format("postings", format!("term {term_id} does not exist"))
        })?;
        let postings = match &stored.postings {
            StoredPostings::Single(id) => Postings::Single(*id),
            StoredPostings::Small(blob) => Postings::Small(blob),
            StoredPostings::List(list) => Postings::List(list),
        };
        Ok(TermPostings {
            postings,
            count: stored.count,
            frequencies: stored.frequencies,
        })
    }
}

//! Reads the term an entry holds for a field, for sorting and projections.

use std::cmp::Ordering;

use byteorder::{ByteOrder, LittleEndian};
use corax_common::{Result, error::Error};
use corax_storage::{
    container::{ContainerItem, ContainerStore},
    fixed_size_tree::FixedSizeTree,
    key_dictionary::{DictionarySource, term_item_bit_length},
};

use crate::{
    buffers_pool::{BYTE_POOL, BufferPoolRef},
    sorting::comparers::{MatchCompareFieldType, MatchComparer},
};

const KEY_CACHE_SIZE: usize = 128;

/// A numeric term stored directly in the fixed-size tree.
pub trait NumericTerm: Copy {
    const NAME: &'static str;

    fn from_le_bytes(bytes: &[u8]) -> Self;

    fn compare(&self, other: &Self) -> Ordering;
}

impl NumericTerm for i64 {
    const NAME: &'static str = "i64";

    fn from_le_bytes(bytes: &[u8]) -> Self {
        LittleEndian::read_i64(bytes)
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl NumericTerm for f64 {
    const NAME: &'static str = "f64";

    fn from_le_bytes(bytes: &[u8]) -> Self {
        LittleEndian::read_f64(bytes)
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

/// Term values of one field.
///
/// The field's fixed-size tree maps an entry id either to the container id of
/// the entry's term or, for numeric fields, to the 8-byte value itself. Two key
/// cache slots taken from the byte pool hold decoded keys; they go back to the
/// pool when the reader is dropped.
pub struct TermsReader<'a> {
    tree: &'a dyn FixedSizeTree,
    containers: &'a dyn ContainerStore,
    dictionaries: &'a dyn DictionarySource,
    x_key: BufferPoolRef<'static, u8>,
    y_key: BufferPoolRef<'static, u8>,
}

impl<'a> TermsReader<'a> {
    pub fn new(
        tree: &'a dyn FixedSizeTree,
        containers: &'a dyn ContainerStore,
        dictionaries: &'a dyn DictionarySource,
    ) -> TermsReader<'a> {
        let mut x_key = BYTE_POOL.get_buffer(KEY_CACHE_SIZE);
        let mut y_key = BYTE_POOL.get_buffer(KEY_CACHE_SIZE);
        x_key.clear();
        y_key.clear();
        TermsReader {
            tree,
            containers,
            dictionaries,
            x_key,
            y_key,
        }
    }

    /// Container id of the term of `id`, or `None` if the entry has no term.
    fn term_container(&self, id: u64) -> Result<Option<u64>> {
        let Some(value) = self.tree.read(id) else {
            return Ok(None);
        };
        if value.len() != 8 {
            return Err(Error::invalid_format(
                "term pointer",
                format!("entry {id} points with {} bytes", value.len()),
            ));
        }
        Ok(Some(LittleEndian::read_u64(value)))
    }

    /// Copies the decoded term of `id` into `buffer` and returns its length.
    /// Fails with a capacity error when `buffer` cannot hold it.
    pub fn try_get_term_for(&mut self, id: u64, buffer: &mut [u8]) -> Result<Option<usize>> {
        let Some(term) = self.term_container(id)? else {
            return Ok(None);
        };
        decode_term(self.containers, self.dictionaries, term, &mut self.x_key)?;
        let key: &[u8] = &self.x_key;
        if buffer.len() < key.len() {
            return Err(Error::capacity_exceeded(
                "term buffer",
                format!("term of {} bytes into {} bytes", key.len(), buffer.len()),
            ));
        }
        buffer[..key.len()].copy_from_slice(key);
        Ok(Some(key.len()))
    }

    /// The decoded term of `id` as text.
    pub fn try_get_term_string(&mut self, id: u64) -> Result<Option<String>> {
        let Some(term) = self.term_container(id)? else {
            return Ok(None);
        };
        decode_term(self.containers, self.dictionaries, term, &mut self.x_key)?;
        Ok(Some(String::from_utf8_lossy(&self.x_key).into_owned()))
    }

    /// The numeric term of `id`. A stored value of another width is corruption.
    pub fn try_get_numeric<T: NumericTerm>(&self, id: u64) -> Result<Option<T>> {
        let Some(value) = self.tree.read(id) else {
            return Ok(None);
        };
        if value.len() != 8 {
            return Err(Error::invalid_format(
                "numeric term",
                format!("{} value of entry {id} has {} bytes", T::NAME, value.len()),
            ));
        }
        Ok(Some(T::from_le_bytes(value)))
    }

    /// The latitude and longitude stored for `id`.
    pub fn try_get_coordinates(&self, id: u64) -> Result<Option<(f32, f32)>> {
        let Some(value) = self.tree.read(id) else {
            return Ok(None);
        };
        if value.len() != 8 {
            return Err(Error::invalid_format(
                "coordinates",
                format!("entry {id} stores {} bytes", value.len()),
            ));
        }
        Ok(Some((
            LittleEndian::read_f32(&value[..4]),
            LittleEndian::read_f32(&value[4..]),
        )))
    }

    /// Ascending order of the numeric terms of two entries; entries without a
    /// term sort last.
    pub fn compare_as_numeric<T: NumericTerm>(&self, x: u64, y: u64) -> Result<Ordering> {
        let x = self.try_get_numeric::<T>(x)?;
        let y = self.try_get_numeric::<T>(y)?;
        Ok(missing_last(x, y, |x, y| x.compare(&y)))
    }

    /// Ascending order of the sequence terms of two entries; entries without a
    /// term sort last.
    ///
    /// Terms encoded with the same dictionary compare as stored: encoded bytes
    /// first, then bit length. Otherwise both are decoded.
    pub fn compare(&mut self, x: u64, y: u64) -> Result<Ordering> {
        match (self.term_container(x)?, self.term_container(y)?) {
            (Some(x), Some(y)) => self.compare_terms(x, y),
            (x, y) => Ok(missing_last(x, y, |_, _| Ordering::Equal)),
        }
    }

    fn compare_terms(&mut self, x: u64, y: u64) -> Result<Ordering> {
        let x_item = self.containers.get(x)?;
        let y_item = self.containers.get(y)?;
        if x_item.page_metadata == y_item.page_metadata {
            let x_bits = term_item_bit_length(x_item.data)?;
            let y_bits = term_item_bit_length(y_item.data)?;
            let n = x_item.data.len().min(y_item.data.len());
            return Ok(x_item.data[1..n]
                .cmp(&y_item.data[1..n])
                .then(x_bits.cmp(&y_bits)));
        }
        decode_item(self.dictionaries, x_item, &mut self.x_key)?;
        decode_item(self.dictionaries, y_item, &mut self.y_key)?;
        Ok(self.x_key.as_slice().cmp(self.y_key.as_slice()))
    }

    /// Orders two entries with `comparer`. Entries without a value sort last in
    /// either direction.
    pub fn compare_with<C: MatchComparer>(
        &mut self,
        x: u64,
        y: u64,
        comparer: &C,
    ) -> Result<Ordering> {
        match comparer.field_type() {
            MatchCompareFieldType::Integer => {
                let x = self.try_get_numeric::<i64>(x)?;
                let y = self.try_get_numeric::<i64>(y)?;
                Ok(missing_last(x, y, |x, y| comparer.compare_numerical(x, y)))
            }
            MatchCompareFieldType::Floating => {
                let x = self.try_get_numeric::<f64>(x)?;
                let y = self.try_get_numeric::<f64>(y)?;
                Ok(missing_last(x, y, |x, y| comparer.orient(x.total_cmp(&y))))
            }
            MatchCompareFieldType::Spatial => {
                let Some(origin) = comparer.spatial() else {
                    return Err(Error::invalid_arg(
                        "comparer",
                        format!("{} has no spatial origin", comparer.name()),
                    ));
                };
                let distance = |c: Option<(f32, f32)>| {
                    c.map(|(lat, lon)| origin.distance_to(lat as f64, lon as f64))
                };
                let x = distance(self.try_get_coordinates(x)?);
                let y = distance(self.try_get_coordinates(y)?);
                Ok(missing_last(x, y, |x, y| comparer.orient(x.total_cmp(&y))))
            }
            MatchCompareFieldType::Sequence | MatchCompareFieldType::Alphanumeric => {
                let terms = (self.term_container(x)?, self.term_container(y)?);
                let (Some(x), Some(y)) = terms else {
                    return Ok(missing_last(terms.0, terms.1, |_, _| Ordering::Equal));
                };
                if !comparer.requires_decoding() {
                    return Ok(comparer.orient(self.compare_terms(x, y)?));
                }
                decode_term(self.containers, self.dictionaries, x, &mut self.x_key)?;
                decode_term(self.containers, self.dictionaries, y, &mut self.y_key)?;
                Ok(comparer.compare_sequence(&self.x_key, &self.y_key))
            }
        }
    }
}

fn missing_last<T>(x: Option<T>, y: Option<T>, compare: impl FnOnce(T, T) -> Ordering) -> Ordering {
    match (x, y) {
        (Some(x), Some(y)) => compare(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn decode_term(
    containers: &dyn ContainerStore,
    dictionaries: &dyn DictionarySource,
    term: u64,
    out: &mut Vec<u8>,
) -> Result<()> {
    decode_item(dictionaries, containers.get(term)?, out)
}

fn decode_item(dictionaries: &dyn DictionarySource, item: ContainerItem<'_>, out: &mut Vec<u8>) -> Result<()> {
    let bits = term_item_bit_length(item.data)?;
    out.clear();
    dictionaries
        .dictionary(item.page_metadata)?
        .decode(&item.data[1..], bits, out)
}

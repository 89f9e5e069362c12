use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};
use corax_common::{Result, verify_arg};

/// Ordered map from a 64-bit key to a value of fixed width.
///
/// The search layer keeps one tree per field, mapping each result id to either the
/// container id of its term or, for numeric fields, the value itself.
pub trait FixedSizeTree {
    /// Width in bytes of every stored value.
    fn value_size(&self) -> usize;

    fn read(&self, key: u64) -> Option<&[u8]>;

    fn contains(&self, key: u64) -> bool {
        self.read(key).is_some()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryFixedSizeTree {
    value_size: usize,
    values: BTreeMap<u64, Box<[u8]>>,
}

impl MemoryFixedSizeTree {
    pub fn new(value_size: usize) -> MemoryFixedSizeTree {
        MemoryFixedSizeTree {
            value_size,
            values: BTreeMap::new(),
        }
    }

    /// Stores `value`, replacing any previous value of `key`.
    pub fn insert(&mut self, key: u64, value: &[u8]) -> Result<()> {
        verify_arg!(value, value.len() == self.value_size);
        self.values.insert(key, value.into());
        Ok(())
    }

    pub fn insert_i64(&mut self, key: u64, value: i64) -> Result<()> {
        let mut bytes = [0u8; 8];
        LittleEndian::write_i64(&mut bytes, value);
        self.insert(key, &bytes)
    }

    pub fn insert_f64(&mut self, key: u64, value: f64) -> Result<()> {
        let mut bytes = [0u8; 8];
        LittleEndian::write_f64(&mut bytes, value);
        self.insert(key, &bytes)
    }

    pub fn insert_u64(&mut self, key: u64, value: u64) -> Result<()> {
        let mut bytes = [0u8; 8];
        LittleEndian::write_u64(&mut bytes, value);
        self.insert(key, &bytes)
    }

    /// Stores a latitude/longitude pair as two consecutive `f32`.
    pub fn insert_coordinates(&mut self, key: u64, lat: f32, lon: f32) -> Result<()> {
        let mut value = [0u8; 8];
        LittleEndian::write_f32(&mut value[..4], lat);
        LittleEndian::write_f32(&mut value[4..], lon);
        self.insert(key, &value)
    }

    pub fn remove(&mut self, key: u64) -> bool {
        self.values.remove(&key).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FixedSizeTree for MemoryFixedSizeTree {
    fn value_size(&self) -> usize {
        self.value_size
    }

    fn read(&self, key: u64) -> Option<&[u8]> {
        self.values.get(&key).map(|v| v.as_ref())
    }
}

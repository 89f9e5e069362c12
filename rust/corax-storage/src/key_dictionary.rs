//! Compact key encoding.
//!
//! Term keys are stored encoded with the dictionary of the page they live on. A
//! stored term item is one header byte whose high nibble holds the number of
//! padding bits in the last byte, followed by the encoded bits (MSB-first):
//!
//! ```text
//! bit_len = (item.len() - 1) * 8 - (item[0] >> 4)
//! ```
//!
//! Dictionaries are order preserving: comparing the encoded bytes of two keys of
//! the same dictionary, then their bit lengths, orders them like their decoded form.

use ahash::AHashMap;
use corax_common::{Result, error::Error, verify_data};

pub trait KeyDictionary {
    /// Appends the encoded form of `key` to `out`, zero padded to a byte boundary,
    /// and returns its length in bits.
    fn encode(&self, key: &[u8], out: &mut Vec<u8>) -> Result<usize>;

    /// Appends the decoded key of the first `bit_len` bits of `encoded` to `out`.
    fn decode(&self, encoded: &[u8], bit_len: usize, out: &mut Vec<u8>) -> Result<()>;
}

/// Resolves the dictionary a page was encoded with from its page metadata.
pub trait DictionarySource {
    fn dictionary(&self, id: u64) -> Result<&dyn KeyDictionary>;
}

/// Builds a stored term item for `key`.
pub fn encode_term_item(dictionary: &dyn KeyDictionary, key: &[u8]) -> Result<Vec<u8>> {
    let mut item = vec![0u8];
    let bits = dictionary.encode(key, &mut item)?;
    let padding = (item.len() - 1) * 8 - bits;
    verify_data!(padding, padding < 8);
    item[0] = (padding as u8) << 4;
    Ok(item)
}

/// Length in bits of the encoded key held by a term item.
pub fn term_item_bit_length(item: &[u8]) -> Result<usize> {
    let Some(&head) = item.first() else {
        return Err(Error::invalid_format("term item", "empty item"));
    };
    let padding = (head >> 4) as usize;
    let bytes = (item.len() - 1) * 8;
    if padding >= 8 || padding > bytes {
        return Err(Error::invalid_format(
            "term item",
            format!("{padding} padding bits in {} bytes", item.len() - 1),
        ));
    }
    Ok(bytes - padding)
}

/// Stores keys verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDictionary;

impl KeyDictionary for IdentityDictionary {
    fn encode(&self, key: &[u8], out: &mut Vec<u8>) -> Result<usize> {
        out.extend_from_slice(key);
        Ok(key.len() * 8)
    }

    fn decode(&self, encoded: &[u8], bit_len: usize, out: &mut Vec<u8>) -> Result<()> {
        verify_data!(bit_len, bit_len % 8 == 0 && bit_len / 8 <= encoded.len());
        out.extend_from_slice(&encoded[..bit_len / 8]);
        Ok(())
    }
}

/// Packs 7-bit ASCII keys into consecutive 7-bit groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct SevenBitDictionary;

impl KeyDictionary for SevenBitDictionary {
    fn encode(&self, key: &[u8], out: &mut Vec<u8>) -> Result<usize> {
        if let Some(pos) = key.iter().position(|&b| b >= 0x80) {
            return Err(Error::invalid_arg(
                "key",
                format!("byte {:#x} at {pos} is not 7-bit ASCII", key[pos]),
            ));
        }

        let start = out.len();
        let bits = key.len() * 7;
        out.resize(start + bits.div_ceil(8), 0);
        let target = &mut out[start..];
        for (i, &b) in key.iter().enumerate() {
            for bit in 0..7 {
                if b & (0x40 >> bit) != 0 {
                    let pos = i * 7 + bit;
                    target[pos / 8] |= 0x80 >> (pos % 8);
                }
            }
        }
        Ok(bits)
    }

    fn decode(&self, encoded: &[u8], bit_len: usize, out: &mut Vec<u8>) -> Result<()> {
        verify_data!(bit_len, bit_len % 7 == 0 && bit_len.div_ceil(8) <= encoded.len());
        for i in 0..bit_len / 7 {
            let mut b = 0u8;
            for bit in 0..7 {
                let pos = i * 7 + bit;
                if encoded[pos / 8] & (0x80 >> (pos % 8)) != 0 {
                    b |= 0x40 >> bit;
                }
            }
            out.push(b);
        }
        Ok(())
    }
}

/// Dictionaries by id.
#[derive(Default)]
pub struct DictionaryRegistry {
    dictionaries: AHashMap<u64, Box<dyn KeyDictionary + Send + Sync>>,
}

impl DictionaryRegistry {
    pub fn new() -> DictionaryRegistry {
        DictionaryRegistry::default()
    }

    pub fn register(&mut self, id: u64, dictionary: impl KeyDictionary + Send + Sync + 'static) {
        self.dictionaries.insert(id, Box::new(dictionary));
    }
}

impl DictionarySource for DictionaryRegistry {
    fn dictionary(&self, id: u64) -> Result<&dyn KeyDictionary> {
        match self.dictionaries.get(&id) {
            Some(d) => Ok(d.as_ref()),
            None => Err(Error::invalid_format(
                "key dictionary",
                format!("dictionary {id} is not registered"),
            )),
        }
    }
}

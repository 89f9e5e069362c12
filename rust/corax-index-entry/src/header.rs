//! Fixed-size index entry header.

use byteorder::{ByteOrder, LittleEndian};
use corax_common::{Result, error::Error};

pub const LENGTH_OFFSET: usize = 0;
pub const KNOWN_FIELD_COUNT_OFFSET: usize = 4;
pub const DYNAMIC_TABLE_OFFSET: usize = 6;
pub const HEADER_SIZE: usize = 10;

/// Largest number of known fields the 14 count bits can describe.
pub const MAX_KNOWN_FIELDS: usize = (u16::MAX >> 2) as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntryHeader {
    pub length: u32,
    pub known_field_count: usize,
    /// Width in bytes of every known-field pointer: 1, 2 or 4.
    pub pointer_width: usize,
    pub dynamic_table: u32,
}

impl IndexEntryHeader {
    pub fn write_to(&self, buffer: &mut [u8]) {
        debug_assert!(matches!(self.pointer_width, 1 | 2 | 4));
        debug_assert!(self.known_field_count <= MAX_KNOWN_FIELDS);
        let selector = if self.pointer_width == 4 { 0 } else { self.pointer_width as u16 };
        LittleEndian::write_u32(&mut buffer[LENGTH_OFFSET..], self.length);
        LittleEndian::write_u16(
            &mut buffer[KNOWN_FIELD_COUNT_OFFSET..],
            ((self.known_field_count as u16) << 2) | selector,
        );
        LittleEndian::write_u32(&mut buffer[DYNAMIC_TABLE_OFFSET..], self.dynamic_table);
    }

    pub fn read_from(buffer: &[u8]) -> Result<IndexEntryHeader> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::invalid_format(
                "index entry header",
                format!("{} bytes is shorter than the header", buffer.len()),
            ));
        }

        let packed = LittleEndian::read_u16(&buffer[KNOWN_FIELD_COUNT_OFFSET..]);
        let pointer_width = (packed & 0b11) as usize;
        let pointer_width = match pointer_width {
            1 | 2 => pointer_width,
            // Two selector bits cannot express 4; it is stored as 0b00.
            0 => 4,
            _ => {
                return Err(Error::invalid_format(
                    "index entry header",
                    format!("pointer width selector {pointer_width}"),
                ));
            }
        };

        Ok(IndexEntryHeader {
            length: LittleEndian::read_u32(&buffer[LENGTH_OFFSET..]),
            known_field_count: (packed >> 2) as usize,
            pointer_width,
            dynamic_table: LittleEndian::read_u32(&buffer[DYNAMIC_TABLE_OFFSET..]),
        })
    }
}

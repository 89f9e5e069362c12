use std::fmt::Write as _;

use byteorder::{ByteOrder, LittleEndian};
use corax_common::{Result, error::Error, try_or_ret_some_err, verify_data};
use corax_encodings::varint;

use crate::{
    field_type::IndexEntryFieldType,
    header::{HEADER_SIZE, IndexEntryHeader},
    known_fields::KnownFields,
    numeric::TupleNumeric,
};

/// Random-access view over a serialized index entry.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntryReader<'a> {
    buffer: &'a [u8],
    header: IndexEntryHeader,
}

impl<'a> IndexEntryReader<'a> {
    /// Validates the header against `buffer` and builds the reader.
    pub fn new(buffer: &'a [u8]) -> Result<IndexEntryReader<'a>> {
        let header = IndexEntryHeader::read_from(buffer)?;
        verify_data!(length, header.length as usize == buffer.len());
        let tables = header.known_field_count * header.pointer_width;
        verify_data!(known_field_table, HEADER_SIZE + tables < buffer.len());
        verify_data!(dynamic_table, (header.dynamic_table as usize) < buffer.len() - tables);
        Ok(IndexEntryReader { buffer, header })
    }

    /// Total entry size in bytes, as recorded in the header.
    pub fn length(&self) -> usize {
        self.header.length as usize
    }

    pub fn known_field_count(&self) -> usize {
        self.header.known_field_count
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buffer
    }

    /// Returns the data offset of `field` and whether its value is typed, or `None`
    /// when the field is absent or outside the known field table.
    fn location(&self, field: usize) -> Option<(usize, bool)> {
        let width = self.header.pointer_width;
        let count = self.header.known_field_count;
        if field >= count {
            return None;
        }
        let at = self.buffer.len() - count * width + field * width;
        let (raw, absent, typed_flag) = match width {
            1 => (self.buffer[at] as u32, 0xFF, 0x80),
            2 => (LittleEndian::read_u16(&self.buffer[at..]) as u32, 0xFFFF, 0x8000),
            _ => (LittleEndian::read_u32(&self.buffer[at..]), u32::MAX, 0x8000_0000),
        };
        if raw == absent {
            return None;
        }
        Some(((raw & !typed_flag) as usize, raw & typed_flag != 0))
    }

    /// Reads the type tag of a typed value at `offset`, returning the tag and the
    /// offset just past it.
    fn type_at(&self, offset: usize) -> Result<(IndexEntryFieldType, usize)> {
        let (bits, len) = varint::read::<u8>(self.buffer, offset)?;
        let field_type = IndexEntryFieldType::from_bits(bits).ok_or_else(|| {
            Error::invalid_format("index entry field type", format!("unknown tag {bits:#x}"))
        })?;
        Ok((field_type, offset + len))
    }

    /// Shape of the stored value; `INVALID` when the field is absent.
    pub fn field_type(&self, field: usize) -> Result<IndexEntryFieldType> {
        match self.location(field) {
            None => Ok(IndexEntryFieldType::INVALID),
            Some((_, false)) => Ok(IndexEntryFieldType::NONE),
            Some((offset, true)) => Ok(self.type_at(offset)?.0),
        }
    }

    /// Reads the sequence of a scalar field, or the first element of a list.
    pub fn read(&self, field: usize) -> Result<Option<&'a [u8]>> {
        self.read_element(field, 0)
    }

    /// Reads the sequence of a scalar field, or the `index`-th element of a list.
    ///
    /// Returns `None` for an absent field or an out-of-range index; a scalar
    /// holds only index 0. An empty stored value is `Some(&[])`.
    pub fn read_element(&self, field: usize, index: usize) -> Result<Option<&'a [u8]>> {
        let Some((offset, typed)) = self.location(field) else {
            return Ok(None);
        };

        if !typed {
            if index > 0 {
                return Ok(None);
            }
            let (len, read) = varint::read::<u32>(self.buffer, offset)?;
            return self.slice(offset + read, len as usize).map(Some);
        }

        let (field_type, offset) = self.type_at(offset)?;
        if field_type.is_list() {
            let (count, read) = varint::read::<u32>(self.buffer, offset)?;
            let count = count as usize;
            if index >= count {
                return Ok(None);
            }
            let offset = offset + read;
            let mut length_table = self.read_u32(offset)? as usize;
            let mut data = if field_type.is_tuple() {
                offset + 8 + count * 8
            } else {
                offset + 4
            };
            for _ in 0..index {
                let (len, read) = varint::read::<u32>(self.buffer, length_table)?;
                data += len as usize;
                length_table += read;
            }
            let (len, _) = varint::read::<u32>(self.buffer, length_table)?;
            return self.slice(data, len as usize).map(Some);
        }

        if field_type.is_tuple() {
            if index > 0 {
                return Ok(None);
            }
            let (_, read) = varint::read::<i64>(self.buffer, offset)?;
            let offset = offset + read + 8;
            let (len, read) = varint::read::<u32>(self.buffer, offset)?;
            return self.slice(offset + read, len as usize).map(Some);
        }

        Err(Error::invalid_format(
            "index entry field type",
            format!("typed value with tag {:#x}", field_type.bits()),
        ))
    }

    /// Reads a tuple field. For a tuple list this is its first element; `None` for
    /// absent fields, fields without tuple parts and empty tuple lists.
    pub fn read_tuple(&self, field: usize) -> Result<Option<(i64, f64, &'a [u8])>> {
        let Some((offset, true)) = self.location(field) else {
            return Ok(None);
        };
        let (field_type, offset) = self.type_at(offset)?;
        if !field_type.is_tuple() {
            return Ok(None);
        }

        if field_type.is_list() {
            let mut iter = FieldIterator::open(self.buffer, offset, field_type)?;
            if !iter.read_next()? {
                return Ok(None);
            }
            return Ok(Some((iter.long()?, iter.double()?, iter.sequence()?)));
        }

        let (long, read) = varint::read::<i64>(self.buffer, offset)?;
        let offset = offset + read;
        let double = self.read_f64(offset)?;
        let offset = offset + 8;
        let (len, read) = varint::read::<u32>(self.buffer, offset)?;
        Ok(Some((long, double, self.slice(offset + read, len as usize)?)))
    }

    /// Reads the numeric part of a tuple field as `T`, paired with a flag that is
    /// `false` when the stored long did not fit `T` (the value then holds the
    /// truncated bits).
    ///
    /// Absent and untyped fields yield `None`. A typed list without tuple parts has
    /// no numeric value and fails with `NotSupported`.
    pub fn read_numeric<T: TupleNumeric>(&self, field: usize) -> Result<Option<(T, bool)>> {
        let Some((offset, true)) = self.location(field) else {
            return Ok(None);
        };
        let (field_type, _) = self.type_at(offset)?;
        if !field_type.is_tuple() {
            return Err(Error::not_supported(format!(
                "field {field} of type {field_type:?} has no numeric value"
            )));
        }
        Ok(self
            .read_tuple(field)?
            .map(|(long, double, _)| T::from_tuple(long, double)))
    }

    /// Like [`IndexEntryReader::read_numeric`], but only yields values that
    /// converted without loss.
    pub fn try_read_numeric<T: TupleNumeric>(&self, field: usize) -> Result<Option<T>> {
        Ok(self
            .read_numeric::<T>(field)?
            .and_then(|(value, lossless)| lossless.then_some(value)))
    }

    /// Opens an iterator over a typed field.
    ///
    /// An absent field yields an empty iterator of type `INVALID`; an untyped field
    /// is an argument error.
    pub fn read_many(&self, field: usize) -> Result<FieldIterator<'a>> {
        match self.location(field) {
            None => Ok(FieldIterator::empty()),
            Some((_, false)) => Err(Error::invalid_arg(
                "field",
                format!("field {field} is untyped"),
            )),
            Some((offset, true)) => {
                let (field_type, offset) = self.type_at(offset)?;
                FieldIterator::open(self.buffer, offset, field_type)
            }
        }
    }

    /// Opens an iterator over a typed field, or `None` for absent or untyped fields.
    pub fn try_read_many(&self, field: usize) -> Result<Option<FieldIterator<'a>>> {
        match self.location(field) {
            Some((offset, true)) => {
                let (field_type, offset) = self.type_at(offset)?;
                FieldIterator::open(self.buffer, offset, field_type).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Renders every known field as `name: value` lines, sequences decoded as UTF-8
    /// (lossy). Absent fields print as `null`; list elements are comma-separated.
    pub fn debug_dump(&self, known_fields: &KnownFields) -> Result<String> {
        let mut out = String::new();
        for (field, name) in known_fields.iter() {
            let field_type = self.field_type(field)?;
            if field_type.is_absent() {
                let _ = writeln!(out, "{name}: null");
            } else if field_type.is_list() {
                let mut iter = self.read_many(field)?;
                let _ = write!(out, "{name}: ");
                let mut first = true;
                while iter.read_next()? {
                    if !first {
                        out.push(',');
                    }
                    first = false;
                    out.push_str(&String::from_utf8_lossy(iter.sequence()?));
                }
                out.push('\n');
            } else if field_type.is_tuple() {
                if let Some((long, double, seq)) = self.read_tuple(field)? {
                    let _ = writeln!(
                        out,
                        "{name}: {} ({long}, {double})",
                        String::from_utf8_lossy(seq)
                    );
                }
            } else {
                let value = self.read(field)?.unwrap_or_default();
                let _ = writeln!(out, "{name}: {}", String::from_utf8_lossy(value));
            }
        }
        Ok(out)
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        slice_at(self.buffer, offset, len)
    }

    fn read_u32(&self, offset: usize) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.slice(offset, 4)?))
    }

    fn read_f64(&self, offset: usize) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.slice(offset, 8)?))
    }
}

fn slice_at(buffer: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buffer.get(offset..end))
        .ok_or_else(|| {
            Error::invalid_format(
                "index entry",
                format!("{len} bytes at {offset} exceed the entry of {} bytes", buffer.len()),
            )
        })
}

/// One element of a list field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldItem<'a> {
    pub sequence: &'a [u8],
    /// Numeric parts, present for tuple lists.
    pub tuple: Option<(i64, f64)>,
}

/// Cursor over the elements of a typed field.
///
/// A list yields each element in write order; a scalar tuple yields its single
/// value. `read_next` must be called before the first element is accessed.
#[derive(Debug, Clone)]
pub struct FieldIterator<'a> {
    buffer: &'a [u8],
    field_type: IndexEntryFieldType,
    count: usize,
    position: Option<usize>,
    data_offset: usize,
    length_offset: usize,
    long_offset: usize,
    double_offset: Option<usize>,
    current_len: usize,
    current_long: i64,
}

impl<'a> FieldIterator<'a> {
    fn empty() -> FieldIterator<'a> {
        FieldIterator {
            buffer: &[],
            field_type: IndexEntryFieldType::INVALID,
            count: 0,
            position: None,
            data_offset: 0,
            length_offset: 0,
            long_offset: 0,
            double_offset: None,
            current_len: 0,
            current_long: 0,
        }
    }

    /// `offset` points just past the type tag.
    fn open(buffer: &'a [u8], offset: usize, field_type: IndexEntryFieldType) -> Result<FieldIterator<'a>> {
        let mut iter = FieldIterator::empty();
        iter.buffer = buffer;
        iter.field_type = field_type;

        if field_type.is_list() {
            let (count, read) = varint::read::<u32>(buffer, offset)?;
            iter.count = count as usize;
            let offset = offset + read;
            iter.length_offset = LittleEndian::read_u32(slice_at(buffer, offset, 4)?) as usize;
            if field_type.is_tuple() {
                iter.long_offset =
                    LittleEndian::read_u32(slice_at(buffer, offset + 4, 4)?) as usize;
                iter.double_offset = Some(offset + 8);
                iter.data_offset = offset + 8 + iter.count * 8;
            } else {
                iter.data_offset = offset + 4;
            }
        } else if field_type.is_tuple() {
            // A scalar tuple reads as a one-element list.
            iter.count = 1;
            iter.long_offset = offset;
            let (_, read) = varint::read::<i64>(buffer, offset)?;
            iter.double_offset = Some(offset + read);
            iter.length_offset = offset + read + 8;
            let (_, read) = varint::read::<u32>(buffer, iter.length_offset)?;
            iter.data_offset = iter.length_offset + read;
        } else {
            return Err(Error::invalid_format(
                "index entry field type",
                format!("cannot iterate tag {:#x}", field_type.bits()),
            ));
        }
        Ok(iter)
    }

    pub fn field_type(&self) -> IndexEntryFieldType {
        self.field_type
    }

    /// Number of elements in the field.
    pub fn element_count(&self) -> usize {
        self.count
    }

    pub fn is_tuple(&self) -> bool {
        self.double_offset.is_some()
    }

    /// Moves to the next element; `false` once all elements were visited.
    pub fn read_next(&mut self) -> Result<bool> {
        let next = self.position.map_or(0, |p| p + 1);
        if next >= self.count {
            self.position = Some(self.count);
            return Ok(false);
        }

        if self.position.is_some() {
            self.data_offset += self.current_len;
            if let Some(double_offset) = self.double_offset.as_mut() {
                *double_offset += 8;
            }
        }

        let (len, read) = varint::read::<u32>(self.buffer, self.length_offset)?;
        self.length_offset += read;
        self.current_len = len as usize;

        if self.double_offset.is_some() {
            let (long, read) = varint::read::<i64>(self.buffer, self.long_offset)?;
            self.long_offset += read;
            self.current_long = long;
        }

        self.position = Some(next);
        Ok(true)
    }

    fn current(&self) -> Result<usize> {
        match self.position {
            Some(p) if p < self.count => Ok(p),
            _ => Err(Error::invalid_operation("field iterator is not positioned")),
        }
    }

    pub fn sequence(&self) -> Result<&'a [u8]> {
        self.current()?;
        slice_at(self.buffer, self.data_offset, self.current_len)
    }

    pub fn long(&self) -> Result<i64> {
        self.current()?;
        if self.double_offset.is_none() {
            return Err(Error::invalid_operation("list elements carry no long"));
        }
        Ok(self.current_long)
    }

    pub fn double(&self) -> Result<f64> {
        self.current()?;
        match self.double_offset {
            Some(offset) => Ok(LittleEndian::read_f64(slice_at(self.buffer, offset, 8)?)),
            None => Err(Error::invalid_operation("list elements carry no double")),
        }
    }

    fn item(&self) -> Result<FieldItem<'a>> {
        let tuple = if self.is_tuple() {
            Some((self.long()?, self.double()?))
        } else {
            None
        };
        Ok(FieldItem {
            sequence: self.sequence()?,
            tuple,
        })
    }
}

impl<'a> Iterator for FieldIterator<'a> {
    type Item = Result<FieldItem<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !try_or_ret_some_err!(self.read_next()) {
            return None;
        }
        Some(self.item())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.position.map_or(0, |p| (p + 1).min(self.count));
        (remaining, Some(remaining))
    }
}

use byteorder::{ByteOrder, LittleEndian};
use corax_common::{Result, error::Error, verify_arg};
use corax_encodings::varint;

use crate::{
    field_type::IndexEntryFieldType,
    header::{HEADER_SIZE, IndexEntryHeader},
    known_fields::KnownFields,
};

/// Upper bound on the number of dynamic (name-addressed, unknown) fields one entry
/// can describe; the count is persisted as a single byte.
pub const MAX_DYNAMIC_FIELDS: usize = u8::MAX as usize;

/// Largest data offset a known-field pointer can carry; the top bit is the typed flag.
const MAX_LOCATION: usize = 0x7FFF_FFFE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldLocation {
    offset: u32,
    typed: bool,
}

/// Builds one serialized index entry.
///
/// Each known field can be written at most once, in any order. Fields that are
/// never written read back as absent. [`IndexEntryWriter::finish`] appends the
/// dynamic and known field tables and patches the header.
pub struct IndexEntryWriter<'a> {
    known_fields: &'a KnownFields,
    buffer: Vec<u8>,
    locations: Vec<Option<FieldLocation>>,
    dynamic_attempts: usize,
}

impl<'a> IndexEntryWriter<'a> {
    pub fn new(known_fields: &'a KnownFields) -> IndexEntryWriter<'a> {
        IndexEntryWriter::with_capacity(known_fields, 256)
    }

    pub fn with_capacity(known_fields: &'a KnownFields, capacity: usize) -> IndexEntryWriter<'a> {
        let mut buffer = Vec::with_capacity(capacity.max(HEADER_SIZE));
        buffer.resize(HEADER_SIZE, 0);
        IndexEntryWriter {
            known_fields,
            buffer,
            locations: vec![None; known_fields.len()],
            dynamic_attempts: 0,
        }
    }

    pub fn known_fields(&self) -> &KnownFields {
        self.known_fields
    }

    /// Writes an untyped raw sequence.
    pub fn write(&mut self, field: usize, value: &[u8]) -> Result<()> {
        let offset = self.begin_field(field, false)?;
        varint::push(&mut self.buffer, value.len() as u32);
        self.buffer.extend_from_slice(value);
        self.locations[field] = Some(offset);
        Ok(())
    }

    /// Writes a tuple: a sequence with an accompanying long and double.
    pub fn write_tuple(&mut self, field: usize, value: &[u8], long: i64, double: f64) -> Result<()> {
        let offset = self.begin_field(field, true)?;
        varint::push(&mut self.buffer, IndexEntryFieldType::TUPLE.bits());
        varint::push(&mut self.buffer, long);
        self.buffer.extend_from_slice(&double.to_le_bytes());
        varint::push(&mut self.buffer, value.len() as u32);
        self.buffer.extend_from_slice(value);
        self.locations[field] = Some(offset);
        Ok(())
    }

    /// Writes a list of sequences. An empty list is stored and reads back as a
    /// present field with zero elements.
    pub fn write_list<V: AsRef<[u8]>>(&mut self, field: usize, values: &[V]) -> Result<()> {
        let offset = self.begin_field(field, true)?;
        varint::push(&mut self.buffer, IndexEntryFieldType::LIST.bits());
        varint::push(&mut self.buffer, values.len() as u32);

        let length_table_ptr = self.reserve_u32();
        for value in values {
            self.buffer.extend_from_slice(value.as_ref());
        }
        self.patch_u32(length_table_ptr, self.buffer.len())?;
        for value in values {
            varint::push(&mut self.buffer, value.as_ref().len() as u32);
        }

        self.locations[field] = Some(offset);
        Ok(())
    }

    /// Writes a list of tuples. The three slices must have equal length.
    pub fn write_tuple_list<V: AsRef<[u8]>>(
        &mut self,
        field: usize,
        values: &[V],
        longs: &[i64],
        doubles: &[f64],
    ) -> Result<()> {
        verify_arg!(longs, longs.len() == values.len());
        verify_arg!(doubles, doubles.len() == values.len());

        let offset = self.begin_field(field, true)?;
        varint::push(
            &mut self.buffer,
            (IndexEntryFieldType::LIST | IndexEntryFieldType::TUPLE).bits(),
        );
        varint::push(&mut self.buffer, values.len() as u32);

        let length_table_ptr = self.reserve_u32();
        let long_table_ptr = self.reserve_u32();
        for double in doubles {
            self.buffer.extend_from_slice(&double.to_le_bytes());
        }
        for value in values {
            self.buffer.extend_from_slice(value.as_ref());
        }
        self.patch_u32(length_table_ptr, self.buffer.len())?;
        for value in values {
            varint::push(&mut self.buffer, value.as_ref().len() as u32);
        }
        self.patch_u32(long_table_ptr, self.buffer.len())?;
        for &long in longs {
            varint::push(&mut self.buffer, long);
        }

        self.locations[field] = Some(offset);
        Ok(())
    }

    /// Starts a list whose elements are supplied one at a time.
    pub fn begin_list(&mut self, field: usize) -> Result<ListFieldWriter<'_, 'a>> {
        self.check_field(field)?;
        Ok(ListFieldWriter {
            writer: self,
            field,
            data: Vec::new(),
            lengths: Vec::new(),
        })
    }

    /// Writes a raw sequence addressed by field name.
    ///
    /// Unknown names are dynamic fields, which this format version does not store:
    /// the call fails with `NotSupported` and the entry is left untouched. Once
    /// [`MAX_DYNAMIC_FIELDS`] attempts were made the call fails with
    /// `CapacityExceeded` instead.
    pub fn write_by_name(&mut self, name: &str, value: &[u8]) -> Result<()> {
        match self.known_fields.get(name) {
            Some(field) => self.write(field, value),
            None => self.reject_dynamic(name),
        }
    }

    pub fn write_tuple_by_name(&mut self, name: &str, value: &[u8], long: i64, double: f64) -> Result<()> {
        match self.known_fields.get(name) {
            Some(field) => self.write_tuple(field, value, long, double),
            None => self.reject_dynamic(name),
        }
    }

    /// Completes the entry and returns its bytes.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let max_offset = self
            .locations
            .iter()
            .flatten()
            .map(|loc| loc.offset as usize)
            .max()
            .unwrap_or(0);

        // The all-ones pattern of each width is reserved for "absent".
        let pointer_width = if max_offset > i16::MAX as usize - 1 {
            4
        } else if max_offset > i8::MAX as usize - 1 {
            2
        } else {
            1
        };

        let data_end = self.buffer.len();
        let known_section = pointer_width * self.locations.len();
        // Dynamic fields are never stored, so their table is just a zero count byte.
        let total = data_end + 1 + known_section;
        if total > u32::MAX as usize {
            return Err(Error::capacity_exceeded(
                "index entry",
                format!("{total} bytes does not fit the length field"),
            ));
        }

        let header = IndexEntryHeader {
            length: total as u32,
            known_field_count: self.locations.len(),
            pointer_width,
            dynamic_table: data_end as u32,
        };
        header.write_to(&mut self.buffer[..HEADER_SIZE]);

        self.buffer.reserve(total - data_end);
        self.buffer.push(0);

        for location in &self.locations {
            match (pointer_width, location) {
                (1, None) => self.buffer.push(0xFF),
                (1, Some(loc)) => {
                    let flag = if loc.typed { 0x80 } else { 0 };
                    self.buffer.push(loc.offset as u8 | flag);
                }
                (2, None) => self.buffer.extend_from_slice(&u16::MAX.to_le_bytes()),
                (2, Some(loc)) => {
                    let flag = if loc.typed { 0x8000 } else { 0 };
                    self.buffer.extend_from_slice(&(loc.offset as u16 | flag).to_le_bytes());
                }
                (_, None) => self.buffer.extend_from_slice(&u32::MAX.to_le_bytes()),
                (_, Some(loc)) => {
                    let flag = if loc.typed { 0x8000_0000 } else { 0 };
                    self.buffer.extend_from_slice(&(loc.offset | flag).to_le_bytes());
                }
            }
        }

        debug_assert_eq!(self.buffer.len(), total);
        log::trace!(
            "index entry finished: {} bytes, {} known fields, pointer width {}",
            total,
            self.locations.len(),
            pointer_width
        );
        Ok(self.buffer)
    }

    fn check_field(&self, field: usize) -> Result<()> {
        if field >= self.locations.len() {
            return Err(Error::invalid_arg(
                "field",
                format!("{field} is not a known field (count {})", self.locations.len()),
            ));
        }
        if self.locations[field].is_some() {
            return Err(Error::invalid_operation(format!(
                "field {field} was already written"
            )));
        }
        Ok(())
    }

    fn begin_field(&mut self, field: usize, typed: bool) -> Result<FieldLocation> {
        self.check_field(field)?;
        let offset = self.buffer.len();
        if offset > MAX_LOCATION {
            return Err(Error::capacity_exceeded(
                "index entry",
                format!("field offset {offset} exceeds the pointer range"),
            ));
        }
        Ok(FieldLocation {
            offset: offset as u32,
            typed,
        })
    }

    fn reserve_u32(&mut self) -> usize {
        let at = self.buffer.len();
        self.buffer.extend_from_slice(&[0u8; 4]);
        at
    }

    fn patch_u32(&mut self, at: usize, value: usize) -> Result<()> {
        let value = u32::try_from(value)
            .map_err(|_| Error::capacity_exceeded("index entry", "table offset exceeds u32"))?;
        LittleEndian::write_u32(&mut self.buffer[at..at + 4], value);
        Ok(())
    }

    fn reject_dynamic(&mut self, name: &str) -> Result<()> {
        if self.dynamic_attempts >= MAX_DYNAMIC_FIELDS {
            return Err(Error::capacity_exceeded(
                "dynamic fields",
                format!("more than {MAX_DYNAMIC_FIELDS} dynamic fields"),
            ));
        }
        self.dynamic_attempts += 1;
        Err(Error::not_supported(format!(
            "dynamic field '{name}' cannot be stored"
        )))
    }
}

/// Streams the elements of a list field; nothing is written to the entry until
/// [`ListFieldWriter::finish`]. Dropping the writer without finishing leaves the
/// field absent.
pub struct ListFieldWriter<'w, 'a> {
    writer: &'w mut IndexEntryWriter<'a>,
    field: usize,
    data: Vec<u8>,
    lengths: Vec<usize>,
}

impl ListFieldWriter<'_, '_> {
    pub fn push(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
        self.lengths.push(value.len());
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn finish(self) -> Result<()> {
        let mut values = Vec::with_capacity(self.lengths.len());
        let mut start = 0;
        for &len in &self.lengths {
            values.push(&self.data[start..start + len]);
            start += len;
        }
        self.writer.write_list(self.field, &values)
    }
}

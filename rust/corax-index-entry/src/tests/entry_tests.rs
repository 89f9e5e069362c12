use corax_testkit::data_gen::{self, GeneratedValue};

use crate::{IndexEntryFieldType, IndexEntryReader, IndexEntryWriter, KnownFields};

fn fields(count: usize) -> KnownFields {
    KnownFields::from_names((0..count).map(|i| format!("f{i}"))).unwrap()
}

fn write_document(writer: &mut IndexEntryWriter, doc: &[GeneratedValue]) {
    for (field, value) in doc.iter().enumerate() {
        match value {
            GeneratedValue::Absent => {}
            GeneratedValue::Raw(v) => writer.write(field, v).unwrap(),
            GeneratedValue::Tuple(v, l, d) => writer.write_tuple(field, v, *l, *d).unwrap(),
            GeneratedValue::List(values) => writer.write_list(field, values).unwrap(),
            GeneratedValue::TupleList(items) => {
                let values: Vec<&[u8]> = items.iter().map(|(v, _, _)| v.as_slice()).collect();
                let longs: Vec<i64> = items.iter().map(|(_, l, _)| *l).collect();
                let doubles: Vec<f64> = items.iter().map(|(_, _, d)| *d).collect();
                writer.write_tuple_list(field, &values, &longs, &doubles).unwrap();
            }
        }
    }
}

fn verify_document(reader: &IndexEntryReader, doc: &[GeneratedValue]) {
    for (field, value) in doc.iter().enumerate() {
        let field_type = reader.field_type(field).unwrap();
        match value {
            GeneratedValue::Absent => {
                assert_eq!(field_type, IndexEntryFieldType::INVALID);
                assert_eq!(reader.read(field).unwrap(), None);
            }
            GeneratedValue::Raw(v) => {
                assert_eq!(field_type, IndexEntryFieldType::NONE);
                assert_eq!(reader.read(field).unwrap(), Some(v.as_slice()));
                assert_eq!(reader.read_element(field, 1).unwrap(), None);
            }
            GeneratedValue::Tuple(v, l, d) => {
                assert_eq!(field_type, IndexEntryFieldType::TUPLE);
                assert_eq!(reader.read(field).unwrap(), Some(v.as_slice()));
                assert_eq!(reader.read_tuple(field).unwrap(), Some((*l, *d, v.as_slice())));
                assert_eq!(reader.read_element(field, 1).unwrap(), None);
                assert_eq!(reader.read_numeric::<i64>(field).unwrap(), Some((*l, true)));
                assert_eq!(reader.read_numeric::<f64>(field).unwrap(), Some((*d, true)));
            }
            GeneratedValue::List(values) => {
                assert_eq!(field_type, IndexEntryFieldType::LIST);
                for (i, v) in values.iter().enumerate() {
                    assert_eq!(reader.read_element(field, i).unwrap(), Some(v.as_slice()));
                }
                assert_eq!(reader.read_element(field, values.len()).unwrap(), None);
                let items = reader
                    .read_many(field)
                    .unwrap()
                    .map(|item| item.unwrap().sequence.to_vec())
                    .collect::<Vec<_>>();
                assert_eq!(&items, values);
            }
            GeneratedValue::TupleList(expected) => {
                assert_eq!(field_type, IndexEntryFieldType::LIST | IndexEntryFieldType::TUPLE);
                let mut iter = reader.read_many(field).unwrap();
                assert_eq!(iter.element_count(), expected.len());
                for (v, l, d) in expected {
                    assert!(iter.read_next().unwrap());
                    assert_eq!(iter.sequence().unwrap(), v.as_slice());
                    assert_eq!(iter.long().unwrap(), *l);
                    assert_eq!(iter.double().unwrap(), *d);
                }
                assert!(!iter.read_next().unwrap());
                let first = expected.first().map(|(v, l, d)| (*l, *d, v.as_slice()));
                assert_eq!(reader.read_tuple(field).unwrap(), first);
            }
        }
    }
}

#[test]
fn test_random_documents_round_trip() {
    fastrand::seed(7311);
    let known = fields(12);
    for _ in 0..300 {
        let max_len = [4, 40, 2000][fastrand::usize(0..3)];
        let doc = data_gen::document(known.len(), max_len, 6);
        let mut writer = IndexEntryWriter::new(&known);
        write_document(&mut writer, &doc);
        let bytes = writer.finish().unwrap();
        let reader = IndexEntryReader::new(&bytes).unwrap();
        assert_eq!(reader.length(), bytes.len());
        assert_eq!(reader.known_field_count(), known.len());
        verify_document(&reader, &doc);
    }
}

#[test]
fn test_single_tuple_layout() {
    let known = KnownFields::from_names(["A"]).unwrap();
    let mut writer = IndexEntryWriter::new(&known);
    writer.write_tuple(0, b"abc", 5, 1.5).unwrap();
    let bytes = writer.finish().unwrap();

    // header(10) + tag(1) + long(1) + double(8) + len(1) + "abc"(3) + dyn count(1) + ptr(1)
    assert_eq!(bytes.len(), 26);
    assert_eq!(*bytes.last().unwrap(), 0x80 | 10);

    let reader = IndexEntryReader::new(&bytes).unwrap();
    assert_eq!(reader.read_tuple(0).unwrap(), Some((5, 1.5, &b"abc"[..])));
    assert_eq!(reader.read_numeric::<i32>(0).unwrap(), Some((5, true)));
    assert_eq!(reader.read_numeric::<f32>(0).unwrap(), Some((1.5, true)));
}

#[test]
fn test_pointer_width_grows_with_offsets() {
    let known = fields(2);
    for (payload, expected_width) in [(50usize, 1usize), (1000, 2), (40_000, 4)] {
        let mut writer = IndexEntryWriter::new(&known);
        writer.write(0, &vec![b'x'; payload]).unwrap();
        writer.write_tuple(1, b"tail", -3, 0.25).unwrap();
        let bytes = writer.finish().unwrap();
        let header = crate::header::IndexEntryHeader::read_from(&bytes).unwrap();
        assert_eq!(header.pointer_width, expected_width);
        assert_eq!(header.known_field_count, 2);

        let reader = IndexEntryReader::new(&bytes).unwrap();
        assert_eq!(reader.read(0).unwrap().unwrap().len(), payload);
        assert_eq!(reader.read_tuple(1).unwrap(), Some((-3, 0.25, &b"tail"[..])));
    }
}

#[test]
fn test_empty_entry_reads_all_absent() {
    let known = fields(3);
    let bytes = IndexEntryWriter::new(&known).finish().unwrap();
    let reader = IndexEntryReader::new(&bytes).unwrap();
    for field in 0..3 {
        assert!(reader.field_type(field).unwrap().is_absent());
        assert_eq!(reader.read_numeric::<i64>(field).unwrap(), None);
        assert!(reader.try_read_many(field).unwrap().is_none());
        assert_eq!(reader.read_many(field).unwrap().count(), 0);
    }
    // Ids past the known field table are absent as well.
    assert!(reader.field_type(99).unwrap().is_absent());
}

#[test]
fn test_empty_values_are_present() {
    let known = fields(3);
    let mut writer = IndexEntryWriter::new(&known);
    writer.write(0, b"").unwrap();
    writer.write_list::<&[u8]>(1, &[]).unwrap();
    let bytes = writer.finish().unwrap();
    let reader = IndexEntryReader::new(&bytes).unwrap();

    assert_eq!(reader.read(0).unwrap(), Some(&b""[..]));
    assert_eq!(reader.field_type(1).unwrap(), IndexEntryFieldType::LIST);
    assert_eq!(reader.read(1).unwrap(), None);
    assert_eq!(reader.read_many(1).unwrap().count(), 0);
    assert_eq!(reader.read(2).unwrap(), None);
}

#[test]
fn test_numeric_narrowing_reports_loss() {
    let known = fields(2);
    let mut writer = IndexEntryWriter::new(&known);
    writer.write_tuple(0, b"big", 1 << 40, 0.0).unwrap();
    writer.write(1, b"plain").unwrap();
    let bytes = writer.finish().unwrap();
    let reader = IndexEntryReader::new(&bytes).unwrap();

    assert_eq!(reader.read_numeric::<i32>(0).unwrap(), Some((0, false)));
    assert_eq!(reader.try_read_numeric::<i32>(0).unwrap(), None);
    assert_eq!(reader.try_read_numeric::<i64>(0).unwrap(), Some(1 << 40));
    // Untyped values carry no numeric part.
    assert_eq!(reader.read_numeric::<i64>(1).unwrap(), None);
}

#[test]
fn test_scalar_fields_hold_a_single_element() {
    let known = fields(2);
    let mut writer = IndexEntryWriter::new(&known);
    writer.write(0, b"plain").unwrap();
    writer.write_tuple(1, b"tenth", 3, 0.1).unwrap();
    let bytes = writer.finish().unwrap();
    let reader = IndexEntryReader::new(&bytes).unwrap();

    assert_eq!(reader.read_element(0, 0).unwrap(), Some(&b"plain"[..]));
    assert_eq!(reader.read_element(0, 7).unwrap(), None);
    assert_eq!(reader.read_element(1, 0).unwrap(), Some(&b"tenth"[..]));
    assert_eq!(reader.read_element(1, 1).unwrap(), None);

    // 0.1 has no exact f32 form.
    assert_eq!(reader.read_numeric::<f32>(1).unwrap(), Some((0.1f32, false)));
    assert_eq!(reader.try_read_numeric::<f32>(1).unwrap(), None);
    assert_eq!(reader.try_read_numeric::<f64>(1).unwrap(), Some(0.1));
}

#[test]
fn test_numeric_read_of_plain_list_is_not_supported() {
    let known = fields(1);
    let mut writer = IndexEntryWriter::new(&known);
    writer.write_list(0, &[b"a", b"b"]).unwrap();
    let bytes = writer.finish().unwrap();
    let reader = IndexEntryReader::new(&bytes).unwrap();
    assert!(reader.read_numeric::<i64>(0).unwrap_err().is_not_supported());
}

#[test]
fn test_writer_rejects_misuse() {
    let known = fields(2);
    let mut writer = IndexEntryWriter::new(&known);
    writer.write(0, b"once").unwrap();
    assert!(writer.write(0, b"twice").is_err());
    assert!(writer.write(5, b"unknown id").is_err());
    assert!(writer.write_tuple_list(1, &[b"a"], &[1, 2], &[0.0]).is_err());

    let bytes = writer.finish().unwrap();
    let reader = IndexEntryReader::new(&bytes).unwrap();
    assert_eq!(reader.read(0).unwrap(), Some(&b"once"[..]));
    assert!(reader.field_type(1).unwrap().is_absent());
}

#[test]
fn test_dynamic_fields_are_rejected() {
    let known = KnownFields::from_names(["Name"]).unwrap();
    let mut writer = IndexEntryWriter::new(&known);
    writer.write_by_name("Name", b"oren").unwrap();

    let err = writer.write_by_name("Extra", b"x").unwrap_err();
    assert!(err.is_not_supported());
    for _ in 1..crate::writer::MAX_DYNAMIC_FIELDS {
        assert!(writer.write_tuple_by_name("Extra", b"x", 1, 1.0).unwrap_err().is_not_supported());
    }
    assert!(writer.write_by_name("Extra", b"x").unwrap_err().is_capacity_exceeded());

    // The rejected writes leave the entry intact.
    let bytes = writer.finish().unwrap();
    let reader = IndexEntryReader::new(&bytes).unwrap();
    assert_eq!(reader.read(0).unwrap(), Some(&b"oren"[..]));
}

#[test]
fn test_reader_rejects_corrupt_buffers() {
    let known = fields(1);
    let mut writer = IndexEntryWriter::new(&known);
    writer.write(0, b"value").unwrap();
    let bytes = writer.finish().unwrap();

    assert!(IndexEntryReader::new(&bytes[..bytes.len() - 1]).unwrap_err().is_invalid_format());
    assert!(IndexEntryReader::new(&bytes[..5]).unwrap_err().is_invalid_format());

    let mut lying = bytes.clone();
    // Claim a 100-byte value inside a much shorter entry.
    lying[10] = 100;
    let reader = IndexEntryReader::new(&lying).unwrap();
    assert!(reader.read(0).unwrap_err().is_invalid_format());
}

#[test]
fn test_debug_dump() {
    let known = KnownFields::from_names(["Name", "Tags", "Age", "Missing"]).unwrap();
    let mut writer = IndexEntryWriter::new(&known);
    writer.write(0, b"Oren").unwrap();
    writer.write_list(1, &[b"a", b"b"]).unwrap();
    writer.write_tuple(2, b"42", 42, 42.0).unwrap();
    let bytes = writer.finish().unwrap();
    let reader = IndexEntryReader::new(&bytes).unwrap();

    let dump = reader.debug_dump(&known).unwrap();
    assert_eq!(dump, "Name: Oren\nTags: a,b\nAge: 42 (42, 42)\nMissing: null\n");
}

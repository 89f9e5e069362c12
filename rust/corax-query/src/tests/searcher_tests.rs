use std::ops::Bound;

use corax_index_entry::{IndexEntryWriter, KnownFields};
use corax_storage::{
    container::MemoryContainerStore,
    fixed_size_tree::MemoryFixedSizeTree,
    key_dictionary::DictionaryRegistry,
    lookup::{Int64LookupKey, MemoryLookup},
    postings::MemoryPostingStore,
};

use crate::{
    IndexSearcher, QueryConfig,
    match_protocol::{QueryMatch, drain},
    sorting::comparers::{DescendingMatchComparer, MatchCompareFieldType},
    terms_reader::TermsReader,
};

const AGE: usize = 0;

struct Index {
    postings: MemoryPostingStore,
    entries: MemoryContainerStore,
    ages: MemoryFixedSizeTree,
    age_lookup: MemoryLookup<Int64LookupKey>,
}

/// Entries 1 to 40; entry `i` is `i` years old and tagged `even` or `odd`.
fn index() -> Index {
    let known = KnownFields::from_names(["Age"]).unwrap();
    let mut postings = MemoryPostingStore::new();
    let mut entries = MemoryContainerStore::new();
    let mut ages = MemoryFixedSizeTree::new(8);
    let mut age_lookup = MemoryLookup::new();
    for id in 1..=40u64 {
        let mut writer = IndexEntryWriter::new(&known);
        let age = id as i64;
        writer
            .write_tuple(AGE, age.to_string().as_bytes(), age, age as f64)
            .unwrap();
        entries.insert(id, &writer.finish().unwrap(), 0);
        ages.insert_i64(id, age).unwrap();
        let term_id = postings.add_postings(&[id]).unwrap();
        age_lookup.insert(Int64LookupKey(age), term_id);
    }
    let even: Vec<u64> = (1..=40).filter(|i| i % 2 == 0).collect();
    let odd: Vec<u64> = (1..=40).filter(|i| i % 2 == 1).collect();
    postings.add_term("Tag", b"even", &even).unwrap();
    postings.add_term("Tag", b"odd", &odd).unwrap();
    Index {
        postings,
        entries,
        ages,
        age_lookup,
    }
}

#[test]
fn test_query_tree() {
    let index = index();
    let searcher =
        IndexSearcher::new(&index.postings, &index.entries, 40, QueryConfig::default()).unwrap();

    let mut missing = searcher.term_query("Tag", b"none").unwrap();
    assert_eq!(drain(&mut missing, 4).unwrap(), Vec::<u64>::new());

    // Even entries older than 30, youngest last.
    let even = searcher.term_query("Tag", b"even").unwrap();
    let older = searcher.greater_than(even, AGE, 30i64);
    let dictionaries = DictionaryRegistry::new();
    let reader = TermsReader::new(&index.ages, &index.entries, &dictionaries);
    let comparer = DescendingMatchComparer::new(MatchCompareFieldType::Integer);
    let mut sorted = searcher.order_by(older, reader, comparer, Some(3));
    assert_eq!(drain(&mut sorted, 2).unwrap(), vec![40, 38, 36]);

    let range = searcher.between_query(
        "Age",
        index.age_lookup.iterate(true),
        Bound::Included(Int64LookupKey(10)),
        Bound::Excluded(Int64LookupKey(15)),
    );
    let shared = searcher.memoize(range);
    let mut odd = searcher.term_query("Tag", b"odd").unwrap();
    let mut buffer = drain(&mut shared.replay(), 3).unwrap();
    assert_eq!(buffer, vec![10, 11, 12, 13, 14]);
    let len = buffer.len();
    let n = odd.and_with(&mut buffer, len).unwrap();
    assert_eq!(&buffer[..n], &[11, 13]);

    let in_terms = searcher.in_query("Tag", vec![b"odd".to_vec(), b"even".to_vec()]);
    let mut young = searcher.less_than_or_equal(in_terms, AGE, 3.0f64);
    assert_eq!(drain(&mut young, 8).unwrap(), vec![1, 2, 3]);
    assert!(young.inspect().to_string().contains("MultiTermMatch"));

    // Odd entries up to 5, or even entries from 36 on.
    let odd = searcher.term_query("Tag", b"odd").unwrap();
    let tagged = searcher.in_query("Tag", vec![b"odd".to_vec(), b"even".to_vec()]);
    let young_odd = searcher.and_query(odd, searcher.less_than_or_equal(tagged, AGE, 5i64));
    let even = searcher.term_query("Tag", b"even").unwrap();
    let old_even = searcher.greater_than_or_equal(even, AGE, 36i64);
    let mut either = searcher.or_query(young_odd, old_even);
    assert_eq!(drain(&mut either, 4).unwrap(), vec![1, 3, 5, 36, 38, 40]);
}

#[test]
fn test_invalid_config_is_rejected() {
    let index = index();
    let config = QueryConfig {
        and_block_size: 2,
        ..QueryConfig::default()
    };
    let err = IndexSearcher::new(&index.postings, &index.entries, 40, config)
        .err()
        .unwrap();
    assert!(err.to_string().contains("and_block_size"));
}

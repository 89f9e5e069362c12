use std::ops::Bound;

use corax_storage::{
    lookup::{DoubleLookupKey, Int64LookupKey, MemoryLookup},
    postings::MemoryPostingStore,
};
use corax_testkit::{data_gen, reference};

use crate::{
    config::QueryConfig,
    match_protocol::{Confidence, QueryMatch, drain},
    term_provider::{InTermProvider, TermNumericRangeProvider, TermProvider},
};

#[test]
fn test_in_terms_union() {
    fastrand::seed(8080);
    let config = QueryConfig::default();
    for _ in 0..30 {
        let mut store = MemoryPostingStore::new();
        let mut sets = Vec::new();
        let mut terms = Vec::new();
        for t in 0..fastrand::usize(1..6) {
            // Mixes single ids, small sets and posting lists.
            let ids = match fastrand::u8(0..3) {
                0 => vec![fastrand::u64(0..5_000)],
                1 => data_gen::sorted_ids(fastrand::usize(2..60), 0, 5_000),
                _ => data_gen::sorted_ids(fastrand::usize(65..900), 0, 5_000),
            };
            let term = format!("t{t}").into_bytes();
            store.add_term("Tag", &term, &ids).unwrap();
            terms.push(term);
            sets.push(ids);
        }
        terms.push(b"missing".to_vec());
        let expected = reference::union_all(sets.iter().map(|s| s.as_slice()));

        let provider = InTermProvider::new(&store, "Tag", terms.clone(), 5_000, &config);
        let mut m = crate::multi_term::MultiTermMatch::new(provider, &config);
        assert_eq!(m.confidence(), Confidence::Low);
        assert_eq!(drain(&mut m, 64).unwrap(), expected);
        assert_eq!(m.count(), expected.len() as u64);
        assert_eq!(m.confidence(), Confidence::High);

        let candidates = data_gen::sorted_ids(300, 0, 5_000);
        let provider = InTermProvider::new(&store, "Tag", terms, 5_000, &config);
        let mut m = crate::multi_term::MultiTermMatch::new(provider, &config)
            .with_estimate(10, Confidence::Normal);
        let mut buffer = candidates.clone();
        let n = m.and_with(&mut buffer, candidates.len()).unwrap();
        assert_eq!(&buffer[..n], reference::intersect(&candidates, &expected).as_slice());
    }
}

#[test]
fn test_and_with_upgrades_estimate() {
    let config = QueryConfig::default();
    let mut store = MemoryPostingStore::new();
    store.add_term("Tag", b"a", &[1, 3, 5]).unwrap();
    store.add_term("Tag", b"b", &[3, 4]).unwrap();

    let terms = vec![b"a".to_vec(), b"b".to_vec()];
    let provider = InTermProvider::new(&store, "Tag", terms, 10, &config);
    let mut m = crate::multi_term::MultiTermMatch::new(provider, &config)
        .with_estimate(2, Confidence::Low);
    let mut buffer = [2, 3, 4, 6];
    let n = m.and_with(&mut buffer, 4).unwrap();
    assert_eq!(&buffer[..n], &[3, 4]);
    // Entry 3 sits in both terms: the summed count exceeds the union {1, 3, 4, 5}.
    assert_eq!(m.count(), 5);
    assert_eq!(m.confidence(), Confidence::High);

    let mut buffer = [0u64; 8];
    let n = m.fill(&mut buffer).unwrap();
    assert_eq!(&buffer[..n], &[1, 3, 4, 5]);
    assert_eq!(m.count(), 4);
}

struct RangeFixture {
    store: MemoryPostingStore,
    longs: MemoryLookup<Int64LookupKey>,
    doubles: MemoryLookup<DoubleLookupKey>,
}

/// Entry `10 + k` holds the numeric value `k` for k in -5..=5.
fn range_fixture() -> RangeFixture {
    let mut store = MemoryPostingStore::new();
    let mut longs = MemoryLookup::new();
    let mut doubles = MemoryLookup::new();
    for k in -5i64..=5 {
        let term_id = store.add_postings(&[(10 + k) as u64]).unwrap();
        longs.insert(Int64LookupKey(k), term_id);
        doubles.insert(DoubleLookupKey(k as f64 / 2.0), term_id);
    }
    RangeFixture {
        store,
        longs,
        doubles,
    }
}

fn long_range(fixture: &RangeFixture, low: Bound<i64>, high: Bound<i64>, forward: bool) -> Vec<u64> {
    let config = QueryConfig::default();
    let provider = TermNumericRangeProvider::new(
        &fixture.store,
        "Age",
        fixture.longs.iterate(forward),
        low.map(Int64LookupKey),
        high.map(Int64LookupKey),
        100,
        &config,
    );
    let mut m = crate::multi_term::MultiTermMatch::new(provider, &config);
    drain(&mut m, 3).unwrap()
}

#[test]
fn test_numeric_range_bounds() {
    use Bound::*;
    let fixture = range_fixture();
    for forward in [true, false] {
        assert_eq!(long_range(&fixture, Included(-1), Included(2), forward), vec![9, 10, 11, 12]);
        assert_eq!(long_range(&fixture, Excluded(-1), Excluded(2), forward), vec![10, 11]);
        assert_eq!(long_range(&fixture, Unbounded, Excluded(-3), forward), vec![5, 6]);
        assert_eq!(long_range(&fixture, Included(4), Unbounded, forward), vec![14, 15]);
        assert_eq!(long_range(&fixture, Unbounded, Unbounded, forward).len(), 11);
        assert_eq!(long_range(&fixture, Included(3), Included(1), forward), Vec::<u64>::new());
        assert_eq!(long_range(&fixture, Excluded(2), Excluded(2), forward), Vec::<u64>::new());
        assert_eq!(
            long_range(&fixture, Included(i64::MIN), Included(i64::MAX), forward).len(),
            11
        );
        assert_eq!(long_range(&fixture, Included(7), Included(9), forward), Vec::<u64>::new());
    }
}

#[test]
fn test_double_range_and_reset() {
    let fixture = range_fixture();
    let config = QueryConfig::default();
    let mut provider = TermNumericRangeProvider::new(
        &fixture.store,
        "Score",
        fixture.doubles.iterate(false),
        Bound::Excluded(DoubleLookupKey(-0.0)),
        Bound::Included(DoubleLookupKey(1.0)),
        100,
        &config,
    );
    let mut seen = Vec::new();
    while let Some(mut term) = provider.next().unwrap() {
        seen.extend(drain(&mut term, 4).unwrap());
    }
    // Walks backward from 1.0 and stops at zero, which equals -0.0.
    assert_eq!(seen, vec![12, 11]);

    provider.reset().unwrap();
    assert!(provider.next().unwrap().is_some());

    let node = provider.inspect();
    assert!(node.parameters.contains(&("Low".to_string(), "(-0)".to_string())));
    assert!(node.parameters.contains(&("High".to_string(), "[1]".to_string())));
}

use corax_encodings::{frequency, varint};
use corax_storage::postings::{MemoryPostingStore, PostingStore};
use corax_testkit::{data_gen, reference};

use crate::{
    config::QueryConfig,
    match_protocol::{Confidence, QueryMatch, drain},
    scoring::Bm25,
    term_match::TermMatch,
};

fn term<'a>(store: &'a MemoryPostingStore, term: &[u8], config: &QueryConfig) -> TermMatch<'a> {
    let term_id = store.term_id("Name", term).unwrap();
    TermMatch::from_postings(store.postings(term_id).unwrap(), 1000, config).unwrap()
}

fn blob(values: &[i64]) -> Vec<u8> {
    let mut blob = Vec::new();
    varint::push(&mut blob, values.len() as i64);
    let mut previous = 0;
    for &value in values {
        varint::push(&mut blob, value - previous);
        previous = value;
    }
    blob
}

#[test]
fn test_unordered_small_set_is_normalized() {
    let mut store = MemoryPostingStore::new();
    store.add_small_set_blob("Name", b"dup", &blob(&[5, 5, 2, 9]), 4);
    let config = QueryConfig::default();

    let mut m = term(&store, b"dup", &config);
    assert_eq!(m.count(), 3);
    assert_eq!(drain(&mut m, 2).unwrap(), vec![2, 5, 9]);
    assert_eq!(m.fill(&mut [0; 4]).unwrap(), 0);
}

#[test]
fn test_small_set_and_with() {
    let mut store = MemoryPostingStore::new();
    store.add_term("Name", b"odd", &[1, 4, 7, 10]).unwrap();
    let config = QueryConfig::default();

    let mut m = term(&store, b"odd", &config);
    let mut buffer = [2, 4, 6, 7, 11];
    let n = m.and_with(&mut buffer, 5).unwrap();
    assert_eq!(&buffer[..n], &[4, 7]);

    // Every intersection starts from the first value again.
    let mut buffer = [1, 10];
    let n = m.and_with(&mut buffer, 2).unwrap();
    assert_eq!(&buffer[..n], &[1, 10]);
}

#[test]
fn test_malformed_small_sets() {
    let config = QueryConfig::default();
    let mut store = MemoryPostingStore::new();
    store.add_small_set_blob("Name", b"short", &blob(&[1, 2, 3]), 5);
    let mut trailing = blob(&[1, 2]);
    trailing.push(0);
    store.add_small_set_blob("Name", b"trailing", &trailing, 2);

    for name in [&b"short"[..], b"trailing"] {
        let term_id = store.term_id("Name", name).unwrap();
        let err = TermMatch::from_postings(store.postings(term_id).unwrap(), 10, &config).unwrap_err();
        assert!(err.is_invalid_format(), "{err}");
    }
}

#[test]
fn test_once_and_empty() {
    let mut once = TermMatch::once(7);
    assert_eq!(once.confidence(), Confidence::High);
    let mut buffer = [3, 7, 9];
    assert_eq!(once.and_with(&mut buffer, 3).unwrap(), 1);
    assert_eq!(buffer[0], 7);
    let mut buffer = [3, 8];
    assert_eq!(once.and_with(&mut buffer, 2).unwrap(), 0);
    assert_eq!(drain(&mut once, 8).unwrap(), vec![7]);

    let mut empty = TermMatch::empty();
    assert_eq!(empty.count(), 0);
    assert_eq!(empty.fill(&mut [0; 4]).unwrap(), 0);
    assert_eq!(empty.and_with(&mut [1, 2], 2).unwrap(), 0);
}

#[test]
fn test_set_paths_agree() {
    fastrand::seed(2027);
    for round in 0..60 {
        let ids = data_gen::dense_ids(fastrand::usize(65..3000), fastrand::u64(0..100), 6);
        let mut store = MemoryPostingStore::new();
        store.add_term("Name", b"big", &ids).unwrap();

        let candidates = data_gen::sorted_ids(fastrand::usize(1..400), 0, ids[ids.len() - 1] + 500);
        let expected = reference::intersect(&candidates, &ids);

        let scalar = QueryConfig {
            vectorized: false,
            ..QueryConfig::default()
        };
        let vectorized = QueryConfig {
            and_block_size: if round % 2 == 0 { 16 } else { 4096 },
            ..QueryConfig::default()
        };
        for config in [&scalar, &vectorized] {
            config.validate().unwrap();
            let mut m = term(&store, b"big", config);
            let mut buffer = candidates.clone();
            let n = m.and_with(&mut buffer, candidates.len()).unwrap();
            assert_eq!(&buffer[..n], expected.as_slice(), "vectorized: {}", config.vectorized);
        }

        let mut m = term(&store, b"big", &scalar);
        assert_eq!(drain(&mut m, 100).unwrap(), ids);
    }
}

#[test]
fn test_frequencies_are_stripped_and_scored() {
    let config = QueryConfig::default();
    let mut store = MemoryPostingStore::new();
    store
        .add_term_with_frequencies("Name", b"fox", &[(3, 1), (9, 4), (20, 2)])
        .unwrap();

    let mut m = term(&store, b"fox", &config);
    assert_eq!(drain(&mut m, 2).unwrap(), vec![3, 9, 20]);
    let mut scores = [0.0f32; 3];
    m.score(&[3, 9, 20], &mut scores).unwrap();
    assert!(scores.iter().all(|&s| s > 0.0));
    assert!(scores[1] > scores[2] && scores[2] > scores[0]);

    // Candidates that miss are rolled back out of the scorer.
    let mut m = term(&store, b"fox", &config);
    let mut buffer = [1, 9, 21];
    let n = m.and_with(&mut buffer, 3).unwrap();
    assert_eq!(&buffer[..n], &[9]);
    let mut scores = [0.0f32; 2];
    m.score(&[3, 9], &mut scores).unwrap();
    assert_eq!(scores[0], 0.0);
    assert!(scores[1] > 0.0);
}

#[test]
fn test_large_frequency_set_and_with() {
    fastrand::seed(515);
    let ids = data_gen::sorted_ids(500, 0, 10_000);
    let entries: Vec<(u64, u16)> = ids.iter().map(|&id| (id, fastrand::u16(1..300))).collect();
    let mut store = MemoryPostingStore::new();
    store.add_term_with_frequencies("Name", b"common", &entries).unwrap();

    let candidates = data_gen::sample_ids(&ids, 0.3);
    let config = QueryConfig::default();
    let mut m = term(&store, b"common", &config);
    let mut buffer = candidates.clone();
    let n = m.and_with(&mut buffer, candidates.len()).unwrap();
    assert_eq!(&buffer[..n], candidates.as_slice());
}

fn set_configs() -> [QueryConfig; 3] {
    [
        QueryConfig {
            vectorized: false,
            ..QueryConfig::default()
        },
        QueryConfig::default(),
        QueryConfig {
            and_block_size: 16,
            ..QueryConfig::default()
        },
    ]
}

#[test]
fn test_set_intersection_scores_only_matched_entries() {
    let entries: Vec<(u64, u16)> = (1..=200)
        .map(|id| (id, if id % 2 == 0 { 250 } else { 1 }))
        .collect();
    let mut store = MemoryPostingStore::new();
    store.add_term_with_frequencies("Name", b"fox", &entries).unwrap();

    let mut alone = Bm25::new(1000, 200);
    alone.add(frequency::add_frequency(50, 250));
    let mut expected = [0.0f32];
    alone.score(&[50], &mut expected).unwrap();

    for config in &set_configs() {
        let mut m = term(&store, b"fox", config);
        assert_eq!(m.inspect().name, "TermMatch [Set]");
        let mut buffer = [50];
        assert_eq!(m.and_with(&mut buffer, 1).unwrap(), 1);
        assert_eq!(buffer[0], 50);

        let mut scores = [0.0f32; 3];
        m.score(&[49, 50, 51], &mut scores).unwrap();
        assert_eq!(scores, [0.0, expected[0], 0.0], "vectorized: {}", config.vectorized);
    }
}

#[test]
fn test_set_scores_agree_across_paths() {
    fastrand::seed(4242);
    let ids = data_gen::sorted_ids(800, 0, 20_000);
    let entries: Vec<(u64, u16)> = ids.iter().map(|&id| (id, fastrand::u16(1..=255))).collect();
    let mut store = MemoryPostingStore::new();
    store.add_term_with_frequencies("Name", b"fox", &entries).unwrap();

    let candidates = reference::union(
        &data_gen::sample_ids(&ids, 0.2),
        &data_gen::sorted_ids(100, 0, 20_000),
    );
    let expected = reference::intersect(&candidates, &ids);

    let mut all_scores = Vec::new();
    for config in &set_configs() {
        let mut m = term(&store, b"fox", config);
        let mut buffer = candidates.clone();
        let n = m.and_with(&mut buffer, candidates.len()).unwrap();
        assert_eq!(&buffer[..n], expected.as_slice());

        let mut scores = vec![0.0f32; ids.len()];
        m.score(&ids, &mut scores).unwrap();
        for (id, score) in ids.iter().zip(&scores) {
            assert_eq!(*score > 0.0, expected.binary_search(id).is_ok(), "entry {id}");
        }
        all_scores.push(scores);
    }
    assert_eq!(all_scores[0], all_scores[1]);
    assert_eq!(all_scores[0], all_scores[2]);
}

#[test]
fn test_inspect() {
    let mut store = MemoryPostingStore::new();
    store.add_term("Name", b"odd", &[1, 4, 7, 10]).unwrap();
    let config = QueryConfig::default();
    let node = term(&store, b"odd", &config).inspect();
    assert_eq!(node.name, "TermMatch [SmallSet]");
    assert!(
        node.parameters
            .iter()
            .any(|(k, v)| k == "Count" && v == "4 [High]")
    );
}

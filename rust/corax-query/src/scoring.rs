//! BM25 relevance for a single term.

use ahash::AHashMap;
use corax_common::{Result, verify_arg};
use corax_encodings::frequency;

pub const DEFAULT_K1: f32 = 1.2;
pub const DEFAULT_B: f32 = 0.75;

/// Collects the term frequencies of the entries a term match produces and turns
/// them into BM25 scores.
///
/// Entry lengths are not stored with postings; the frequency of the term in an
/// entry relative to its average over the collected entries stands in for the
/// length ratio.
#[derive(Debug, Clone)]
pub struct Bm25 {
    k1: f32,
    b: f32,
    idf: f32,
    frequencies: AHashMap<u64, u16>,
    frequency_total: u64,
    last_added: Option<(u64, u16)>,
}

impl Bm25 {
    /// `term_count` entries contain the term out of `total_entries`.
    pub fn new(total_entries: u64, term_count: u64) -> Bm25 {
        Bm25::with_parameters(total_entries, term_count, DEFAULT_K1, DEFAULT_B)
    }

    pub fn with_parameters(total_entries: u64, term_count: u64, k1: f32, b: f32) -> Bm25 {
        let n = term_count as f64;
        let total = (total_entries as f64).max(n);
        let idf = (1.0 + (total - n + 0.5) / (n + 0.5)).ln() as f32;
        Bm25 {
            k1,
            b,
            idf,
            frequencies: AHashMap::new(),
            frequency_total: 0,
            last_added: None,
        }
    }

    pub fn idf(&self) -> f32 {
        self.idf
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Records a folded posting and returns its entry id.
    pub fn add(&mut self, folded: u64) -> u64 {
        let (id, freq) = frequency::split_frequency(folded);
        let freq = freq.max(1);
        if let Some(previous) = self.frequencies.insert(id, freq) {
            self.frequency_total -= previous as u64;
        }
        self.frequency_total += freq as u64;
        self.last_added = Some((id, freq));
        id
    }

    /// Forgets the posting recorded by the last [`Bm25::add`].
    pub fn remove(&mut self) {
        if let Some((id, freq)) = self.last_added.take() {
            if self.frequencies.remove(&id).is_some() {
                self.frequency_total -= freq as u64;
            }
        }
    }

    /// Records every folded posting of `matches` and strips the frequencies in place.
    pub fn process(&mut self, matches: &mut [u64]) {
        for value in matches {
            *value = self.add(*value);
        }
    }

    /// Adds the score of every recorded entry in `matches` to `scores`.
    pub fn score(&self, matches: &[u64], scores: &mut [f32]) -> Result<()> {
        verify_arg!(scores, scores.len() >= matches.len());
        if self.frequencies.is_empty() {
            return Ok(());
        }
        let average = self.frequency_total as f32 / self.frequencies.len() as f32;
        for (id, score) in matches.iter().zip(scores.iter_mut()) {
            if let Some(&freq) = self.frequencies.get(id) {
                let tf = freq as f32;
                let norm = self.k1 * (1.0 - self.b + self.b * tf / average);
                *score += self.idf * tf * (self.k1 + 1.0) / (tf + norm);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_and_score() {
        let mut bm25 = Bm25::new(1000, 3);
        assert_eq!(bm25.add(frequency::add_frequency(7, 3)), 7);
        assert_eq!(bm25.add(frequency::add_frequency(9, 1)), 9);
        bm25.remove();
        assert_eq!(bm25.len(), 1);

        let mut values = [frequency::add_frequency(12, 5), frequency::add_frequency(15, 1)];
        bm25.process(&mut values);
        assert_eq!(values, [12, 15]);

        let mut scores = [0.0f32; 4];
        bm25.score(&[7, 9, 12, 15], &mut scores).unwrap();
        assert!(scores[0] > 0.0);
        assert_eq!(scores[1], 0.0);
        assert!(scores[2] > scores[3]);
        assert!(bm25.score(&[7, 9], &mut [0.0]).is_err());
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        assert!(Bm25::new(1000, 2).idf() > Bm25::new(1000, 500).idf());
        assert!(Bm25::new(10, 10).idf() > 0.0);
    }
}

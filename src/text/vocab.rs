//! Vocabulary selection and term-count vectors.
//!
//! The vocabulary is the `max_features` most frequent terms over the whole
//! corpus (total occurrences, not document frequency). Equal counts keep the
//! order in which terms were first seen while scanning descriptors in item
//! order, so the same corpus always yields the same column layout.

use super::stem::{Stemmer, SuffixStemmer};
use super::stopwords::StopWords;
use std::collections::HashMap;

/// Default vocabulary bound.
pub const DEFAULT_MAX_FEATURES: usize = 5000;

/// Whitespace tokenizer with stemming and stop word removal.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    stemmer: SuffixStemmer,
    stop_words: StopWords,
}

impl Tokenizer {
    pub fn new(stop_words: StopWords) -> Self {
        Self {
            stemmer: SuffixStemmer::new(),
            stop_words,
        }
    }

    /// Normalized terms of `text`, in order, duplicates kept.
    ///
    /// Tokens are split on whitespace, trimmed of leading and trailing
    /// punctuation, lowercased and stemmed. Stems in the stop list are dropped.
    pub fn terms<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        text.split_whitespace()
            .map(|raw| raw.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|tok| !tok.is_empty())
            .map(|tok| self.stemmer.stem(tok))
            .filter(|term| !self.stop_words.contains(term))
    }
}

/// Ordered, bounded term set. Column `i` of every [`TermVector`] is `terms()[i]`.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    terms: Vec<String>,
    lookup: HashMap<String, u32>,
    tokenizer: Tokenizer,
}

impl Vocabulary {
    /// Select at most `max_features` terms from `descriptors`.
    pub fn build<S: AsRef<str>>(descriptors: &[S], max_features: usize, tokenizer: Tokenizer) -> Self {
        // slot per term in first-seen order
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut counts: Vec<(String, u64)> = Vec::new();

        for doc in descriptors {
            for term in tokenizer.terms(doc.as_ref()) {
                match slots.get(&term) {
                    Some(&slot) => counts[slot].1 += 1,
                    None => {
                        slots.insert(term.clone(), counts.len());
                        counts.push((term, 1));
                    }
                }
            }
        }

        // stable: equal counts stay in first-seen order
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(max_features);

        let terms: Vec<String> = counts.into_iter().map(|(t, _)| t).collect();
        let lookup = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();

        Self {
            terms,
            lookup,
            tokenizer,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Column of `term`, if selected.
    #[must_use]
    pub fn get(&self, term: &str) -> Option<u32> {
        self.lookup.get(term).copied()
    }

    /// Terms in column order.
    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Count vocabulary terms in `descriptor`. Unknown terms are ignored.
    #[must_use]
    pub fn vectorize(&self, descriptor: &str) -> TermVector {
        let mut cols: Vec<u32> = self
            .tokenizer
            .terms(descriptor)
            .filter_map(|t| self.get(&t))
            .collect();
        cols.sort_unstable();

        let mut indices = Vec::new();
        let mut counts: Vec<f32> = Vec::new();
        for col in cols {
            if indices.last() == Some(&col) {
                if let Some(c) = counts.last_mut() {
                    *c += 1.0;
                }
            } else {
                indices.push(col);
                counts.push(1.0);
            }
        }

        TermVector {
            dim: self.terms.len(),
            indices,
            counts,
        }
    }
}

/// Build a vocabulary with the default English tokenizer.
pub fn build_vocabulary<S: AsRef<str>>(descriptors: &[S], max_features: usize) -> Vocabulary {
    Vocabulary::build(descriptors, max_features, Tokenizer::default())
}

/// Count vector of `descriptor` over `vocabulary`.
pub fn vectorize(descriptor: &str, vocabulary: &Vocabulary) -> TermVector {
    vocabulary.vectorize(descriptor)
}

/// Raw term counts over a vocabulary, stored sparsely.
///
/// Logically a dense vector of length [`TermVector::dim`]; only non-zero
/// columns are kept, with `indices` strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct TermVector {
    dim: usize,
    indices: Vec<u32>,
    counts: Vec<f32>,
}

impl TermVector {
    /// Build from a dense slice.
    pub fn from_dense(dense: &[f32]) -> Self {
        let (indices, counts) = dense
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != 0.0)
            .map(|(i, &c)| (i as u32, c))
            .unzip();
        Self {
            dim: dense.len(),
            indices,
            counts,
        }
    }

    /// Vocabulary size this vector is defined over.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of non-zero columns.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[must_use]
    pub fn counts(&self) -> &[f32] {
        &self.counts
    }

    /// Count at column `col` (0 when absent or out of range).
    #[must_use]
    pub fn get(&self, col: u32) -> f32 {
        self.indices
            .binary_search(&col)
            .map(|pos| self.counts[pos])
            .unwrap_or(0.0)
    }

    /// Euclidean norm.
    #[must_use]
    pub fn norm(&self) -> f32 {
        crate::simd::norm(&self.counts)
    }

    /// `true` when no vocabulary term occurred.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    #[must_use]
    pub fn to_dense(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.dim];
        for (&i, &c) in self.indices.iter().zip(&self.counts) {
            out[i as usize] = c;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_are_stemmed_and_filtered() {
        let tok = Tokenizer::default();
        let terms: Vec<String> = tok.terms("The Spies, loved a HEIST!").collect();
        assert_eq!(terms, vec!["spi", "lov", "heist"]);
    }

    #[test]
    fn vocabulary_orders_by_frequency_then_first_seen() {
        let docs = ["zebra apple", "apple mango zebra", "mango kiwi apple"];
        let vocab = build_vocabulary(&docs, 10);
        // apple=3, zebra=2, mango=2 (zebra seen first), kiwi=1
        assert_eq!(vocab.terms(), &["apple", "zebra", "mango", "kiwi"]);
    }

    #[test]
    fn vocabulary_is_bounded() {
        let docs = ["alpha beta gamma delta", "alpha beta", "alpha"];
        let vocab = build_vocabulary(&docs, 2);
        assert_eq!(vocab.terms(), &["alpha", "beta"]);
        assert_eq!(vocab.get("gamma"), None);
    }

    #[test]
    fn vectorize_counts_known_terms() {
        let docs = ["space war space", "robot war"];
        let vocab = build_vocabulary(&docs, 10);
        let v = vectorize("space space robot unknown", &vocab);
        assert_eq!(v.dim(), vocab.len());
        assert_eq!(v.get(vocab.get("space").unwrap()), 2.0);
        assert_eq!(v.get(vocab.get("robot").unwrap()), 1.0);
        assert_eq!(v.get(vocab.get("war").unwrap()), 0.0);
        assert_eq!(v.nnz(), 2);
    }

    #[test]
    fn all_stop_words_gives_zero_vector() {
        let docs = ["the and of", "space"];
        let vocab = build_vocabulary(&docs, 10);
        assert!(vectorize(docs[0], &vocab).is_zero());
    }

    #[test]
    fn dense_roundtrip() {
        let dense = [0.0, 2.0, 0.0, 1.0];
        let v = TermVector::from_dense(&dense);
        assert_eq!(v.indices(), &[1, 3]);
        assert_eq!(v.to_dense(), dense);
    }
}

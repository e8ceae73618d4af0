//! Suffix-stripping stemmer.
//!
//! A deliberately small stemmer: one pass over a priority-ordered suffix list,
//! at most one strip per word. It does not try to produce dictionary roots,
//! only a stable key so that "thrilling", "thrilled" and "thrills" land on the
//! same vocabulary term.
//!
//! ```
//! use kindred::text::stem::{Stemmer, SuffixStemmer};
//!
//! let stemmer = SuffixStemmer::new();
//! assert_eq!(stemmer.stem("Thrilling"), "thrill");
//! assert_eq!(stemmer.stem("bus"), "bus");
//! ```

/// Suffixes tried in order; the first applicable one wins.
pub const SUFFIXES: &[&str] = &["ing", "ly", "ed", "ious", "ies", "ive", "es", "ment", "s"];

/// Characters that must remain after stripping a suffix.
pub const MIN_STEM_CHARS: usize = 3;

/// Reduces a word to a normalized key.
pub trait Stemmer {
    /// Stem a single word. Output is lowercase.
    fn stem(&self, word: &str) -> String;
}

/// Priority-ordered suffix stripper over [`SUFFIXES`].
///
/// A suffix is removed only when the word is longer than the suffix by more
/// than two characters, so at least [`MIN_STEM_CHARS`] characters survive.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixStemmer;

impl SuffixStemmer {
    /// Create a new stemmer.
    pub fn new() -> Self {
        Self
    }
}

impl Stemmer for SuffixStemmer {
    fn stem(&self, word: &str) -> String {
        let word = word.to_lowercase();
        let len = word.chars().count();
        for suffix in SUFFIXES {
            if len > suffix.len() + 2 {
                if let Some(stem) = word.strip_suffix(suffix) {
                    return stem.to_string();
                }
            }
        }
        word
    }
}

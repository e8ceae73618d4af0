//! Descriptor text to term-count vectors.
//!
//! Pipeline per descriptor: whitespace split, edge punctuation trim,
//! lowercase, suffix stem, stop word drop. [`Vocabulary`] fixes the columns
//! once per build; [`TermVector`] holds raw counts over those columns.

pub mod stem;
pub mod stopwords;
pub mod vocab;

pub use stem::{Stemmer, SuffixStemmer};
pub use stopwords::StopWords;
pub use vocab::{build_vocabulary, vectorize, TermVector, Tokenizer, Vocabulary, DEFAULT_MAX_FEATURES};

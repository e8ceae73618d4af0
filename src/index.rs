//! The served index and the batch pipeline that builds it.
//!
//! ```text
//! Catalog ─► Vocabulary ─► TermVector per item ─► SimilarityEngine
//!                                                      │ one row at a time
//!                                                      ▼
//!                                    compact(i, row, K) ─► NeighborList
//! ```
//!
//! An [`Index`] is immutable once constructed: titles plus one ranked
//! [`NeighborList`] per item. Every constructor checks the invariants, so a
//! value of this type is always safe to resolve against.

use crate::catalog::Catalog;
use crate::compact::{compact, NeighborList};
use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::persistence::PersistenceError;
use crate::similarity::SimilarityEngine;
use crate::text::{TermVector, Tokenizer, Vocabulary};
use std::mem::size_of;
use tracing::{debug, info, warn};

/// Titles and per-item neighbor lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    titles: Vec<String>,
    neighbors: Vec<NeighborList>,
    /// Lowercased titles for substring matching; derived, never persisted.
    folded: Vec<String>,
}

impl Index {
    /// Assemble an index, checking every invariant.
    ///
    /// Fails when `titles` and `neighbors` differ in length, a title is
    /// blank, or any list references itself, an index outside `[0, N)`, or is
    /// out of order.
    pub fn new(titles: Vec<String>, neighbors: Vec<NeighborList>) -> Result<Self, PersistenceError> {
        if titles.len() != neighbors.len() {
            return Err(PersistenceError::Invariant(format!(
                "{} titles but {} neighbor lists",
                titles.len(),
                neighbors.len()
            )));
        }
        if let Some(item) = titles.iter().position(|t| t.trim().is_empty()) {
            return Err(PersistenceError::Invariant(format!("item {item}: empty title")));
        }
        let n = titles.len();
        for (item, list) in neighbors.iter().enumerate() {
            list.validate(item, n).map_err(PersistenceError::Invariant)?;
        }
        Ok(Self::from_parts(titles, neighbors))
    }

    fn from_parts(titles: Vec<String>, neighbors: Vec<NeighborList>) -> Self {
        let folded = titles.iter().map(|t| t.to_lowercase()).collect();
        Self {
            titles,
            neighbors,
            folded,
        }
    }

    /// Build from a catalog with default tokenization.
    pub fn build(catalog: &Catalog, config: &BuildConfig) -> Result<Self, BuildError> {
        IndexBuilder::new(config.clone()).build(catalog)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    #[must_use]
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    #[must_use]
    pub fn title(&self, item: usize) -> Option<&str> {
        self.titles.get(item).map(String::as_str)
    }

    /// Ranked neighbors of `item`.
    #[must_use]
    pub fn neighbors(&self, item: usize) -> Option<&NeighborList> {
        self.neighbors.get(item)
    }

    #[must_use]
    pub fn neighbor_lists(&self) -> &[NeighborList] {
        &self.neighbors
    }

    pub(crate) fn folded_titles(&self) -> &[String] {
        &self.folded
    }

    /// Size accounting against the dense alternative.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let entries: usize = self.neighbors.iter().map(NeighborList::len).sum();
        let title_bytes: usize = self.titles.iter().map(String::len).sum();
        IndexStats {
            items: self.len(),
            entries,
            max_neighbors: self.neighbors.iter().map(NeighborList::len).max().unwrap_or(0),
            dense_bytes: self.len() * self.len() * size_of::<f32>(),
            compact_bytes: title_bytes + entries * (size_of::<u32>() + size_of::<u16>()),
        }
    }
}

/// Memory accounting for an [`Index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub items: usize,
    /// Total neighbor entries across all lists.
    pub entries: usize,
    /// Longest neighbor list.
    pub max_neighbors: usize,
    /// Bytes a dense `f32` similarity matrix would take.
    pub dense_bytes: usize,
    /// In-memory payload of titles plus neighbor entries.
    pub compact_bytes: usize,
}

impl IndexStats {
    /// Dense size over compact size. Values > 1 mean savings.
    pub fn compression_ratio(&self) -> f64 {
        if self.compact_bytes == 0 {
            return 0.0;
        }
        self.dense_bytes as f64 / self.compact_bytes as f64
    }
}

/// Offline index construction.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    config: BuildConfig,
    tokenizer: Tokenizer,
}

impl IndexBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            tokenizer: Tokenizer::default(),
        }
    }

    /// Replace the tokenizer (e.g. custom stop words).
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run the whole pipeline. Output is identical with or without `parallel`.
    pub fn build(&self, catalog: &Catalog) -> Result<Index, BuildError> {
        self.config.validate()?;
        if catalog.is_empty() {
            return Err(BuildError::EmptyCorpus);
        }
        check_capacity(catalog.len())?;
        if let Some(record) = catalog.items().iter().position(|it| it.title.trim().is_empty()) {
            return Err(BuildError::MissingField {
                record,
                field: "title".into(),
            });
        }

        let descriptors = catalog.descriptors();
        let vocabulary = Vocabulary::build(
            &descriptors,
            self.config.max_features,
            self.tokenizer.clone(),
        );
        info!(
            items = catalog.len(),
            terms = vocabulary.len(),
            max_features = self.config.max_features,
            "vocabulary built"
        );
        if vocabulary.is_empty() {
            warn!("vocabulary is empty; every similarity will be 0");
        }

        let vectors = self.vectorize_all(&vocabulary, &descriptors);
        let zero = vectors.iter().filter(|v| v.is_zero()).count();
        if zero > 0 {
            debug!(items = zero, "items with no vocabulary terms");
        }

        let engine = SimilarityEngine::new(&vectors);
        drop(vectors);

        let neighbors = self.compact_rows(&engine);
        let index = Index::from_parts(catalog.titles(), neighbors);

        let stats = index.stats();
        info!(
            items = stats.items,
            k = self.config.neighbors,
            entries = stats.entries,
            compact_bytes = stats.compact_bytes,
            dense_bytes = stats.dense_bytes,
            "index built"
        );
        Ok(index)
    }

    fn vectorize_all(&self, vocabulary: &Vocabulary, descriptors: &[&str]) -> Vec<TermVector> {
        #[cfg(feature = "parallel")]
        {
            if self.config.parallel {
                use rayon::prelude::*;
                return descriptors
                    .par_iter()
                    .map(|d| vocabulary.vectorize(d))
                    .collect();
            }
        }
        descriptors.iter().map(|d| vocabulary.vectorize(d)).collect()
    }

    fn compact_rows(&self, engine: &SimilarityEngine) -> Vec<NeighborList> {
        let k = self.config.neighbors;

        #[cfg(feature = "parallel")]
        {
            if self.config.parallel {
                use rayon::prelude::*;
                return (0..engine.len())
                    .into_par_iter()
                    .map_init(Vec::new, |row, i| {
                        engine.row_into(i, row);
                        compact(i, row, k)
                    })
                    .collect();
            }
        }

        let mut row = Vec::new();
        (0..engine.len())
            .map(|i| {
                engine.row_into(i, &mut row);
                compact(i, &row, k)
            })
            .collect()
    }
}

/// Neighbor indices are stored as `u32`.
fn check_capacity(items: usize) -> Result<(), BuildError> {
    if u32::try_from(items).is_err() {
        return Err(BuildError::InvalidConfig(format!(
            "{items} items exceed the index limit of {}",
            u32::MAX
        )));
    }
    Ok(())
}

//! Query resolution against a loaded [`Index`].
//!
//! Everything here reads the index and nothing mutates it, so any number of
//! calls may share one `&Index` (or `Arc<Index>`) across threads.

use crate::error::ResolveError;
use crate::index::Index;
use serde::Serialize;
use tracing::debug;

/// Most recommendations returned for one query.
pub const RECOMMENDATION_LIMIT: usize = 8;

/// A resolved query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    /// The query, trimmed but otherwise as given.
    pub query: String,
    /// Title of the item the query matched.
    pub matched: String,
    /// Neighbor titles, best first. Never padded.
    pub recommendations: Vec<String>,
}

/// Find the first title containing `query` and return its neighbors.
///
/// Matching is a case-insensitive substring test in index order. The first
/// hit wins even when a later title is a closer match: `"matrix"` against
/// `["The Matrix", "Matrix Reloaded"]` resolves to `"The Matrix"`.
///
/// # Errors
///
/// [`ResolveError::EmptyQuery`] when `query` is blank, and
/// [`ResolveError::NotFound`] when no title contains it.
pub fn resolve(query: &str, index: &Index) -> Result<Recommendation, ResolveError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ResolveError::EmptyQuery);
    }
    let needle = query.to_lowercase();

    let Some(item) = index
        .folded_titles()
        .iter()
        .position(|t| t.contains(&needle))
    else {
        debug!(query, "no matching title");
        return Err(ResolveError::NotFound(query.to_string()));
    };

    let recommendations = index
        .neighbors(item)
        .map(|list| {
            list.indices()
                .take(RECOMMENDATION_LIMIT)
                .filter_map(|j| index.title(j))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Recommendation {
        query: query.to_string(),
        matched: index.titles()[item].clone(),
        recommendations,
    })
}

/// All titles in index order, or those containing `filter` (case-insensitive).
///
/// An empty filter lists everything.
pub fn list_titles(index: &Index, filter: Option<&str>) -> Vec<String> {
    let needle = filter.map(str::to_lowercase).unwrap_or_default();
    if needle.is_empty() {
        return index.titles().to_vec();
    }
    index
        .titles()
        .iter()
        .zip(index.folded_titles())
        .filter(|(_, folded)| folded.contains(&needle))
        .map(|(title, _)| title.clone())
        .collect()
}

/// Health summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    #[serde(rename = "model_loaded")]
    pub loaded: bool,
    #[serde(rename = "total_movies")]
    pub count: usize,
}

/// Whether an index is loaded and how many items it holds.
pub fn status(index: Option<&Index>) -> Status {
    Status {
        loaded: index.is_some(),
        count: index.map_or(0, Index::len),
    }
}

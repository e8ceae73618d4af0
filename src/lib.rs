//! kindred: tag-based content similarity with a compact neighbor index.
//!
//! Two halves:
//!
//! - **Offline build**: item descriptors are tokenized and stemmed, counted
//!   into bag-of-words vectors over a bounded vocabulary, compared by cosine
//!   similarity, and each item keeps only its top `K` neighbors.
//! - **Serving**: the resulting [`Index`] is loaded once, shared read-only,
//!   and queried by title substring.
//!
//! ```text
//! catalog ─► text ─► similarity ─► compact ─► index ─► persistence
//!                                                          │
//!                          resolve ◄─ serve (IndexHandle) ◄┘
//! ```
//!
//! # Example
//!
//! ```
//! use kindred::{resolve, BuildConfig, Catalog, Index, Item};
//!
//! let catalog = Catalog::new(vec![
//!     Item::new("The Matrix", "hacker simulation kung fu"),
//!     Item::new("Matrix Reloaded", "hacker simulation machines"),
//!     Item::new("Inception", "dream heist"),
//! ]);
//! let index = Index::build(&catalog, &BuildConfig::default()).unwrap();
//!
//! let rec = resolve("matrix", &index).unwrap();
//! assert_eq!(rec.matched, "The Matrix");
//! assert_eq!(rec.recommendations[0], "Matrix Reloaded");
//! ```
//!
//! # Size
//!
//! The dense similarity matrix of `N` items costs `4 * N^2` bytes; it is never
//! allocated. Rows are computed one at a time from a sparse inverted index and
//! immediately cut to `K` entries of 6 bytes each (u32 index, f16 score).
//! For 5,000 items and `K = 10` that is ~300 KB instead of ~100 MB.
//!
//! # Features
//!
//! - `parallel` (default): build rows on the `rayon` pool. Output is
//!   identical to the sequential build.
//! - `remote` (default): fetch a serialized index over HTTP via `ureq`.

pub mod catalog;
pub mod compact;
pub mod config;
pub mod error;
pub mod index;
pub mod persistence;
pub mod resolve;
pub mod serve;
pub mod similarity;
pub mod simd;
pub mod text;

// Re-exports
pub use catalog::{Catalog, Item};
pub use compact::{compact, Neighbor, NeighborList, QUANTIZATION_EPSILON};
pub use config::{BuildConfig, CatalogConfig, ServeConfig, Settings};
pub use error::{BuildError, LoadError, QueryError, ResolveError, Result};
pub use index::{Index, IndexBuilder, IndexStats};
pub use persistence::{IndexSource, LoaderChain, PersistenceError};
pub use resolve::{list_titles, resolve, status, Recommendation, Status};
pub use serve::{IndexHandle, IndexState};
pub use similarity::{similarity, SimilarityEngine};
pub use text::{build_vocabulary, vectorize, TermVector, Vocabulary};

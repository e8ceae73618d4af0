//! Shared, swappable access to the served index.
//!
//! An [`IndexHandle`] is what a server holds. Readers take a snapshot
//! ([`IndexHandle::state`]) without locking; a (re)load swaps in a new state
//! atomically. In-flight queries keep the `Arc<Index>` they started with.

use crate::error::{LoadError, QueryError};
use crate::index::Index;
use crate::persistence::LoaderChain;
use crate::resolve::{self, Recommendation, Status};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{info, warn};

/// Availability of the index.
#[derive(Debug, Clone)]
pub enum IndexState {
    /// Nothing attempted yet.
    NotLoaded,
    Ready(Arc<Index>),
    /// Loading failed. `retryable` separates "not there yet" from corruption.
    Failed { reason: String, retryable: bool },
}

impl IndexState {
    pub fn index(&self) -> Option<&Arc<Index>> {
        match self {
            IndexState::Ready(index) => Some(index),
            _ => None,
        }
    }
}

/// Lock-free holder of the current [`IndexState`].
pub struct IndexHandle {
    state: ArcSwap<IndexState>,
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("state", &self.state.load_full())
            .finish()
    }
}

impl IndexHandle {
    /// Handle in the `NotLoaded` state.
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(IndexState::NotLoaded),
        }
    }

    /// Handle that is already serving `index`.
    pub fn ready(index: Index) -> Self {
        Self {
            state: ArcSwap::from_pointee(IndexState::Ready(Arc::new(index))),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> Arc<IndexState> {
        self.state.load_full()
    }

    /// The served index, if any.
    pub fn current(&self) -> Option<Arc<Index>> {
        self.state.load().index().cloned()
    }

    pub fn is_ready(&self) -> bool {
        matches!(**self.state.load(), IndexState::Ready(_))
    }

    /// Serve `index` from now on.
    pub fn install(&self, index: Index) -> Arc<Index> {
        let index = Arc::new(index);
        self.state.store(Arc::new(IndexState::Ready(index.clone())));
        index
    }

    /// Run `chain` and record the outcome.
    ///
    /// On failure a previously ready index keeps being served; otherwise the
    /// state becomes `Failed`.
    pub fn load_from(&self, chain: &LoaderChain) -> Result<Arc<Index>, LoadError> {
        match chain.load() {
            Ok(index) => Ok(self.install(index)),
            Err(e) => {
                let failed = Arc::new(IndexState::Failed {
                    reason: e.to_string(),
                    retryable: e.is_retryable(),
                });
                let previous = self.state.rcu(|cur| match **cur {
                    IndexState::Ready(_) => cur.clone(),
                    _ => failed.clone(),
                });
                if let IndexState::Ready(index) = &*previous {
                    info!(items = index.len(), "reload failed; keeping current index");
                } else {
                    warn!(retryable = e.is_retryable(), "no index available");
                }
                Err(e)
            }
        }
    }

    /// Health of the handle.
    pub fn status(&self) -> Status {
        resolve::status(self.current().as_deref())
    }

    /// Resolve `query` against the current index.
    pub fn resolve(&self, query: &str) -> Result<Recommendation, QueryError> {
        let state = self.state.load();
        match &**state {
            IndexState::Ready(index) => Ok(resolve::resolve(query, index)?),
            IndexState::NotLoaded => Err(QueryError::NotLoaded),
            IndexState::Failed { reason, retryable } => Err(QueryError::Failed {
                reason: reason.clone(),
                retryable: *retryable,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Item};
    use crate::config::BuildConfig;
    use crate::error::ResolveError;
    use crate::persistence::FileLoader;

    fn index() -> Index {
        let catalog = Catalog::new(vec![
            Item::new("Alien", "space horror crew"),
            Item::new("Aliens", "space marines horror"),
        ]);
        Index::build(&catalog, &BuildConfig::default()).unwrap()
    }

    #[test]
    fn not_loaded_then_ready() {
        let handle = IndexHandle::new();
        assert!(!handle.status().loaded);
        assert_eq!(handle.resolve("alien"), Err(QueryError::NotLoaded));

        handle.install(index());
        assert_eq!(handle.status().count, 2);
        assert_eq!(handle.resolve("alien").unwrap().matched, "Alien");
        assert_eq!(
            handle.resolve("  "),
            Err(QueryError::Resolve(ResolveError::EmptyQuery))
        );
    }

    #[test]
    fn missing_artifact_is_retryable_failure() {
        let dir = tempfile::tempdir().unwrap();
        let chain = LoaderChain::new().with(FileLoader::new(dir.path().join("absent.idx")));
        let handle = IndexHandle::new();
        assert!(handle.load_from(&chain).is_err());
        match &*handle.state() {
            IndexState::Failed { retryable, .. } => assert!(*retryable),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            handle.resolve("x"),
            Err(QueryError::Failed { retryable: true, .. })
        ));
    }

    #[test]
    fn corrupt_artifact_is_fatal_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.idx");
        std::fs::write(&path, b"not an index at all, just bytes").unwrap();
        let handle = IndexHandle::new();
        let err = handle
            .load_from(&LoaderChain::new().with(FileLoader::new(&path)))
            .unwrap_err();
        assert!(!err.is_retryable());
        assert!(matches!(
            &*handle.state(),
            IndexState::Failed {
                retryable: false,
                ..
            }
        ));
    }

    #[test]
    fn failed_reload_keeps_serving() {
        let dir = tempfile::tempdir().unwrap();
        let handle = IndexHandle::ready(index());
        let chain = LoaderChain::new().with(FileLoader::new(dir.path().join("absent.idx")));
        assert!(handle.load_from(&chain).is_err());
        assert!(handle.is_ready());
        assert_eq!(handle.resolve("aliens").unwrap().matched, "Aliens");
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let handle = IndexHandle::ready(index());
        let held = handle.current().unwrap();
        let replacement = Index::build(
            &Catalog::new(vec![Item::new("Up", "balloon house")]),
            &BuildConfig::default(),
        )
        .unwrap();
        handle.install(replacement);
        assert_eq!(held.len(), 2);
        assert_eq!(handle.status().count, 1);
    }
}

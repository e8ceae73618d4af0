//! Acquiring a serialized index at serve time.
//!
//! Each [`IndexLoader`] fetches raw bytes from one place. A [`LoaderChain`]
//! tries loaders in order:
//!
//! - [`LoadError::Unavailable`] (missing file, network failure, HTTP error)
//!   falls through to the next loader.
//! - [`LoadError::Corrupt`] stops the chain. Bytes that were fetched but do
//!   not decode are never silently replaced by a different source.

use super::format::deserialize;
use crate::error::LoadError;
use crate::index::Index;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// A place an index can be loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSource {
    Local(PathBuf),
    Remote { url: String, timeout: Duration },
}

impl IndexSource {
    /// Loader for this source.
    ///
    /// Without the `remote` feature a remote source always reports
    /// [`LoadError::Unavailable`].
    pub fn loader(&self) -> Box<dyn IndexLoader> {
        match self {
            IndexSource::Local(path) => Box::new(FileLoader::new(path.clone())),
            #[cfg(feature = "remote")]
            IndexSource::Remote { url, timeout } => Box::new(HttpLoader::new(url.clone(), *timeout)),
            #[cfg(not(feature = "remote"))]
            IndexSource::Remote { url, .. } => Box::new(DisabledLoader {
                origin: url.clone(),
            }),
        }
    }
}

impl std::fmt::Display for IndexSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexSource::Local(path) => write!(f, "file:{}", path.display()),
            IndexSource::Remote { url, .. } => f.write_str(url),
        }
    }
}

/// One way of getting index bytes.
pub trait IndexLoader: Send + Sync {
    /// Human-readable origin, used in errors and logs.
    fn origin(&self) -> String;

    /// Fetch the raw artifact.
    fn fetch(&self) -> Result<Vec<u8>, LoadError>;

    /// Fetch and decode.
    fn load(&self) -> Result<Index, LoadError> {
        let bytes = self.fetch()?;
        deserialize(&bytes).map_err(|error| LoadError::Corrupt {
            origin: self.origin(),
            error,
        })
    }
}

/// Reads an artifact from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IndexLoader for FileLoader {
    fn origin(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        std::fs::read(&self.path).map_err(|e| LoadError::Unavailable {
            origin: self.origin(),
            reason: match e.kind() {
                ErrorKind::NotFound => "no such file".to_string(),
                _ => e.to_string(),
            },
        })
    }
}

/// Downloads an artifact over HTTP(S).
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpLoader {
    url: String,
    timeout: Duration,
}

#[cfg(feature = "remote")]
impl HttpLoader {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

#[cfg(feature = "remote")]
impl IndexLoader for HttpLoader {
    fn origin(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        use std::io::Read;

        let unavailable = |reason: String| LoadError::Unavailable {
            origin: self.origin(),
            reason,
        };

        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let response = match agent.get(&self.url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                return Err(unavailable(format!("HTTP status {code}")));
            }
            Err(e) => return Err(unavailable(e.to_string())),
        };

        // The reader owns the connection; it is released when dropped.
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| unavailable(format!("reading body: {e}")))?;
        Ok(body)
    }
}

#[cfg(not(feature = "remote"))]
struct DisabledLoader {
    origin: String,
}

#[cfg(not(feature = "remote"))]
impl IndexLoader for DisabledLoader {
    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        Err(LoadError::Unavailable {
            origin: self.origin(),
            reason: "built without the `remote` feature".to_string(),
        })
    }
}

/// Ordered fallback over several loaders.
#[derive(Default)]
pub struct LoaderChain {
    loaders: Vec<Box<dyn IndexLoader>>,
}

impl LoaderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// One loader per source, in order.
    pub fn from_sources(sources: &[IndexSource]) -> Self {
        Self {
            loaders: sources.iter().map(IndexSource::loader).collect(),
        }
    }

    /// Append a loader.
    #[must_use]
    pub fn with(mut self, loader: impl IndexLoader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// First index any loader produces.
    ///
    /// Returns the first [`LoadError::Corrupt`] encountered, or an
    /// [`LoadError::Unavailable`] summarizing every attempt.
    pub fn load(&self) -> Result<Index, LoadError> {
        let mut attempts = Vec::with_capacity(self.loaders.len());
        for loader in &self.loaders {
            match loader.load() {
                Ok(index) => {
                    info!(origin = %loader.origin(), items = index.len(), "index loaded");
                    return Ok(index);
                }
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, "index source unavailable");
                    attempts.push(e.to_string());
                }
                Err(e) => {
                    warn!(error = %e, "index source corrupt");
                    return Err(e);
                }
            }
        }

        Err(LoadError::Unavailable {
            origin: self
                .loaders
                .iter()
                .map(|l| l.origin())
                .collect::<Vec<_>>()
                .join(", "),
            reason: if attempts.is_empty() {
                "no index sources configured".to_string()
            } else {
                attempts.join("; ")
            },
        })
    }
}

impl std::fmt::Debug for LoaderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.loaders.iter().map(|l| l.origin()))
            .finish()
    }
}

/// Load from a single source.
pub fn load_index(source: &IndexSource) -> Result<Index, LoadError> {
    let loader = source.loader();
    loader.load().map_err(|e| {
        warn!(error = %e, "index load failed");
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Item};
    use crate::config::BuildConfig;
    use crate::persistence::format::serialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed {
        origin: &'static str,
        result: Result<Vec<u8>, ()>,
        calls: Arc<AtomicUsize>,
    }

    impl IndexLoader for Fixed {
        fn origin(&self) -> String {
            self.origin.to_string()
        }

        fn fetch(&self) -> Result<Vec<u8>, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(|()| LoadError::Unavailable {
                origin: self.origin(),
                reason: "down".into(),
            })
        }
    }

    fn bytes() -> Vec<u8> {
        let catalog = Catalog::new(vec![
            Item::new("Alien", "space horror"),
            Item::new("Aliens", "space marines"),
        ]);
        serialize(&Index::build(&catalog, &BuildConfig::default()).unwrap()).unwrap()
    }

    #[test]
    fn falls_through_unavailable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = LoaderChain::new()
            .with(Fixed {
                origin: "a",
                result: Err(()),
                calls: calls.clone(),
            })
            .with(Fixed {
                origin: "b",
                result: Ok(bytes()),
                calls: calls.clone(),
            });
        let index = chain.load().unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn corrupt_stops_the_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = LoaderChain::new()
            .with(Fixed {
                origin: "bad",
                result: Ok(b"KNDXgarbage".to_vec()),
                calls: calls.clone(),
            })
            .with(Fixed {
                origin: "good",
                result: Ok(bytes()),
                calls: calls.clone(),
            });
        let err = chain.load().unwrap_err();
        assert!(matches!(err, LoadError::Corrupt { ref origin, .. } if origin == "bad"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exhausted_chain_reports_every_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = LoaderChain::new()
            .with(Fixed {
                origin: "a",
                result: Err(()),
                calls: calls.clone(),
            })
            .with(Fixed {
                origin: "b",
                result: Err(()),
                calls,
            });
        match chain.load() {
            Err(LoadError::Unavailable { origin, reason }) => {
                assert_eq!(origin, "a, b");
                assert_eq!(reason.matches("down").count(), 2);
            }
            other => panic!("unexpected: {other:?}"),
        }

        assert!(matches!(
            LoaderChain::new().load(),
            Err(LoadError::Unavailable { .. })
        ));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_index(&IndexSource::Local(dir.path().join("absent.idx"))).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn source_display() {
        let src = IndexSource::Remote {
            url: "https://example.com/k.idx".into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(src.to_string(), "https://example.com/k.idx");
        assert!(IndexSource::Local("x.idx".into()).to_string().starts_with("file:"));
    }
}

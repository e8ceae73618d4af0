//! Index artifacts: binary format, file storage, and serve-time loading.
//!
//! The offline build writes one self-contained file (see [`format`]); the
//! serving side reads it back through a [`LoaderChain`], trying the local
//! file first and an optional remote URL second. Every decode validates the
//! checksum and the index invariants before anything is served.

pub mod error;
pub mod format;
pub mod loader;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use format::{deserialize, serialize, FORMAT_VERSION, INDEX_MAGIC};
#[cfg(feature = "remote")]
pub use loader::HttpLoader;
pub use loader::{load_index, FileLoader, IndexLoader, IndexSource, LoaderChain};
pub use store::{load, save};

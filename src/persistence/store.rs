//! Index artifacts on the local filesystem.

use super::error::PersistenceResult;
use super::format::{deserialize, serialize};
use crate::index::Index;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `index` to `path`, replacing any existing artifact atomically.
///
/// Bytes go to a sibling `*.tmp` file which is synced and then renamed over
/// `path`, so readers never observe a partial artifact. Returns the number of
/// bytes written.
pub fn save(index: &Index, path: &Path) -> PersistenceResult<u64> {
    let bytes = serialize(index)?;
    let temp = temp_path(path);

    let written = (|| {
        let mut file = File::create(&temp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp, path)
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }

    debug!(path = %path.display(), bytes = bytes.len(), "index written");
    Ok(bytes.len() as u64)
}

/// Read and validate the artifact at `path`.
pub fn load(path: &Path) -> PersistenceResult<Index> {
    let bytes = fs::read(path)?;
    deserialize(&bytes)
}

impl Index {
    /// See [`save`].
    pub fn save(&self, path: impl AsRef<Path>) -> PersistenceResult<u64> {
        save(self, path.as_ref())
    }

    /// See [`load`].
    pub fn load(path: impl AsRef<Path>) -> PersistenceResult<Index> {
        load(path.as_ref())
    }
}

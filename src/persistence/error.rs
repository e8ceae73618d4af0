//! Error types for persistence operations.

use thiserror::Error;

/// Errors that can occur while encoding, decoding or validating an index artifact.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// I/O error (file operations, disk I/O)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input ended before the declared layout did.
    #[error("truncated input: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// Leading bytes are not an index artifact.
    #[error("format error: bad magic bytes")]
    BadMagic,

    /// Artifact written by an incompatible format version.
    #[error("format error: unsupported version {0}")]
    UnsupportedVersion(u32),

    /// Header sets flags this build does not understand.
    #[error("format error: unsupported flags {0:#010x}")]
    UnsupportedFlags(u32),

    /// Checksum mismatch (data corruption detected)
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Serialization error (postcard)
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Decoded structure violates an index invariant.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl From<postcard::Error> for PersistenceError {
    fn from(e: postcard::Error) -> Self {
        Self::Deserialization(format!("postcard error: {}", e))
    }
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

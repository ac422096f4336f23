//! Error types for mesh subsetting.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using MeshError.
pub type MeshResult<T> = Result<T, MeshError>;

/// Primary error type shared by the reader, normalizer, subset engine and writer.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The remote (or mirrored) object does not exist or could not be reached.
    #[error("Source unavailable: {key}: {reason}")]
    SourceUnavailable { key: String, reason: String },

    /// The object exists but is not a usable mesh dataset.
    #[error("Malformed source: {0}")]
    MalformedSource(String),

    /// The bounding region is degenerate or out of range.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// Persisting the output failed; no file is left at `path`.
    #[error("Failed to write {}: {reason}", path.display())]
    WriteFailure { path: PathBuf, reason: String },
}

impl MeshError {
    /// Create a SourceUnavailable error.
    pub fn source_unavailable(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a MalformedSource error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedSource(msg.into())
    }

    /// Create a WriteFailure error.
    pub fn write_failure(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::WriteFailure {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Short stable label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            MeshError::SourceUnavailable { .. } => "source_unavailable",
            MeshError::MalformedSource(_) => "malformed_source",
            MeshError::InvalidRegion(_) => "invalid_region",
            MeshError::WriteFailure { .. } => "write_failure",
        }
    }
}

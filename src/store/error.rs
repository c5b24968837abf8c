//! Error types for the persistent store.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading or writing persisted state.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error during file operations
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// JSON parsing or serialization error
    #[error("JSON error in {path:?}: {source}")]
    Json {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create an I/O error for the given path.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create a JSON error for the given path.
    pub fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

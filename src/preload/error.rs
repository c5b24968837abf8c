//! Error types for image loading and prefetch.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading an image into the preload cache.
#[derive(Error, Debug)]
pub enum PreloadError {
    /// The image file does not exist
    #[error("Image not found: {path:?}")]
    NotFound {
        /// Requested path
        path: PathBuf,
    },

    /// The image file exists but could not be read
    #[error("IO error reading {path:?}: {source}")]
    Io {
        /// Requested path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file contents are not a decodable image
    #[error("Failed to decode {path:?}: {source}")]
    Decode {
        /// Requested path
        path: PathBuf,
        /// Underlying error
        source: image::ImageError,
    },

    /// Re-encoding the processed image failed
    #[error("Failed to encode {path:?}: {source}")]
    Encode {
        /// Requested path
        path: PathBuf,
        /// Underlying error
        source: image::ImageError,
    },

    /// Requested a maximum dimension of zero pixels
    #[error("Maximum image dimension must be at least 1 pixel")]
    InvalidMaxDimension,

    /// The prefetch worker thread could not be started
    #[error("Failed to spawn prefetch thread: {source}")]
    Spawn {
        /// Underlying error
        source: std::io::Error,
    },

    /// The prefetch worker thread is not running
    #[error("Prefetch worker is not running")]
    WorkerStopped,
}

impl PreloadError {
    /// Classify a read failure, separating missing files from other I/O errors.
    pub fn read(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Create a decode error for the given path.
    pub fn decode(path: &Path, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create an encode error for the given path.
    pub fn encode(path: &Path, source: image::ImageError) -> Self {
        Self::Encode {
            path: path.to_path_buf(),
            source,
        }
    }
}

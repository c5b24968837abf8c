//! Validation errors for labeling operations.

use thiserror::Error;

use crate::model::Label;

/// A labeling request that was rejected before any state changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    /// Dataset type name is empty
    #[error("Dataset type must not be empty")]
    EmptyDatasetType,

    /// Image path is empty
    #[error("Image path must not be empty")]
    EmptyImagePath,

    /// Dataset type is not one the service was configured with
    #[error("Unknown dataset type: {name}")]
    UnknownDataset {
        /// The rejected dataset type
        name: String,
    },

    /// Label is outside the configured class range
    #[error("Invalid label {label}: expected a value below {class_count}")]
    InvalidLabel {
        /// The rejected label
        label: Label,
        /// Number of configured classes
        class_count: u32,
    },
}

impl AnnotationError {
    /// Create an unknown dataset error.
    pub fn unknown_dataset(name: impl Into<String>) -> Self {
        Self::UnknownDataset { name: name.into() }
    }
}

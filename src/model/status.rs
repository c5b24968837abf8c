//! Per-image labeling status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A class label assigned to an image.
pub type Label = u32;

/// Labeling status of one image within one dataset.
///
/// Exactly one variant holds for every (dataset, image) pair. `Labeled`
/// carries the class so a status alone is enough to restore an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "label", rename_all = "snake_case")]
pub enum ImageStatus {
    /// Not yet looked at (or every decision was undone)
    #[default]
    Pending,
    /// Assigned a class label
    Labeled(Label),
    /// Explicitly skipped by the user
    Skipped,
}

impl ImageStatus {
    /// The label carried by this status, if any.
    pub fn label(&self) -> Option<Label> {
        match self {
            ImageStatus::Labeled(label) => Some(*label),
            ImageStatus::Pending | ImageStatus::Skipped => None,
        }
    }

    /// Whether the image has been labeled.
    pub fn is_labeled(&self) -> bool {
        matches!(self, ImageStatus::Labeled(_))
    }

    /// Whether the image has been skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, ImageStatus::Skipped)
    }

    /// Short lowercase name used in logs and the terminal UI.
    pub fn name(&self) -> &'static str {
        match self {
            ImageStatus::Pending => "pending",
            ImageStatus::Labeled(_) => "labeled",
            ImageStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageStatus::Labeled(label) => write!(f, "labeled({})", label),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_accessor() {
        assert_eq!(ImageStatus::Pending.label(), None);
        assert_eq!(ImageStatus::Skipped.label(), None);
        assert_eq!(ImageStatus::Labeled(1).label(), Some(1));
    }

    #[test]
    fn test_display() {
        assert_eq!(ImageStatus::Pending.to_string(), "pending");
        assert_eq!(ImageStatus::Labeled(0).to_string(), "labeled(0)");
        assert_eq!(ImageStatus::Skipped.to_string(), "skipped");
    }

    #[test]
    fn test_serialization_shape() {
        let json = serde_json::to_string(&ImageStatus::Labeled(1)).unwrap();
        assert_eq!(json, r#"{"state":"labeled","label":1}"#);

        let pending: ImageStatus = serde_json::from_str(r#"{"state":"pending"}"#).unwrap();
        assert_eq!(pending, ImageStatus::Pending);
    }
}

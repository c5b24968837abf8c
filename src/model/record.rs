//! Annotation and transition records.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{ImageStatus, Label};

/// An accepted label for one image in one dataset.
///
/// Writing a new label for the same (dataset, image) pair replaces the record;
/// the record itself keeps no history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Absolute path of the labeled image
    pub image_path: PathBuf,
    /// Assigned class label
    pub label: Label,
    /// Dataset type the image belongs to
    pub dataset_type: String,
    /// When this label value was written
    pub timestamp: DateTime<Utc>,
}

impl AnnotationRecord {
    /// Create a record stamped with the current time.
    pub fn new(dataset_type: &str, image_path: &Path, label: Label) -> Self {
        Self {
            image_path: image_path.to_path_buf(),
            label,
            dataset_type: dataset_type.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// One status change, the unit of undo/redo.
///
/// Holds the complete before and after status so it can be reversed without
/// consulting any other state. The labels are carried inside
/// [`ImageStatus::Labeled`], so a transition can never disagree with itself
/// about which label goes with which status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Image whose status changed
    pub image_path: PathBuf,
    /// Dataset type the image belongs to
    pub dataset_type: String,
    /// Status before the change
    pub old_status: ImageStatus,
    /// Status after the change
    pub new_status: ImageStatus,
    /// When the change was made
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    /// Create a transition stamped with the current time.
    pub fn new(
        dataset_type: &str,
        image_path: &Path,
        old_status: ImageStatus,
        new_status: ImageStatus,
    ) -> Self {
        Self {
            image_path: image_path.to_path_buf(),
            dataset_type: dataset_type.to_string(),
            old_status,
            new_status,
            timestamp: Utc::now(),
        }
    }

    /// Label before the change, if the image was labeled.
    pub fn old_label(&self) -> Option<Label> {
        self.old_status.label()
    }

    /// Label after the change, if the image is labeled.
    pub fn new_label(&self) -> Option<Label> {
        self.new_status.label()
    }

    /// Get a human-readable description of this transition
    pub fn description(&self) -> String {
        let name = self
            .image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.image_path.display().to_string());
        format!(
            "{} [{}]: {} -> {}",
            name, self.dataset_type, self.old_status, self.new_status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_labels_follow_status() {
        let t = TransitionRecord::new(
            "x",
            Path::new("/data/img1.jpg"),
            ImageStatus::Labeled(0),
            ImageStatus::Skipped,
        );
        assert_eq!(t.old_label(), Some(0));
        assert_eq!(t.new_label(), None);
    }

    #[test]
    fn test_description() {
        let t = TransitionRecord::new(
            "x",
            Path::new("/data/img1.jpg"),
            ImageStatus::Pending,
            ImageStatus::Labeled(1),
        );
        assert_eq!(t.description(), "img1.jpg [x]: pending -> labeled(1)");
    }

    #[test]
    fn test_record_line_fields() {
        let record = AnnotationRecord::new("x", Path::new("/data/a.png"), 1);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["image_path"], "/data/a.png");
        assert_eq!(value["label"], 1);
        assert_eq!(value["dataset_type"], "x");
        assert!(value["timestamp"].is_string());
    }
}

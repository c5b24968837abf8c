//! Progress and session summaries.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::status::{ImageStatus, Label};

/// Labeling progress of one dataset type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Dataset type the counts belong to
    pub dataset_type: String,
    /// Current cursor position
    pub current_index: usize,
    /// Number of images in the dataset (supplied by the caller)
    pub total_images: usize,
    /// Images with a live label
    pub annotated_count: usize,
    /// Images in the skip set
    pub skipped_count: usize,
    /// Images labeled with the positive class
    pub positive_count: usize,
    /// Images labeled with any other class
    pub negative_count: usize,
    /// Count per individual label
    pub label_counts: BTreeMap<Label, usize>,
}

impl ProgressSnapshot {
    /// Images neither labeled nor skipped.
    ///
    /// Saturates at zero, since records may exist for images that are no
    /// longer part of the scanned list.
    pub fn pending_count(&self) -> usize {
        self.total_images
            .saturating_sub(self.annotated_count + self.skipped_count)
    }

    /// Share of images that have been decided (labeled or skipped), in percent.
    pub fn percent_done(&self) -> f64 {
        if self.total_images == 0 {
            return 0.0;
        }
        let done = (self.annotated_count + self.skipped_count).min(self.total_images);
        done as f64 * 100.0 / self.total_images as f64
    }
}

/// Statistics for the current process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Labels written since the process started
    pub session_count: usize,
    /// Time since the process started
    pub elapsed: Duration,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs();
        let (hours, rem) = (secs / 3600, secs % 3600);
        let (minutes, seconds) = (rem / 60, rem % 60);
        write!(
            f,
            "{} labeled in {:02}:{:02}:{:02}",
            self.session_count, hours, minutes, seconds
        )
    }
}

/// Everything the front-end needs to show one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// Absolute image path
    pub path: PathBuf,
    /// File name for display
    pub filename: String,
    /// Position in the dataset's ordered image list
    pub index: usize,
    /// Current labeling status
    pub status: ImageStatus,
}

impl ImageInfo {
    /// Label of the image, if labeled.
    pub fn label(&self) -> Option<Label> {
        self.status.label()
    }
}

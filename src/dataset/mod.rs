//! Ordered image lists per dataset type.
//!
//! The labeling core only needs a read-only, ordered sequence of image paths
//! for each dataset type. [`DatasetView`] is that boundary; [`DatasetCatalog`]
//! implements it by scanning the directories named in the configuration.

mod catalog;

use std::path::PathBuf;
use std::sync::Arc;

pub use catalog::DatasetCatalog;

/// Source of the ordered image list for a dataset type.
pub trait DatasetView: Send + Sync {
    /// Absolute image paths of `dataset_type`, in display order.
    ///
    /// Unknown dataset types yield an empty list. The returned list stays the
    /// same until the implementation is explicitly refreshed.
    fn list_images(&self, dataset_type: &str) -> Arc<[PathBuf]>;
}

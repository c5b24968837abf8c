//! Process-wide owner of the labeling services.
//!
//! A [`LabelingContext`] is built once at startup and passed to whatever front
//! end drives it. It holds the annotation service behind one lock, the preload
//! cache and the dataset catalog, and adds the index-based helpers a front end
//! needs (bounds-checked navigation, image lookup, fetching).

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::annotation::{AnnotationService, ServiceOptions};
use crate::config::AppConfig;
use crate::dataset::{DatasetCatalog, DatasetView};
use crate::model::{ImageInfo, ProgressSnapshot};
use crate::preload::{PreloadError, PreloadOptions, PreloadService, ServedImage};
use crate::store::{FileStore, PersistentStore, StoreError};

/// Annotation service over a type-erased store.
pub type SharedAnnotations = AnnotationService<Box<dyn PersistentStore>>;

/// Errors surfaced by [`LabelingContext`].
#[derive(Error, Debug)]
pub enum ContextError {
    /// Loading or saving labeling state failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Loading an image failed
    #[error(transparent)]
    Preload(#[from] PreloadError),

    /// Index is past the end of the dataset's image list
    #[error("Index {index} out of range for '{dataset_type}' ({len} images)")]
    IndexOutOfRange {
        /// Dataset type
        dataset_type: String,
        /// Requested index
        index: usize,
        /// Number of images in the dataset
        len: usize,
    },
}

/// The annotation service, preload cache and dataset catalog of one process.
pub struct LabelingContext {
    annotations: Mutex<SharedAnnotations>,
    preload: PreloadService,
    catalog: Arc<DatasetCatalog>,
    config: AppConfig,
}

impl LabelingContext {
    /// Open the context with a file store in the configured data directory.
    pub fn open(config: AppConfig) -> Result<Self, ContextError> {
        let store = FileStore::in_dir(&config.settings.data_dir);
        log::info!("Using data directory {:?}", config.settings.data_dir);
        Self::with_store(config, Box::new(store))
    }

    /// Open the context over an explicit store.
    pub fn with_store(
        config: AppConfig,
        store: Box<dyn PersistentStore>,
    ) -> Result<Self, ContextError> {
        let catalog = Arc::new(DatasetCatalog::from_config(&config));
        let options = ServiceOptions::from_settings(&config.settings)
            .with_datasets(catalog.dataset_names());
        let annotations = AnnotationService::open(store, options)?;

        let view: Arc<dyn DatasetView> = catalog.clone();
        let preload = PreloadService::new(PreloadOptions::from_settings(&config.settings), view)?;

        Ok(Self {
            annotations: Mutex::new(annotations),
            preload,
            catalog,
            config,
        })
    }

    /// Exclusive access to the annotation service.
    pub fn annotations(&self) -> MutexGuard<'_, SharedAnnotations> {
        self.annotations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The preload cache.
    pub fn preload(&self) -> &PreloadService {
        &self.preload
    }

    /// The dataset catalog.
    pub fn catalog(&self) -> &DatasetCatalog {
        &self.catalog
    }

    /// The configuration the context was opened with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Path of image `index` in a dataset type.
    pub fn image_path(&self, dataset_type: &str, index: usize) -> Option<PathBuf> {
        self.catalog.list_images(dataset_type).get(index).cloned()
    }

    /// Position of `path` in a dataset type's image list.
    pub fn index_of(&self, dataset_type: &str, path: &Path) -> Option<usize> {
        self.catalog
            .list_images(dataset_type)
            .iter()
            .position(|p| p == path)
    }

    /// Number of images in a dataset type.
    pub fn image_count(&self, dataset_type: &str) -> usize {
        self.catalog.list_images(dataset_type).len()
    }

    /// Path, name and status of image `index`.
    pub fn image_info(&self, dataset_type: &str, index: usize) -> Option<ImageInfo> {
        let path = self.image_path(dataset_type, index)?;
        let status = self.annotations().get_image_status(dataset_type, &path);
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(ImageInfo {
            path,
            filename,
            index,
            status,
        })
    }

    /// Image at the dataset's current index.
    pub fn current_image(&self, dataset_type: &str) -> Option<ImageInfo> {
        let index = self.annotations().get_current_index(dataset_type);
        self.image_info(dataset_type, index)
    }

    /// Move to `index` and warm the cache around it.
    ///
    /// Returns `None` without moving when `index` is out of range.
    pub fn navigate_to(&self, dataset_type: &str, index: usize) -> Option<ImageInfo> {
        if index >= self.image_count(dataset_type) {
            log::debug!("Navigation to {} in '{}' out of range", index, dataset_type);
            return None;
        }
        self.annotations().set_current_index(dataset_type, index);
        if let Err(e) = self.preload.start_prefetch(dataset_type, index) {
            log::warn!("Could not start prefetch: {}", e);
        }
        self.image_info(dataset_type, index)
    }

    /// Move one image forward. `None` at the end of the list.
    pub fn navigate_next(&self, dataset_type: &str) -> Option<ImageInfo> {
        let index = self.annotations().get_current_index(dataset_type);
        self.navigate_to(dataset_type, index.checked_add(1)?)
    }

    /// Move one image back. `None` at the start of the list.
    pub fn navigate_prev(&self, dataset_type: &str) -> Option<ImageInfo> {
        let index = self.annotations().get_current_index(dataset_type);
        self.navigate_to(dataset_type, index.checked_sub(1)?)
    }

    /// Display bytes of image `index`.
    pub fn fetch_image(&self, dataset_type: &str, index: usize) -> Result<ServedImage, ContextError> {
        let images = self.catalog.list_images(dataset_type);
        let path = images
            .get(index)
            .ok_or_else(|| ContextError::IndexOutOfRange {
                dataset_type: dataset_type.to_string(),
                index,
                len: images.len(),
            })?;
        Ok(self.preload.fetch_for_serving(path)?)
    }

    /// Progress of a dataset type against its scanned image count.
    pub fn progress(&self, dataset_type: &str) -> ProgressSnapshot {
        let total = self.image_count(dataset_type);
        self.annotations().get_progress(dataset_type, total)
    }

    /// Stop prefetching and write all labeling state.
    pub fn shutdown(&mut self) -> Result<(), ContextError> {
        log::info!("Shutting down labeling context");
        self.preload.shutdown();
        self.annotations().save_all()?;
        Ok(())
    }
}

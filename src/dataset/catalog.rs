//! Directory-scanning dataset catalog.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use walkdir::{DirEntry, WalkDir};

use super::DatasetView;
use crate::config::{AppConfig, DatasetConfig};

/// Image lists for every configured dataset type, scanned lazily and cached.
pub struct DatasetCatalog {
    datasets: Vec<DatasetConfig>,
    extensions: Vec<String>,
    scans: RwLock<HashMap<String, Arc<[PathBuf]>>>,
}

impl DatasetCatalog {
    /// Create a catalog for the given datasets, accepting files whose
    /// extension (case-insensitive) is in `extensions`.
    pub fn new(datasets: Vec<DatasetConfig>, extensions: &[String]) -> Self {
        Self {
            datasets,
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            scans: RwLock::new(HashMap::new()),
        }
    }

    /// Create a catalog from the application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let datasets = config.datasets_by_priority().into_iter().cloned().collect();
        Self::new(datasets, &config.settings.supported_formats)
    }

    /// Configured dataset type names, highest priority first.
    pub fn dataset_names(&self) -> Vec<&str> {
        self.datasets.iter().map(|d| d.name.as_str()).collect()
    }

    /// Configuration of one dataset type.
    pub fn dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Rescan one dataset type. Returns the number of images found.
    pub fn refresh(&self, dataset_type: &str) -> usize {
        let images = match self.dataset(dataset_type) {
            Some(config) => self.scan(config),
            None => {
                log::warn!("Refresh requested for unknown dataset type '{}'", dataset_type);
                return 0;
            }
        };
        let count = images.len();
        self.scans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(dataset_type.to_string(), images);
        count
    }

    /// Rescan every dataset type.
    pub fn refresh_all(&self) {
        for config in &self.datasets {
            self.refresh(&config.name);
        }
    }

    fn has_supported_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
    }

    fn scan(&self, config: &DatasetConfig) -> Arc<[PathBuf]> {
        let is_excluded = |entry: &DirEntry| {
            entry.depth() > 0
                && entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| config.exclude_dirs.iter().any(|ex| ex == name))
        };

        let mut images = Vec::new();
        for dir in &config.image_dirs {
            let root = match std::path::absolute(dir) {
                Ok(root) => root,
                Err(e) => {
                    log::warn!("Cannot resolve image directory {:?}: {}", dir, e);
                    continue;
                }
            };
            if !root.is_dir() {
                log::warn!(
                    "Image directory {:?} for '{}' does not exist",
                    root,
                    config.name
                );
                continue;
            }

            let max_depth = if config.recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(&root)
                .follow_links(true)
                .max_depth(max_depth)
                .into_iter()
                .filter_entry(|e| !is_excluded(e));

            for entry in walker {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() && self.has_supported_extension(entry.path())
                        {
                            images.push(entry.into_path());
                        }
                    }
                    Err(e) => log::warn!("Error while scanning {:?}: {}", root, e),
                }
            }
        }

        images.sort();
        images.dedup();
        log::info!("Found {} images for '{}'", images.len(), config.name);
        images.into()
    }
}

impl DatasetView for DatasetCatalog {
    fn list_images(&self, dataset_type: &str) -> Arc<[PathBuf]> {
        if let Some(images) = self
            .scans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dataset_type)
        {
            return Arc::clone(images);
        }

        let Some(config) = self.dataset(dataset_type) else {
            return Arc::from(Vec::new());
        };
        let images = self.scan(config);
        self.scans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(dataset_type.to_string())
            .or_insert(images)
            .clone()
    }
}

//! Windowed LRU preload cache.
//!
//! Images near the user's position are decoded, normalized to RGB, downscaled
//! and re-encoded as JPEG ahead of time so that stepping to the next image is
//! served from memory. A single background thread performs the warming; the
//! foreground path never waits on it and loads synchronously on a miss.
//!
//! Starting a new prefetch supersedes the previous one: the old pass stops
//! before its next image, so at most one pass does useful work at a time.

mod codec;
mod error;
mod lru;
mod worker;

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::Settings;
use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_PRELOAD_WINDOW, SERVED_CONTENT_TYPE};
use crate::dataset::DatasetView;
use worker::{PrefetchPass, PrefetchWorker};

pub use codec::{CodecOptions, fit_within, recompress};
pub use error::PreloadError;
pub use lru::LruCache;

/// Encoded image bytes shared between the cache and its readers.
pub type ImageBytes = Arc<[u8]>;

/// Bytes ready to be handed to a client.
#[derive(Debug, Clone)]
pub struct ServedImage {
    /// Encoded image
    pub bytes: ImageBytes,
    /// MIME type of `bytes`
    pub content_type: &'static str,
}

/// Tunables for [`PreloadService`].
#[derive(Debug, Clone, Copy)]
pub struct PreloadOptions {
    /// Maximum number of cached images
    pub capacity: usize,
    /// Number of images warmed around the current index
    pub window_size: usize,
    /// Recompression parameters
    pub codec: CodecOptions,
}

impl Default for PreloadOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            window_size: DEFAULT_PRELOAD_WINDOW,
            codec: CodecOptions::default(),
        }
    }
}

impl PreloadOptions {
    /// Build options from the global settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            capacity: settings.cache_capacity,
            window_size: settings.preload_window,
            codec: CodecOptions {
                max_dimension: settings.max_dimension,
                jpeg_quality: settings.jpeg_quality,
            },
        }
    }
}

/// State shared between the service and its prefetch thread.
struct Shared {
    cache: Mutex<LruCache>,
    codec: CodecOptions,
    /// Bumped on every new prefetch; passes with an older value stop
    generation: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LruCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    /// Read, recompress and cache one image. The cache lock is only taken for
    /// the final insert.
    fn load_and_cache(&self, path: &Path, max_dimension: u32) -> Result<ImageBytes, PreloadError> {
        let data = fs::read(path).map_err(|e| PreloadError::read(path, e))?;
        let options = CodecOptions {
            max_dimension,
            ..self.codec
        };
        let bytes: ImageBytes = recompress(path, &data, options)?.into();
        self.lock().put(path.to_path_buf(), Arc::clone(&bytes));
        Ok(bytes)
    }
}

/// Indices warmed for `center` in a list of `len` images.
///
/// The window is `[center - window_size/2, center + window_size/2)` clamped to
/// the list.
pub fn window_range(center: usize, len: usize, window_size: usize) -> Range<usize> {
    let half = window_size / 2;
    let end = center.saturating_add(half).min(len);
    let start = center.saturating_sub(half).min(end);
    start..end
}

/// Indices of `range` ordered by distance from `center`, ahead before behind.
fn nearest_first(center: usize, range: Range<usize>) -> Vec<usize> {
    let mut indices: Vec<usize> = range.collect();
    indices.sort_by_key(|&i| (i.abs_diff(center), i < center));
    indices
}

/// Bounded image cache with background prefetch around the current index.
pub struct PreloadService {
    shared: Arc<Shared>,
    worker: PrefetchWorker,
    datasets: Arc<dyn DatasetView>,
    window_size: usize,
}

impl PreloadService {
    /// Create the cache and start its prefetch thread.
    pub fn new(
        options: PreloadOptions,
        datasets: Arc<dyn DatasetView>,
    ) -> Result<Self, PreloadError> {
        let shared = Arc::new(Shared {
            cache: Mutex::new(LruCache::new(options.capacity)),
            codec: options.codec,
            generation: AtomicU64::new(0),
        });
        let worker = PrefetchWorker::spawn(Arc::clone(&shared))?;

        log::info!(
            "Preload cache ready: capacity {}, window {}, max dimension {}",
            options.capacity,
            options.window_size,
            options.codec.max_dimension
        );

        Ok(Self {
            shared,
            worker,
            datasets,
            window_size: options.window_size,
        })
    }

    /// Cached bytes for `path`, marking them most recently used.
    pub fn get(&self, path: &Path) -> Option<ImageBytes> {
        self.shared.lock().get(path)
    }

    /// Insert bytes for `path`, evicting the least recently used entry if full.
    pub fn put(&self, path: impl Into<PathBuf>, bytes: ImageBytes) {
        self.shared.lock().put(path.into(), bytes);
    }

    /// Check presence without changing recency.
    pub fn contains(&self, path: &Path) -> bool {
        self.shared.contains(path)
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    /// Check if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }

    /// Maximum number of cached images.
    pub fn capacity(&self) -> usize {
        self.shared.lock().capacity()
    }

    /// Drop every cached image.
    pub fn clear(&self) {
        self.shared.lock().clear();
    }

    /// Load, recompress and cache `path` on the calling thread.
    pub fn load_and_cache(
        &self,
        path: &Path,
        max_dimension: u32,
    ) -> Result<ImageBytes, PreloadError> {
        self.shared.load_and_cache(path, max_dimension)
    }

    /// Bytes to serve for `path`, loading synchronously on a cache miss.
    pub fn fetch_for_serving(&self, path: &Path) -> Result<ServedImage, PreloadError> {
        let bytes = match self.get(path) {
            Some(bytes) => {
                log::debug!("Cache hit for {:?}", path);
                bytes
            }
            None => {
                log::debug!("Cache miss for {:?}", path);
                self.load_and_cache(path, self.shared.codec.max_dimension)?
            }
        };
        Ok(ServedImage {
            bytes,
            content_type: SERVED_CONTENT_TYPE,
        })
    }

    /// Warm the window around `center_index` in `ordered_paths` in the
    /// background, superseding any pass still running.
    pub fn warm_window(
        &self,
        dataset_type: &str,
        center_index: usize,
        ordered_paths: &[PathBuf],
        window_size: usize,
    ) -> Result<(), PreloadError> {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let range = window_range(center_index, ordered_paths.len(), window_size);
        let paths: Vec<PathBuf> = {
            let cache = self.shared.lock();
            nearest_first(center_index, range)
                .into_iter()
                .map(|i| &ordered_paths[i])
                .filter(|path| !cache.contains(path))
                .cloned()
                .collect()
        };

        if paths.is_empty() {
            log::debug!(
                "Window for '{}' at {} already cached",
                dataset_type,
                center_index
            );
            return Ok(());
        }

        log::debug!(
            "Prefetching {} images for '{}' around {}",
            paths.len(),
            dataset_type,
            center_index
        );
        self.worker.submit(PrefetchPass {
            generation,
            dataset_type: dataset_type.to_string(),
            center_index,
            paths,
        })
    }

    /// Warm the configured window around `center_index` of a dataset type.
    pub fn start_prefetch(&self, dataset_type: &str, center_index: usize) -> Result<(), PreloadError> {
        let images = self.datasets.list_images(dataset_type);
        self.warm_window(dataset_type, center_index, &images, self.window_size)
    }

    /// Check if the prefetch thread is running.
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Cancel the current pass and stop the prefetch thread.
    pub fn shutdown(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        self.worker.shutdown();
    }
}

impl Drop for PreloadService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//! Global constants for the quicklabel application

/// Number of images kept warm around the current index
pub const DEFAULT_PRELOAD_WINDOW: usize = 10;

/// Number of labeling operations between automatic saves
pub const DEFAULT_AUTO_SAVE_INTERVAL: usize = 10;

/// Maximum number of recompressed images held in memory
pub const DEFAULT_CACHE_CAPACITY: usize = 30;

/// Longest edge (in pixels) of an image after recompression
pub const DEFAULT_MAX_DIMENSION: u32 = 1200;

/// JPEG quality used when recompressing images for display
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Number of label classes (0 = negative, 1 = positive)
pub const DEFAULT_CLASS_COUNT: u32 = 2;

/// Maximum number of transitions kept in undo history
pub const UNDO_HISTORY_SIZE: usize = 1000;

/// Label treated as the positive class in progress reports
pub const POSITIVE_LABEL: u32 = 1;

/// MIME type of every image served from the preload cache
pub const SERVED_CONTENT_TYPE: &str = "image/jpeg";

/// Pause between two background prefetch loads so foreground requests get the CPU
pub const PREFETCH_YIELD_MILLIS: u64 = 10;

/// File name of the annotation record log inside the data directory
pub const ANNOTATIONS_FILE: &str = "annotations/annotations.jsonl";

/// File name of the session state blob inside the data directory
pub const SESSION_FILE: &str = "progress/session_state.json";

//! quicklabel - keyboard-driven image classification labeling
//!
//! The crate is built from two cooperating services:
//!
//! - [`annotation::AnnotationService`]: per-image label/skip state for any
//!   number of dataset types, a global undo/redo history and crash-safe
//!   persistence through a [`store::PersistentStore`].
//! - [`preload::PreloadService`]: a bounded LRU cache of display-ready JPEG
//!   bytes, warmed around the current image by a background thread.
//!
//! [`context::LabelingContext`] owns both, plus the [`dataset::DatasetCatalog`]
//! that supplies each dataset type's ordered image list.

pub mod annotation;
pub mod config;
pub mod constants;
pub mod context;
pub mod dataset;
pub mod model;
pub mod preload;
pub mod store;
pub mod undo;

pub use annotation::{AnnotationError, AnnotationService, ServiceOptions};
pub use config::AppConfig;
pub use context::{ContextError, LabelingContext};
pub use model::{AnnotationRecord, ImageStatus, Label, TransitionRecord};
pub use preload::{PreloadError, PreloadService, ServedImage};
pub use store::{FileStore, MemoryStore, PersistentStore, StoreError};

//! Annotation state machine.
//!
//! [`AnnotationService`] owns the per-dataset label records, skip sets and
//! cursor positions, the global undo/redo history, and the auto-save policy.
//! Mutations run to completion without suspending; callers sharing one service
//! across threads wrap the whole service in a single lock.

mod auto_save;
mod error;
mod service;

pub use auto_save::AutoSaveManager;
pub use error::AnnotationError;
pub use service::{AnnotationService, ServiceOptions};

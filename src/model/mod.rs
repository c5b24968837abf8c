//! Data models for labeling state.

mod progress;
mod record;
mod status;

pub use progress::{ImageInfo, ProgressSnapshot, SessionStats};
pub use record::{AnnotationRecord, TransitionRecord};
pub use status::{ImageStatus, Label};

//! Persistence of annotation records and session state.
//!
//! The store is a leaf: it turns records into files and back, nothing more.
//! Two artifacts are kept:
//!
//! - **Annotation log**: one JSON object per line, one line per live record
//! - **Session state**: a JSON blob with cursor positions and skip sets
//!
//! Implementations sit behind the [`PersistentStore`] trait so the annotation
//! service can run against [`FileStore`] in production and [`MemoryStore`]
//! when nothing should touch the disk.

mod error;
mod file;
mod memory;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::AnnotationRecord;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Navigation state that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Current index per dataset type
    #[serde(default)]
    pub current_indices: BTreeMap<String, usize>,

    /// Skipped image paths per dataset type
    #[serde(default)]
    pub skipped: BTreeMap<String, Vec<PathBuf>>,

    /// When this state was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_save: Option<DateTime<Utc>>,
}

/// Result of reading the annotation log.
#[derive(Debug, Default)]
pub struct LoadedRecords {
    /// Records that parsed successfully, in file order
    pub records: Vec<AnnotationRecord>,
    /// Number of lines that could not be parsed and were skipped
    pub skipped_lines: usize,
}

/// Backend that persists annotation records and session state.
pub trait PersistentStore: Send {
    /// Read every annotation record.
    ///
    /// Corrupt lines are skipped and counted rather than failing the load.
    fn load_records(&self) -> Result<LoadedRecords, StoreError>;

    /// Replace the persisted records with `records`.
    fn save_records(&mut self, records: &[&AnnotationRecord]) -> Result<(), StoreError>;

    /// Read the session state, or `None` if none was ever saved.
    fn load_session(&self) -> Result<Option<SessionState>, StoreError>;

    /// Replace the persisted session state.
    fn save_session(&mut self, state: &SessionState) -> Result<(), StoreError>;
}

impl<S: PersistentStore + ?Sized> PersistentStore for Box<S> {
    fn load_records(&self) -> Result<LoadedRecords, StoreError> {
        (**self).load_records()
    }

    fn save_records(&mut self, records: &[&AnnotationRecord]) -> Result<(), StoreError> {
        (**self).save_records(records)
    }

    fn load_session(&self) -> Result<Option<SessionState>, StoreError> {
        (**self).load_session()
    }

    fn save_session(&mut self, state: &SessionState) -> Result<(), StoreError> {
        (**self).save_session(state)
    }
}

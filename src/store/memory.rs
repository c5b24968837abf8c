//! In-memory store, for sessions that must not touch the disk.

use super::{LoadedRecords, PersistentStore, SessionState, StoreError};
use crate::model::AnnotationRecord;

/// Store that keeps the last saved records and session state in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<AnnotationRecord>,
    session: Option<SessionState>,
    saves: usize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records and session state.
    pub fn with_contents(records: Vec<AnnotationRecord>, session: Option<SessionState>) -> Self {
        Self {
            records,
            session,
            saves: 0,
        }
    }

    /// Records from the most recent save.
    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    /// Session state from the most recent save.
    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    /// Number of record saves performed.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl PersistentStore for MemoryStore {
    fn load_records(&self) -> Result<LoadedRecords, StoreError> {
        Ok(LoadedRecords {
            records: self.records.clone(),
            skipped_lines: 0,
        })
    }

    fn save_records(&mut self, records: &[&AnnotationRecord]) -> Result<(), StoreError> {
        self.records = records.iter().map(|r| (*r).clone()).collect();
        self.saves += 1;
        Ok(())
    }

    fn load_session(&self) -> Result<Option<SessionState>, StoreError> {
        Ok(self.session.clone())
    }

    fn save_session(&mut self, state: &SessionState) -> Result<(), StoreError> {
        self.session = Some(state.clone());
        Ok(())
    }
}

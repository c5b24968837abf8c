//! The annotation service: labels, skips, cursors, undo/redo and persistence.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use web_time::Instant;

use super::auto_save::AutoSaveManager;
use super::error::AnnotationError;
use crate::config::Settings;
use crate::constants::{
    DEFAULT_AUTO_SAVE_INTERVAL, DEFAULT_CLASS_COUNT, POSITIVE_LABEL, UNDO_HISTORY_SIZE,
};
use crate::model::{
    AnnotationRecord, ImageStatus, Label, ProgressSnapshot, SessionStats, TransitionRecord,
};
use crate::store::{FileStore, PersistentStore, SessionState, StoreError};
use crate::undo::{StatusTarget, UndoConfig, UndoStack, redo_transition, undo_transition};

/// Tunables for [`AnnotationService`].
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Number of label classes; labels must be below this value
    pub class_count: u32,
    /// Maximum number of transitions kept for undo
    pub undo_limit: usize,
    /// Labeling operations between automatic saves (0 disables auto-save)
    pub auto_save_interval: usize,
    /// Accepted dataset types; empty accepts any name
    pub datasets: Vec<String>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            class_count: DEFAULT_CLASS_COUNT,
            undo_limit: UNDO_HISTORY_SIZE,
            auto_save_interval: DEFAULT_AUTO_SAVE_INTERVAL,
            datasets: Vec::new(),
        }
    }
}

impl ServiceOptions {
    /// Build options from the global settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            class_count: settings.class_count,
            undo_limit: settings.undo_limit,
            auto_save_interval: settings.auto_save_interval,
            datasets: Vec::new(),
        }
    }

    /// Restrict the service to the given dataset types.
    pub fn with_datasets<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.datasets = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Labeling state of one dataset type.
///
/// An image's status is derived from membership: in `skipped` means Skipped,
/// in `records` means Labeled, otherwise Pending. The two collections never
/// share a path.
#[derive(Debug, Default)]
struct DatasetState {
    records: HashMap<PathBuf, AnnotationRecord>,
    skipped: HashSet<PathBuf>,
    current_index: usize,
}

impl DatasetState {
    fn status(&self, image_path: &Path) -> ImageStatus {
        if self.skipped.contains(image_path) {
            ImageStatus::Skipped
        } else if let Some(record) = self.records.get(image_path) {
            ImageStatus::Labeled(record.label)
        } else {
            ImageStatus::Pending
        }
    }
}

/// All dataset states, keyed by dataset type.
#[derive(Debug, Default)]
struct LabelState {
    datasets: HashMap<String, DatasetState>,
}

impl LabelState {
    fn dataset(&self, dataset_type: &str) -> Option<&DatasetState> {
        self.datasets.get(dataset_type)
    }

    fn dataset_mut(&mut self, dataset_type: &str) -> &mut DatasetState {
        self.datasets.entry(dataset_type.to_string()).or_default()
    }

    fn status(&self, dataset_type: &str, image_path: &Path) -> ImageStatus {
        self.dataset(dataset_type)
            .map(|d| d.status(image_path))
            .unwrap_or_default()
    }

    fn insert_record(&mut self, record: AnnotationRecord) {
        let dataset = self.dataset_mut(&record.dataset_type);
        dataset.skipped.remove(&record.image_path);
        dataset.records.insert(record.image_path.clone(), record);
    }
}

impl StatusTarget for LabelState {
    fn apply_status(&mut self, dataset_type: &str, image_path: &Path, status: ImageStatus) {
        match status {
            ImageStatus::Labeled(label) => {
                self.insert_record(AnnotationRecord::new(dataset_type, image_path, label));
            }
            ImageStatus::Skipped => {
                let dataset = self.dataset_mut(dataset_type);
                dataset.records.remove(image_path);
                dataset.skipped.insert(image_path.to_path_buf());
            }
            ImageStatus::Pending => {
                let dataset = self.dataset_mut(dataset_type);
                dataset.records.remove(image_path);
                dataset.skipped.remove(image_path);
            }
        }
    }
}

/// Per-image labeling state machine with undo/redo and persistence.
///
/// The undo history is shared by all dataset types and is not persisted; it
/// starts empty every time the service is opened.
pub struct AnnotationService<S = FileStore> {
    state: LabelState,
    undo: UndoStack,
    auto_save: AutoSaveManager,
    store: S,
    class_count: u32,
    known_datasets: HashSet<String>,
    session_start: Instant,
    session_count: usize,
}

impl<S: PersistentStore> AnnotationService<S> {
    /// Create an empty service without reading anything from `store`.
    pub fn new(store: S, options: ServiceOptions) -> Self {
        Self {
            state: LabelState::default(),
            undo: UndoStack::with_config(UndoConfig {
                max_history: options.undo_limit,
            }),
            auto_save: AutoSaveManager::new(options.auto_save_interval),
            store,
            class_count: options.class_count,
            known_datasets: options.datasets.into_iter().collect(),
            session_start: Instant::now(),
            session_count: 0,
        }
    }

    /// Create a service and restore records and session state from `store`.
    ///
    /// Corrupt annotation lines are skipped by the store. A session blob that
    /// cannot be read is logged and ignored. Failing to read the annotation log
    /// at all is an error, since continuing would overwrite it on the next save.
    pub fn open(store: S, options: ServiceOptions) -> Result<Self, StoreError> {
        let mut service = Self::new(store, options);
        service.load()?;
        Ok(service)
    }

    fn load(&mut self) -> Result<(), StoreError> {
        let loaded = self.store.load_records()?;
        let record_count = loaded.records.len();
        for record in loaded.records {
            self.state.insert_record(record);
        }

        match self.store.load_session() {
            Ok(Some(session)) => self.restore_session(session),
            Ok(None) => log::debug!("No saved session state"),
            Err(e) => log::warn!("Failed to load session state, starting fresh: {}", e),
        }

        log::info!(
            "Annotation service ready: {} records across {} dataset types",
            record_count,
            self.state.datasets.len()
        );
        Ok(())
    }

    fn restore_session(&mut self, session: SessionState) {
        for (dataset_type, index) in session.current_indices {
            self.state.dataset_mut(&dataset_type).current_index = index;
        }

        for (dataset_type, paths) in session.skipped {
            let dataset = self.state.dataset_mut(&dataset_type);
            for path in paths {
                if dataset.records.contains_key(&path) {
                    log::warn!(
                        "{:?} in '{}' is both labeled and skipped; keeping the label",
                        path,
                        dataset_type
                    );
                    continue;
                }
                dataset.skipped.insert(path);
            }
        }
    }

    fn validate(
        &self,
        dataset_type: &str,
        image_path: &Path,
        label: Option<Label>,
    ) -> Result<(), AnnotationError> {
        if dataset_type.is_empty() {
            return Err(AnnotationError::EmptyDatasetType);
        }
        if image_path.as_os_str().is_empty() {
            return Err(AnnotationError::EmptyImagePath);
        }
        if !self.known_datasets.is_empty() && !self.known_datasets.contains(dataset_type) {
            return Err(AnnotationError::unknown_dataset(dataset_type));
        }
        if let Some(label) = label {
            if label >= self.class_count {
                return Err(AnnotationError::InvalidLabel {
                    label,
                    class_count: self.class_count,
                });
            }
        }
        Ok(())
    }

    /// Record a transition and run auto-save if it is due.
    fn commit(&mut self, transition: TransitionRecord) {
        self.undo.push(transition);
        if self.auto_save.record_operation() {
            self.run_auto_save();
        }
    }

    fn run_auto_save(&mut self) {
        match self.save_all() {
            Ok(()) => log::info!("Auto-saved labeling state"),
            Err(e) => {
                self.auto_save.mark_save_failed();
                log::error!(
                    "Auto-save failed ({} in a row), retrying after {} more operations: {}",
                    self.auto_save.consecutive_failures(),
                    self.auto_save.interval(),
                    e
                );
            }
        }
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Label an image, replacing any previous label or skip.
    ///
    /// Relabeling with the same value still records a transition, so every
    /// successful call is exactly one undo step.
    pub fn annotate(
        &mut self,
        dataset_type: &str,
        image_path: &Path,
        label: Label,
    ) -> Result<AnnotationRecord, AnnotationError> {
        self.validate(dataset_type, image_path, Some(label))?;

        let old_status = self.state.status(dataset_type, image_path);
        let record = AnnotationRecord::new(dataset_type, image_path, label);
        self.state.insert_record(record.clone());
        self.session_count += 1;

        log::info!(
            "Labeled {:?} as {} in '{}'",
            image_path,
            label,
            dataset_type
        );
        self.commit(TransitionRecord::new(
            dataset_type,
            image_path,
            old_status,
            ImageStatus::Labeled(label),
        ));

        Ok(record)
    }

    /// Mark an image as skipped, removing any label it had.
    ///
    /// The removed label is kept in the returned transition, so undo restores it.
    pub fn skip(
        &mut self,
        dataset_type: &str,
        image_path: &Path,
    ) -> Result<TransitionRecord, AnnotationError> {
        self.validate(dataset_type, image_path, None)?;

        let old_status = self.state.status(dataset_type, image_path);
        self.state
            .apply_status(dataset_type, image_path, ImageStatus::Skipped);

        let transition =
            TransitionRecord::new(dataset_type, image_path, old_status, ImageStatus::Skipped);
        log::info!("Skipped {:?} in '{}'", image_path, dataset_type);
        self.commit(transition.clone());

        Ok(transition)
    }

    /// Revert the most recent transition in any dataset type.
    pub fn undo(&mut self) -> Option<TransitionRecord> {
        let transition = undo_transition(&mut self.undo, &mut self.state)?;
        self.auto_save.mark_dirty();
        log::info!("Undid {}", transition.description());
        Some(transition)
    }

    /// Re-apply the most recently undone transition.
    pub fn redo(&mut self) -> Option<TransitionRecord> {
        let transition = redo_transition(&mut self.undo, &mut self.state)?;
        self.auto_save.mark_dirty();
        log::info!("Redid {}", transition.description());
        Some(transition)
    }

    /// Move the cursor of a dataset type. Not bounds-checked.
    pub fn set_current_index(&mut self, dataset_type: &str, index: usize) {
        self.state.dataset_mut(dataset_type).current_index = index;
        self.auto_save.mark_dirty();
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Cursor of a dataset type (0 if never set).
    pub fn get_current_index(&self, dataset_type: &str) -> usize {
        self.state
            .dataset(dataset_type)
            .map(|d| d.current_index)
            .unwrap_or(0)
    }

    /// Status of one image.
    pub fn get_image_status(&self, dataset_type: &str, image_path: &Path) -> ImageStatus {
        self.state.status(dataset_type, image_path)
    }

    /// Live record of one image, if labeled.
    pub fn get_record(&self, dataset_type: &str, image_path: &Path) -> Option<&AnnotationRecord> {
        self.state
            .dataset(dataset_type)
            .and_then(|d| d.records.get(image_path))
    }

    /// Label of one image, if labeled.
    pub fn get_label(&self, dataset_type: &str, image_path: &Path) -> Option<Label> {
        self.get_record(dataset_type, image_path).map(|r| r.label)
    }

    /// Live records of one dataset type, in no particular order.
    pub fn records<'a>(
        &'a self,
        dataset_type: &str,
    ) -> impl Iterator<Item = &'a AnnotationRecord> + 'a {
        self.state
            .dataset(dataset_type)
            .into_iter()
            .flat_map(|d| d.records.values())
    }

    /// Skipped paths of one dataset type, in no particular order.
    pub fn skipped<'a>(&'a self, dataset_type: &str) -> impl Iterator<Item = &'a Path> + 'a {
        self.state
            .dataset(dataset_type)
            .into_iter()
            .flat_map(|d| d.skipped.iter().map(PathBuf::as_path))
    }

    /// Dataset types with any recorded state, sorted by name.
    pub fn dataset_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.state.datasets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Progress counts for one dataset type.
    ///
    /// Runs in time proportional to the number of labeled images, not to
    /// `total_images`.
    pub fn get_progress(&self, dataset_type: &str, total_images: usize) -> ProgressSnapshot {
        let mut label_counts: BTreeMap<Label, usize> = BTreeMap::new();
        let mut skipped_count = 0;
        let mut current_index = 0;

        if let Some(dataset) = self.state.dataset(dataset_type) {
            for record in dataset.records.values() {
                *label_counts.entry(record.label).or_default() += 1;
            }
            skipped_count = dataset.skipped.len();
            current_index = dataset.current_index;
        }

        let annotated_count: usize = label_counts.values().sum();
        let positive_count = label_counts.get(&POSITIVE_LABEL).copied().unwrap_or(0);

        ProgressSnapshot {
            dataset_type: dataset_type.to_string(),
            current_index,
            total_images,
            annotated_count,
            skipped_count,
            positive_count,
            negative_count: annotated_count - positive_count,
            label_counts,
        }
    }

    /// Labels written and time elapsed since the service was created.
    pub fn get_session_stats(&self) -> SessionStats {
        SessionStats {
            session_count: self.session_count,
            elapsed: self.session_start.elapsed(),
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Number of transitions that can be undone.
    pub fn undo_count(&self) -> usize {
        self.undo.undo_count()
    }

    /// Number of transitions that can be redone.
    pub fn redo_count(&self) -> usize {
        self.undo.redo_count()
    }

    /// Whether there are changes not yet written to the store.
    pub fn is_dirty(&self) -> bool {
        self.auto_save.is_dirty()
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The backing store, mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Snapshot of cursors and skip sets, with deterministic ordering.
    pub fn session_state(&self) -> SessionState {
        let mut session = SessionState::default();
        for (dataset_type, dataset) in &self.state.datasets {
            session
                .current_indices
                .insert(dataset_type.clone(), dataset.current_index);
            if !dataset.skipped.is_empty() {
                let mut paths: Vec<PathBuf> = dataset.skipped.iter().cloned().collect();
                paths.sort();
                session.skipped.insert(dataset_type.clone(), paths);
            }
        }
        session
    }

    /// Write every live record to the store.
    pub fn save_annotations(&mut self) -> Result<(), StoreError> {
        let mut records: Vec<&AnnotationRecord> = self
            .state
            .datasets
            .values()
            .flat_map(|d| d.records.values())
            .collect();
        records.sort_by(|a, b| {
            a.dataset_type
                .cmp(&b.dataset_type)
                .then_with(|| a.image_path.cmp(&b.image_path))
        });
        self.store.save_records(&records)
    }

    /// Write cursors and skip sets to the store.
    pub fn save_session_state(&mut self) -> Result<(), StoreError> {
        let session = self.session_state();
        self.store.save_session(&session)
    }

    /// Write records and session state, then reset the auto-save counter.
    pub fn save_all(&mut self) -> Result<(), StoreError> {
        self.save_annotations()?;
        self.save_session_state()?;
        self.auto_save.mark_saved();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LoadedRecords, MemoryStore};

    fn service() -> AnnotationService<MemoryStore> {
        AnnotationService::new(MemoryStore::new(), ServiceOptions::default())
    }

    fn p(name: &str) -> &Path {
        Path::new(name)
    }

    /// Store whose saves can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        fail: bool,
        attempts: usize,
        inner: MemoryStore,
    }

    impl PersistentStore for FlakyStore {
        fn load_records(&self) -> Result<LoadedRecords, StoreError> {
            self.inner.load_records()
        }

        fn save_records(&mut self, records: &[&AnnotationRecord]) -> Result<(), StoreError> {
            self.attempts += 1;
            if self.fail {
                return Err(StoreError::io(
                    p("/full/disk"),
                    std::io::Error::other("disk full"),
                ));
            }
            self.inner.save_records(records)
        }

        fn load_session(&self) -> Result<Option<SessionState>, StoreError> {
            self.inner.load_session()
        }

        fn save_session(&mut self, state: &SessionState) -> Result<(), StoreError> {
            self.inner.save_session(state)
        }
    }

    #[test]
    fn test_relabel_then_undo_restores_previous_label() {
        let mut svc = service();
        svc.annotate("x", p("img1"), 0).unwrap();
        svc.annotate("x", p("img1"), 1).unwrap();

        let undone = svc.undo().unwrap();
        assert_eq!(undone.old_label(), Some(0));
        assert_eq!(svc.get_image_status("x", p("img1")), ImageStatus::Labeled(0));
        assert_eq!(svc.get_label("x", p("img1")), Some(0));
    }

    #[test]
    fn test_skip_then_undo_returns_to_pending() {
        let mut svc = service();
        svc.skip("x", p("img2")).unwrap();
        assert_eq!(svc.get_image_status("x", p("img2")), ImageStatus::Skipped);

        svc.undo().unwrap();
        assert_eq!(svc.get_image_status("x", p("img2")), ImageStatus::Pending);
        assert!(svc.get_record("x", p("img2")).is_none());
        assert_eq!(svc.skipped("x").count(), 0);
    }

    #[test]
    fn test_skip_labeled_image_removes_record_and_undo_restores_it() {
        let mut svc = service();
        svc.annotate("x", p("a"), 1).unwrap();

        let t = svc.skip("x", p("a")).unwrap();
        assert_eq!(t.old_label(), Some(1));
        assert!(svc.get_record("x", p("a")).is_none());
        assert_eq!(svc.get_image_status("x", p("a")), ImageStatus::Skipped);

        svc.undo().unwrap();
        assert_eq!(svc.get_image_status("x", p("a")), ImageStatus::Labeled(1));
        assert_eq!(svc.skipped("x").count(), 0);
    }

    #[test]
    fn test_annotate_skipped_image_clears_skip() {
        let mut svc = service();
        svc.skip("x", p("a")).unwrap();
        svc.annotate("x", p("a"), 0).unwrap();
        assert_eq!(svc.get_image_status("x", p("a")), ImageStatus::Labeled(0));
        assert_eq!(svc.skipped("x").count(), 0);

        svc.undo().unwrap();
        assert_eq!(svc.get_image_status("x", p("a")), ImageStatus::Skipped);
        assert!(svc.get_record("x", p("a")).is_none());
    }

    #[test]
    fn test_redo_after_undo_roundtrip() {
        let mut svc = service();
        svc.annotate("x", p("a"), 1).unwrap();
        svc.skip("x", p("a")).unwrap();

        svc.undo().unwrap();
        assert_eq!(svc.get_image_status("x", p("a")), ImageStatus::Labeled(1));

        let redone = svc.redo().unwrap();
        assert_eq!(redone.new_status, ImageStatus::Skipped);
        assert_eq!(svc.get_image_status("x", p("a")), ImageStatus::Skipped);
        assert!(svc.get_record("x", p("a")).is_none());
    }

    #[test]
    fn test_new_action_clears_redo() {
        let mut svc = service();
        svc.annotate("x", p("a"), 1).unwrap();
        svc.undo().unwrap();
        assert!(svc.can_redo());

        svc.skip("x", p("b")).unwrap();
        assert!(!svc.can_redo());
        assert!(svc.redo().is_none());
    }

    #[test]
    fn test_undo_on_empty_history() {
        let mut svc = service();
        assert!(svc.undo().is_none());
        assert!(svc.redo().is_none());
    }

    #[test]
    fn test_history_is_global_across_datasets() {
        let mut svc = service();
        svc.annotate("x", p("a"), 1).unwrap();
        svc.annotate("y", p("b"), 0).unwrap();

        let first = svc.undo().unwrap();
        assert_eq!(first.dataset_type, "y");
        assert_eq!(svc.get_image_status("y", p("b")), ImageStatus::Pending);
        assert_eq!(svc.get_image_status("x", p("a")), ImageStatus::Labeled(1));

        let second = svc.undo().unwrap();
        assert_eq!(second.dataset_type, "x");
        assert_eq!(svc.get_image_status("x", p("a")), ImageStatus::Pending);
    }

    #[test]
    fn test_validation_rejects_without_mutation() {
        let options = ServiceOptions::default().with_datasets(["x"]);
        let mut svc = AnnotationService::new(MemoryStore::new(), options);
        svc.annotate("x", p("a"), 0).unwrap();
        svc.undo().unwrap();
        assert!(svc.can_redo());

        assert_eq!(
            svc.annotate("x", p("a"), 2),
            Err(AnnotationError::InvalidLabel {
                label: 2,
                class_count: 2
            })
        );
        assert_eq!(
            svc.skip("y", p("a")),
            Err(AnnotationError::unknown_dataset("y"))
        );
        assert_eq!(svc.skip("", p("a")), Err(AnnotationError::EmptyDatasetType));
        assert_eq!(
            svc.annotate("x", p(""), 0),
            Err(AnnotationError::EmptyImagePath)
        );

        // Nothing changed: redo is still available and history is untouched
        assert!(svc.can_redo());
        assert_eq!(svc.undo_count(), 0);
        assert_eq!(svc.get_image_status("x", p("a")), ImageStatus::Pending);
    }

    #[test]
    fn test_progress_counts() {
        let mut svc = service();
        svc.annotate("x", p("a"), 1).unwrap();
        svc.annotate("x", p("b"), 0).unwrap();
        svc.annotate("x", p("c"), 1).unwrap();
        svc.skip("x", p("d")).unwrap();
        svc.skip("x", p("c")).unwrap();
        svc.annotate("y", p("z"), 1).unwrap();
        svc.set_current_index("x", 3);

        let progress = svc.get_progress("x", 10);
        assert_eq!(progress.current_index, 3);
        assert_eq!(progress.annotated_count, 2);
        assert_eq!(progress.skipped_count, 2);
        assert_eq!(progress.positive_count, 1);
        assert_eq!(progress.negative_count, 1);
        assert_eq!(progress.label_counts.get(&0), Some(&1));
        assert_eq!(progress.pending_count(), 6);

        let empty = svc.get_progress("nope", 5);
        assert_eq!(empty.annotated_count, 0);
        assert_eq!(empty.current_index, 0);
    }

    #[test]
    fn test_cursor_defaults_to_zero() {
        let mut svc = service();
        assert_eq!(svc.get_current_index("x"), 0);
        svc.set_current_index("x", 7);
        assert_eq!(svc.get_current_index("x"), 7);
        assert!(svc.is_dirty());
    }

    #[test]
    fn test_auto_save_at_interval() {
        let options = ServiceOptions {
            auto_save_interval: 3,
            ..ServiceOptions::default()
        };
        let mut svc = AnnotationService::new(MemoryStore::new(), options);

        svc.annotate("x", p("a"), 0).unwrap();
        svc.skip("x", p("b")).unwrap();
        assert_eq!(svc.store().save_count(), 0);

        svc.annotate("x", p("c"), 1).unwrap();
        assert_eq!(svc.store().save_count(), 1);
        assert_eq!(svc.store().records().len(), 2);
        let session = svc.store().session().unwrap();
        assert_eq!(session.skipped["x"], vec![PathBuf::from("b")]);
        assert!(!svc.is_dirty());
    }

    #[test]
    fn test_auto_save_failure_is_retried_next_interval() {
        let options = ServiceOptions {
            auto_save_interval: 2,
            ..ServiceOptions::default()
        };
        let store = FlakyStore {
            fail: true,
            ..FlakyStore::default()
        };
        let mut svc = AnnotationService::new(store, options);

        svc.annotate("x", p("a"), 0).unwrap();
        svc.annotate("x", p("b"), 0).unwrap();
        assert_eq!(svc.store().attempts, 1);
        assert!(svc.is_dirty());

        svc.store_mut().fail = false;
        svc.annotate("x", p("c"), 0).unwrap();
        assert_eq!(svc.store().attempts, 1);
        svc.annotate("x", p("d"), 0).unwrap();
        assert_eq!(svc.store().attempts, 2);
        assert_eq!(svc.store().inner.records().len(), 4);
        assert!(!svc.is_dirty());
    }

    #[test]
    fn test_explicit_save_surfaces_failure() {
        let store = FlakyStore {
            fail: true,
            ..FlakyStore::default()
        };
        let mut svc = AnnotationService::new(store, ServiceOptions::default());
        svc.annotate("x", p("a"), 0).unwrap();
        assert!(matches!(svc.save_all(), Err(StoreError::Io { .. })));
        assert!(svc.is_dirty());
    }

    #[test]
    fn test_open_restores_records_and_session() {
        let records = vec![
            AnnotationRecord::new("x", p("a"), 1),
            AnnotationRecord::new("x", p("b"), 0),
        ];
        let mut session = SessionState::default();
        session.current_indices.insert("x".to_string(), 5);
        session
            .skipped
            .insert("x".to_string(), vec![PathBuf::from("b"), PathBuf::from("c")]);

        let store = MemoryStore::with_contents(records, Some(session));
        let svc = AnnotationService::open(store, ServiceOptions::default()).unwrap();

        assert_eq!(svc.get_current_index("x"), 5);
        assert_eq!(svc.get_image_status("x", p("a")), ImageStatus::Labeled(1));
        // Label wins over a conflicting skip entry
        assert_eq!(svc.get_image_status("x", p("b")), ImageStatus::Labeled(0));
        assert_eq!(svc.get_image_status("x", p("c")), ImageStatus::Skipped);
        assert!(!svc.can_undo());
    }

    #[test]
    fn test_dataset_types_are_sorted() {
        let mut svc = service();
        assert!(svc.dataset_types().is_empty());
        svc.annotate("zebras", p("a"), 0).unwrap();
        svc.skip("ants", p("b")).unwrap();
        svc.annotate("moths", p("c"), 1).unwrap();
        assert_eq!(svc.dataset_types(), vec!["ants", "moths", "zebras"]);
    }

    #[test]
    fn test_session_stats_count_labels() {
        let mut svc = service();
        svc.annotate("x", p("a"), 0).unwrap();
        svc.annotate("x", p("b"), 1).unwrap();
        svc.skip("x", p("c")).unwrap();
        assert_eq!(svc.get_session_stats().session_count, 2);
    }

    #[test]
    fn test_saved_records_are_sorted() {
        let mut svc = service();
        svc.annotate("y", p("b"), 0).unwrap();
        svc.annotate("x", p("z"), 0).unwrap();
        svc.annotate("x", p("a"), 1).unwrap();
        svc.save_annotations().unwrap();

        let keys: Vec<(String, PathBuf)> = svc
            .store()
            .records()
            .iter()
            .map(|r| (r.dataset_type.clone(), r.image_path.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("x".to_string(), PathBuf::from("a")),
                ("x".to_string(), PathBuf::from("z")),
                ("y".to_string(), PathBuf::from("b")),
            ]
        );
    }
}

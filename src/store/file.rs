//! File-backed store: JSON Lines annotation log plus a JSON session blob.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::{LoadedRecords, PersistentStore, SessionState, StoreError};
use crate::constants::{ANNOTATIONS_FILE, SESSION_FILE};
use crate::model::AnnotationRecord;

/// Store that keeps records and session state in two files.
///
/// Every write goes to a sibling temporary file which is flushed, synced and
/// then renamed over the target, so a crash mid-write leaves the previous
/// version intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    annotations_path: PathBuf,
    session_path: PathBuf,
}

impl FileStore {
    /// Create a store using explicit file paths.
    pub fn new(annotations_path: impl Into<PathBuf>, session_path: impl Into<PathBuf>) -> Self {
        Self {
            annotations_path: annotations_path.into(),
            session_path: session_path.into(),
        }
    }

    /// Create a store using the standard layout inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(ANNOTATIONS_FILE), data_dir.join(SESSION_FILE))
    }

    /// Path of the annotation log.
    pub fn annotations_path(&self) -> &Path {
        &self.annotations_path
    }

    /// Path of the session state file.
    pub fn session_path(&self) -> &Path {
        &self.session_path
    }
}

/// Write `path` atomically, filling it through `write`.
fn write_atomic<F>(path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), StoreError>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let file = File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;

    let file = writer
        .into_inner()
        .map_err(|e| StoreError::io(&tmp_path, e.into_error()))?;
    file.sync_all().map_err(|e| StoreError::io(&tmp_path, e))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| StoreError::io(path, e))
}

impl PersistentStore for FileStore {
    fn load_records(&self) -> Result<LoadedRecords, StoreError> {
        let path = &self.annotations_path;
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No annotation log at {:?}", path);
                return Ok(LoadedRecords::default());
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let mut loaded = LoadedRecords::default();
        for (line_no, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line.map_err(|e| StoreError::io(path, e))?;
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_slice::<AnnotationRecord>(line) {
                Ok(record) => loaded.records.push(record),
                Err(e) => {
                    log::warn!(
                        "Skipping corrupt record at {:?} line {}: {}",
                        path,
                        line_no + 1,
                        e
                    );
                    loaded.skipped_lines += 1;
                }
            }
        }

        log::info!(
            "Loaded {} annotation records from {:?} ({} corrupt lines skipped)",
            loaded.records.len(),
            path,
            loaded.skipped_lines
        );
        Ok(loaded)
    }

    fn save_records(&mut self, records: &[&AnnotationRecord]) -> Result<(), StoreError> {
        let path = self.annotations_path.clone();
        write_atomic(&path, |writer| {
            for record in records {
                serde_json::to_writer(&mut *writer, record)
                    .map_err(|e| StoreError::json(&path, e))?;
                writer.write_all(b"\n").map_err(|e| StoreError::io(&path, e))?;
            }
            Ok(())
        })?;

        log::info!("Saved {} annotation records to {:?}", records.len(), path);
        Ok(())
    }

    fn load_session(&self) -> Result<Option<SessionState>, StoreError> {
        let path = &self.session_path;
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let state: SessionState =
            serde_json::from_str(&json).map_err(|e| StoreError::json(path, e))?;
        Ok(Some(state))
    }

    fn save_session(&mut self, state: &SessionState) -> Result<(), StoreError> {
        let path = self.session_path.clone();
        let mut state = state.clone();
        state.last_save = Some(Utc::now());

        write_atomic(&path, |writer| {
            serde_json::to_writer_pretty(&mut *writer, &state)
                .map_err(|e| StoreError::json(&path, e))
        })?;

        log::debug!("Saved session state to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(dataset: &str, path: &str, label: u32) -> AnnotationRecord {
        AnnotationRecord::new(dataset, Path::new(path), label)
    }

    #[test]
    fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path());

        let loaded = store.load_records().unwrap();
        assert!(loaded.records.is_empty());
        assert_eq!(loaded.skipped_lines, 0);
        assert!(store.load_session().unwrap().is_none());
    }

    #[test]
    fn test_records_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::in_dir(dir.path());

        let a = record("x", "/img/a.jpg", 0);
        let b = record("y", "/img/b.jpg", 1);
        store.save_records(&[&a, &b]).unwrap();

        let loaded = store.load_records().unwrap();
        assert_eq!(loaded.records, vec![a, b]);
        assert!(!dir.path().join("annotations/annotations.jsonl.tmp").exists());
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path());

        let good = record("x", "/img/a.jpg", 1);
        let content = format!(
            "{}\nnot json at all\n\n{{\"image_path\": \"/img/b.jpg\"}}\n{}\n",
            serde_json::to_string(&good).unwrap(),
            serde_json::to_string(&record("x", "/img/c.jpg", 0)).unwrap(),
        );
        fs::create_dir_all(store.annotations_path().parent().unwrap()).unwrap();
        fs::write(store.annotations_path(), content).unwrap();

        let loaded = store.load_records().unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0], good);
        assert_eq!(loaded.skipped_lines, 2);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path());

        let first = record("x", "/img/a.jpg", 1);
        let last = record("x", "/img/c.jpg", 0);
        let mut content = serde_json::to_vec(&first).unwrap();
        content.extend_from_slice(b"\n\xff\xfe garbage\n");
        content.extend_from_slice(&serde_json::to_vec(&last).unwrap());
        content.push(b'\n');
        fs::create_dir_all(store.annotations_path().parent().unwrap()).unwrap();
        fs::write(store.annotations_path(), content).unwrap();

        let loaded = store.load_records().unwrap();
        assert_eq!(loaded.records, vec![first, last]);
        assert_eq!(loaded.skipped_lines, 1);
    }

    #[test]
    fn test_session_roundtrip_sets_last_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::in_dir(dir.path());

        let mut state = SessionState::default();
        state.current_indices.insert("x".to_string(), 42);
        state
            .skipped
            .insert("x".to_string(), vec![PathBuf::from("/img/s.jpg")]);
        store.save_session(&state).unwrap();

        let loaded = store.load_session().unwrap().unwrap();
        assert_eq!(loaded.current_indices, state.current_indices);
        assert_eq!(loaded.skipped, state.skipped);
        assert!(loaded.last_save.is_some());
    }

    #[test]
    fn test_corrupt_session_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path());
        fs::create_dir_all(store.session_path().parent().unwrap()).unwrap();
        fs::write(store.session_path(), "{ broken").unwrap();

        assert!(matches!(
            store.load_session(),
            Err(StoreError::Json { .. })
        ));
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let mut store = FileStore::new(blocker.join("a.jsonl"), blocker.join("s.json"));

        let a = record("x", "/img/a.jpg", 0);
        assert!(matches!(
            store.save_records(&[&a]),
            Err(StoreError::Io { .. })
        ));
    }
}

//! Per-record-kind directory of JSON files, with atomic single-file writes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::errors::{CoreError, Result};

/// A directory holding one `{id}.json` file per record of a given kind.
///
/// Crash semantics: writes go to a sibling `{id}.json.tmp` file first, then
/// are renamed into place, so a half-written file never shows up under the
/// `.json` suffix that `list()` scans for.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    /// Opens (creating if necessary) the record directory at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn tmp_path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json.tmp"))
    }

    /// Serializes `payload` and writes it atomically to `{id}.json`,
    /// overwriting any existing record with the same id.
    pub fn put<T: Serialize>(&self, id: &str, payload: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(payload)?;
        let tmp = self.tmp_path_for(id);
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, self.path_for(id))?;
        Ok(())
    }

    /// Reads and deserializes the record with the given id.
    pub fn get<T: DeserializeOwned>(&self, id: &str) -> Result<T> {
        let path = self.path_for(id);
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::NotFound(id.to_string())
            } else {
                CoreError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Unlinks the record with the given id. Idempotent: a second call on an
    /// absent id returns `NotFound` but leaves the store unchanged.
    pub fn delete(&self, id: &str) -> Result<()> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(CoreError::Io(e)),
        }
    }

    /// Lists all ids currently present, by scanning `.json` filenames.
    /// Stray `.tmp` files from an interrupted write are skipped.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Checks whether a record with the given id exists, without reading it.
    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).is_file()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        store.put("a", &Payload { value: 42 }).unwrap();
        let got: Payload = store.get("a").unwrap();
        assert_eq!(got, Payload { value: 42 });
    }

    #[test]
    fn get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let err = store.get::<Payload>("missing").unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn put_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        store.put("a", &Payload { value: 1 }).unwrap();
        store.put("a", &Payload { value: 2 }).unwrap();
        let got: Payload = store.get("a").unwrap();
        assert_eq!(got, Payload { value: 2 });
    }

    #[test]
    fn delete_is_idempotent_reporting_not_found_on_second_call() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        store.put("a", &Payload { value: 1 }).unwrap();
        store.delete("a").unwrap();
        let err = store.delete("a").unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert!(!store.exists("a"));
    }

    #[test]
    fn list_ignores_tmp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        store.put("a", &Payload { value: 1 }).unwrap();
        fs::write(dir.path().join("b.json.tmp"), b"{}").unwrap();
        let ids = store.list().unwrap();
        assert_eq!(ids, vec!["a".to_string()]);
    }

    #[test]
    fn exists_reflects_store_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        assert!(!store.exists("a"));
        store.put("a", &Payload { value: 1 }).unwrap();
        assert!(store.exists("a"));
    }
}

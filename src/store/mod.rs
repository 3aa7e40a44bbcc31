//! Durable metadata store for media records.
//!
//! All records live in a single JSON file mirrored in memory. One mutex
//! guards the full read-modify-write-persist cycle, so concurrent mutations
//! never interleave partial writes and no update is lost. Persistence is
//! write-to-temp-then-rename: a failed write leaves the previous durable
//! state intact, and the in-memory mirror is rolled back to match.

mod types;

pub use types::*;

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct MediaStore {
    records: Mutex<HashMap<String, MediaRecord>>,
    db_path: PathBuf,
}

impl MediaStore {
    /// Open the store, loading any existing records.
    ///
    /// A corrupt store file is a hard error: refusing to start beats
    /// silently dropping records.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let records = if db_path.exists() {
            let content = std::fs::read_to_string(&db_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::internal(format!(
                    "store file {} is corrupt: {e}",
                    db_path.display()
                ))
            })?
        } else {
            HashMap::new()
        };

        Ok(Self {
            records: Mutex::new(records),
            db_path,
        })
    }

    /// Insert a new record.
    pub fn create(&self, record: MediaRecord) -> Result<()> {
        let mut records = self.records.lock();

        if records.contains_key(&record.public_id) {
            return Err(Error::DuplicateId(record.public_id));
        }
        if records
            .values()
            .any(|r| r.internal_id == record.internal_id)
        {
            return Err(Error::DuplicateId(record.internal_id));
        }

        let public_id = record.public_id.clone();
        records.insert(public_id.clone(), record);
        if let Err(e) = persist(&self.db_path, &records) {
            records.remove(&public_id);
            return Err(e);
        }
        Ok(())
    }

    /// Fetch a snapshot of a record.
    pub fn get(&self, public_id: &str) -> Result<MediaRecord> {
        let records = self.records.lock();
        records
            .get(public_id)
            .cloned()
            .ok_or_else(|| Error::not_found(public_id))
    }

    /// Apply an atomic read-modify-write to one record.
    ///
    /// `f` runs under the store lock; if it fails, or the write to disk
    /// fails, the record is left exactly as it was. This is the only
    /// sanctioned way to change a record, and any credential check that
    /// gates a mutation belongs inside `f` so check and change share the
    /// critical section.
    pub fn mutate<T>(
        &self,
        public_id: &str,
        f: impl FnOnce(&mut MediaRecord) -> Result<T>,
    ) -> Result<T> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(public_id)
            .ok_or_else(|| Error::not_found(public_id))?;

        let backup = record.clone();
        let value = match f(record) {
            Ok(v) => v,
            Err(e) => {
                *record = backup;
                return Err(e);
            }
        };
        record.updated_at = chrono::Utc::now();

        if let Err(e) = persist(&self.db_path, &records) {
            // Unreachable via get_mut above, but avoid unwrap on the re-borrow.
            if let Some(r) = records.get_mut(public_id) {
                *r = backup;
            }
            return Err(e);
        }
        Ok(value)
    }

    /// Mark a record deleted and drop it from the store, returning the
    /// final record so the caller can remove its files. A second delete
    /// yields `NotFound`.
    ///
    /// `guard` runs under the store lock before anything is removed, so a
    /// credential check and the deletion it authorizes share one critical
    /// section.
    pub fn delete(
        &self,
        public_id: &str,
        guard: impl FnOnce(&MediaRecord) -> Result<()>,
    ) -> Result<MediaRecord> {
        let mut records = self.records.lock();
        let record = records
            .get(public_id)
            .ok_or_else(|| Error::not_found(public_id))?;
        guard(record)?;

        // Guard passed; the entry is known to exist.
        let mut record = records
            .remove(public_id)
            .ok_or_else(|| Error::not_found(public_id))?;
        record.status = MediaStatus::Deleted;
        record.updated_at = chrono::Utc::now();

        if let Err(e) = persist(&self.db_path, &records) {
            records.insert(public_id.to_string(), record);
            return Err(e);
        }
        Ok(record)
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

/// Write the full record map durably: temp file in the same directory,
/// flushed, then atomically renamed over the store file.
fn persist(db_path: &Path, records: &HashMap<String, MediaRecord>) -> Result<()> {
    let dir = db_path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
        None => tempfile::NamedTempFile::new_in(".")?,
    };

    let json = serde_json::to_string_pretty(records)
        .map_err(|e| Error::internal(format!("failed to serialize store: {e}")))?;
    tmp.write_all(json.as_bytes())?;
    tmp.flush()?;

    tmp.persist(db_path)
        .map_err(|e| Error::Storage(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn temp_store() -> (MediaStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::open(dir.path().join("store.json")).unwrap();
        (store, dir)
    }

    #[test]
    fn create_get_round_trip() {
        let (store, _dir) = temp_store();
        let record = MediaRecord::new(60);
        let id = record.public_id.clone();

        store.create(record).unwrap();
        let fetched = store.get(&id).unwrap();
        assert_eq!(fetched.public_id, id);
        assert_eq!(fetched.status, MediaStatus::Processing);
    }

    #[test]
    fn duplicate_public_id_rejected() {
        let (store, _dir) = temp_store();
        let record = MediaRecord::new(60);
        store.create(record.clone()).unwrap();
        assert_matches!(store.create(record), Err(Error::DuplicateId(_)));
    }

    #[test]
    fn duplicate_internal_id_rejected() {
        let (store, _dir) = temp_store();
        let record = MediaRecord::new(60);
        store.create(record.clone()).unwrap();

        let mut clash = MediaRecord::new(60);
        clash.internal_id = record.internal_id;
        assert_matches!(store.create(clash), Err(Error::DuplicateId(_)));
    }

    #[test]
    fn mutate_persists_and_bumps_updated_at() {
        let (store, dir) = temp_store();
        let record = MediaRecord::new(60);
        let id = record.public_id.clone();
        let before = record.updated_at;
        store.create(record).unwrap();

        store
            .mutate(&id, |r| {
                r.status = MediaStatus::Ready;
                Ok(())
            })
            .unwrap();

        let fetched = store.get(&id).unwrap();
        assert_eq!(fetched.status, MediaStatus::Ready);
        assert!(fetched.updated_at >= before);

        // Reload from disk: the mutation survived the process.
        let reopened = MediaStore::open(dir.path().join("store.json")).unwrap();
        assert_eq!(reopened.get(&id).unwrap().status, MediaStatus::Ready);
    }

    #[test]
    fn failed_mutation_leaves_record_untouched() {
        let (store, _dir) = temp_store();
        let record = MediaRecord::new(60);
        let id = record.public_id.clone();
        store.create(record).unwrap();

        let result: Result<()> = store.mutate(&id, |r| {
            r.status = MediaStatus::Ready;
            Err(Error::AdminKeyMismatch)
        });
        assert_matches!(result, Err(Error::AdminKeyMismatch));
        assert_eq!(store.get(&id).unwrap().status, MediaStatus::Processing);
    }

    #[test]
    fn delete_is_not_idempotent_at_store_level() {
        let (store, _dir) = temp_store();
        let record = MediaRecord::new(60);
        let id = record.public_id.clone();
        store.create(record).unwrap();

        let deleted = store.delete(&id, |_| Ok(())).unwrap();
        assert_eq!(deleted.status, MediaStatus::Deleted);
        assert_matches!(store.get(&id), Err(Error::NotFound(_)));
        assert_matches!(store.delete(&id, |_| Ok(())), Err(Error::NotFound(_)));
    }

    #[test]
    fn failed_delete_guard_keeps_record() {
        let (store, _dir) = temp_store();
        let record = MediaRecord::new(60);
        let id = record.public_id.clone();
        store.create(record).unwrap();

        let result = store.delete(&id, |_| Err(Error::AdminKeyMismatch));
        assert_matches!(result, Err(Error::AdminKeyMismatch));
        assert!(store.get(&id).is_ok());
    }

    #[test]
    fn corrupt_store_file_refuses_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not valid json").unwrap();
        assert_matches!(MediaStore::open(&path), Err(Error::Internal(_)));
    }

    #[test]
    fn missing_file_starts_empty() {
        let (store, _dir) = temp_store();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }
}

use crate::config::Config;
use crate::error::{Error, Result};
use crate::state::{Application, Visibility};
use crate::storage::{check_insert, ApplicationStore};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;

/// File-backed store shared by every process pointed at the same data directory.
///
/// Files:
/// - `applications.bin`: bincode-serialized list of all applications
/// - `applications.bin.tmp`: temporary file for atomic snapshot writes
/// - `applications.lock`: advisory lock serializing writers across processes
///
/// Every mutation takes an exclusive `flock` on the lock file, re-reads the
/// snapshot, checks it, and writes the new snapshot before releasing. Reads
/// take no lock: the snapshot is only ever replaced by rename, so a reader
/// sees either the previous file or the next one whole.
pub struct FileStorage {
    path: PathBuf,
    tmp_path: PathBuf,
    lock_path: PathBuf,
}

/// Held for the duration of one read-check-write cycle.
struct SnapshotLock(File);

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl FileStorage {
    /// Open the store at the configured data directory, loading the snapshot if present.
    pub fn open(config: &Config) -> Result<Self> {
        FileStorage::with_path(config.get_store_path())
    }

    /// Open a store backed by a specific snapshot file (for testing)
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let tmp_path = path.with_extension("bin.tmp");
        let lock_path = path.with_extension("lock");
        // Surface a corrupt snapshot at open time rather than on first use.
        load_snapshot(&path)?;
        Ok(FileStorage {
            path,
            tmp_path,
            lock_path,
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Block until this handle is the only writer on the data directory.
    fn lock_exclusive(&self) -> Result<SnapshotLock> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create data directory: {}", e)))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| Error::Storage(format!("Failed to open lock file: {}", e)))?;
        file.lock_exclusive()
            .map_err(|e| Error::Storage(format!("Failed to lock {}: {}", self.lock_path.display(), e)))?;
        Ok(SnapshotLock(file))
    }

    /// Run one locked read-check-write cycle.
    ///
    /// `mutate` works on the records as they are on disk under the lock. It
    /// returns `Ok(None)` to leave the snapshot untouched, or `Ok(Some(value))`
    /// after changing them, in which case the new snapshot is persisted.
    fn write_locked<T, F>(&self, mutate: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut HashMap<String, Application>) -> Result<Option<T>>,
    {
        let _lock = self.lock_exclusive()?;
        let mut records = load_snapshot(&self.path)?;

        let outcome = mutate(&mut records)?;
        if outcome.is_some() {
            self.persist(&records)?;
        }
        Ok(outcome)
    }

    /// Write the full record set atomically (temp file, fsync, rename, fsync dir).
    fn persist(&self, records: &HashMap<String, Application>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create data directory: {}", e)))?;
        }

        let mut ordered: Vec<&Application> = records.values().collect();
        ordered.sort_by(|a, b| a.application_id.cmp(&b.application_id));
        let bytes = bincode::serialize(&ordered)
            .map_err(|e| Error::Storage(format!("Failed to serialize snapshot: {}", e)))?;

        let mut file = File::create(&self.tmp_path)
            .map_err(|e| Error::Storage(format!("Failed to create temp snapshot: {}", e)))?;
        file.write_all(&bytes)
            .map_err(|e| Error::Storage(format!("Failed to write snapshot: {}", e)))?;
        file.sync_all()
            .map_err(|e| Error::Storage(format!("Failed to fsync temp snapshot: {}", e)))?;
        drop(file);

        fs::rename(&self.tmp_path, &self.path)
            .map_err(|e| Error::Storage(format!("Failed to rename temp snapshot: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            let dir = File::open(parent)
                .map_err(|e| Error::Storage(format!("Failed to open data directory: {}", e)))?;
            dir.sync_all()
                .map_err(|e| Error::Storage(format!("Failed to fsync data directory: {}", e)))?;
        }

        Ok(())
    }
}

fn load_snapshot(path: &PathBuf) -> Result<HashMap<String, Application>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let mut file = File::open(path)
        .map_err(|e| Error::Storage(format!("Failed to open snapshot: {}", e)))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| Error::Storage(format!("Failed to read snapshot: {}", e)))?;

    let apps: Vec<Application> = bincode::deserialize(&data)
        .map_err(|e| Error::Storage(format!("Failed to deserialize snapshot: {}", e)))?;
    Ok(apps
        .into_iter()
        .map(|app| (app.application_id.clone(), app))
        .collect())
}

impl ApplicationStore for FileStorage {
    fn insert(&self, app: Application) -> Result<()> {
        self.write_locked(|records| {
            check_insert(records, &app)?;
            records.insert(app.application_id.clone(), app);
            Ok(Some(()))
        })?;
        Ok(())
    }

    fn get(&self, application_id: &str) -> Result<Option<Application>> {
        Ok(load_snapshot(&self.path)?.remove(application_id))
    }

    fn compare_and_swap(&self, expected_version: u64, next: &Application) -> Result<bool> {
        let swapped = self.write_locked(|records| {
            match records.get(&next.application_id) {
                Some(current) if current.version == expected_version => {}
                Some(_) => return Ok(None),
                None => return Err(Error::NotFound(next.application_id.clone())),
            }
            records.insert(next.application_id.clone(), next.clone());
            Ok(Some(()))
        })?;
        Ok(swapped.is_some())
    }

    fn scan(&self, visibility: &Visibility) -> Result<Vec<Application>> {
        Ok(load_snapshot(&self.path)?
            .into_values()
            .filter(|app| visibility.matches(app))
            .collect())
    }
}

//! Ledger storage backends.
//!
//! Storage is a keyed byte store: the key is the record's sequence number and
//! the value its serialized JSON. Backends never overwrite an existing key.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{LedgerError, Result};

/// Name of the lock file guarding a ledger directory.
pub const LOCK_FILE_NAME: &str = ".obligo-ledger.lock";

const RECORD_EXTENSION: &str = "json";

/// Keyed, append-only record store.
pub trait LedgerStorage: Send {
    /// Every stored sequence number, ascending.
    fn sequences(&self) -> Result<Vec<u64>>;

    fn read(&self, sequence: u64) -> Result<Vec<u8>>;

    /// Store `bytes` under a new key. Fails if the key is already taken.
    fn write(&mut self, sequence: u64, bytes: &[u8]) -> Result<()>;

    /// Release any resources held by the backend.
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// In-process storage for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    records: BTreeMap<u64, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the bytes stored under `sequence`.
    ///
    /// Bypasses the append-only rule; exists so tests can simulate tampering.
    pub fn overwrite(&mut self, sequence: u64, bytes: Vec<u8>) {
        self.records.insert(sequence, bytes);
    }

    pub fn remove(&mut self, sequence: u64) -> Option<Vec<u8>> {
        self.records.remove(&sequence)
    }
}

impl LedgerStorage for MemoryStorage {
    fn sequences(&self) -> Result<Vec<u64>> {
        Ok(self.records.keys().copied().collect())
    }

    fn read(&self, sequence: u64) -> Result<Vec<u8>> {
        self.records
            .get(&sequence)
            .cloned()
            .ok_or(LedgerError::SequenceNotFound(sequence))
    }

    fn write(&mut self, sequence: u64, bytes: &[u8]) -> Result<()> {
        if self.records.contains_key(&sequence) {
            return Err(LedgerError::SequenceExists(sequence));
        }
        self.records.insert(sequence, bytes.to_vec());
        Ok(())
    }
}

/// One JSON file per record (`00000001.json`, `00000002.json`, ...) in a
/// directory owned exclusively by this value.
#[derive(Debug)]
pub struct DirectoryStorage {
    dir: PathBuf,
    lock: Option<LockFile>,
}

impl DirectoryStorage {
    /// Open (creating if needed) a ledger directory and take its lock.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| LedgerError::io(&dir, e))?;
        let lock = LockFile::acquire(&dir)?;
        debug!(dir = %dir.display(), "opened ledger directory");
        Ok(Self {
            dir,
            lock: Some(lock),
        })
    }

    /// Remove the lock file a crashed process left in `dir`.
    ///
    /// Returns whether a lock was removed. Only call this when no live
    /// process has the ledger open; the lock file records the owner's pid.
    pub fn break_lock(dir: impl AsRef<Path>) -> Result<bool> {
        let path = dir.as_ref().join(LOCK_FILE_NAME);
        let owner = match fs::read_to_string(&path) {
            Ok(owner) => owner,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(LedgerError::io(&path, e)),
        };
        fs::remove_file(&path).map_err(|e| LedgerError::io(&path, e))?;
        warn!(path = %path.display(), owner_pid = owner.trim(), "broke ledger lock");
        Ok(true)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, sequence: u64) -> PathBuf {
        self.dir.join(record_file_name(sequence))
    }
}

impl LedgerStorage for DirectoryStorage {
    fn sequences(&self) -> Result<Vec<u64>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| LedgerError::io(&self.dir, e))?;
        let mut sequences = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LedgerError::io(&self.dir, e))?;
            if let Some(sequence) = parse_record_file_name(&entry.path()) {
                sequences.push(sequence);
            }
        }
        sequences.sort_unstable();
        Ok(sequences)
    }

    fn read(&self, sequence: u64) -> Result<Vec<u8>> {
        let path = self.record_path(sequence);
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LedgerError::SequenceNotFound(sequence),
            _ => LedgerError::io(&path, e),
        })
    }

    fn write(&mut self, sequence: u64, bytes: &[u8]) -> Result<()> {
        let path = self.record_path(sequence);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => LedgerError::SequenceExists(sequence),
                _ => LedgerError::io(&path, e),
            })?;
        file.write_all(bytes).map_err(|e| LedgerError::io(&path, e))?;
        file.sync_all().map_err(|e| LedgerError::io(&path, e))
    }

    fn close(mut self) -> Result<()> {
        match self.lock.take() {
            Some(lock) => lock.release(),
            None => Ok(()),
        }
    }
}

fn record_file_name(sequence: u64) -> String {
    format!("{sequence:08}.{RECORD_EXTENSION}")
}

/// Sequence number of a record file; `None` for anything else in the directory.
///
/// Only names `record_file_name` produces are accepted, so `1.json` never
/// aliases `00000001.json`.
fn parse_record_file_name(path: &Path) -> Option<u64> {
    if path.extension()? != RECORD_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let sequence = stem.parse().ok()?;
    (path.file_name()?.to_str()? == record_file_name(sequence)).then_some(sequence)
}

/// Exclusive lock on a ledger directory, held for the lifetime of the value.
#[derive(Debug)]
struct LockFile {
    path: PathBuf,
    released: bool,
}

impl LockFile {
    fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE_NAME);
        let mut file: File = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => LedgerError::Locked {
                    path: dir.to_path_buf(),
                },
                _ => LedgerError::io(&path, e),
            })?;
        writeln!(file, "{}", std::process::id()).map_err(|e| LedgerError::io(&path, e))?;
        Ok(Self {
            path,
            released: false,
        })
    }

    fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_file(&self.path).map_err(|e| LedgerError::io(&self.path, e))
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(error) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), %error, "failed to remove ledger lock file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_refuses_overwrite() {
        let mut storage = MemoryStorage::new();
        storage.write(1, b"a").unwrap();
        assert!(matches!(storage.write(1, b"b"), Err(LedgerError::SequenceExists(1))));
        assert_eq!(storage.read(1).unwrap(), b"a");
        assert_eq!(storage.sequences().unwrap(), vec![1]);
    }

    #[test]
    fn record_file_names_round_trip() {
        assert_eq!(record_file_name(1), "00000001.json");
        assert_eq!(parse_record_file_name(Path::new("/x/00000042.json")), Some(42));
        assert_eq!(parse_record_file_name(Path::new("/x/123456789.json")), Some(123_456_789));
        assert_eq!(parse_record_file_name(Path::new("/x/.obligo-ledger.lock")), None);
        assert_eq!(parse_record_file_name(Path::new("/x/notes.json")), None);
        assert_eq!(parse_record_file_name(Path::new("/x/00000001.tmp")), None);
        assert_eq!(parse_record_file_name(Path::new("/x/1.json")), None);
        assert_eq!(parse_record_file_name(Path::new("/x/000000001.json")), None);
    }

    #[test]
    fn unpadded_names_do_not_alias_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DirectoryStorage::open(dir.path()).unwrap();
        storage.write(1, b"{}").unwrap();
        fs::write(dir.path().join("1.json"), "{}").unwrap();
        fs::write(dir.path().join("0002.json"), "{}").unwrap();
        assert_eq!(storage.sequences().unwrap(), vec![1]);
    }

    #[test]
    fn stale_lock_can_be_broken() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!DirectoryStorage::break_lock(dir.path()).unwrap());

        fs::write(dir.path().join(LOCK_FILE_NAME), "4242\n").unwrap();
        assert!(matches!(DirectoryStorage::open(dir.path()), Err(LedgerError::Locked { .. })));

        assert!(DirectoryStorage::break_lock(dir.path()).unwrap());
        let storage = DirectoryStorage::open(dir.path()).unwrap();
        storage.close().unwrap();
    }

    #[test]
    fn directory_storage_lists_only_record_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DirectoryStorage::open(dir.path()).unwrap();
        storage.write(2, b"{}").unwrap();
        storage.write(1, b"{}").unwrap();
        fs::write(dir.path().join("README.txt"), "ignored").unwrap();
        assert_eq!(storage.sequences().unwrap(), vec![1, 2]);
        assert!(matches!(storage.write(2, b"{}"), Err(LedgerError::SequenceExists(2))));
        assert!(matches!(storage.read(9), Err(LedgerError::SequenceNotFound(9))));
    }

    #[test]
    fn second_open_is_locked_until_close() {
        let dir = tempfile::tempdir().unwrap();
        let first = DirectoryStorage::open(dir.path()).unwrap();
        assert!(dir.path().join(LOCK_FILE_NAME).exists());
        assert!(matches!(DirectoryStorage::open(dir.path()), Err(LedgerError::Locked { .. })));

        first.close().unwrap();
        assert!(!dir.path().join(LOCK_FILE_NAME).exists());
        DirectoryStorage::open(dir.path()).unwrap();
    }

    #[test]
    fn dropping_storage_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        drop(DirectoryStorage::open(dir.path()).unwrap());
        DirectoryStorage::open(dir.path()).unwrap();
    }
}

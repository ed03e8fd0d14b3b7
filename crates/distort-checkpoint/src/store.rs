use std::path::{Path, PathBuf};

use crate::error::CheckpointError;
use crate::file_backed::FileBackedCheckpoint;
use crate::key::slug;
use crate::record::Checkpoint;
use crate::shared::SharedCheckpoint;

/// Job checkpoint storage, keyed by `(username, filename)` (spec §6.3).
/// Two backends implement the same durability contract; `Shared` is the
/// default, `FileBacked` is the fallback for hosts where mapping shared
/// memory segments isn't available or desired.
pub enum CheckpointStore {
    Shared { dir: PathBuf },
    FileBacked { dir: PathBuf },
}

impl CheckpointStore {
    pub fn shared(dir: impl Into<PathBuf>) -> Self {
        Self::Shared { dir: dir.into() }
    }

    pub fn file_backed(dir: impl Into<PathBuf>) -> Self {
        Self::FileBacked { dir: dir.into() }
    }

    pub fn load(&self, username: &str, filename: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        match self {
            Self::Shared { dir } => {
                let path = dir.join(slug(username, filename));
                Ok(SharedCheckpoint::open_or_create(&path)?.load())
            }
            Self::FileBacked { dir } => {
                let path = dir.join(slug(username, filename));
                FileBackedCheckpoint::at(path).load()
            }
        }
    }

    pub fn store(
        &self,
        username: &str,
        filename: &str,
        checkpoint: Checkpoint,
    ) -> Result<(), CheckpointError> {
        match self {
            Self::Shared { dir } => {
                let path = dir.join(slug(username, filename));
                SharedCheckpoint::open_or_create(&path)?.store(checkpoint);
                Ok(())
            }
            Self::FileBacked { dir } => {
                let path = dir.join(slug(username, filename));
                FileBackedCheckpoint::at(path).store(checkpoint)
            }
        }
    }

    pub fn clear(&self, username: &str, filename: &str) -> Result<(), CheckpointError> {
        match self {
            Self::Shared { dir } => {
                let path = dir.join(slug(username, filename));
                SharedCheckpoint::open_or_create(&path)?.clear();
                Ok(())
            }
            Self::FileBacked { dir } => {
                let path = dir.join(slug(username, filename));
                FileBackedCheckpoint::at(path).clear()
            }
        }
    }

    pub fn dir(&self) -> &Path {
        match self {
            Self::Shared { dir } | Self::FileBacked { dir } => dir,
        }
    }

    /// Every key with a checkpoint region on disk right now, for an orphan
    /// sweep to cross-reference against the parking directory. Missing
    /// directories are treated as empty rather than an error, since a fresh
    /// install has nothing to sweep yet.
    pub fn keys(&self) -> Result<Vec<String>, CheckpointError> {
        let dir = self.dir();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CheckpointError::Io { path: dir.display().to_string(), source })
            }
        };
        Ok(entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !name.ends_with(".tmp"))
            .collect())
    }

    /// Clear a checkpoint identified by its already-computed key rather
    /// than by `(username, filename)`, for sweeps that only have the
    /// filesystem name to go on.
    pub fn clear_key(&self, key: &str) -> Result<(), CheckpointError> {
        match self {
            Self::Shared { dir } => {
                SharedCheckpoint::open_or_create(&dir.join(key))?.clear();
                Ok(())
            }
            Self::FileBacked { dir } => FileBackedCheckpoint::at(dir.join(key)).clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_then_file_backed_stores() -> Vec<CheckpointStore> {
        let shared_dir = tempfile::tempdir().unwrap();
        let file_dir = tempfile::tempdir().unwrap();
        vec![
            CheckpointStore::shared(shared_dir.into_path()),
            CheckpointStore::file_backed(file_dir.into_path()),
        ]
    }

    #[test]
    fn both_backends_round_trip_a_checkpoint() {
        for store in shared_then_file_backed_stores() {
            assert_eq!(store.load("alice", "beach.jpg").unwrap(), None);
            store.store("alice", "beach.jpg", Checkpoint { stage: 4, n_packets: 9, n_done: 9 }).unwrap();
            assert_eq!(
                store.load("alice", "beach.jpg").unwrap(),
                Some(Checkpoint { stage: 4, n_packets: 9, n_done: 9 })
            );
            store.clear("alice", "beach.jpg").unwrap();
            assert_eq!(store.load("alice", "beach.jpg").unwrap(), None);
        }
    }

    #[test]
    fn distinct_keys_do_not_collide() {
        for store in shared_then_file_backed_stores() {
            store.store("alice", "a.txt", Checkpoint { stage: 1, n_packets: 1, n_done: 0 }).unwrap();
            store.store("bob", "a.txt", Checkpoint { stage: 2, n_packets: 2, n_done: 1 }).unwrap();
            assert_eq!(store.load("alice", "a.txt").unwrap().unwrap().stage, 1);
            assert_eq!(store.load("bob", "a.txt").unwrap().unwrap().stage, 2);
        }
    }
}

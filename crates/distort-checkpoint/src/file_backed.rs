use std::path::{Path, PathBuf};

use crate::error::CheckpointError;
use crate::record::Checkpoint;

/// File-backed checkpoint, for platforms or deployments where a shared
/// memory segment isn't wanted. Stored as three newline-separated decimal
/// fields; writes go to a sibling `.tmp` file and are renamed into place so
/// a reader never observes a half-written record (spec §6.3 Design Notes).
pub struct FileBackedCheckpoint {
    path: PathBuf,
}

impl FileBackedCheckpoint {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CheckpointError::Io { path: self.path.display().to_string(), source })
            }
        };

        let mut fields = text.lines();
        let mut parse_field = || -> Option<u32> { fields.next()?.trim().parse().ok() };
        let stage = parse_field();
        let n_packets = parse_field();
        let n_done = parse_field();
        match (stage, n_packets, n_done) {
            (Some(stage), Some(n_packets), Some(n_done)) => {
                Ok(Some(Checkpoint { stage, n_packets, n_done }))
            }
            _ => Err(CheckpointError::Corrupt { path: self.path.display().to_string() }),
        }
    }

    pub fn store(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CheckpointError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let tmp = tmp_path(&self.path);
        let contents = format!("{}\n{}\n{}\n", checkpoint.stage, checkpoint.n_packets, checkpoint.n_done);
        std::fs::write(&tmp, contents)
            .map_err(|source| CheckpointError::Io { path: tmp.display().to_string(), source })?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|source| CheckpointError::Io { path: self.path.display().to_string(), source })
    }

    pub fn clear(&self) -> Result<(), CheckpointError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckpointError::Io { path: self.path.display().to_string(), source }),
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

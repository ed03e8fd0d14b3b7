use std::ptr::NonNull;

use shared_memory::{Shmem, ShmemConf, ShmemError};
use tracing::debug;

use crate::error::CheckpointError;
use crate::record::{Checkpoint, CheckpointRecord};

/// One checkpoint record mapped into a named shared memory segment. Opening
/// the same `flink` path from a second process maps the same bytes, so a
/// worker that crashes and restarts (or a second worker process taking over
/// the same class) sees whatever the previous holder last stored.
///
/// Mirrors the open-or-create-by-flink shape used for long-lived shared
/// state elsewhere in this stack: try `create`, and if the link already
/// exists, `open` it instead of treating that as an error.
pub struct SharedCheckpoint {
    inner: NonNull<CheckpointRecord>,
    _shmem: Shmem,
}

unsafe impl Send for SharedCheckpoint {}
unsafe impl Sync for SharedCheckpoint {}

impl SharedCheckpoint {
    pub fn open_or_create(path: &std::path::Path) -> Result<Self, CheckpointError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CheckpointError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let shmem = match ShmemConf::new().size(std::mem::size_of::<CheckpointRecord>()).flink(path).create() {
            Ok(shmem) => {
                let ptr = shmem.as_ptr().cast::<CheckpointRecord>();
                unsafe { std::ptr::write(ptr, CheckpointRecord::default()) };
                debug!(path = %path.display(), "checkpoint: created shared segment");
                shmem
            }
            Err(ShmemError::LinkExists) => {
                let shmem = ShmemConf::new().flink(path).open().map_err(|source| {
                    CheckpointError::Shmem { key: path.display().to_string(), source }
                })?;
                debug!(path = %path.display(), "checkpoint: attached to existing shared segment");
                shmem
            }
            Err(source) => {
                return Err(CheckpointError::Shmem { key: path.display().to_string(), source })
            }
        };

        let inner = NonNull::new(shmem.as_ptr().cast::<CheckpointRecord>())
            .expect("shmem pointer is never null");

        Ok(Self { inner, _shmem: shmem })
    }

    fn record(&self) -> &CheckpointRecord {
        unsafe { self.inner.as_ref() }
    }

    pub fn load(&self) -> Option<Checkpoint> {
        self.record().load()
    }

    pub fn store(&self, checkpoint: Checkpoint) {
        self.record().store(checkpoint);
    }

    pub fn clear(&self) {
        self.record().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_handles_to_the_same_flink_see_the_same_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.shmem");

        let first = SharedCheckpoint::open_or_create(&path).unwrap();
        first.store(Checkpoint { stage: 1, n_packets: 5, n_done: 2 });

        let second = SharedCheckpoint::open_or_create(&path).unwrap();
        assert_eq!(second.load(), Some(Checkpoint { stage: 1, n_packets: 5, n_done: 2 }));
    }
}

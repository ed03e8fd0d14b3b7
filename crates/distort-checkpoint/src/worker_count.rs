use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};

use shared_memory::{Shmem, ShmemConf, ShmemError};

use crate::error::CheckpointError;

/// Live worker count for one media class, shared across every worker
/// process of that class. A worker increments on startup and decrements on
/// shutdown; the registry reads it to judge whether a class still has any
/// primary candidate left (spec §5, replacing the reference implementation's
/// named semaphore with a plain atomic, since a count is all that's needed).
pub struct WorkerCount {
    inner: NonNull<AtomicU32>,
    _shmem: Shmem,
}

unsafe impl Send for WorkerCount {}
unsafe impl Sync for WorkerCount {}

impl WorkerCount {
    pub fn open_or_create(path: &std::path::Path) -> Result<Self, CheckpointError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CheckpointError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let shmem = match ShmemConf::new().size(std::mem::size_of::<AtomicU32>()).flink(path).create() {
            Ok(shmem) => {
                let ptr = shmem.as_ptr().cast::<AtomicU32>();
                unsafe { std::ptr::write(ptr, AtomicU32::new(0)) };
                shmem
            }
            Err(ShmemError::LinkExists) => ShmemConf::new()
                .flink(path)
                .open()
                .map_err(|source| CheckpointError::Shmem { key: path.display().to_string(), source })?,
            Err(source) => {
                return Err(CheckpointError::Shmem { key: path.display().to_string(), source })
            }
        };

        let inner =
            NonNull::new(shmem.as_ptr().cast::<AtomicU32>()).expect("shmem pointer is never null");
        Ok(Self { inner, _shmem: shmem })
    }

    fn atomic(&self) -> &AtomicU32 {
        unsafe { self.inner.as_ref() }
    }

    pub fn get(&self) -> u32 {
        self.atomic().load(Ordering::Acquire)
    }

    /// Returns the count after incrementing.
    pub fn increment(&self) -> u32 {
        self.atomic().fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns the count after decrementing. Saturates at zero so a
    /// double-decrement (e.g. a worker that never incremented) can't wrap.
    pub fn decrement(&self) -> u32 {
        self.atomic()
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0)
            .saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_and_decrements_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text.count");

        let a = WorkerCount::open_or_create(&path).unwrap();
        let b = WorkerCount::open_or_create(&path).unwrap();

        assert_eq!(a.increment(), 1);
        assert_eq!(b.increment(), 2);
        assert_eq!(a.get(), 2);
        assert_eq!(b.decrement(), 1);
        assert_eq!(a.get(), 1);
    }

    #[test]
    fn decrement_saturates_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let count = WorkerCount::open_or_create(&dir.path().join("media.count")).unwrap();
        assert_eq!(count.decrement(), 0);
        assert_eq!(count.decrement(), 0);
    }
}

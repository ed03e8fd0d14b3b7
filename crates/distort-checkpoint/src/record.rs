use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// In-progress-job bookmark (spec §6.3): which stage a job last reached and
/// how many packets of the file transfer are already on disk. A worker or
/// client that restarts resumes from here instead of redoing completed work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Checkpoint {
    pub stage: u32,
    pub n_packets: u32,
    pub n_done: u32,
}

/// The raw layout placed in a shared memory segment. `present` distinguishes
/// a freshly-mapped all-zero region (no checkpoint recorded yet) from a
/// genuine checkpoint whose stage happens to be zero.
#[repr(C)]
pub struct CheckpointRecord {
    present: AtomicU8,
    stage: AtomicU32,
    n_packets: AtomicU32,
    n_done: AtomicU32,
}

impl Default for CheckpointRecord {
    fn default() -> Self {
        Self {
            present: AtomicU8::new(0),
            stage: AtomicU32::new(0),
            n_packets: AtomicU32::new(0),
            n_done: AtomicU32::new(0),
        }
    }
}

impl CheckpointRecord {
    pub fn load(&self) -> Option<Checkpoint> {
        if self.present.load(Ordering::Acquire) == 0 {
            return None;
        }
        Some(Checkpoint {
            stage: self.stage.load(Ordering::Acquire),
            n_packets: self.n_packets.load(Ordering::Acquire),
            n_done: self.n_done.load(Ordering::Acquire),
        })
    }

    pub fn store(&self, checkpoint: Checkpoint) {
        self.stage.store(checkpoint.stage, Ordering::Release);
        self.n_packets.store(checkpoint.n_packets, Ordering::Release);
        self.n_done.store(checkpoint.n_done, Ordering::Release);
        self.present.store(1, Ordering::Release);
    }

    pub fn clear(&self) {
        self.present.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_until_first_store() {
        let record = CheckpointRecord::default();
        assert_eq!(record.load(), None);
        record.store(Checkpoint { stage: 2, n_packets: 10, n_done: 4 });
        assert_eq!(record.load(), Some(Checkpoint { stage: 2, n_packets: 10, n_done: 4 }));
        record.clear();
        assert_eq!(record.load(), None);
    }
}

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use distort_checkpoint::{CheckpointStore, WorkerCount};
use distort_core::Class;

/// Shared, per-process state for one worker. Replaces the reference
/// implementation's file-scope globals with an explicit context passed by
/// reference into every per-connection task (spec §9).
pub struct WorkerContext {
    pub registry_addr: SocketAddr,
    pub class: Class,
    pub work_dir: PathBuf,
    pub parking_dir: PathBuf,
    pub checkpoints: CheckpointStore,
    pub worker_count: WorkerCount,
    pub exit: Arc<AtomicBool>,
    pub registry_dead: Arc<AtomicBool>,
    pub is_primary: Arc<AtomicBool>,
}

impl WorkerContext {
    pub fn is_exiting(&self) -> bool {
        self.exit.load(Ordering::Relaxed)
    }
}

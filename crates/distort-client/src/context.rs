use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Shared, per-process state every job task and the liveness task read.
/// Replaces the reference implementation's file-scope globals (`exit_program`,
/// the Registry socket) with an explicit context passed by reference.
pub struct ClientContext {
    pub registry_addr: SocketAddr,
    pub username: String,
    pub folder_path: PathBuf,
    pub exit: Arc<AtomicBool>,
    pub registry_dead: Arc<AtomicBool>,
}

impl ClientContext {
    pub fn new(registry_addr: SocketAddr, username: String, folder_path: PathBuf) -> Self {
        Self {
            registry_addr,
            username,
            folder_path,
            exit: Arc::new(AtomicBool::new(false)),
            registry_dead: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_exiting(&self) -> bool {
        self.exit.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn is_registry_dead(&self) -> bool {
        self.registry_dead.load(std::sync::atomic::Ordering::Relaxed)
    }
}

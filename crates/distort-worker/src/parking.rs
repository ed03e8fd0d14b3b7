use std::path::Path;

use distort_checkpoint::checkpoint_key as slug;
use tracing::{info, warn};

use crate::context::WorkerContext;

/// Shutdown-time disposal of an in-flight job's working file (spec §4.4
/// "park-vs-discard"). If another worker of this class is still registered,
/// the file is parked so the next worker to adopt the checkpoint can resume
/// it; otherwise there is nobody left to resume it, so the file and its
/// checkpoint are discarded. Parked files are named with the same
/// `(username, filename)` key the checkpoint store uses, not the raw
/// `{username}_{filename}` form, so a later orphan sweep can pair a parked
/// file with its checkpoint by filename alone (see `sweep`).
pub fn park_or_discard(ctx: &WorkerContext, username: &str, filename: &str, file_path: &Path) {
    if ctx.worker_count.get() > 1 {
        park(ctx, username, filename, file_path);
    } else {
        discard(ctx, username, filename, file_path);
    }
}

fn park(ctx: &WorkerContext, username: &str, filename: &str, file_path: &Path) {
    if !file_path.exists() {
        return;
    }
    let dest = ctx.parking_dir.join(slug(username, filename));
    match std::fs::rename(file_path, &dest) {
        Ok(()) => info!(username, filename, dest = %dest.display(), "worker: parked job for handoff"),
        Err(e) => warn!(username, filename, error = %e, "worker: failed to park job file"),
    }
}

fn discard(ctx: &WorkerContext, username: &str, filename: &str, file_path: &Path) {
    let _ = std::fs::remove_file(file_path);
    if let Err(e) = ctx.checkpoints.clear(username, filename) {
        warn!(username, filename, error = %e, "worker: failed to clear checkpoint on discard");
    } else {
        info!(username, filename, "worker: discarded job, no other worker to resume it");
    }
}

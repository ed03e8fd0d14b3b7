use std::collections::HashSet;

use tracing::{info, warn};

use crate::context::WorkerContext;

/// Reconcile the checkpoint store against the parking directory at worker
/// startup (spec §9 Design Notes: "sweep orphaned regions with no
/// referencing parking file, or validate and claim on worker startup").
/// Both sides are keyed by the same `checkpoint_key(username, filename)`
/// string, so the sweep never needs to decode a filename back into its
/// parts — it only ever compares sets of keys:
///
/// - a checkpoint with no parking file and no in-progress owner can never
///   be resumed (the bytes it would resume are gone), so it's cleared;
/// - a parked file with no checkpoint is leftover from a crash between
///   renaming the file into the parking directory and persisting the
///   checkpoint that points at it, so it's deleted.
///
/// A worker that is mid-job at the moment this runs does not exist yet —
/// this only ever runs once, before the worker starts accepting
/// connections — so there is no race against a live job holding a
/// checkpoint that happens to have no parked file (e.g. one still being
/// received directly into `work_dir`).
pub fn sweep_orphans(ctx: &WorkerContext) {
    let checkpoint_keys: HashSet<String> = match ctx.checkpoints.keys() {
        Ok(keys) => keys.into_iter().collect(),
        Err(e) => {
            warn!(error = %e, "worker: could not list checkpoint keys for startup sweep");
            return;
        }
    };

    let parked_keys: HashSet<String> = match std::fs::read_dir(&ctx.parking_dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
        Err(e) => {
            warn!(error = %e, "worker: could not list parking directory for startup sweep");
            return;
        }
    };

    let plan = plan_sweep(&checkpoint_keys, &parked_keys, |key| ctx.work_dir.join(key).exists());

    for key in plan.checkpoints_to_clear {
        info!(key, "worker: clearing orphaned checkpoint with no resumable file");
        if let Err(e) = ctx.checkpoints.clear_key(&key) {
            warn!(key, error = %e, "worker: failed to clear orphaned checkpoint");
        }
    }

    for key in plan.parked_files_to_remove {
        info!(key, "worker: removing parked file with no owning checkpoint");
        if let Err(e) = std::fs::remove_file(ctx.parking_dir.join(&key)) {
            warn!(key, error = %e, "worker: failed to remove orphaned parked file");
        }
    }
}

struct SweepPlan {
    checkpoints_to_clear: Vec<String>,
    parked_files_to_remove: Vec<String>,
}

/// Pure decision logic, kept separate from the filesystem calls above so it
/// can be tested without standing up a real `WorkerContext`.
fn plan_sweep(
    checkpoint_keys: &HashSet<String>,
    parked_keys: &HashSet<String>,
    work_dir_has: impl Fn(&str) -> bool,
) -> SweepPlan {
    let checkpoints_to_clear = checkpoint_keys
        .difference(parked_keys)
        .filter(|key| !work_dir_has(key))
        .cloned()
        .collect();
    let parked_files_to_remove = parked_keys.difference(checkpoint_keys).cloned().collect();
    SweepPlan { checkpoints_to_clear, parked_files_to_remove }
}

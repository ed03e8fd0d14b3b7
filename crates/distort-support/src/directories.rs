use std::path::PathBuf;

use directories::BaseDirs;
use tracing::warn;

/// Root directory for an app's persisted state: `~/.local/share/<app_name>`
/// on Linux, with a `/tmp` fallback when the platform has no home directory.
pub fn local_share_dir<S: AsRef<str>>(app_name: S) -> PathBuf {
    let Some(base_dirs) = BaseDirs::new() else {
        warn!(app_name = app_name.as_ref(), "couldn't find basedirs, storing data in /tmp");
        return PathBuf::from(format!("/tmp/{}", app_name.as_ref()));
    };
    base_dirs.data_dir().join(app_name.as_ref())
}

/// Directory workers of the same class use to park an in-flight job's
/// working file and durable checkpoint when they shut down gracefully
/// without being the last worker of their class.
pub fn parking_dir<S: AsRef<str>>(app_name: S, class: &str) -> PathBuf {
    local_share_dir(app_name).join("parking").join(class)
}

/// Directory holding shared-memory-backed checkpoint regions, grouped by
/// class so that a sweep can be scoped to one class at a time.
pub fn checkpoint_dir<S: AsRef<str>>(app_name: S, class: &str) -> PathBuf {
    local_share_dir(app_name).join("checkpoints").join(class)
}

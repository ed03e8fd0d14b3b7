mod context;
mod error;
mod job;
mod liveness;
mod registry_client;
mod worker_dialogue;

pub use context::ClientContext;
pub use error::SessionError;
pub use job::{run as run_job, JobOutcome};
pub use liveness::spawn as spawn_liveness;
pub use registry_client::announce;

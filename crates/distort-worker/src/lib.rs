mod client_dialogue;
mod context;
mod control;
mod error;
mod job;
mod parking;
mod registry_client;
mod sweep;

pub use context::WorkerContext;
pub use control::spawn as spawn_control;
pub use error::SessionError;
pub use job::run as run_job;
pub use registry_client::announce;
pub use sweep::sweep_orphans;

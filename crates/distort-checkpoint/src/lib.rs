mod error;
mod file_backed;
mod key;
mod record;
mod shared;
mod store;
mod worker_count;

pub use error::CheckpointError;
pub use file_backed::FileBackedCheckpoint;
pub use key::slug as checkpoint_key;
pub use record::{Checkpoint, CheckpointRecord};
pub use shared::SharedCheckpoint;
pub use store::CheckpointStore;
pub use worker_count::WorkerCount;

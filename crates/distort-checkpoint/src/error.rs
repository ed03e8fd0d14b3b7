use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("shared memory error for {key}: {source}")]
    Shmem { key: String, source: shared_memory::ShmemError },
    #[error("checkpoint directory {path} could not be created: {source}")]
    CreateDir { path: String, source: std::io::Error },
    #[error("checkpoint file {path} could not be read or written: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("checkpoint file {path} is the wrong size for a record")]
    Corrupt { path: String },
}

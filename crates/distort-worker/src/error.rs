use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] distort_checkpoint::CheckpointError),
    #[error("transfer error: {0}")]
    Transfer(#[from] distort_transfer::TransferError),
    #[error("client closed the connection")]
    ClientClosed,
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("reassembled upload failed MD5 verification")]
    ReassemblyFailed,
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("registry is unreachable")]
    RegistryUnreachable,
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("malformed reply from peer")]
    MalformedReply,
}

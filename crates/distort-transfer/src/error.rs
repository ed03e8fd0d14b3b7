use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("peer closed the connection mid-transfer")]
    PeerClosed,
    #[error("transfer interrupted by signal")]
    Interrupted,
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("unexpected frame type during transfer: {0:?}")]
    UnexpectedFrame(distort_proto::FrameType),
}

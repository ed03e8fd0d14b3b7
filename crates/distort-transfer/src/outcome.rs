use crate::error::TransferError;

/// Result of a full `send`/`receive` call. Interruption is a first-class
/// outcome rather than an error: a cancelled transfer is expected to resume
/// later from the progress it leaves behind (spec §4.2, §6.3), while
/// `Failed` means the connection or local filesystem is no longer usable.
#[derive(Debug)]
pub enum TransferOutcome {
    Completed,
    Interrupted,
    Failed(TransferError),
}

impl From<TransferError> for TransferOutcome {
    fn from(err: TransferError) -> Self {
        TransferOutcome::Failed(err)
    }
}

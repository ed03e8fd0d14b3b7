use std::path::PathBuf;

use crate::{Class, Username};

/// Packet payload size: every `DATA` frame carries at most this many bytes
/// (spec §3, §6.2 — `FRAME_SIZE` 256 minus the 12 bytes of header fields).
pub const PACKET_SIZE: u64 = 244;

/// Derive the number of packets needed to carry `filesize` bytes.
pub fn n_packets_for(filesize: u64) -> u32 {
    filesize.div_ceil(PACKET_SIZE) as u32
}

/// Client-side per-job state machine position (spec §4.3).
///
/// Deliberately an explicit enumeration rather than the source's `goto`
/// jumps back to `enviaMetadades` (spec §9): every "recoverable fault"
/// transition in §4.3's table is realised as returning to `SendMeta`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientStage {
    RequestPrimary,
    SendMeta,
    SendFile,
    AwaitCheck,
    RecvMeta,
    RecvFile,
    VerifyAndBye,
    Done,
}

/// Worker-side per-job state machine position (spec §4.4).
///
/// Encoded with explicit discriminants because this is also the `stage`
/// field persisted verbatim in the durable checkpoint record (spec §6.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum WorkerStage {
    RecvFile = 0,
    Verify = 1,
    Distort = 2,
    SendMeta = 3,
    SendFile = 4,
    AwaitCheck = 5,
    Bye = 6,
}

impl TryFrom<u32> for WorkerStage {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WorkerStage::RecvFile),
            1 => Ok(WorkerStage::Verify),
            2 => Ok(WorkerStage::Distort),
            3 => Ok(WorkerStage::SendMeta),
            4 => Ok(WorkerStage::SendFile),
            5 => Ok(WorkerStage::AwaitCheck),
            6 => Ok(WorkerStage::Bye),
            other => Err(other),
        }
    }
}

/// Client-owned record of one distortion job (spec §3 "Job (client-side)").
#[derive(Clone, Debug)]
pub struct Job {
    pub username: Username,
    pub filename: String,
    pub file_path: PathBuf,
    pub filesize: u64,
    pub md5: String,
    pub factor: u32,
    pub stage: ClientStage,
    pub n_packets: u32,
    pub n_done: u32,
    pub class: Class,
}

impl Job {
    pub fn new(
        username: Username,
        filename: String,
        file_path: PathBuf,
        filesize: u64,
        md5: String,
        factor: u32,
        class: Class,
    ) -> Self {
        Self {
            username,
            filename,
            file_path,
            filesize,
            md5,
            factor,
            stage: ClientStage::RequestPrimary,
            n_packets: n_packets_for(filesize),
            n_done: 0,
            class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_count_rounds_up() {
        assert_eq!(n_packets_for(0), 0);
        assert_eq!(n_packets_for(1), 1);
        assert_eq!(n_packets_for(244), 1);
        assert_eq!(n_packets_for(245), 2);
        assert_eq!(n_packets_for(500), 3);
    }

    #[test]
    fn worker_stage_round_trips_through_u32() {
        for s in [
            WorkerStage::RecvFile,
            WorkerStage::Verify,
            WorkerStage::Distort,
            WorkerStage::SendMeta,
            WorkerStage::SendFile,
            WorkerStage::AwaitCheck,
            WorkerStage::Bye,
        ] {
            assert_eq!(WorkerStage::try_from(s as u32), Ok(s));
        }
        assert_eq!(WorkerStage::try_from(99), Err(99));
    }
}

use std::fs::File;
use std::io::Read;
use std::net::TcpStream;
use std::path::PathBuf;

use distort_checkpoint::Checkpoint;
use distort_core::{n_packets_for, WorkerStage};
use distort_transfer::{Progress, TransferEngine, TransferOutcome};
use md5::{Digest, Md5};
use tracing::{info, warn};

use distort_checkpoint::checkpoint_key as slug;

use crate::client_dialogue;
use crate::context::WorkerContext;
use crate::error::SessionError;
use crate::parking::park_or_discard;

struct WorkerJob {
    username: String,
    filename: String,
    file_path: PathBuf,
    md5: String,
    factor: u32,
    stage: WorkerStage,
    n_packets: u32,
    n_done: u32,
    filesize_out: u64,
    md5_out: String,
}

/// Service one accepted client connection end to end: metadata handshake,
/// checkpoint adoption, the mirror transfer/verify/distort/transfer
/// sequence, and cleanup (spec §4.4). Each accepted connection runs this on
/// its own thread. There is one working file per job on disk; `Distort`
/// replaces it in place, matching the reference design's "replace working
/// file with output" rather than keeping input and output side by side.
pub fn run(ctx: &WorkerContext, mut stream: TcpStream) -> Result<(), SessionError> {
    if !ctx.is_primary.load(std::sync::atomic::Ordering::Relaxed) {
        // The Registry only ever advertises the class's primary, so a
        // connection arriving here before this worker has seen its own
        // ASSIGN_PRIMARY means the two disagree about who holds the role.
        warn!("worker: servicing a connection while not marked primary for its class");
    }
    let request = client_dialogue::recv_meta(&mut stream)?;
    let mut job = adopt_checkpoint(ctx, request)?;
    info!(
        username = %job.username,
        filename = %job.filename,
        stage = ?job.stage,
        "worker: job adopted"
    );

    loop {
        if ctx.is_exiting() {
            park_or_discard(ctx, &job.username, &job.filename, &job.file_path);
            return Ok(());
        }

        match job.stage {
            WorkerStage::RecvFile => {
                let mut progress = Progress::new(job.n_packets, job.n_done);
                let outcome = TransferEngine::receive(&mut stream, &job.file_path, &mut progress, &ctx.exit);
                job.n_done = progress.n_done;
                match outcome {
                    TransferOutcome::Completed => advance(ctx, &mut job, WorkerStage::Verify)?,
                    TransferOutcome::Interrupted => {
                        checkpoint_save(ctx, &job)?;
                        park_or_discard(ctx, &job.username, &job.filename, &job.file_path);
                        return Ok(());
                    }
                    TransferOutcome::Failed(e) => {
                        checkpoint_save(ctx, &job)?;
                        return Err(e.into());
                    }
                }
            }

            WorkerStage::Verify => {
                let actual = md5_of_file(&job.file_path)?;
                let ok = actual == job.md5;
                client_dialogue::send_check(&mut stream, ok)?;
                if !ok {
                    warn!(username = %job.username, filename = %job.filename, "worker: reassembly failed MD5 check");
                    ctx.checkpoints.clear(&job.username, &job.filename).ok();
                    let _ = std::fs::remove_file(&job.file_path);
                    return Err(SessionError::ReassemblyFailed);
                }
                advance(ctx, &mut job, WorkerStage::Distort)?;
            }

            WorkerStage::Distort => {
                let tmp_output = job.file_path.with_extension("distort-tmp");
                distort_distortion::distort(&job.file_path, &tmp_output, job.factor)?;
                std::fs::rename(&tmp_output, &job.file_path)?;
                advance(ctx, &mut job, WorkerStage::SendMeta)?;
            }

            WorkerStage::SendMeta => {
                let metadata = std::fs::metadata(&job.file_path)?;
                job.filesize_out = metadata.len();
                job.md5_out = md5_of_file(&job.file_path)?;
                client_dialogue::send_meta_out(&mut stream, job.filesize_out, &job.md5_out)?;
                job.n_packets = n_packets_for(job.filesize_out);
                job.n_done = 0;
                advance(ctx, &mut job, WorkerStage::SendFile)?;
            }

            WorkerStage::SendFile => {
                let mut progress = Progress::new(job.n_packets, job.n_done);
                let outcome = TransferEngine::send(&mut stream, &job.file_path, &mut progress, &ctx.exit);
                job.n_done = progress.n_done;
                match outcome {
                    TransferOutcome::Completed => advance(ctx, &mut job, WorkerStage::AwaitCheck)?,
                    TransferOutcome::Interrupted => {
                        checkpoint_save(ctx, &job)?;
                        park_or_discard(ctx, &job.username, &job.filename, &job.file_path);
                        return Ok(());
                    }
                    TransferOutcome::Failed(e) => {
                        checkpoint_save(ctx, &job)?;
                        return Err(e.into());
                    }
                }
            }

            WorkerStage::AwaitCheck => {
                let client_ok = client_dialogue::await_check_and_bye(&mut stream)?;
                if !client_ok {
                    warn!(username = %job.username, filename = %job.filename, "worker: client reported CHECK_KO on distorted file");
                }
                advance(ctx, &mut job, WorkerStage::Bye)?;
            }

            WorkerStage::Bye => {
                ctx.checkpoints.clear(&job.username, &job.filename)?;
                let _ = std::fs::remove_file(&job.file_path);
                info!(username = %job.username, filename = %job.filename, "worker: job complete");
                return Ok(());
            }
        }
    }
}

fn adopt_checkpoint(ctx: &WorkerContext, request: client_dialogue::DistortRequest) -> Result<WorkerJob, SessionError> {
    let key_slug = slug(&request.username, &request.filename);
    let file_path = ctx.work_dir.join(&key_slug);

    let existing = ctx.checkpoints.load(&request.username, &request.filename)?;
    let (stage, n_packets, n_done) = match existing {
        Some(cp) => {
            let parked = ctx.parking_dir.join(&key_slug);
            if parked.exists() {
                std::fs::rename(&parked, &file_path)?;
            }
            let stage = WorkerStage::try_from(cp.stage).unwrap_or_else(|raw| {
                distort_support::safe_panic!("checkpoint for {key_slug} holds unknown stage {raw}, treating as RecvFile");
                WorkerStage::RecvFile
            });
            // The client always re-sends the upload from scratch after a
            // dropped connection (spec §4.3 SendFile row: "re-enter at
            // SendMeta with n_done=0"), so a successor picking up mid-upload
            // must restart its own receive counter in lockstep rather than
            // trusting the dead primary's last n_done, or the two sides
            // would disagree on which packet comes next.
            let n_done = if stage == WorkerStage::RecvFile { 0 } else { cp.n_done };
            (stage, cp.n_packets, n_done)
        }
        None => {
            let n_packets = n_packets_for(request.filesize);
            ctx.checkpoints.store(
                &request.username,
                &request.filename,
                Checkpoint { stage: WorkerStage::RecvFile as u32, n_packets, n_done: 0 },
            )?;
            (WorkerStage::RecvFile, n_packets, 0)
        }
    };

    Ok(WorkerJob {
        username: request.username,
        filename: request.filename,
        file_path,
        md5: request.md5,
        factor: request.factor,
        stage,
        n_packets,
        n_done,
        filesize_out: 0,
        md5_out: String::new(),
    })
}

/// Move to `next`, persisting the checkpoint immediately afterwards — never
/// before, so a crash always leaves the checkpoint at or behind the true
/// progress (spec §4.4 "Checkpoint update rule").
fn advance(ctx: &WorkerContext, job: &mut WorkerJob, next: WorkerStage) -> Result<(), SessionError> {
    job.stage = next;
    checkpoint_save(ctx, job)
}

fn checkpoint_save(ctx: &WorkerContext, job: &WorkerJob) -> Result<(), SessionError> {
    ctx.checkpoints
        .store(
            &job.username,
            &job.filename,
            Checkpoint { stage: job.stage as u32, n_packets: job.n_packets, n_done: job.n_done },
        )
        .map_err(SessionError::from)
}

fn md5_of_file(path: &PathBuf) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

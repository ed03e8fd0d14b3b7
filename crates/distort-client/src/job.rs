use std::fs::File;
use std::io::Read;
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;

use distort_core::{ClientStage, Job};
use distort_transfer::{Progress, TransferEngine, TransferOutcome};
use md5::{Digest, Md5};
use tracing::{info, warn};

use crate::context::ClientContext;
use crate::registry_client;
use crate::worker_dialogue;

#[derive(Debug)]
pub enum JobOutcome {
    Completed { distorted_path: PathBuf },
    Failed(String),
    Interrupted,
}

/// Drive one job through the full client-side state machine (spec §4.3),
/// reconnecting via the Registry on every recoverable fault until the job
/// either completes, fails outright, or the process is shutting down.
pub fn run(ctx: &ClientContext, mut job: Job) -> JobOutcome {
    let mut worker_addr: Option<SocketAddr> = None;
    let mut last_primary: Option<SocketAddr> = None;
    let mut stream: Option<TcpStream> = None;
    let distorted_path = job.file_path.with_file_name(format!("{}_distorted", job.filename));

    loop {
        if ctx.is_exiting() {
            return JobOutcome::Interrupted;
        }
        if ctx.is_registry_dead() {
            return JobOutcome::Failed("registry connection lost".into());
        }

        match job.stage {
            ClientStage::RequestPrimary => {
                let reconnect = last_primary.is_some();
                match registry_client::request_primary(
                    ctx.registry_addr,
                    job.class,
                    &job.filename,
                    reconnect,
                ) {
                    Ok(addr) => {
                        if Some(addr) == last_primary {
                            return JobOutcome::Failed(
                                "worker did not actually die, job unrecoverable".into(),
                            );
                        }
                        info!(?addr, filename = %job.filename, "client: primary resolved");
                        worker_addr = Some(addr);
                        job.stage = ClientStage::SendMeta;
                    }
                    Err(e) => return JobOutcome::Failed(e.to_string()),
                }
            }

            ClientStage::SendMeta => {
                let addr = worker_addr.expect("primary resolved before SendMeta");
                let attempt = TcpStream::connect(addr).and_then(|mut s| {
                    worker_dialogue::send_meta(
                        &mut s,
                        job.username.as_str(),
                        &job.filename,
                        job.filesize,
                        &job.md5,
                        job.factor,
                    )
                    .map(|()| s)
                    .map_err(std::io::Error::other)
                });
                match attempt {
                    Ok(s) => {
                        stream = Some(s);
                        job.stage = ClientStage::SendFile;
                    }
                    Err(e) => {
                        warn!(error = %e, "client: send_meta failed, reconnecting");
                        last_primary = worker_addr;
                        job.n_done = 0;
                        job.stage = ClientStage::RequestPrimary;
                    }
                }
            }

            ClientStage::SendFile => {
                let s = stream.as_mut().expect("stream open before SendFile");
                let mut progress = Progress::new(job.n_packets, job.n_done);
                let outcome = TransferEngine::send(s, &job.file_path, &mut progress, &ctx.exit);
                job.n_done = progress.n_done;
                match outcome {
                    TransferOutcome::Completed => job.stage = ClientStage::AwaitCheck,
                    TransferOutcome::Interrupted => return JobOutcome::Interrupted,
                    TransferOutcome::Failed(e) => {
                        warn!(error = %e, "client: send failed, reconnecting with n_done reset");
                        last_primary = worker_addr;
                        job.n_done = 0;
                        stream = None;
                        job.stage = ClientStage::RequestPrimary;
                    }
                }
            }

            ClientStage::AwaitCheck => {
                let s = stream.as_mut().expect("stream open before AwaitCheck");
                match worker_dialogue::await_check(s) {
                    Ok(true) => job.stage = ClientStage::RecvMeta,
                    Ok(false) => {
                        // The worker destroys its checkpoint and working file on a
                        // failed reassembly (spec §4.4 `Verify`), so any successor
                        // starts the upload completely fresh and needs the whole
                        // file resent, not just the tail from where we left off.
                        warn!("client: worker reported CHECK_KO, reconnecting");
                        last_primary = worker_addr;
                        job.n_done = 0;
                        stream = None;
                        job.stage = ClientStage::RequestPrimary;
                    }
                    Err(e) => {
                        warn!(error = %e, "client: await_check failed, reconnecting");
                        last_primary = worker_addr;
                        stream = None;
                        job.stage = ClientStage::RequestPrimary;
                    }
                }
            }

            ClientStage::RecvMeta => {
                let s = stream.as_mut().expect("stream open before RecvMeta");
                match worker_dialogue::recv_meta_out(s) {
                    Ok((filesize_out, md5_out)) => {
                        job.n_packets = distort_core::n_packets_for(filesize_out);
                        job.n_done = 0;
                        job.filesize = filesize_out;
                        job.md5 = md5_out;
                        job.stage = ClientStage::RecvFile;
                    }
                    Err(e) => {
                        warn!(error = %e, "client: recv_meta_out failed, reconnecting");
                        last_primary = worker_addr;
                        stream = None;
                        job.stage = ClientStage::RequestPrimary;
                    }
                }
            }

            ClientStage::RecvFile => {
                let s = stream.as_mut().expect("stream open before RecvFile");
                let mut progress = Progress::new(job.n_packets, job.n_done);
                let outcome = TransferEngine::receive(s, &distorted_path, &mut progress, &ctx.exit);
                job.n_done = progress.n_done;
                match outcome {
                    TransferOutcome::Completed => job.stage = ClientStage::VerifyAndBye,
                    TransferOutcome::Interrupted => return JobOutcome::Interrupted,
                    TransferOutcome::Failed(e) => {
                        warn!(error = %e, "client: receive failed, reconnecting");
                        last_primary = worker_addr;
                        stream = None;
                        job.stage = ClientStage::RequestPrimary;
                    }
                }
            }

            ClientStage::VerifyAndBye => {
                let s = stream.as_mut().expect("stream open before VerifyAndBye");
                let actual_md5 = match md5_of_file(&distorted_path) {
                    Ok(digest) => digest,
                    Err(e) => return JobOutcome::Failed(format!("could not hash received file: {e}")),
                };
                let md5_ok = actual_md5 == job.md5;
                if let Err(e) = worker_dialogue::verify_and_bye(s, job.username.as_str(), md5_ok) {
                    warn!(error = %e, "client: verify_and_bye send failed, job still considered done locally");
                }
                if !md5_ok {
                    return JobOutcome::Failed("reassembled file failed MD5 verification".into());
                }
                job.stage = ClientStage::Done;
            }

            ClientStage::Done => return JobOutcome::Completed { distorted_path },
        }
    }
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

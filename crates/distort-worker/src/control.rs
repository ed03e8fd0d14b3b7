use std::net::TcpStream;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use distort_proto::{recv_frame, DecodeOutcome, FrameType};
use tracing::{info, warn};

use crate::context::WorkerContext;

/// Spawn the passive task that owns all further reads on the control
/// connection established by `registry_client::announce`. This is the
/// worker-side counterpart of the client's liveness task, with one addition:
/// the Registry promotes a worker to primary for its class by sending an
/// unsolicited `ASSIGN_PRIMARY` frame on this connection, either when the
/// worker is the first to join an empty roster or when it is elected to
/// replace a dead primary (spec §4.5).
pub fn spawn(ctx: Arc<WorkerContext>, mut control: TcpStream) -> JoinHandle<()> {
    std::thread::spawn(move || loop {
        if ctx.is_exiting() {
            return;
        }
        match recv_frame(&mut control) {
            DecodeOutcome::Frame(frame) if frame.frame_type == FrameType::AssignPrimary => {
                info!("control: assigned primary for class");
                ctx.is_primary.store(true, Ordering::Relaxed);
            }
            DecodeOutcome::Frame(_) => continue,
            DecodeOutcome::Interrupted => {
                info!("control: local shutdown, stopping registry watch");
                return;
            }
            DecodeOutcome::PeerClosed | DecodeOutcome::TransportError(_) => {
                warn!("control: registry connection lost");
                ctx.registry_dead.store(true, Ordering::Relaxed);
                return;
            }
        }
    })
}

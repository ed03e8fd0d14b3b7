use std::net::TcpStream;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use distort_proto::{recv_frame, DecodeOutcome};
use tracing::{info, warn};

use crate::context::ClientContext;

/// Spawn the passive task that owns all further reads on the control
/// connection established by `registry_client::announce`. The Registry
/// never sends a client unsolicited frames once connected, so this loop
/// normally blocks forever; it only returns when the Registry dies or the
/// local socket is closed to unblock it during shutdown (spec §4.3, §5).
pub fn spawn(ctx: std::sync::Arc<ClientContext>, mut control: TcpStream) -> JoinHandle<()> {
    std::thread::spawn(move || loop {
        if ctx.is_exiting() {
            return;
        }
        match recv_frame(&mut control) {
            DecodeOutcome::Frame(_) => continue,
            DecodeOutcome::Interrupted => {
                info!("liveness: local shutdown, stopping registry watch");
                return;
            }
            DecodeOutcome::PeerClosed | DecodeOutcome::TransportError(_) => {
                warn!("liveness: registry connection lost");
                ctx.registry_dead.store(true, Ordering::Relaxed);
                return;
            }
        }
    })
}

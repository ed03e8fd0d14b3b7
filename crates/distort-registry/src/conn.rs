use std::io::{self, Write};
use std::net::SocketAddr;

use distort_core::Class;
use distort_proto::{Frame, FrameAssembler};
use mio::net::TcpStream;
use tracing::warn;

/// What a connection turned out to be, discovered from its first frame
/// rather than from which listener accepted it — the client port serves
/// both the long-lived `CONN_CLIENT` control channel and the short-lived
/// `REQ_DISTORT`/`REQ_RECONNECT` lookups (spec §4.5, §6.1).
pub enum ConnKind {
    Unclassified,
    ClientControl { username: String },
    /// A one-shot primary lookup; closed once the reply is flushed.
    ClientRequest,
    Worker { class: Class, listen_addr: SocketAddr },
}

pub struct Conn {
    pub stream: TcpStream,
    pub kind: ConnKind,
    pub peer_addr: SocketAddr,
    assembler: FrameAssembler,
    outbox: Vec<u8>,
    pub close_after_flush: bool,
}

impl Conn {
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Self {
            stream,
            kind: ConnKind::Unclassified,
            peer_addr,
            assembler: FrameAssembler::new(),
            outbox: Vec::new(),
            close_after_flush: false,
        }
    }

    pub fn read_frame(&mut self) -> distort_proto::ReadOutcome {
        self.assembler.read_frame(&mut self.stream)
    }

    /// Queue `frame` for sending and attempt to flush immediately. Frames
    /// are 256 bytes, far smaller than any realistic socket send buffer, so
    /// in practice this always drains in one call; the queue exists only to
    /// absorb the rare case where it doesn't.
    pub fn enqueue(&mut self, frame: &Frame) {
        self.outbox.extend_from_slice(&frame.encode());
        self.flush();
    }

    /// Drain as much of the outbox as the socket accepts right now. Returns
    /// `true` if the connection should be dropped (a write failed for a
    /// reason other than backpressure).
    pub fn flush(&mut self) -> bool {
        while !self.outbox.is_empty() {
            match self.stream.write(&self.outbox) {
                Ok(0) => return true,
                Ok(n) => {
                    self.outbox.drain(..n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return false,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(peer = %self.peer_addr, error = %e, "registry: write failed");
                    return true;
                }
            }
        }
        false
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.outbox.is_empty()
    }
}

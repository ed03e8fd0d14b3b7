use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::net::TcpStream;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use distort_core::PACKET_SIZE;
use distort_proto::{recv_frame, send_frame, DecodeOutcome, Frame, FrameType, DATA_SIZE};
use tracing::{debug, trace};

use crate::error::TransferError;
use crate::outcome::TransferOutcome;
use crate::progress::Progress;

/// Sends and receives packetized file transfers over an already-established
/// `TcpStream`, one `DATA` frame per packet with a blocking `ACK` round trip
/// (spec §4.2). Both directions check `cancel` between packets so a signal
/// handler can stop a transfer at a packet boundary, leaving `progress`
/// pointing at the next packet to send or write.
pub struct TransferEngine;

impl TransferEngine {
    /// Stream `path` to `stream`, resuming at `progress.n_done`.
    pub fn send(
        stream: &mut TcpStream,
        path: &Path,
        progress: &mut Progress,
        cancel: &AtomicBool,
    ) -> TransferOutcome {
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) => return TransferError::from(e).into(),
        };
        if let Err(e) = file.seek(SeekFrom::Start(u64::from(progress.n_done) * PACKET_SIZE)) {
            return TransferError::from(e).into();
        }

        while progress.n_done < progress.n_packets {
            if cancel.load(Ordering::Relaxed) {
                debug!(n_done = progress.n_done, "transfer: send interrupted");
                return TransferOutcome::Interrupted;
            }

            let mut buf = [0u8; DATA_SIZE];
            let n = match read_fill(&mut file, &mut buf) {
                Ok(n) => n,
                Err(e) => return TransferError::from(e).into(),
            };

            let frame = Frame::new(FrameType::Data, &buf[..n]);
            if let Err(e) = send_frame(stream, &frame) {
                return TransferError::from(e).into();
            }

            match recv_frame(stream) {
                DecodeOutcome::Frame(ack) if ack.frame_type == FrameType::Ack => {
                    progress.n_done += 1;
                    trace!(n_done = progress.n_done, n_packets = progress.n_packets, "transfer: packet acked");
                }
                DecodeOutcome::Frame(other) => {
                    return TransferError::UnexpectedFrame(other.frame_type).into()
                }
                DecodeOutcome::PeerClosed => return TransferError::PeerClosed.into(),
                DecodeOutcome::Interrupted => return TransferOutcome::Interrupted,
                DecodeOutcome::TransportError(e) => return TransferError::from(e).into(),
            }
        }

        TransferOutcome::Completed
    }

    /// Receive a packetized file from `stream` into `path`, resuming at
    /// `progress.n_done` (the file is expected to already hold that many
    /// packets worth of bytes from a prior attempt).
    pub fn receive(
        stream: &mut TcpStream,
        path: &Path,
        progress: &mut Progress,
        cancel: &AtomicBool,
    ) -> TransferOutcome {
        let mut file = match OpenOptions::new().create(true).write(true).open(path) {
            Ok(f) => f,
            Err(e) => return TransferError::from(e).into(),
        };
        if let Err(e) = file.seek(SeekFrom::Start(u64::from(progress.n_done) * PACKET_SIZE)) {
            return TransferError::from(e).into();
        }

        while progress.n_done < progress.n_packets {
            if cancel.load(Ordering::Relaxed) {
                debug!(n_done = progress.n_done, "transfer: receive interrupted");
                return TransferOutcome::Interrupted;
            }

            match recv_frame(stream) {
                DecodeOutcome::Frame(frame) if frame.frame_type == FrameType::Data => {
                    if let Err(e) = file.write_all(frame.payload()) {
                        return TransferError::from(e).into();
                    }
                    if let Err(e) = send_frame(stream, &Frame::empty(FrameType::Ack)) {
                        return TransferError::from(e).into();
                    }
                    progress.n_done += 1;
                    trace!(n_done = progress.n_done, n_packets = progress.n_packets, "transfer: packet written");
                }
                DecodeOutcome::Frame(other) => {
                    return TransferError::UnexpectedFrame(other.frame_type).into()
                }
                DecodeOutcome::PeerClosed => return TransferError::PeerClosed.into(),
                DecodeOutcome::Interrupted => return TransferOutcome::Interrupted,
                DecodeOutcome::TransportError(e) => return TransferError::from(e).into(),
            }
        }

        TransferOutcome::Completed
    }
}

/// Fill `buf` from `file`, stopping short only at EOF (a final, shorter
/// last packet).
fn read_fill(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use super::*;

    fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn sends_and_receives_a_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("dst.bin");
        let payload = vec![42u8; DATA_SIZE * 3 + 10];
        std::fs::write(&src, &payload).unwrap();

        let n_packets = distort_core::n_packets_for(payload.len() as u64);
        let (mut tx, mut rx) = loopback_pair();

        let dst_clone = dst.clone();
        let receiver = thread::spawn(move || {
            let mut progress = Progress::new(n_packets, 0);
            let cancel = AtomicBool::new(false);
            TransferEngine::receive(&mut rx, &dst_clone, &mut progress, &cancel)
        });

        let mut send_progress = Progress::new(n_packets, 0);
        let send_cancel = AtomicBool::new(false);
        let send_outcome = TransferEngine::send(&mut tx, &src, &mut send_progress, &send_cancel);
        assert!(matches!(send_outcome, TransferOutcome::Completed));

        let recv_outcome = receiver.join().unwrap();
        assert!(matches!(recv_outcome, TransferOutcome::Completed));
        assert_eq!(std::fs::read(&dst).unwrap(), payload);
    }

    #[test]
    fn resumes_from_a_nonzero_n_done() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("dst.bin");
        let payload = vec![9u8; DATA_SIZE * 4];
        std::fs::write(&src, &payload).unwrap();
        std::fs::write(&dst, &payload[..DATA_SIZE * 2]).unwrap();

        let n_packets = distort_core::n_packets_for(payload.len() as u64);
        let (mut tx, mut rx) = loopback_pair();

        let dst_clone = dst.clone();
        let receiver = thread::spawn(move || {
            let mut progress = Progress::new(n_packets, 2);
            let cancel = AtomicBool::new(false);
            TransferEngine::receive(&mut rx, &dst_clone, &mut progress, &cancel)
        });

        let mut send_progress = Progress::new(n_packets, 2);
        let send_cancel = AtomicBool::new(false);
        TransferEngine::send(&mut tx, &src, &mut send_progress, &send_cancel);
        receiver.join().unwrap();

        assert_eq!(std::fs::read(&dst).unwrap(), payload);
    }

    #[test]
    fn cancel_flag_stops_the_sender_at_a_packet_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        std::fs::write(&src, vec![1u8; DATA_SIZE * 5]).unwrap();

        let (mut tx, rx) = loopback_pair();
        drop(rx);

        let mut progress = Progress::new(5, 0);
        let cancel = AtomicBool::new(true);
        let outcome = TransferEngine::send(&mut tx, &src, &mut progress, &cancel);
        assert!(matches!(outcome, TransferOutcome::Interrupted));
        assert_eq!(progress.n_done, 0);
    }
}

use std::io::{self, Read, Write};

use tracing::trace;

use crate::frame::{CodecError, Frame, FRAME_SIZE};

/// Outcome of a single blocking frame read, distinguishing an orderly peer
/// close from a genuine transport fault (spec §4.1 error taxonomy).
#[derive(Debug)]
pub enum DecodeOutcome {
    Frame(Frame),
    PeerClosed,
    Interrupted,
    TransportError(io::Error),
}

/// Write one frame to `stream`, blocking until the full 256 bytes are sent.
pub fn send_frame<W: Write>(stream: &mut W, frame: &Frame) -> io::Result<()> {
    let wire = frame.encode();
    stream.write_all(&wire)?;
    trace!(frame_type = ?frame.frame_type, data_length = frame.data_length, "sent frame");
    Ok(())
}

/// Read one frame from `stream`, blocking until 256 bytes arrive, the peer
/// closes the connection, or a transport error occurs.
///
/// A `read_exact` that fails with zero bytes read is an orderly close
/// (`PeerClosed`); a partial read before EOF is a transport fault, not a
/// clean close, since it means the peer died mid-frame.
pub fn recv_frame<R: Read>(stream: &mut R) -> DecodeOutcome {
    let mut buf = [0u8; FRAME_SIZE];
    let mut filled = 0usize;
    while filled < FRAME_SIZE {
        match stream.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return DecodeOutcome::PeerClosed,
            Ok(0) => {
                return DecodeOutcome::TransportError(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed mid-frame",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return DecodeOutcome::Interrupted,
            Err(e) => return DecodeOutcome::TransportError(e),
        }
    }
    match Frame::decode(&buf) {
        Ok(frame) => {
            trace!(frame_type = ?frame.frame_type, data_length = frame.data_length, "received frame");
            DecodeOutcome::Frame(frame)
        }
        Err(CodecError::ChecksumMismatch { wire, computed }) => DecodeOutcome::TransportError(
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("checksum mismatch: wire={wire:#06x} computed={computed:#06x}"),
            ),
        ),
        Err(e) => DecodeOutcome::TransportError(io::Error::new(io::ErrorKind::InvalidData, e)),
    }
}

#[cfg(test)]
mod tests {
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use super::*;
    use crate::frame_type::FrameType;

    #[test]
    fn round_trips_a_frame_over_loopback_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            match recv_frame(&mut sock) {
                DecodeOutcome::Frame(f) => f,
                other => panic!("expected a frame, got {other:?}"),
            }
        });

        let mut client = TcpStream::connect(addr).unwrap();
        let sent = Frame::new(FrameType::Data, b"packet payload");
        send_frame(&mut client, &sent).unwrap();

        let received = server.join().unwrap();
        assert_eq!(received, sent);
    }

    #[test]
    fn reports_peer_closed_on_clean_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            recv_frame(&mut sock)
        });

        let client = TcpStream::connect(addr).unwrap();
        drop(client);

        assert!(matches!(server.join().unwrap(), DecodeOutcome::PeerClosed));
    }
}

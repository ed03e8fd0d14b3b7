use std::io::{self, Read};

use tracing::debug;

use crate::frame::{Frame, FRAME_SIZE};

/// Result of one `FrameAssembler::read_frame` poll.
pub enum ReadOutcome {
    /// A complete, checksum-valid frame was assembled.
    Frame(Frame),
    /// The socket would block; call again once readable.
    WouldBlock,
    /// The peer closed the connection, or the frame failed to decode.
    Disconnected,
}

/// Reassembles fixed-size frames out of a non-blocking stream one `read()`
/// at a time, carrying a partially-filled buffer across calls. Used by the
/// registry's single-threaded mio loop, where every socket is polled for
/// readiness rather than blocked on (spec §4.5); the client and worker use
/// the blocking `codec::recv_frame` instead since each owns its own thread.
pub struct FrameAssembler {
    buf: [u8; FRAME_SIZE],
    have: usize,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self { buf: [0u8; FRAME_SIZE], have: 0 }
    }

    /// Drive the read loop until a frame is complete, the stream would
    /// block, or the peer disconnects. Mirrors the teacher's `read_frame`
    /// header/payload loop, collapsed to one fixed-size region since every
    /// frame here is already length-known.
    pub fn read_frame<S: Read>(&mut self, stream: &mut S) -> ReadOutcome {
        loop {
            match stream.read(&mut self.buf[self.have..]) {
                Ok(0) => return ReadOutcome::Disconnected,
                Ok(n) => {
                    self.have += n;
                    if self.have == FRAME_SIZE {
                        let result = Frame::decode(&self.buf);
                        self.have = 0;
                        return match result {
                            Ok(frame) => ReadOutcome::Frame(frame),
                            Err(err) => {
                                debug!(?err, "proto: frame failed to decode, dropping connection");
                                ReadOutcome::Disconnected
                            }
                        };
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return ReadOutcome::WouldBlock,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    debug!(?err, "proto: read error, dropping connection");
                    return ReadOutcome::Disconnected;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_type::FrameType;

    /// A `Read` that yields `WouldBlock` on alternating calls, to exercise
    /// the assembler's ability to resume a partially-filled buffer.
    struct Choppy {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
        block_next: bool,
    }

    impl Read for Choppy {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.block_next {
                self.block_next = false;
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "would block"));
            }
            self.block_next = true;
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn reassembles_a_frame_delivered_in_chopped_reads() {
        let frame = Frame::new(FrameType::Data, b"chopped payload");
        let wire = frame.encode();
        let mut choppy = Choppy { data: wire.to_vec(), pos: 0, chunk: 17, block_next: false };

        let mut assembler = FrameAssembler::new();
        let result = loop {
            match assembler.read_frame(&mut choppy) {
                ReadOutcome::WouldBlock => continue,
                other => break other,
            }
        };

        match result {
            ReadOutcome::Frame(got) => assert_eq!(got, frame),
            _ => panic!("expected a reassembled frame"),
        }
    }

    #[test]
    fn reports_disconnected_on_empty_read() {
        let mut empty = Choppy { data: vec![], pos: 0, chunk: 1, block_next: false };
        let mut assembler = FrameAssembler::new();
        assert!(matches!(assembler.read_frame(&mut empty), ReadOutcome::Disconnected));
    }
}

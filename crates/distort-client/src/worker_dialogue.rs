use std::net::TcpStream;

use distort_proto::{join, recv_frame, send_frame, split, DecodeOutcome, Frame, FrameType};

use crate::error::SessionError;

/// Send the `REQ_DISTORT` metadata handshake to the primary worker and await
/// its `ACK_DISTORT`/`CON_KO` reply (spec §4.3 `SendMeta`).
pub fn send_meta(
    stream: &mut TcpStream,
    username: &str,
    filename: &str,
    filesize: u64,
    md5: &str,
    factor: u32,
) -> Result<(), SessionError> {
    let payload = join(&[username, filename, &filesize.to_string(), md5, &factor.to_string()]);
    send_frame(stream, &Frame::new(FrameType::Metadata, &payload))?;

    match recv_frame(stream) {
        DecodeOutcome::Frame(reply) if reply.payload().is_empty() => Ok(()),
        DecodeOutcome::Frame(reply) => {
            Err(SessionError::Rejected(String::from_utf8_lossy(reply.payload()).into_owned()))
        }
        DecodeOutcome::PeerClosed => Err(SessionError::Rejected("worker closed".into())),
        DecodeOutcome::Interrupted => Err(SessionError::MalformedReply),
        DecodeOutcome::TransportError(e) => Err(SessionError::Io(e)),
    }
}

/// Await the worker's verdict on the reassembled upload (spec §4.3
/// `AwaitCheck`).
pub fn await_check(stream: &mut TcpStream) -> Result<bool, SessionError> {
    match recv_frame(stream) {
        DecodeOutcome::Frame(reply) if reply.frame_type == FrameType::Md5Check => {
            match reply.payload() {
                b"CHECK_OK" => Ok(true),
                b"CHECK_KO" => Ok(false),
                _ => Err(SessionError::MalformedReply),
            }
        }
        DecodeOutcome::Frame(_) => Err(SessionError::MalformedReply),
        DecodeOutcome::PeerClosed => Err(SessionError::Rejected("worker closed".into())),
        DecodeOutcome::Interrupted => Err(SessionError::MalformedReply),
        DecodeOutcome::TransportError(e) => Err(SessionError::Io(e)),
    }
}

/// Read the worker's `META_OUT`, carrying the distorted file's size and MD5
/// (spec §4.3 `RecvMeta`).
pub fn recv_meta_out(stream: &mut TcpStream) -> Result<(u64, String), SessionError> {
    match recv_frame(stream) {
        DecodeOutcome::Frame(reply) if reply.frame_type == FrameType::MetaOut => {
            let fields = split(reply.payload());
            let [filesize_out, md5_out] = fields.as_slice() else {
                return Err(SessionError::MalformedReply);
            };
            let filesize_out: u64 =
                filesize_out.parse().map_err(|_| SessionError::MalformedReply)?;
            Ok((filesize_out, md5_out.clone()))
        }
        DecodeOutcome::Frame(_) => Err(SessionError::MalformedReply),
        DecodeOutcome::PeerClosed => Err(SessionError::Rejected("worker closed".into())),
        DecodeOutcome::Interrupted => Err(SessionError::MalformedReply),
        DecodeOutcome::TransportError(e) => Err(SessionError::Io(e)),
    }
}

/// Report the client's own verdict on the reassembled distorted file, then
/// say goodbye (spec §4.3 `VerifyAndBye`).
pub fn verify_and_bye(
    stream: &mut TcpStream,
    username: &str,
    md5_ok: bool,
) -> Result<(), SessionError> {
    let verdict: &[u8] = if md5_ok { b"CHECK_OK" } else { b"CHECK_KO" };
    send_frame(stream, &Frame::new(FrameType::Md5Check, verdict))?;
    send_frame(stream, &Frame::new(FrameType::Disconnect, username.as_bytes()))?;
    Ok(())
}

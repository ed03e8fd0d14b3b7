use std::net::TcpStream;

use distort_proto::{recv_frame, send_frame, split, DecodeOutcome, Frame, FrameType};

use crate::error::SessionError;

pub struct DistortRequest {
    pub username: String,
    pub filename: String,
    pub filesize: u64,
    pub md5: String,
    pub factor: u32,
}

/// Receive and validate the client's `REQ_DISTORT` metadata handshake
/// (spec §4.4 `RecvMeta`). Replies `CON_KO` and returns an error on any
/// validation failure, or an empty-payload `ACK_DISTORT` on success.
pub fn recv_meta(stream: &mut TcpStream) -> Result<DistortRequest, SessionError> {
    let frame = match recv_frame(stream) {
        DecodeOutcome::Frame(f) if f.frame_type == FrameType::Metadata => f,
        DecodeOutcome::Frame(_) => return Err(SessionError::MalformedRequest("wrong frame type".into())),
        DecodeOutcome::PeerClosed => return Err(SessionError::ClientClosed),
        DecodeOutcome::Interrupted => return Err(SessionError::ClientClosed),
        DecodeOutcome::TransportError(e) => return Err(SessionError::Io(e)),
    };

    let fields = split(frame.payload());
    let request = match fields.as_slice() {
        [username, filename, filesize, md5, factor] => {
            let (Ok(filesize), Ok(factor)) = (filesize.parse::<u64>(), factor.parse::<u32>()) else {
                reject(stream, "bad filesize or factor")?;
                return Err(SessionError::MalformedRequest("bad filesize or factor".into()));
            };
            if username.is_empty() || filename.is_empty() || md5.is_empty() {
                reject(stream, "empty required field")?;
                return Err(SessionError::MalformedRequest("empty required field".into()));
            }
            DistortRequest {
                username: username.clone(),
                filename: filename.clone(),
                filesize,
                md5: md5.clone(),
                factor,
            }
        }
        _ => {
            reject(stream, "expected 5 fields")?;
            return Err(SessionError::MalformedRequest("expected 5 fields".into()));
        }
    };

    send_frame(stream, &Frame::empty(FrameType::Metadata))?;
    Ok(request)
}

fn reject(stream: &mut TcpStream, _reason: &str) -> Result<(), SessionError> {
    send_frame(stream, &Frame::new(FrameType::Metadata, b"CON_KO")).map_err(SessionError::from)
}

/// Tell the client whether the reassembled upload matched its declared MD5
/// (spec §4.4 `Verify`).
pub fn send_check(stream: &mut TcpStream, ok: bool) -> Result<(), SessionError> {
    let payload: &[u8] = if ok { b"CHECK_OK" } else { b"CHECK_KO" };
    send_frame(stream, &Frame::new(FrameType::Md5Check, payload)).map_err(SessionError::from)
}

/// Send the distorted file's size and MD5 (spec §4.4 `SendMeta`).
pub fn send_meta_out(stream: &mut TcpStream, filesize_out: u64, md5_out: &str) -> Result<(), SessionError> {
    let payload = distort_proto::join(&[&filesize_out.to_string(), md5_out]);
    send_frame(stream, &Frame::new(FrameType::MetaOut, &payload)).map_err(SessionError::from)
}

/// Await the client's final verdict and disconnect (spec §4.4 `AwaitCheck`,
/// `Bye`).
pub fn await_check_and_bye(stream: &mut TcpStream) -> Result<bool, SessionError> {
    let verdict = match recv_frame(stream) {
        DecodeOutcome::Frame(f) if f.frame_type == FrameType::Md5Check => match f.payload() {
            b"CHECK_OK" => true,
            b"CHECK_KO" => false,
            _ => return Err(SessionError::MalformedRequest("bad check verdict".into())),
        },
        DecodeOutcome::Frame(_) => return Err(SessionError::MalformedRequest("expected MD5_CHECK".into())),
        DecodeOutcome::PeerClosed => return Err(SessionError::ClientClosed),
        DecodeOutcome::Interrupted => return Err(SessionError::ClientClosed),
        DecodeOutcome::TransportError(e) => return Err(SessionError::Io(e)),
    };

    match recv_frame(stream) {
        DecodeOutcome::Frame(f) if f.frame_type == FrameType::Disconnect => Ok(verdict),
        _ => Ok(verdict),
    }
}

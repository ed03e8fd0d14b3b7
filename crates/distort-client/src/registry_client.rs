use std::net::{SocketAddr, TcpStream};

use distort_core::Class;
use distort_proto::{join, recv_frame, send_frame, split, DecodeOutcome, Frame, FrameType};
use tracing::warn;

use crate::error::SessionError;

/// Open the long-lived control connection to the Registry and announce this
/// client (`CONN_CLIENT`, spec §6.1). The returned stream is handed to the
/// liveness task, which owns all further reads on it.
pub fn announce(registry_addr: SocketAddr, username: &str) -> Result<TcpStream, SessionError> {
    let mut stream = TcpStream::connect(registry_addr)?;
    let local_addr = stream.local_addr()?;
    let payload = join(&[username, &local_addr.ip().to_string(), &local_addr.port().to_string()]);
    send_frame(&mut stream, &Frame::new(FrameType::ConnClient, &payload))?;

    match recv_frame(&mut stream) {
        DecodeOutcome::Frame(reply) if reply.frame_type == FrameType::ConnClient && reply.payload().is_empty() => {
            Ok(stream)
        }
        DecodeOutcome::Frame(reply) if reply.payload() == b"CON_KO" => {
            Err(SessionError::Rejected("CON_KO".to_string()))
        }
        DecodeOutcome::Frame(reply) => {
            Err(SessionError::Rejected(String::from_utf8_lossy(reply.payload()).into_owned()))
        }
        DecodeOutcome::PeerClosed | DecodeOutcome::TransportError(_) => {
            Err(SessionError::RegistryUnreachable)
        }
        DecodeOutcome::Interrupted => Err(SessionError::RegistryUnreachable),
    }
}

/// Ask the Registry for the primary worker of `class` handling `filename`,
/// over a fresh short-lived connection (spec §4.3). `reconnect` selects
/// `REQ_RECONNECT` over `REQ_DISTORT` so Registry-side logs can tell a
/// first-time request from a fail-over retry apart.
pub fn request_primary(
    registry_addr: SocketAddr,
    class: Class,
    filename: &str,
    reconnect: bool,
) -> Result<SocketAddr, SessionError> {
    let mut stream = TcpStream::connect(registry_addr)?;
    let frame_type = if reconnect { FrameType::ReqReconnect } else { FrameType::ReqDistort };
    let payload = join(&[class.as_str(), filename]);
    send_frame(&mut stream, &Frame::new(frame_type, &payload))?;

    match recv_frame(&mut stream) {
        DecodeOutcome::Frame(reply) => parse_primary_reply(reply.payload()),
        DecodeOutcome::PeerClosed | DecodeOutcome::TransportError(_) => {
            warn!("registry: request_primary failed, registry unreachable");
            Err(SessionError::RegistryUnreachable)
        }
        DecodeOutcome::Interrupted => Err(SessionError::RegistryUnreachable),
    }
}

fn parse_primary_reply(payload: &[u8]) -> Result<SocketAddr, SessionError> {
    let fields = split(payload);
    if fields.len() == 1 && (fields[0] == "DISTORT_KO" || fields[0] == "MEDIA_KO") {
        return Err(SessionError::Rejected(fields[0].clone()));
    }
    let [ip, port] = fields.as_slice() else {
        return Err(SessionError::MalformedReply);
    };
    let ip: std::net::IpAddr = ip.parse().map_err(|_| SessionError::MalformedReply)?;
    let port: u16 = port.parse().map_err(|_| SessionError::MalformedReply)?;
    Ok(SocketAddr::new(ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_successful_reply() {
        let addr = parse_primary_reply(b"127.0.0.1&9100").unwrap();
        assert_eq!(addr.port(), 9100);
    }

    #[test]
    fn parses_a_rejection() {
        assert!(matches!(parse_primary_reply(b"DISTORT_KO"), Err(SessionError::Rejected(_))));
        assert!(matches!(parse_primary_reply(b"MEDIA_KO"), Err(SessionError::Rejected(_))));
    }
}

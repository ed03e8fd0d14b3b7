use std::net::{SocketAddr, TcpStream};

use distort_core::Class;
use distort_proto::{join, send_frame, Frame, FrameType};

use crate::error::SessionError;

/// Open the long-lived control connection to the Registry and announce this
/// worker (`CONN_WORKER`, spec §6.1). Unlike the client's `CONN_CLIENT`
/// handshake, the Registry does not reply synchronously here: primary
/// assignment arrives later, asynchronously, as an `ASSIGN_PRIMARY` frame on
/// this same connection (spec §4.5), so the control/liveness task owns reads
/// on it from the moment it is returned.
pub fn announce(registry_addr: SocketAddr, class: Class, listen_addr: SocketAddr) -> Result<TcpStream, SessionError> {
    let mut stream = TcpStream::connect(registry_addr)?;
    let payload = join(&[class.as_str(), &listen_addr.ip().to_string(), &listen_addr.port().to_string()]);
    send_frame(&mut stream, &Frame::new(FrameType::ConnWorker, &payload))?;
    Ok(stream)
}

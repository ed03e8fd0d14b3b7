use std::collections::HashMap;
use std::str::FromStr;

use distort_core::{classify, Class};
use distort_proto::{join, split, Frame, FrameType};
use mio::Token;
use tracing::{info, warn};

use crate::conn::{Conn, ConnKind};
use crate::roster::Roster;

/// Outcome of handling one frame: whether the connection that produced it
/// should be torn down once its reply (if any) has flushed.
pub enum Outcome {
    Keep,
    Close,
}

/// Handle one decoded frame from `token`. `conns` and `roster` are mutated
/// in place; any reply is written directly to the originating connection
/// (and, for a primary handoff, to the newly-elected worker's connection).
pub fn handle_frame(token: Token, frame: &Frame, conns: &mut HashMap<Token, Conn>, roster: &mut Roster) -> Outcome {
    match frame.frame_type {
        FrameType::ConnClient => handle_conn_client(token, frame, conns),
        FrameType::ConnWorker => handle_conn_worker(token, frame, conns, roster),
        FrameType::ReqDistort | FrameType::ReqReconnect => handle_request_primary(token, frame, conns, roster),
        FrameType::Disconnect => handle_disconnect(token, conns, roster),
        other => {
            warn!(?token, ?other, "registry: unexpected frame type, closing connection");
            Outcome::Close
        }
    }
}

fn handle_conn_client(token: Token, frame: &Frame, conns: &mut HashMap<Token, Conn>) -> Outcome {
    let fields = split(frame.payload());
    let [username, _ip, _port] = fields.as_slice() else {
        reply_role_ko(token, conns, FrameType::ConnClient, "malformed CONN_CLIENT");
        return Outcome::Close;
    };
    info!(username, "registry: client connected");
    if let Some(conn) = conns.get_mut(&token) {
        conn.kind = ConnKind::ClientControl { username: username.clone() };
        conn.enqueue(&Frame::empty(FrameType::ConnClient));
    }
    Outcome::Keep
}

fn handle_conn_worker(token: Token, frame: &Frame, conns: &mut HashMap<Token, Conn>, roster: &mut Roster) -> Outcome {
    let fields = split(frame.payload());
    let [class_str, ip, port] = fields.as_slice() else {
        reply_role_ko(token, conns, FrameType::ConnWorker, "malformed CONN_WORKER");
        return Outcome::Close;
    };
    let (Ok(class), Ok(ip), Ok(port)) =
        (Class::from_str(class_str), ip.parse::<std::net::IpAddr>(), port.parse::<u16>())
    else {
        reply_role_ko(token, conns, FrameType::ConnWorker, "malformed CONN_WORKER fields");
        return Outcome::Close;
    };
    let listen_addr = std::net::SocketAddr::new(ip, port);

    info!(?class, %listen_addr, "registry: worker connected");
    if let Some(conn) = conns.get_mut(&token) {
        conn.kind = ConnKind::Worker { class, listen_addr };
    }
    roster.add_worker(class, token);

    if !roster.has_primary(class) {
        roster.set_primary(class, token);
        if let Some(conn) = conns.get_mut(&token) {
            conn.enqueue(&Frame::empty(FrameType::AssignPrimary));
        }
        info!(?class, ?token, "registry: assigned first primary for class");
    }
    Outcome::Keep
}

fn handle_request_primary(
    token: Token,
    frame: &Frame,
    conns: &mut HashMap<Token, Conn>,
    roster: &mut Roster,
) -> Outcome {
    let fields = split(frame.payload());
    let [class_str, filename] = fields.as_slice() else {
        reply_err(token, conns, "malformed primary request");
        return Outcome::Close;
    };

    let class = match classify(filename) {
        Some(c) => c,
        None => {
            reply_payload(token, conns, b"MEDIA_KO");
            return Outcome::Close;
        }
    };
    if Class::from_str(class_str).ok() != Some(class) {
        warn!(claimed = class_str, actual = ?class, filename, "registry: class mismatch on primary request");
    }

    let primary_addr = roster.primary_for(class).and_then(|t| conns.get(&t)).and_then(|c| match &c.kind {
        ConnKind::Worker { listen_addr, .. } => Some(*listen_addr),
        _ => None,
    });

    match primary_addr {
        Some(addr) => {
            let payload = join(&[&addr.ip().to_string(), &addr.port().to_string()]);
            reply_payload(token, conns, &payload);
        }
        None => reply_payload(token, conns, b"DISTORT_KO"),
    }
    Outcome::Close
}

fn reply_payload(token: Token, conns: &mut HashMap<Token, Conn>, payload: &[u8]) {
    if let Some(conn) = conns.get_mut(&token) {
        conn.kind = ConnKind::ClientRequest;
        conn.enqueue(&Frame::new(FrameType::ReqDistort, payload));
        conn.close_after_flush = true;
    }
}

fn reply_err(token: Token, conns: &mut HashMap<Token, Conn>, reason: &str) {
    warn!(?token, reason, "registry: rejecting malformed frame");
    if let Some(conn) = conns.get_mut(&token) {
        conn.enqueue(&Frame::new(FrameType::Err, reason.as_bytes()));
        conn.close_after_flush = true;
    }
}

/// Reject a structured `CONN_CLIENT`/`CONN_WORKER` request with a well-formed
/// reply of the *same* frame type carrying `CON_KO`, rather than a bare
/// `ERR` (spec §7: `ERR` is reserved for framing/checksum faults the peer
/// may retry; a rejected handshake gets an answer in its own protocol).
fn reply_role_ko(token: Token, conns: &mut HashMap<Token, Conn>, frame_type: FrameType, reason: &str) {
    warn!(?token, reason, "registry: rejecting handshake");
    if let Some(conn) = conns.get_mut(&token) {
        conn.enqueue(&Frame::new(frame_type, b"CON_KO"));
        conn.close_after_flush = true;
    }
}

/// An explicit `DISCONNECT` from a worker must drop it from the roster and
/// trigger election exactly like a transport-level `PeerClosed` would (spec
/// §4.5); only the worker case does roster bookkeeping, a client's
/// `DISCONNECT` just closes its connection.
fn handle_disconnect(token: Token, conns: &mut HashMap<Token, Conn>, roster: &mut Roster) -> Outcome {
    if let Some(ConnKind::Worker { class, .. }) = conns.get(&token).map(|c| &c.kind) {
        let class = *class;
        info!(?class, ?token, "registry: worker sent DISCONNECT");
        handle_worker_disconnect(token, class, conns, roster);
    }
    Outcome::Close
}

/// Called when a worker connection drops: remove it from the roster and, if
/// it was primary, elect a replacement and notify it (spec §4.5 failover).
pub fn handle_worker_disconnect(token: Token, class: Class, conns: &mut HashMap<Token, Conn>, roster: &mut Roster) {
    let was_primary = roster.primary_for(class) == Some(token);
    roster.remove_worker(class, token);
    if !was_primary {
        return;
    }
    match roster.elect(class) {
        Some(new_primary) => {
            info!(?class, ?new_primary, "registry: elected new primary after failover");
            if let Some(conn) = conns.get_mut(&new_primary) {
                conn.enqueue(&Frame::empty(FrameType::AssignPrimary));
            }
        }
        None => warn!(?class, "registry: no workers left to elect as primary"),
    }
}

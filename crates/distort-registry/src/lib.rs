mod conn;
mod dispatch;
mod error;
mod roster;

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use conn::{Conn, ConnKind};
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use tracing::{info, warn};

pub use error::RegistryError;

const CLIENT_LISTENER: Token = Token(0);
const WORKER_LISTENER: Token = Token(1);
const FIRST_DYNAMIC_TOKEN: usize = 2;
const POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// Run the registry's single-threaded, non-blocking event loop until `exit`
/// is set. Two listeners share one loop: the client port serves both
/// `CONN_CLIENT` control channels and one-shot primary lookups, the worker
/// port serves `CONN_WORKER` control channels (spec §4.5).
pub fn run(
    client_listener: std::net::TcpListener,
    worker_listener: std::net::TcpListener,
    exit: Arc<AtomicBool>,
) -> Result<(), RegistryError> {
    client_listener.set_nonblocking(true)?;
    worker_listener.set_nonblocking(true)?;
    let mut client_listener = TcpListener::from_std(client_listener);
    let mut worker_listener = TcpListener::from_std(worker_listener);

    let mut poll = Poll::new()?;
    poll.registry().register(&mut client_listener, CLIENT_LISTENER, Interest::READABLE)?;
    poll.registry().register(&mut worker_listener, WORKER_LISTENER, Interest::READABLE)?;

    let mut conns: HashMap<Token, Conn> = HashMap::new();
    let mut roster = roster::Roster::default();
    let mut next_token = FIRST_DYNAMIC_TOKEN;
    let mut events = Events::with_capacity(128);

    info!(
        client_addr = %client_listener.local_addr()?,
        worker_addr = %worker_listener.local_addr()?,
        "registry: listening"
    );

    while !exit.load(Ordering::Relaxed) {
        if let Err(e) = poll.poll(&mut events, Some(POLL_TIMEOUT)) {
            if e.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(e.into());
        }

        for event in events.iter() {
            match event.token() {
                CLIENT_LISTENER => accept_all(&mut client_listener, &mut conns, &mut next_token, poll.registry()),
                WORKER_LISTENER => accept_all(&mut worker_listener, &mut conns, &mut next_token, poll.registry()),
                token => service_connection(token, &mut conns, &mut roster, poll.registry()),
            }
        }

        conns.retain(|_, conn| !(conn.close_after_flush && !conn.has_pending_writes()));
    }

    Ok(())
}

fn accept_all(
    listener: &mut TcpListener,
    conns: &mut HashMap<Token, Conn>,
    next_token: &mut usize,
    registry: &mio::Registry,
) {
    loop {
        match listener.accept() {
            Ok((mut stream, peer_addr)) => {
                let token = Token(*next_token);
                *next_token += 1;
                if let Err(e) = registry.register(&mut stream, token, Interest::READABLE) {
                    warn!(error = %e, "registry: failed to register accepted connection");
                    continue;
                }
                info!(%peer_addr, ?token, "registry: accepted connection");
                conns.insert(token, Conn::new(stream, peer_addr));
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return,
            Err(e) => {
                warn!(error = %e, "registry: accept failed");
                return;
            }
        }
    }
}

fn service_connection(token: Token, conns: &mut HashMap<Token, Conn>, roster: &mut roster::Roster, registry: &mio::Registry) {
    loop {
        let Some(conn) = conns.get_mut(&token) else { return };
        match conn.read_frame() {
            distort_proto::ReadOutcome::Frame(frame) => {
                match dispatch::handle_frame(token, &frame, conns, roster) {
                    dispatch::Outcome::Keep => continue,
                    dispatch::Outcome::Close => {
                        if let Some(conn) = conns.get_mut(&token) {
                            conn.close_after_flush = true;
                        }
                        continue;
                    }
                }
            }
            distort_proto::ReadOutcome::WouldBlock => return,
            distort_proto::ReadOutcome::Disconnected => {
                drop_connection(token, conns, roster, registry);
                return;
            }
        }
    }
}

fn drop_connection(token: Token, conns: &mut HashMap<Token, Conn>, roster: &mut roster::Roster, registry: &mio::Registry) {
    let Some(mut conn) = conns.remove(&token) else { return };
    let _ = registry.deregister(&mut conn.stream);
    if let ConnKind::Worker { class, .. } = conn.kind {
        info!(?class, peer_addr = %conn.peer_addr, "registry: worker disconnected");
        dispatch::handle_worker_disconnect(token, class, conns, roster);
    }
}

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use distort_core::RegistryConfig;
use tracing::{error, info};

/// Registry binary: binds the client- and worker-facing listen sockets
/// named in the config file and runs the event loop until signalled.
fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt::init();

    let Some(config_path) = std::env::args().nth(1) else {
        eprintln!("usage: distort-registry <config-file>");
        return std::process::ExitCode::FAILURE;
    };

    let config = match RegistryConfig::load(&PathBuf::from(config_path)) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load registry config");
            return std::process::ExitCode::FAILURE;
        }
    };

    let client_addr = SocketAddr::new(config.client_ip, config.client_port);
    let worker_addr = SocketAddr::new(config.worker_ip, config.worker_port);

    let client_listener = match TcpListener::bind(client_addr) {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, addr = %client_addr, "could not bind client listener");
            return std::process::ExitCode::FAILURE;
        }
    };
    let worker_listener = match TcpListener::bind(worker_addr) {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, addr = %worker_addr, "could not bind worker listener");
            return std::process::ExitCode::FAILURE;
        }
    };

    let exit = Arc::new(AtomicBool::new(false));
    {
        let exit = exit.clone();
        ctrlc::set_handler(move || {
            info!("registry: shutdown requested");
            exit.store(true, Ordering::Relaxed);
        })
        .expect("failed to install signal handler");
    }

    match distort_registry::run(client_listener, worker_listener, exit) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "registry: event loop failed");
            std::process::ExitCode::FAILURE
        }
    }
}

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use distort_checkpoint::{CheckpointStore, WorkerCount};
use distort_core::WorkerConfig;
use distort_support::{checkpoint_dir, local_share_dir, parking_dir};
use distort_worker::{announce, run_job, spawn_control, sweep_orphans, WorkerContext};
use tracing::{error, info, warn};

const APP_NAME: &str = "distort";

/// Worker binary: announces to the Registry, accepts connections from
/// clients and the Registry's failover redirects alike, and runs each on its
/// own thread through the full `RecvFile..Bye` state machine (spec §4.4).
fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt::init();

    let Some(config_path) = std::env::args().nth(1) else {
        eprintln!("usage: distort-worker <config-file>");
        return std::process::ExitCode::FAILURE;
    };

    let config = match WorkerConfig::load(&PathBuf::from(config_path)) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load worker config");
            return std::process::ExitCode::FAILURE;
        }
    };

    let class_name = config.class.as_str();
    let registry_addr = SocketAddr::new(config.registry_ip, config.registry_port);
    let bind_addr = SocketAddr::new(config.worker_ip, config.worker_port);

    let listener = match TcpListener::bind(bind_addr) {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, addr = %bind_addr, "could not bind worker listen socket");
            return std::process::ExitCode::FAILURE;
        }
    };
    let listen_addr = listener.local_addr().unwrap_or(bind_addr);

    let work_dir = local_share_dir(APP_NAME).join("work").join(class_name);
    let parking_dir = parking_dir(APP_NAME, class_name);
    if let Err(e) = std::fs::create_dir_all(&work_dir).and_then(|()| std::fs::create_dir_all(&parking_dir)) {
        error!(error = %e, "could not create worker data directories");
        return std::process::ExitCode::FAILURE;
    }

    let checkpoints = CheckpointStore::shared(checkpoint_dir(APP_NAME, class_name));
    let worker_count = match WorkerCount::open_or_create(&local_share_dir(APP_NAME).join("worker_count").join(class_name)) {
        Ok(wc) => wc,
        Err(e) => {
            error!(error = %e, "could not open worker count region");
            return std::process::ExitCode::FAILURE;
        }
    };

    let control = match announce(registry_addr, config.class, listen_addr) {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "could not announce to registry");
            return std::process::ExitCode::FAILURE;
        }
    };

    let ctx = Arc::new(WorkerContext {
        registry_addr,
        class: config.class,
        work_dir,
        parking_dir,
        checkpoints,
        worker_count,
        exit: Arc::new(AtomicBool::new(false)),
        registry_dead: Arc::new(AtomicBool::new(false)),
        is_primary: Arc::new(AtomicBool::new(false)),
    });
    sweep_orphans(&ctx);
    ctx.worker_count.increment();

    {
        let ctx = ctx.clone();
        ctrlc::set_handler(move || {
            info!("worker: shutdown requested");
            ctx.exit.store(true, Ordering::Relaxed);
        })
        .expect("failed to install signal handler");
    }

    spawn_control(ctx.clone(), control);

    listener.set_nonblocking(true).ok();
    let mut handles = Vec::new();
    loop {
        if ctx.is_exiting() || ctx.registry_dead.load(Ordering::Relaxed) {
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(false).ok();
                let ctx = ctx.clone();
                handles.push(std::thread::spawn(move || {
                    if let Err(e) = run_job(&ctx, stream) {
                        warn!(error = %e, peer = %peer, "worker: job ended with an error");
                    }
                }));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            Err(e) => {
                warn!(error = %e, "worker: accept failed");
            }
        }
    }

    ctx.worker_count.decrement();
    for handle in handles {
        let _ = handle.join();
    }

    std::process::ExitCode::SUCCESS
}

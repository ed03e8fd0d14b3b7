use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use distort_client::{announce, run_job, spawn_liveness, ClientContext, JobOutcome};
use distort_core::{classify, ClientConfig, Job, Username};
use md5::{Digest, Md5};
use tracing::{error, info, warn};

/// Minimal line-oriented front end: each stdin line is `<filename> <factor>`,
/// resolved against the configured folder. Interactive command parsing
/// beyond this is out of scope; a richer CLI is expected to sit on top of
/// the same `distort-client` library.
fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt::init();

    let Some(config_path) = std::env::args().nth(1) else {
        eprintln!("usage: distort-client <config-file>");
        return std::process::ExitCode::FAILURE;
    };

    let config = match ClientConfig::load(&PathBuf::from(config_path)) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load client config");
            return std::process::ExitCode::FAILURE;
        }
    };

    let registry_addr = std::net::SocketAddr::new(config.registry_ip, config.registry_port);
    let username = Username::new(&config.username);

    let control = match announce(registry_addr, username.as_str()) {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "could not announce to registry");
            return std::process::ExitCode::FAILURE;
        }
    };

    let ctx = Arc::new(ClientContext::new(
        registry_addr,
        username.as_str().to_string(),
        PathBuf::from(config.folder_path),
    ));

    {
        let ctx = ctx.clone();
        ctrlc::set_handler(move || {
            info!("client: shutdown requested");
            ctx.exit.store(true, Ordering::Relaxed);
        })
        .expect("failed to install signal handler");
    }

    spawn_liveness(ctx.clone(), control);

    let stdin = std::io::stdin();
    let mut handles = Vec::new();
    for line in stdin.lock().lines() {
        if ctx.is_exiting() || ctx.is_registry_dead() {
            break;
        }
        let Ok(line) = line else { break };
        let mut parts = line.split_whitespace();
        let (Some(filename), Some(factor)) = (parts.next(), parts.next()) else {
            warn!("client: expected '<filename> <factor>'");
            continue;
        };
        let Ok(factor) = factor.parse::<u32>() else {
            warn!(factor, "client: factor must be a non-negative integer");
            continue;
        };

        let Some(class) = classify(filename) else {
            warn!(filename, "client: unsupported file extension");
            continue;
        };

        let file_path = ctx.folder_path.join(filename);
        let job = match build_job(username.clone(), filename, &file_path, factor, class) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, filename, "client: could not read local file");
                continue;
            }
        };

        let ctx = ctx.clone();
        handles.push(std::thread::spawn(move || match run_job(&ctx, job) {
            JobOutcome::Completed { distorted_path } => {
                info!(path = %distorted_path.display(), "client: job completed");
            }
            JobOutcome::Failed(reason) => error!(reason, "client: job failed"),
            JobOutcome::Interrupted => info!("client: job interrupted by shutdown"),
        }));
    }

    for handle in handles {
        let _ = handle.join();
    }

    std::process::ExitCode::SUCCESS
}

fn build_job(
    username: Username,
    filename: &str,
    file_path: &PathBuf,
    factor: u32,
    class: distort_core::Class,
) -> std::io::Result<Job> {
    let metadata = std::fs::metadata(file_path)?;
    let md5 = md5_of_file(file_path)?;
    Ok(Job::new(username, filename.to_string(), file_path.clone(), metadata.len(), md5, factor, class))
}

fn md5_of_file(path: &PathBuf) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Md5::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

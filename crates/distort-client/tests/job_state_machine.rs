//! Exercises `run_job` against hand-rolled stand-ins for the Registry and a
//! Worker, speaking the wire protocol directly through `distort-proto`
//! rather than through a real `distort-registry`/`distort-worker` process
//! (spec §4.3, scenarios S1/S4 in §8).

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;

use distort_client::{run_job, ClientContext, JobOutcome};
use distort_core::{Class, Job, Username};
use distort_proto::{join, recv_frame, send_frame, split, DecodeOutcome, Frame, FrameType};
use distort_transfer::{Progress, TransferEngine};
use md5::{Digest, Md5};

fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Answers every `REQ_DISTORT`/`REQ_RECONNECT` it receives with the next
/// address from `addrs`, in order, then stops.
fn fake_registry(addrs: Vec<SocketAddr>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for worker_addr in addrs {
            let Ok((mut stream, _)) = listener.accept() else { return };
            match recv_frame(&mut stream) {
                DecodeOutcome::Frame(frame)
                    if matches!(frame.frame_type, FrameType::ReqDistort | FrameType::ReqReconnect) =>
                {
                    let payload =
                        join(&[&worker_addr.ip().to_string(), &worker_addr.port().to_string()]);
                    send_frame(&mut stream, &Frame::new(FrameType::ReqDistort, &payload)).unwrap();
                }
                other => panic!("registry stub: unexpected request {other:?}"),
            }
        }
    });
    addr
}

/// Plays the Worker side of one full dialogue end to end: accepts the
/// metadata handshake, receives the upload, reports the check, sends back a
/// distorted file (here: the identical bytes, since distortion itself is
/// out of scope for this test), and waits for the client's closing verdict.
fn fake_worker_full_session(stream: &mut TcpStream, upload_md5: &str, out_bytes: &[u8]) {
    match recv_frame(stream) {
        DecodeOutcome::Frame(frame) if frame.frame_type == FrameType::Metadata => {
            let fields = split(frame.payload());
            let n_packets = distort_core::n_packets_for(fields[2].parse().unwrap());
            send_frame(stream, &Frame::empty(FrameType::Metadata)).unwrap();

            let dir = tempfile::tempdir().unwrap();
            let received = dir.path().join("upload");
            let mut progress = Progress::new(n_packets, 0);
            let cancel = std::sync::atomic::AtomicBool::new(false);
            let outcome = TransferEngine::receive(stream, &received, &mut progress, &cancel);
            assert!(matches!(outcome, distort_transfer::TransferOutcome::Completed));

            let actual_md5 = md5_hex(&std::fs::read(&received).unwrap());
            assert_eq!(actual_md5, upload_md5);
            send_frame(stream, &Frame::new(FrameType::Md5Check, b"CHECK_OK")).unwrap();

            let out_path = dir.path().join("out");
            std::fs::write(&out_path, out_bytes).unwrap();
            let md5_out = md5_hex(out_bytes);
            let payload = join(&[&out_bytes.len().to_string(), &md5_out]);
            send_frame(stream, &Frame::new(FrameType::MetaOut, &payload)).unwrap();

            let n_packets_out = distort_core::n_packets_for(out_bytes.len() as u64);
            let mut send_progress = Progress::new(n_packets_out, 0);
            let send_outcome =
                TransferEngine::send(stream, &out_path, &mut send_progress, &cancel);
            assert!(matches!(send_outcome, distort_transfer::TransferOutcome::Completed));

            match recv_frame(stream) {
                DecodeOutcome::Frame(f) if f.frame_type == FrameType::Md5Check => {
                    assert_eq!(f.payload(), b"CHECK_OK");
                }
                other => panic!("worker stub: expected client's CHECK_OK, got {other:?}"),
            }
            match recv_frame(stream) {
                DecodeOutcome::Frame(f) if f.frame_type == FrameType::Disconnect => {}
                other => panic!("worker stub: expected DISCONNECT, got {other:?}"),
            }
        }
        other => panic!("worker stub: expected Metadata, got {other:?}"),
    }
}

fn test_job(file_path: std::path::PathBuf, bytes: &[u8]) -> Job {
    std::fs::write(&file_path, bytes).unwrap();
    Job::new(
        Username::new("alice"),
        file_path.file_name().unwrap().to_str().unwrap().to_string(),
        file_path,
        bytes.len() as u64,
        md5_hex(bytes),
        3,
        Class::Text,
    )
}

#[test]
fn happy_path_completes_and_writes_the_distorted_file() {
    let dir = tempfile::tempdir().unwrap();
    let upload_bytes = vec![7u8; 500];
    let job = test_job(dir.path().join("hello.txt"), &upload_bytes);
    let upload_md5 = job.md5.clone();

    let worker_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let worker_addr = worker_listener.local_addr().unwrap();
    let out_bytes = vec![9u8; 300];
    let worker_out = out_bytes.clone();
    let worker = thread::spawn(move || {
        let (mut stream, _) = worker_listener.accept().unwrap();
        fake_worker_full_session(&mut stream, &upload_md5, &worker_out);
    });

    let registry_addr = fake_registry(vec![worker_addr]);
    let ctx = ClientContext::new(registry_addr, "alice".to_string(), dir.path().to_path_buf());

    let outcome = run_job(&ctx, job);
    worker.join().unwrap();

    match outcome {
        JobOutcome::Completed { distorted_path } => {
            assert_eq!(std::fs::read(distorted_path).unwrap(), out_bytes);
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn worker_dying_mid_upload_reconnects_through_a_successor_and_still_completes() {
    // S4: the primary dies partway through the upload (after acking 2 of 3
    // packets); the Client reconnects via the Registry and a second worker
    // finishes the job starting its own receive fresh (see DESIGN.md's note
    // on the SendFile/AdoptCheckpoint resolution) while the Client resends
    // the whole (unchanged) file.
    let dir = tempfile::tempdir().unwrap();
    let upload_bytes = vec![5u8; 500]; // 3 packets: 244 + 244 + 12
    let job = test_job(dir.path().join("hello.txt"), &upload_bytes);
    let upload_md5 = job.md5.clone();

    let dying_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let dying_addr = dying_listener.local_addr().unwrap();
    let dying_worker = thread::spawn(move || {
        let (mut stream, _) = dying_listener.accept().unwrap();
        match recv_frame(&mut stream) {
            DecodeOutcome::Frame(f) if f.frame_type == FrameType::Metadata => {
                send_frame(&mut stream, &Frame::empty(FrameType::Metadata)).unwrap();
            }
            other => panic!("dying worker: unexpected {other:?}"),
        }
        // Receive exactly two packets, ack them, then vanish without
        // acking the third.
        for _ in 0..2 {
            match recv_frame(&mut stream) {
                DecodeOutcome::Frame(f) if f.frame_type == FrameType::Data => {
                    send_frame(&mut stream, &Frame::empty(FrameType::Ack)).unwrap();
                }
                other => panic!("dying worker: expected Data, got {other:?}"),
            }
        }
        drop(stream);
    });

    let successor_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let successor_addr = successor_listener.local_addr().unwrap();
    let out_bytes = vec![2u8; 50];
    let successor_out = out_bytes.clone();
    let successor_md5 = upload_md5.clone();
    let successor = thread::spawn(move || {
        let (mut stream, _) = successor_listener.accept().unwrap();
        fake_worker_full_session(&mut stream, &successor_md5, &successor_out);
    });

    let registry_addr = fake_registry(vec![dying_addr, successor_addr]);
    let ctx = ClientContext::new(registry_addr, "alice".to_string(), dir.path().to_path_buf());

    let outcome = run_job(&ctx, job);
    dying_worker.join().unwrap();
    successor.join().unwrap();

    match outcome {
        JobOutcome::Completed { distorted_path } => {
            assert_eq!(std::fs::read(distorted_path).unwrap(), out_bytes);
        }
        other => panic!("expected Completed after failover, got {other:?}"),
    }
}

#[test]
fn same_primary_advertised_twice_fails_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let job = test_job(dir.path().join("hello.txt"), &[1u8; 10]);

    let dead_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_addr = dead_listener.local_addr().unwrap();
    drop(dead_listener); // nothing is listening, so connect will fail

    let registry_addr = fake_registry(vec![dead_addr, dead_addr]);
    let ctx = ClientContext::new(registry_addr, "alice".to_string(), dir.path().to_path_buf());

    let outcome = run_job(&ctx, job);
    assert!(matches!(outcome, JobOutcome::Failed(_)), "expected Failed, got {outcome:?}");
}

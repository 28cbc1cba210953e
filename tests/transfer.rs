//! End-to-end transfer scenarios, driving a sender and a receiver over real
//! loopback UDP sockets on a distinct port pair per test (so parallel
//! `cargo test` threads never collide). Corrupt/lossy-network scenarios are
//! covered at the unit level instead (`transmitter`, `codec`): there is no
//! fault-injecting transport in this crate to drive them end-to-end without
//! risking a flaky test.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use flux_xfer::context::ProtocolContext;
use flux_xfer::queue::BoundedQueue;
use flux_xfer::{driver, pipeline};

struct Cleanup(PathBuf);
impl Drop for Cleanup {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

/// The receiver always writes to the sent file's basename in its current
/// directory, so `src_path` must live somewhere other than the test
/// process's CWD or the transfer would read from the same path it writes.
fn run_pair(sender_port: u16, receiver_port: u16, src_path: PathBuf, dest_name: &str) {
    let send_ctx = Arc::new(ProtocolContext::new(true));
    let send_main = Arc::new(BoundedQueue::new());
    let send_out = Arc::new(BoundedQueue::new());

    let recv_ctx = Arc::new(ProtocolContext::new(false));
    let recv_main = Arc::new(BoundedQueue::new());
    let recv_out = Arc::new(BoundedQueue::new());

    let _send_egress = pipeline::spawn_egress(send_ctx.clone(), send_out.clone(), receiver_port);
    let _send_ingress = pipeline::spawn_ingress(send_ctx.clone(), send_main.clone(), send_out.clone(), sender_port);
    let _send_timer = pipeline::spawn_timer(send_ctx.clone(), send_main.clone());

    let _recv_egress = pipeline::spawn_egress(recv_ctx.clone(), recv_out.clone(), sender_port);
    let _recv_ingress = pipeline::spawn_ingress(recv_ctx.clone(), recv_main.clone(), recv_out.clone(), receiver_port);
    let _recv_timer = pipeline::spawn_timer(recv_ctx.clone(), recv_main.clone());

    let recv_ctx2 = recv_ctx.clone();
    let recv_main2 = recv_main.clone();
    let recv_out2 = recv_out.clone();
    let recv_handle = thread::spawn(move || driver::run_receive(recv_ctx2, recv_main2, recv_out2));

    let send_result = driver::run_send(send_ctx.clone(), send_main.clone(), send_out.clone(), "127.0.0.1".into(), &src_path);
    send_result.expect("send side failed");

    let recv_result = recv_handle.join().expect("receiver thread panicked");
    recv_result.expect("receive side failed");

    send_ctx.request_stop();
    recv_ctx.request_stop();
    send_main.notify_all();
    send_out.notify_all();
    recv_main.notify_all();
    recv_out.notify_all();

    let written = fs::read(dest_name).expect("destination file was not written");
    let original = fs::read(&src_path).expect("source file missing");
    assert_eq!(written, original, "received bytes did not match the sent file");
}

#[test]
fn transfers_a_small_file_exactly() {
    let src_dir = tempfile::tempdir().unwrap();
    let src = src_dir.path().join("small.bin");
    {
        let mut f = fs::File::create(&src).unwrap();
        f.write_all(&(0..3000u32).map(|i| (i % 251) as u8).collect::<Vec<u8>>()).unwrap();
    }
    let dest_name = "small.bin";
    let _dest_guard = Cleanup(PathBuf::from(dest_name));

    run_pair(38101, 38102, src, dest_name);
}

#[test]
fn transfers_a_file_spanning_many_windows() {
    use flux_xfer::constants::DATA_LEN;

    let src_dir = tempfile::tempdir().unwrap();
    let src = src_dir.path().join("large.bin");
    {
        let mut f = fs::File::create(&src).unwrap();
        let bytes: Vec<u8> = (0..(DATA_LEN * 12 + 77)).map(|i| (i % 256) as u8).collect();
        f.write_all(&bytes).unwrap();
    }
    let dest_name = "large.bin";
    let _dest_guard = Cleanup(PathBuf::from(dest_name));

    run_pair(38201, 38202, src, dest_name);
}

#[test]
fn ctrl_c_style_stop_unblocks_both_peers_without_hanging() {
    let ctx = Arc::new(ProtocolContext::new(false));
    let main_queue = Arc::new(BoundedQueue::new());
    let out_queue = Arc::new(BoundedQueue::new());

    let ingress = pipeline::spawn_ingress(ctx.clone(), main_queue.clone(), out_queue.clone(), 38301);
    let egress = pipeline::spawn_egress(ctx.clone(), out_queue.clone(), 38302);
    let timer = pipeline::spawn_timer(ctx.clone(), main_queue.clone());

    let ctx2 = ctx.clone();
    let main2 = main_queue.clone();
    let out2 = out_queue.clone();
    let handle = thread::spawn(move || driver::run_receive(ctx2, main2, out2));

    thread::sleep(Duration::from_millis(50));
    ctx.stop.store(true, Ordering::Release);
    main_queue.notify_all();
    out_queue.notify_all();

    handle.join().expect("receiver thread panicked").expect("stop should return Ok, not an error");
    ingress.join().ok();
    egress.join().ok();
    timer.join().ok();
}

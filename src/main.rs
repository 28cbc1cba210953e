//! CLI entry point: `flux-xfer <dest_ip> <file>` to send, `flux-xfer` with
//! no arguments to listen. Grounded on `original_source/src/entry.cpp`'s
//! `main`/`process_args` for the argument contract and thread lifecycle.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{error, info};

use flux_xfer::constants::{LISTEN_PORT, SEND_PORT};
use flux_xfer::context::ProtocolContext;
use flux_xfer::ip::discover_own_ip;
use flux_xfer::queue::BoundedQueue;
use flux_xfer::{driver, pipeline};

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let (sending, dest_ip, file_path) = match args.len() {
        1 => {
            info!("no arguments given, listening for an incoming transfer");
            if let Some(ip) = discover_own_ip() {
                println!("Send files to IP: {ip} to receive them here.");
            }
            (false, None, None)
        }
        3 => {
            info!(dest_ip = %args[1], file = %args[2], "sending file");
            (true, Some(args[1].clone()), Some(PathBuf::from(&args[2])))
        }
        _ => {
            eprintln!("Error: wrong number of arguments.");
            eprintln!("Provide no arguments to listen for files.");
            eprintln!("OR provide an IP address and a file path to send one.");
            std::process::exit(1);
        }
    };

    let ctx = Arc::new(ProtocolContext::new(sending));
    let main_queue = Arc::new(BoundedQueue::new());
    let out_queue = Arc::new(BoundedQueue::new());

    let (ingress_port, egress_port) = if sending {
        (SEND_PORT, LISTEN_PORT)
    } else {
        (LISTEN_PORT, SEND_PORT)
    };

    let egress = pipeline::spawn_egress(ctx.clone(), out_queue.clone(), egress_port);
    let ingress = pipeline::spawn_ingress(ctx.clone(), main_queue.clone(), out_queue.clone(), ingress_port);
    let timer = pipeline::spawn_timer(ctx.clone(), main_queue.clone());

    let stop_ctx = ctx.clone();
    let stop_main_queue = main_queue.clone();
    let stop_out_queue = out_queue.clone();
    ctrlc::set_handler(move || {
        stop_ctx.stop.store(true, Ordering::Release);
        stop_main_queue.notify_all();
        stop_out_queue.notify_all();
    })
    .ok();

    let result = if sending {
        driver::run_send(ctx.clone(), main_queue.clone(), out_queue.clone(), dest_ip.unwrap(), &file_path.unwrap())
    } else {
        driver::run_receive(ctx.clone(), main_queue.clone(), out_queue.clone())
    };

    if let Err(e) = result {
        error!(%e, "transfer failed");
    }

    ctx.request_stop();
    main_queue.notify_all();
    out_queue.notify_all();

    egress.join().ok();
    ingress.join().ok();
    timer.join().ok();

    println!("Bye!");
}

//! The three long-lived worker threads: egress, ingress, timer.
//!
//! Grounded on `transport/mod.rs`'s `thread::spawn(move || { .. })` pattern
//! for its send/ack-sweep loops, generalized to the blocking socket model
//! this protocol uses instead of that transport's nonblocking poll loop.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::codec::{self, PacketType};
use crate::constants::RESEND_DELAY_MS;
use crate::context::ProtocolContext;
use crate::events::{MainEvent, OutEvent, OutEventType};
use crate::net::{Receiver, Sender};
use crate::queue::BoundedQueue;

/// Dedicated owner of a `Sender`. Never touches protocol state — it only
/// encodes and ships whatever the protocol layer already decided to send.
pub fn spawn_egress(
    ctx: Arc<ProtocolContext>,
    out_queue: Arc<BoundedQueue<OutEvent>>,
    dest_port: u16,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut sender = match Sender::new(dest_port) {
            Ok(s) => s,
            Err(e) => {
                error!(%e, "egress: failed to open socket");
                return;
            }
        };
        debug!("egress task started");

        while !ctx.is_stopped() {
            let batch = out_queue.wait_nonempty(&ctx.stop);
            for ev in batch {
                let ty = match ev.ty {
                    OutEventType::Msg => PacketType::Msg,
                    OutEventType::Ack => PacketType::Ack,
                };
                let packet = codec::encode(ev.id, ty, &ev.content);
                sender.set_dest_ip(&ev.dest_ip);
                if !sender.send_packet(&packet) {
                    warn!(id = ev.id, dest = %ev.dest_ip, "egress: send failed");
                }
            }
        }
        debug!("egress task exiting");
    })
}

/// Dedicated owner of a `Receiver`. Decodes every datagram, autonomously
/// emits an ack for data messages, and forwards well-formed packets onto
/// `main_queue`.
pub fn spawn_ingress(
    ctx: Arc<ProtocolContext>,
    main_queue: Arc<BoundedQueue<MainEvent>>,
    out_queue: Arc<BoundedQueue<OutEvent>>,
    listen_port: u16,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let receiver = match Receiver::new(listen_port) {
            Ok(r) => r,
            Err(e) => {
                error!(%e, "ingress: failed to open socket");
                return;
            }
        };
        debug!("ingress task started");

        while !ctx.is_stopped() {
            let (origin_ip, bytes) = match receiver.listen_for_packet() {
                Ok(Some(pair)) => pair,
                Ok(None) => continue,
                Err(e) => {
                    error!(%e, "ingress: fatal socket error");
                    ctx.request_stop();
                    main_queue.notify_all();
                    out_queue.notify_all();
                    break;
                }
            };

            let decoded = codec::decode(&bytes);
            if decoded.ty == Some(PacketType::Msg) {
                let ack_payload = if decoded.crc_ok { vec![0xFFu8] } else { vec![0x00u8] };
                for _ in 0..ctx.ack_count() {
                    out_queue.push(OutEvent {
                        ty: OutEventType::Ack,
                        id: decoded.id,
                        dest_ip: origin_ip.clone(),
                        content: ack_payload.clone(),
                    });
                }
            }

            if decoded.crc_ok {
                if let Some(ty) = decoded.ty {
                    main_queue.push(MainEvent::from_packet(ty, decoded.id, origin_ip, decoded.payload));
                }
            }
        }
        debug!("ingress task exiting");
    })
}

/// Periodically nudges the main queue so the protocol layer can sweep for
/// timed-out messages even when nothing else is arriving.
pub fn spawn_timer(ctx: Arc<ProtocolContext>, main_queue: Arc<BoundedQueue<MainEvent>>) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("timer task started");
        while !ctx.stop.load(Ordering::Acquire) {
            thread::sleep(Duration::from_millis(RESEND_DELAY_MS));
            if ctx.is_stopped() {
                break;
            }
            main_queue.push(MainEvent::timeout());
        }
        info!("timer task exiting");
    })
}

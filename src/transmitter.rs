//! The sliding-window send/receive state machine — the heart of the engine.
//!
//! Grounded on `original_source/src/transmitter.cpp` (the authoritative
//! revision per spec.md §9) and structured the way the teacher structures
//! `ReliableUdpRingBufferTransport` in `src/transport/reliable_udp/mod.rs`:
//! one plain struct, no base-class hierarchy (SPEC_FULL.md §9 / REDESIGN
//! FLAGS).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::constants::{MAX_RETRIES, RESEND_DELAY_MS};
use crate::context::ProtocolContext;
use crate::error::{Result, XferError};
use crate::events::{MainEvent, MainEventType, OutEvent, OutEventType};
use crate::queue::BoundedQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Send,
    Receive,
}

#[derive(Debug)]
pub struct SentMessage {
    pub content: Vec<u8>,
    pub ackd: bool,
    pub retries: u8,
    pub sent_at: Instant,
}

#[derive(Debug)]
pub struct RecvdMessage {
    pub content: Vec<u8>,
    pub received_at: Instant,
}

/// One phase of a transfer: a contiguous id window, a send/recv map, and a
/// completion predicate. The driver constructs one of these per phase and
/// discards it once `done()`.
pub struct Transmitter {
    ctx: Arc<ProtocolContext>,
    out_queue: Arc<BoundedQueue<OutEvent>>,

    pub dest_ip: String,
    pub src_ip: String,

    pub sent_msgs: HashMap<u32, SentMessage>,
    pub recvd_msgs: HashMap<u32, RecvdMessage>,

    pub in_msg_count: usize,
    pub out_msg_count: usize,

    pub min_ack_id: u32,
    pub min_msg_id: u32,

    pub mode: Mode,
    done: bool,
}

impl Transmitter {
    pub fn new_send(
        ctx: Arc<ProtocolContext>,
        out_queue: Arc<BoundedQueue<OutEvent>>,
        dest_ip: String,
        out_msg_count: usize,
        in_msg_count: usize,
        min_ack_id: u32,
        min_msg_id: u32,
    ) -> Self {
        Self {
            ctx,
            out_queue,
            dest_ip,
            src_ip: String::new(),
            sent_msgs: HashMap::new(),
            recvd_msgs: HashMap::new(),
            in_msg_count,
            out_msg_count,
            min_ack_id,
            min_msg_id,
            mode: Mode::Send,
            done: false,
        }
    }

    pub fn new_receive(
        ctx: Arc<ProtocolContext>,
        out_queue: Arc<BoundedQueue<OutEvent>>,
        in_msg_count: usize,
        min_ack_id: u32,
        min_msg_id: u32,
    ) -> Self {
        Self {
            ctx,
            out_queue,
            dest_ip: String::new(),
            src_ip: String::new(),
            sent_msgs: HashMap::new(),
            recvd_msgs: HashMap::new(),
            in_msg_count,
            out_msg_count: 0,
            min_ack_id,
            min_msg_id,
            mode: Mode::Receive,
            done: false,
        }
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn ctx(&self) -> &ProtocolContext {
        &self.ctx
    }

    /// Assign the next id, record the message as in-flight, and enqueue it.
    pub fn send_msg(&mut self, payload: Vec<u8>) -> u32 {
        let id = self.ctx.next_id();
        self.sent_msgs.insert(
            id,
            SentMessage { content: payload.clone(), ackd: false, retries: 1, sent_at: Instant::now() },
        );
        self.out_queue.push(OutEvent {
            ty: OutEventType::Msg,
            id,
            dest_ip: self.dest_ip.clone(),
            content: payload,
        });
        trace!(id, "sent message");
        id
    }

    fn on_msg(&mut self, ev: &MainEvent) {
        self.src_ip = ev.origin_ip.clone();
        self.recvd_msgs.insert(ev.id, RecvdMessage { content: ev.content.clone(), received_at: Instant::now() });
        self.check_completion();
    }

    fn on_ack(&mut self, ev: &MainEvent) {
        if let Some(msg) = self.sent_msgs.get_mut(&ev.id) {
            let positive = ev.content.first().map(|&b| b > 128).unwrap_or(false);
            msg.ackd = positive;
            if msg.ackd {
                msg.content.clear();
            }
            self.check_completion();
        }
    }

    fn on_timeout(&mut self) -> Result<()> {
        let now = Instant::now();
        let resend_delay = Duration::from_millis(RESEND_DELAY_MS);
        let mut to_resend = Vec::new();

        for (&id, msg) in self.sent_msgs.iter_mut() {
            if !msg.ackd && now.duration_since(msg.sent_at) > resend_delay {
                msg.retries += 1;
                if msg.retries > MAX_RETRIES {
                    return Err(XferError::retries_exhausted(id, MAX_RETRIES));
                }
                to_resend.push((id, msg.content.clone()));
            }
        }

        for (id, content) in to_resend {
            warn!(id, "resending after timeout");
            self.out_queue.push(OutEvent { ty: OutEventType::Msg, id, dest_ip: self.dest_ip.clone(), content });
        }

        Ok(())
    }

    fn check_completion(&mut self) {
        let all_ackd = self.sent_msgs.values().all(|m| m.ackd);
        self.done = self.recvd_msgs.len() == self.in_msg_count
            && self.sent_msgs.len() == self.out_msg_count
            && all_ackd;
    }

    /// Drive this phase to completion. `after_batch` is the phase-specific
    /// continuation (e.g. the file phase pushes more window frames).
    pub fn run_main_body(
        &mut self,
        main_queue: &BoundedQueue<MainEvent>,
        mut after_batch: impl FnMut(&mut Transmitter, &[MainEvent]) -> Result<()>,
    ) -> Result<()> {
        while !self.done && !self.ctx.is_stopped() {
            let batch = main_queue.wait_nonempty(&self.ctx.stop);
            if self.done || self.ctx.is_stopped() {
                break;
            }

            for ev in &batch {
                match ev.ty {
                    MainEventType::Msg => {
                        if ev.id >= self.min_msg_id && !self.recvd_msgs.contains_key(&ev.id) {
                            self.on_msg(ev);
                        }
                    }
                    MainEventType::Ack => {
                        if ev.id >= self.min_ack_id && self.mode == Mode::Send {
                            self.on_ack(ev);
                        }
                    }
                    MainEventType::Timeout => {
                        self.on_timeout()?;
                    }
                }
            }

            after_batch(self, &batch)?;
        }

        debug!(done = self.done, stopped = self.ctx.is_stopped(), "phase loop exited");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Arc<ProtocolContext> {
        Arc::new(ProtocolContext::new(true))
    }

    #[test]
    fn ack_idempotence() {
        let mut t = Transmitter::new_send(ctx(), Arc::new(BoundedQueue::new()), "1.2.3.4".into(), 1, 0, 0, 0);
        let id = t.send_msg(b"hi".to_vec());
        let ack = MainEvent { ty: MainEventType::Ack, id, origin_ip: String::new(), content: vec![0xFF] };
        t.on_ack(&ack);
        assert!(t.sent_msgs[&id].ackd);
        t.on_ack(&ack);
        assert!(t.sent_msgs[&id].ackd);
        assert!(t.done());
    }

    #[test]
    fn negative_ack_leaves_message_in_flight() {
        let mut t = Transmitter::new_send(ctx(), Arc::new(BoundedQueue::new()), "1.2.3.4".into(), 1, 0, 0, 0);
        let id = t.send_msg(b"hi".to_vec());
        let ack = MainEvent { ty: MainEventType::Ack, id, origin_ip: String::new(), content: vec![0x00] };
        t.on_ack(&ack);
        assert!(!t.sent_msgs[&id].ackd);
        assert!(!t.done());
    }

    #[test]
    fn duplicate_msg_does_not_double_count() {
        let mut t = Transmitter::new_receive(ctx(), Arc::new(BoundedQueue::new()), 1, 0, 0);
        let ev = MainEvent { ty: MainEventType::Msg, id: 0, origin_ip: "9.9.9.9".into(), content: vec![1, 2, 3] };
        t.on_msg(&ev);
        t.on_msg(&ev);
        assert_eq!(t.recvd_msgs.len(), 1);
    }

    #[test]
    fn phase_isolation_drops_stale_ack() {
        let mut t = Transmitter::new_send(ctx(), Arc::new(BoundedQueue::new()), "1.2.3.4".into(), 0, 0, 5, 5);
        let ack = MainEvent { ty: MainEventType::Ack, id: 3, origin_ip: String::new(), content: vec![0xFF] };
        // id below min_ack_id: run_main_body's dispatch would skip on_ack entirely.
        assert!(ack.id < t.min_ack_id);
        t.on_ack(&ack); // direct call is a no-op anyway: id 3 was never sent.
        assert!(t.sent_msgs.is_empty());
    }

    #[test]
    fn retry_cap_trips_after_max_retries() {
        let mut t = Transmitter::new_send(ctx(), Arc::new(BoundedQueue::new()), "1.2.3.4".into(), 1, 0, 0, 0);
        let id = t.send_msg(b"hi".to_vec());
        t.sent_msgs.get_mut(&id).unwrap().sent_at = Instant::now() - Duration::from_secs(10);
        for _ in 0..MAX_RETRIES {
            t.on_timeout().unwrap();
            t.sent_msgs.get_mut(&id).unwrap().sent_at = Instant::now() - Duration::from_secs(10);
        }
        let err = t.on_timeout().unwrap_err();
        assert!(matches!(err, XferError::RetriesExhausted { .. }));
    }
}

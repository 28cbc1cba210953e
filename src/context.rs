//! Process-wide protocol state.
//!
//! The original program keeps `stop`/`sending`/`next_id`/`ack_count` as
//! free-standing `volatile` globals (see the REDESIGN FLAGS in SPEC_FULL.md
//! §9). Here they are fields of a single `ProtocolContext`, owned by the
//! driver and shared with the three worker threads behind an `Arc`, with
//! mutability confined to atomics.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::constants::DEFAULT_ACK_COUNT;

pub struct ProtocolContext {
    /// Set once, by the SIGINT handler or normal completion; never cleared.
    pub stop: AtomicBool,
    /// True on the peer transmitting a file, false on the listening peer.
    pub sending: bool,
    /// Monotonic id source shared across all phases of one transfer.
    next_id: AtomicU32,
    /// Number of ack replicas the ingress task emits per received message.
    pub ack_count: AtomicU32,
}

impl ProtocolContext {
    pub fn new(sending: bool) -> Self {
        Self {
            stop: AtomicBool::new(false),
            sending,
            next_id: AtomicU32::new(0),
            ack_count: AtomicU32::new(DEFAULT_ACK_COUNT),
        }
    }

    /// Fetch-and-add the next message id. Unique across the whole transfer
    /// even though phases partition the id space into windows.
    pub fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn peek_next_id(&self) -> u32 {
        self.next_id.load(Ordering::Relaxed)
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn ack_count(&self) -> u32 {
        self.ack_count.load(Ordering::Relaxed)
    }

    pub fn set_ack_count(&self, count: u32) {
        self.ack_count.store(count, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_id_is_strictly_increasing() {
        let ctx = ProtocolContext::new(true);
        let ids: Vec<u32> = (0..5).map(|_| ctx.next_id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }
}

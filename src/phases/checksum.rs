//! Checksum phase: the receiver confirms (or denies) that its reassembled
//! file's SHA-256 matched the sender's.
//!
//! Wire payload: `"%*%CHKSUM%*%" + ("1" | "0") + "%*%"`. Grounded on
//! `original_source/{include,src}/checksum_transmitter.{h,cpp}`.

use std::sync::Arc;

use crate::context::ProtocolContext;
use crate::events::OutEvent;
use crate::queue::BoundedQueue;
use crate::transmitter::Transmitter;

const TAG: &str = "CHKSUM";
const SEPARATOR: &str = "%*%";

pub struct ChecksumTransmitter {
    inner: Transmitter,
}

impl ChecksumTransmitter {
    pub fn new_send(
        ctx: Arc<ProtocolContext>,
        out_queue: Arc<BoundedQueue<OutEvent>>,
        dest_ip: String,
        min_ack_id: u32,
        min_msg_id: u32,
    ) -> Self {
        Self { inner: Transmitter::new_send(ctx, out_queue, dest_ip, 1, 0, min_ack_id, min_msg_id) }
    }

    pub fn inner_mut(&mut self) -> &mut Transmitter {
        &mut self.inner
    }

    /// Build and send the confirmation: `%*%CHKSUM%*%1%*%` on match,
    /// `%*%CHKSUM%*%0%*%` otherwise.
    pub fn send_confirmation(&mut self, matched: bool) -> u32 {
        let flag = if matched { '1' } else { '0' };
        let payload = format!("{SEPARATOR}{TAG}{SEPARATOR}{flag}{SEPARATOR}").into_bytes();
        self.inner.send_msg(payload)
    }
}

/// Parse a checksum-confirmation payload as received by the sender's file
/// phase transmitter. The tag sits at offset 3..9, the flag at offset 12.
pub fn parse_confirmation(content: &[u8]) -> Option<bool> {
    if content.len() < 13 {
        return None;
    }
    let tag = std::str::from_utf8(&content[3..9]).ok()?;
    if tag != TAG {
        return None;
    }
    Some(content[12] == b'1')
}

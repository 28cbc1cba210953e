//! Header phase: transmits the filename and file size.
//!
//! Wire payload: `"%*%HEADER%*%" + filename + "%*%" + file_size (8 bytes,
//! little-endian)`. Grounded on
//! `original_source/{include,src}/header_transmitter.{h,cpp}`.

use std::sync::Arc;

use crate::constants::MAX_FILENAME_LEN;
use crate::context::ProtocolContext;
use crate::error::{Result, XferError};
use crate::events::{MainEvent, OutEvent};
use crate::queue::BoundedQueue;
use crate::transmitter::Transmitter;

const TAG: &str = "HEADER";
const SEPARATOR: &str = "%*%";

pub struct HeaderTransmitter {
    inner: Transmitter,
}

impl HeaderTransmitter {
    pub fn new_send(
        ctx: Arc<ProtocolContext>,
        out_queue: Arc<BoundedQueue<OutEvent>>,
        dest_ip: String,
        min_ack_id: u32,
        min_msg_id: u32,
    ) -> Self {
        Self { inner: Transmitter::new_send(ctx, out_queue, dest_ip, 1, 0, min_ack_id, min_msg_id) }
    }

    pub fn new_receive(
        ctx: Arc<ProtocolContext>,
        out_queue: Arc<BoundedQueue<OutEvent>>,
        min_ack_id: u32,
        min_msg_id: u32,
    ) -> Self {
        Self { inner: Transmitter::new_receive(ctx, out_queue, 1, min_ack_id, min_msg_id) }
    }

    pub fn inner_mut(&mut self) -> &mut Transmitter {
        &mut self.inner
    }

    /// Build and send the header message: `%*%HEADER%*%<filename>%*%<size>`.
    pub fn send_header(&mut self, file_name: &str, file_size: u64) -> u32 {
        let truncated: String = file_name.chars().take(MAX_FILENAME_LEN).collect();
        let mut payload = format!("{SEPARATOR}{TAG}{SEPARATOR}{truncated}{SEPARATOR}").into_bytes();
        payload.extend_from_slice(&file_size.to_le_bytes());
        self.inner.send_msg(payload)
    }

    /// Run the header phase's receive loop to completion (no window hook
    /// needed: the single header message either arrives and is ackd, or
    /// the phase keeps waiting).
    pub fn run_receive(&mut self, main_queue: &BoundedQueue<MainEvent>) -> Result<()> {
        self.inner.run_main_body(main_queue, |_t, _batch| Ok(()))
    }

    pub fn run_send(&mut self, main_queue: &BoundedQueue<MainEvent>) -> Result<()> {
        self.inner.run_main_body(main_queue, |_t, _batch| Ok(()))
    }

    /// The id the header message actually arrived with (not assumed to be
    /// 0: a retried transfer's header carries on from the sender's
    /// still-incrementing id counter).
    pub fn received_id(&self) -> Option<u32> {
        self.inner.recvd_msgs.keys().next().copied()
    }

    /// Parse the filename/size out of the received header payload.
    ///
    /// Layout: `HEADER` tag at offset 3..9, filename starts at offset 12
    /// (after the first `%*%`), ends at `len - 8 - 3` (before the trailing
    /// `%*%`), and the last 8 bytes are the little-endian file size.
    pub fn parse(&self) -> Result<(String, u64)> {
        let content = &self
            .inner
            .recvd_msgs
            .values()
            .next()
            .ok_or_else(|| XferError::malformed("header", "no header message received"))?
            .content;

        if content.len() < 12 + 3 + 8 {
            return Err(XferError::malformed("header", "insufficient data"));
        }

        let tag = std::str::from_utf8(&content[3..9])
            .map_err(|_| XferError::malformed("header", "non-utf8 tag"))?;
        if tag != TAG {
            return Err(XferError::malformed("header", format!("expected HEADER tag, got {tag:?}")));
        }

        let nm_start = 12;
        let nm_end = content.len() - 8 - 3;
        if nm_end < nm_start {
            return Err(XferError::malformed("header", "filename region underflows"));
        }

        let file_name = std::str::from_utf8(&content[nm_start..nm_end])
            .map_err(|_| XferError::malformed("header", "filename not utf8"))?
            .to_string();

        let size_bytes: [u8; 8] = content[nm_end + 3..nm_end + 3 + 8]
            .try_into()
            .map_err(|_| XferError::malformed("header", "size field truncated"))?;
        let file_size = u64::from_le_bytes(size_bytes);

        Ok((file_name, file_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MainEventType;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn round_trips_filename_and_size() {
        let ctx = Arc::new(ProtocolContext::new(true));
        let out_queue = Arc::new(BoundedQueue::new());
        let mut sender = HeaderTransmitter::new_send(ctx.clone(), out_queue.clone(), "1.2.3.4".into(), 0, 0);
        sender.send_header("report.pdf", 3141);

        let sent = out_queue.wait_nonempty(&AtomicBool::new(false));
        assert_eq!(sent.len(), 1);

        let mut receiver = HeaderTransmitter::new_receive(ctx, Arc::new(BoundedQueue::new()), 0, 0);
        let ev = MainEvent { ty: MainEventType::Msg, id: 0, origin_ip: "5.5.5.5".into(), content: sent[0].content.clone() };
        receiver.inner_mut().recvd_msgs.insert(0, crate::transmitter::RecvdMessage {
            content: ev.content,
            received_at: std::time::Instant::now(),
        });

        let (name, size) = receiver.parse().unwrap();
        assert_eq!(name, "report.pdf");
        assert_eq!(size, 3141);
    }

    #[test]
    fn filename_is_truncated_to_max_len() {
        let ctx = Arc::new(ProtocolContext::new(true));
        let out_queue = Arc::new(BoundedQueue::new());
        let mut sender = HeaderTransmitter::new_send(ctx, out_queue.clone(), "1.2.3.4".into(), 0, 0);
        let long_name = "a".repeat(300);
        sender.send_header(&long_name, 0);
        let sent = out_queue.wait_nonempty(&AtomicBool::new(false));
        // tag(12) + 256 chars + trailing sep(3) + size(8)
        assert_eq!(sent[0].content.len(), 12 + MAX_FILENAME_LEN + 3 + 8);
    }
}

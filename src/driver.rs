//! Sequences the three phases into a whole transfer, retrying from the
//! header phase whenever the receiver reports a checksum mismatch.
//!
//! Grounded on `original_source/src/entry.cpp`'s `sending_logic`/
//! `receiving_logic` for the phase ordering and the retry-on-mismatch loop.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::constants::DATA_LEN;
use crate::context::ProtocolContext;
use crate::error::{Result, XferError};
use crate::events::{MainEvent, OutEvent};
use crate::phases::checksum::ChecksumTransmitter;
use crate::phases::file::FileTransmitter;
use crate::phases::header::HeaderTransmitter;
use crate::queue::BoundedQueue;

/// Send `file_path` to `dest_ip`, retrying the whole transfer if the
/// receiver's checksum confirmation comes back negative.
///
/// Ids are never reused across a retry: `next_id` keeps incrementing for
/// our own messages, and the receiver's own counter (which only ever sends
/// the one checksum-confirmation message per attempt) advances by exactly
/// one each time around. `remote_next_id` tracks that externally, since we
/// have no other way to observe it ahead of time.
pub fn run_send(
    ctx: Arc<ProtocolContext>,
    main_queue: Arc<BoundedQueue<MainEvent>>,
    out_queue: Arc<BoundedQueue<OutEvent>>,
    dest_ip: String,
    file_path: &Path,
) -> Result<()> {
    let file_name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| XferError::malformed("file_path", "no file name component"))?
        .to_string();
    let file_size = fs::metadata(file_path)?.len();
    let mut remote_next_id = 0u32;

    loop {
        let header_min_ack_id = ctx.peek_next_id();
        let mut header =
            HeaderTransmitter::new_send(ctx.clone(), out_queue.clone(), dest_ip.clone(), header_min_ack_id, 0);
        header.send_header(&file_name, file_size);
        header.run_send(&main_queue)?;
        if ctx.is_stopped() {
            return Ok(());
        }
        info!("header phase complete");

        let file_min_ack_id = ctx.peek_next_id();
        let mut file_transm = FileTransmitter::new_send(
            ctx.clone(),
            out_queue.clone(),
            dest_ip.clone(),
            file_min_ack_id,
            remote_next_id,
            file_path,
        )?;
        file_transm.run_send(&main_queue)?;
        if ctx.is_stopped() {
            return Ok(());
        }
        remote_next_id += 1;

        match file_transm.checksum_matched() {
            Some(true) => {
                info!("transfer complete, checksums matched");
                return Ok(());
            }
            Some(false) => {
                warn!("receiver reported checksum mismatch, retrying whole transfer");
                continue;
            }
            None => {
                return Err(XferError::malformed("checksum", "no confirmation received from receiver"));
            }
        }
    }
}

/// Listen for one incoming transfer and write it to the current directory
/// under its sent filename, retrying from the header phase if our own
/// recomputed checksum does not match the sender's.
pub fn run_receive(
    ctx: Arc<ProtocolContext>,
    main_queue: Arc<BoundedQueue<MainEvent>>,
    out_queue: Arc<BoundedQueue<OutEvent>>,
) -> Result<()> {
    loop {
        // min_ack_id is inert for a receiving HeaderTransmitter (it never
        // sends), so 0 is fine even across retries.
        let mut header = HeaderTransmitter::new_receive(ctx.clone(), out_queue.clone(), 0, 0);
        header.run_receive(&main_queue)?;
        if ctx.is_stopped() {
            return Ok(());
        }

        let header_id = header
            .received_id()
            .ok_or_else(|| XferError::malformed("header", "no header message received"))?;
        let (file_name, file_size) = header.parse()?;
        info!(file_name = %file_name, file_size, "receiving file");

        let f_pckt_n = (file_size as usize).div_ceil(DATA_LEN) + 1;
        let dest_path = PathBuf::from(&file_name);

        let mut file_transm = FileTransmitter::new_receive(
            ctx.clone(),
            out_queue.clone(),
            header_id + 1,
            f_pckt_n,
            &dest_path,
        )?;
        file_transm.run_receive(&main_queue, file_size)?;
        if ctx.is_stopped() {
            return Ok(());
        }

        let src_ip = file_transm.inner_mut().src_ip.clone();
        let sender_hash = file_transm
            .sender_sha_hex()
            .ok_or_else(|| XferError::malformed("checksum", "no terminator message received"))?;
        let our_hash = file_transm.received_sha_hex(&dest_path)?;
        let matched = sender_hash == our_hash;

        let mut checksum_transm = ChecksumTransmitter::new_send(
            ctx.clone(),
            out_queue.clone(),
            src_ip,
            ctx.peek_next_id(),
            file_transm.next_available_id(),
        );
        checksum_transm.send_confirmation(matched);
        checksum_transm.inner_mut().run_main_body(&main_queue, |_t, _batch| Ok(()))?;
        if ctx.is_stopped() {
            return Ok(());
        }

        if matched {
            info!("transfer complete, checksums matched");
            return Ok(());
        }
        warn!("local checksum mismatch, waiting for sender to retry");
    }
}

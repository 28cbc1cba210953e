//! File phase: streams the file body through the sliding window, then a
//! SHA-256 terminator message; on the receive side, writes each chunk to
//! disk as it slots into place and truncates away the final chunk's
//! wire-padding once the whole phase is done.
//!
//! Grounded on `original_source/{include,src}/file_transmitter.{h,cpp}`.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::constants::{DATA_LEN, FILE_PHASE_ACK_COUNT, PROGRESS_LOG_INTERVAL, SHA256_HEX_LEN, WINDOW_SIZE};
use crate::context::ProtocolContext;
use crate::error::Result;
use crate::events::{MainEvent, OutEvent};
use crate::hash::hash_file_hex;
use crate::phases::checksum;
use crate::queue::BoundedQueue;
use crate::transmitter::Transmitter;

pub struct FileTransmitter {
    inner: Transmitter,
    f_pckt_n: usize,

    // Send side.
    reader: Option<BufReader<File>>,
    sha_hex: String,

    // Receive side.
    writer: Option<File>,
    shelf: BTreeMap<u32, Vec<u8>>,
    next_packet_id_to_write: u32,
    recvd_fs_msgs: HashSet<u32>,
    chunks_written: u32,
}

impl FileTransmitter {
    /// `f_pckt_n = ceil(file_size / DATA_LEN) + 1` (data chunks plus the
    /// terminator), matching the count `HeaderTransmitter`'s peer derives
    /// from the size it was sent.
    pub fn new_send(
        ctx: Arc<ProtocolContext>,
        out_queue: Arc<BoundedQueue<OutEvent>>,
        dest_ip: String,
        min_ack_id: u32,
        min_msg_id: u32,
        file_path: &Path,
    ) -> Result<Self> {
        let file = File::open(file_path)?;
        let size = file.metadata()?.len();
        let f_pckt_n = size.div_ceil(DATA_LEN as u64) as usize + 1;
        let sha_hex = hash_file_hex(file_path)?;

        let inner = Transmitter::new_send(ctx, out_queue, dest_ip, f_pckt_n, 1, min_ack_id, min_msg_id);

        Ok(Self {
            inner,
            f_pckt_n,
            reader: Some(BufReader::new(file)),
            sha_hex,
            writer: None,
            shelf: BTreeMap::new(),
            next_packet_id_to_write: 0,
            recvd_fs_msgs: HashSet::new(),
            chunks_written: 0,
        })
    }

    pub fn new_receive(
        ctx: Arc<ProtocolContext>,
        out_queue: Arc<BoundedQueue<OutEvent>>,
        min_msg_id: u32,
        f_pckt_n: usize,
        dest_path: &Path,
    ) -> Result<Self> {
        let writer = File::create(dest_path)?;
        let inner = Transmitter::new_receive(ctx, out_queue, f_pckt_n, 0, min_msg_id);

        Ok(Self {
            inner,
            f_pckt_n,
            reader: None,
            sha_hex: String::new(),
            writer: Some(writer),
            shelf: BTreeMap::new(),
            next_packet_id_to_write: min_msg_id,
            recvd_fs_msgs: HashSet::new(),
            chunks_written: 0,
        })
    }

    pub fn inner_mut(&mut self) -> &mut Transmitter {
        &mut self.inner
    }

    fn terminator_id(&self) -> u32 {
        self.inner.min_msg_id + self.f_pckt_n as u32 - 1
    }

    /// First id not used by this phase, i.e. where the next phase's id
    /// window should begin.
    pub fn next_available_id(&self) -> u32 {
        self.terminator_id() + 1
    }

    /// Run the sending side: stream chunks under the window, send the
    /// SHA-256 terminator once the file is exhausted, then wait for the
    /// receiver's checksum confirmation (a single inbound message).
    pub fn run_send(&mut self, main_queue: &BoundedQueue<MainEvent>) -> Result<()> {
        self.inner.ctx().set_ack_count(FILE_PHASE_ACK_COUNT);

        let reader = &mut self.reader;
        let f_pckt_n = self.f_pckt_n;
        let sha_hex = self.sha_hex.clone();
        let mut terminator_sent = false;

        self.inner.run_main_body(main_queue, move |t, _batch| {
            loop {
                let in_flight = t.sent_msgs.values().filter(|m| !m.ackd).count();
                if in_flight >= WINDOW_SIZE || t.sent_msgs.len() >= f_pckt_n {
                    break;
                }

                if t.sent_msgs.len() == f_pckt_n - 1 {
                    if !terminator_sent {
                        t.send_msg(sha_hex.clone().into_bytes());
                        terminator_sent = true;
                    }
                    break;
                }

                let reader = reader.as_mut().expect("send-side reader present");
                let mut buf = [0u8; DATA_LEN];
                let n = reader.read(&mut buf)?;
                t.send_msg(buf[..n].to_vec());
            }
            Ok(())
        })?;

        Ok(())
    }

    pub fn checksum_matched(&self) -> Option<bool> {
        let confirmation_id = self.inner.min_msg_id;
        self.inner
            .recvd_msgs
            .get(&confirmation_id)
            .and_then(|m| checksum::parse_confirmation(&m.content))
    }

    /// Run the receiving side: accept chunks (out of order, deduped), write
    /// them to disk in order via a shelf, and truncate the file to its
    /// authoritative size once every chunk and the terminator have arrived.
    pub fn run_receive(&mut self, main_queue: &BoundedQueue<MainEvent>, authoritative_size: u64) -> Result<()> {
        let terminator_id = self.terminator_id();
        let writer = &mut self.writer;
        let shelf = &mut self.shelf;
        let next_packet_id_to_write = &mut self.next_packet_id_to_write;
        let recvd_fs_msgs = &mut self.recvd_fs_msgs;
        let chunks_written = &mut self.chunks_written;

        self.inner.run_main_body(main_queue, move |t, batch| {
            for ev in batch {
                if ev.ty != crate::events::MainEventType::Msg {
                    continue;
                }
                if ev.id == terminator_id || !recvd_fs_msgs.insert(ev.id) {
                    continue;
                }
                let Some(recvd) = t.recvd_msgs.get(&ev.id) else {
                    continue; // stale event outside this phase's id window
                };
                shelf.insert(ev.id, recvd.content.clone());
            }

            let writer = writer.as_mut().expect("receive-side writer present");
            while let Some(content) = shelf.remove(next_packet_id_to_write) {
                writer.write_all(&content)?;
                *next_packet_id_to_write += 1;
                *chunks_written += 1;
                if *chunks_written % PROGRESS_LOG_INTERVAL == 0 {
                    info!(chunks = *chunks_written, "file phase progress");
                }
            }
            Ok(())
        })?;

        if self.inner.done() {
            if let Some(writer) = self.writer.as_mut() {
                writer.flush()?;
                writer.set_len(authoritative_size)?;
            }
        }
        Ok(())
    }

    /// The receiver's computed SHA-256 of the file it just wrote, hex
    /// encoded, to compare against the sender's terminator value.
    pub fn received_sha_hex(&self, dest_path: &Path) -> Result<String> {
        hash_file_hex(dest_path)
    }

    pub fn sender_sha_hex(&self) -> Option<String> {
        let terminator_id = self.terminator_id();
        self.inner
            .recvd_msgs
            .get(&terminator_id)
            .and_then(|m| std::str::from_utf8(&m.content[..SHA256_HEX_LEN.min(m.content.len())]).ok())
            .map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn f_pckt_n_counts_one_terminator_past_the_data_chunks() {
        let ctx = Arc::new(ProtocolContext::new(true));
        let out_queue = Arc::new(BoundedQueue::new());
        let mut src = NamedTempFile::new().unwrap();
        src.write_all(&vec![7u8; DATA_LEN * 3 + 10]).unwrap();

        let ft = FileTransmitter::new_send(ctx, out_queue, "1.2.3.4".into(), 1, 0, src.path()).unwrap();
        assert_eq!(ft.f_pckt_n, 5); // 4 data chunks + 1 terminator
    }

    #[test]
    fn terminator_id_is_the_last_id_in_the_phase_window() {
        let ctx = Arc::new(ProtocolContext::new(false));
        let out_queue = Arc::new(BoundedQueue::new());
        let dest = NamedTempFile::new().unwrap();
        let ft = FileTransmitter::new_receive(ctx, out_queue, 1, 5, dest.path()).unwrap();
        assert_eq!(ft.terminator_id(), 5);
    }
}

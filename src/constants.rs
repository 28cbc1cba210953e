//! Protocol constants for the reliable file-transfer engine
//!
//! This module contains the fixed sizing, timing, and port values the
//! protocol is built around. None of these are meant to be tuned at
//! runtime — the wire format and the retransmission state machine both
//! assume these exact numbers.

/// Total size of a wire packet: `[type:1][id:4][payload:1015][crc32:4]`.
pub const PACKET_LEN: usize = 1024;

/// Size of the payload region carried by every data packet.
pub const DATA_LEN: usize = 1015;

/// Byte offset of the CRC-32 trailer within a packet.
pub const CRC_OFFSET: usize = 1 + 4 + DATA_LEN;

/// UDP port a listening (receiving) peer binds to.
pub const LISTEN_PORT: u16 = 24824;

/// UDP port a sending peer binds to.
pub const SEND_PORT: u16 = 24825;

/// Socket receive timeout, so the ingress loop can observe `stop`.
pub const SOCKET_TIMEOUT_MS: u64 = 200;

/// Retransmission timeout: how long an unacked message waits before resend.
pub const RESEND_DELAY_MS: u64 = 100;

/// Maximum number of retransmission attempts before a transfer is fatal.
pub const MAX_RETRIES: u8 = 20;

/// Sliding window size for the file-streaming phase (messages in flight).
pub const WINDOW_SIZE: usize = 4;

/// Number of redundant acks sent per received message outside the file phase.
pub const DEFAULT_ACK_COUNT: u32 = 1;

/// Number of redundant acks sent per received data message during the file
/// phase, to compensate for ack loss under the fixed window.
pub const FILE_PHASE_ACK_COUNT: u32 = 10;

/// Maximum filename length accepted in the header message.
pub const MAX_FILENAME_LEN: usize = 256;

/// Number of received file packets between progress log lines.
pub const PROGRESS_LOG_INTERVAL: u32 = 10;

/// Hex-encoded SHA-256 digest length in bytes (the terminator message size).
pub const SHA256_HEX_LEN: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_layout_adds_up() {
        assert_eq!(1 + 4 + DATA_LEN + 4, PACKET_LEN);
    }

    #[test]
    fn ports_are_distinct() {
        assert_ne!(LISTEN_PORT, SEND_PORT);
    }
}

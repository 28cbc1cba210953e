//! Phase-specific transmitters, one per stage of a transfer: header, file
//! body, checksum confirmation. Each wraps a [`crate::transmitter::Transmitter`]
//! rather than extending it, so a stale message from one phase can never be
//! mistaken for a message belonging to another (enforced by each phase's own
//! `min_ack_id`/`min_msg_id` window).

pub mod checksum;
pub mod file;
pub mod header;

//! Packet framing and CRC-32 integrity check.
//!
//! The wire format is a fixed 1024-byte datagram:
//! `[type:1][id:4 little-endian][payload:1015][crc32:4 little-endian]`.
//! `encode`/`decode` are total — malformed input never panics, a bad CRC
//! is just reported as `crc_ok = false`.

use crate::constants::{DATA_LEN, PACKET_LEN};
use crc32fast::Hasher;

/// Packet type carried in byte 0 of the wire frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Msg = 0,
    Ack = 1,
}

impl TryFrom<u8> for PacketType {
    type Error = ();

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(PacketType::Msg),
            1 => Ok(PacketType::Ack),
            _ => Err(()),
        }
    }
}

fn crc32_of(header_and_payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(header_and_payload);
    hasher.finalize()
}

/// Encode an `id`/`type`/payload triple into a full `PACKET_LEN`-byte frame.
///
/// `payload` is written verbatim and zero-padded up to `DATA_LEN`; it is the
/// caller's responsibility to keep `payload.len() <= DATA_LEN`.
pub fn encode(id: u32, ty: PacketType, payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= DATA_LEN);

    let mut packet = Vec::with_capacity(PACKET_LEN);
    packet.push(ty as u8);
    packet.extend_from_slice(&id.to_le_bytes());
    packet.extend_from_slice(payload);
    packet.resize(1 + 4 + DATA_LEN, 0);

    let crc = crc32_of(&packet);
    packet.extend_from_slice(&crc.to_le_bytes());
    packet
}

/// A decoded packet: the fields are extracted regardless of CRC validity so
/// the caller can decide whether to trust `payload`.
pub struct Decoded {
    pub id: u32,
    pub ty: Option<PacketType>,
    pub payload: Vec<u8>,
    pub crc_ok: bool,
}

/// Decode a wire frame. Never panics: a too-short or malformed `packet`
/// simply yields `crc_ok = false`.
pub fn decode(packet: &[u8]) -> Decoded {
    if packet.len() < 1 + 4 + 4 {
        return Decoded { id: 0, ty: None, payload: Vec::new(), crc_ok: false };
    }

    let ty_byte = packet[0];
    let id = u32::from_le_bytes(packet[1..5].try_into().unwrap());
    let body_end = packet.len() - 4;
    let payload = packet[5..body_end].to_vec();

    let computed = crc32_of(&packet[..body_end]);
    let trailing = u32::from_le_bytes(packet[body_end..].try_into().unwrap());

    Decoded {
        id,
        ty: PacketType::try_from(ty_byte).ok(),
        payload,
        crc_ok: computed == trailing,
    }
}

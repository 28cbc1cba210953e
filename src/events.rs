//! Event types passed between the ingress/egress/timer tasks and the
//! transmitter state machine.

use crate::codec::PacketType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainEventType {
    Msg,
    Ack,
    Timeout,
}

/// Produced by the ingress task (Msg/Ack) and the timer task (Timeout).
#[derive(Debug, Clone)]
pub struct MainEvent {
    pub ty: MainEventType,
    pub id: u32,
    pub origin_ip: String,
    pub content: Vec<u8>,
}

impl MainEvent {
    pub fn timeout() -> Self {
        Self { ty: MainEventType::Timeout, id: 0, origin_ip: String::new(), content: Vec::new() }
    }

    pub fn from_packet(ty: PacketType, id: u32, origin_ip: String, content: Vec<u8>) -> Self {
        let ty = match ty {
            PacketType::Msg => MainEventType::Msg,
            PacketType::Ack => MainEventType::Ack,
        };
        Self { ty, id, origin_ip, content }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutEventType {
    Msg,
    Ack,
}

/// Consumed by the egress task.
#[derive(Debug, Clone)]
pub struct OutEvent {
    pub ty: OutEventType,
    pub id: u32,
    pub dest_ip: String,
    pub content: Vec<u8>,
}

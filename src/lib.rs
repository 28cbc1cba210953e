//! flux-xfer - reliable point-to-point file transfer over UDP

pub mod codec;
pub mod constants;
pub mod context;
pub mod driver;
pub mod error;
pub mod events;
pub mod hash;
pub mod ip;
pub mod net;
pub mod phases;
pub mod pipeline;
pub mod queue;
pub mod transmitter;

pub use context::ProtocolContext;
pub use error::{Result, XferError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Error types for the transfer engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, XferError>;

#[derive(Error, Debug)]
pub enum XferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message {id} exhausted its {max_retries} retransmission attempts")]
    RetriesExhausted { id: u32, max_retries: u8 },

    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    #[error("checksum mismatch for {file}")]
    ChecksumMismatch { file: String },

    #[error("socket error: {0}")]
    Socket(String),
}

impl XferError {
    pub fn retries_exhausted(id: u32, max_retries: u8) -> Self {
        Self::RetriesExhausted { id, max_retries }
    }

    pub fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed { what, reason: reason.into() }
    }

    pub fn checksum_mismatch(file: impl Into<String>) -> Self {
        Self::ChecksumMismatch { file: file.into() }
    }

    pub fn socket(message: impl Into<String>) -> Self {
        Self::Socket(message.into())
    }
}

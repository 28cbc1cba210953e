//! SHA-256 file hashing, streamed in fixed-size chunks so the whole file is
//! never held in memory at once. The hash routine itself is an external
//! collaborator (`sha2`); this module only owns the chunked-read loop.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::constants::DATA_LEN;
use crate::error::Result;

/// Hex-encode the SHA-256 digest of a file, reading it in `DATA_LEN`-sized
/// chunks (the same chunk size the file phase streams with).
pub fn hash_file_hex(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; DATA_LEN];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(s, "{b:02x}").unwrap();
    }
    s
}

//! Content hashing for media dedup.
//!
//! SHA-256 over the raw bytes, rendered as 64 lowercase hex characters.
//! Export fingerprints every media payload it writes; import compares those
//! fingerprints against the hashes stored on existing artifacts.

use std::io::{self, Read};

use sha2::{Digest, Sha256};

const READ_BUFFER: usize = 64 * 1024;

/// Compute the SHA-256 hex digest of a byte buffer.
#[must_use]
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 hex digest of everything `reader` yields.
///
/// # Errors
///
/// Returns the first read error.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUFFER];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

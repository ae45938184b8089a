use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Streams `reader` through SHA-256 in fixed-size chunks.
pub fn sha256_reader_hex<R: Read>(mut reader: R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0_u8; CHUNK_SIZE];
    loop {
        let read = reader.read(&mut buf).context("failed reading hash input")?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256_file_hex(path: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    sha256_reader_hex(file).with_context(|| format!("failed to hash {}", path.display()))
}

/// Compares two hex digests, ignoring case and surrounding whitespace.
pub fn digests_match(actual_hex: &str, expected_hex: &str) -> bool {
    let expected = expected_hex.trim();
    !expected.is_empty() && actual_hex.trim().eq_ignore_ascii_case(expected)
}

//! SHA-256 checksums of compiled SQL, recorded in the manifest.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of a string
pub fn compute_checksum(s: &str) -> String {
    hex::encode(Sha256::digest(s.as_bytes()))
}

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of a document's raw bytes.
pub fn digest_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

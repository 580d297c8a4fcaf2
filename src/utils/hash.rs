use sha2::{Digest, Sha256};

/// Hex characters of a hash used in label suffixes.
pub const SHORT_HASH_LEN: usize = 8;

/// Compute SHA-256 hash of a string
#[must_use]
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// First [`SHORT_HASH_LEN`] hex characters of the SHA-256 of `content`.
#[must_use]
pub fn short_hash(content: &str) -> String {
    compute_hash(content).chars().take(SHORT_HASH_LEN).collect()
}

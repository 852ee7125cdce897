//! Content hashing for cache keys.

use blake3::Hasher as Blake3Hasher;

/// BLAKE3 content hashing over raw source bytes.
pub struct Hasher;

impl Hasher {
    /// Hex-encoded BLAKE3 digest of an in-memory buffer.
    ///
    /// Hashes the bytes exactly as submitted, before any decoding, so two
    /// uploads of the same file always map to the same cache entry.
    pub fn content_hash(data: &[u8]) -> String {
        let mut hasher = Blake3Hasher::new();
        hasher.update(data);
        hasher.finalize().to_hex().to_string()
    }
}

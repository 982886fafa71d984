//! Hashing: BLAKE3 for anything security-relevant, XXH for cheap
//! change-detection fingerprints (never for secrecy).

/// 256-bit BLAKE3 digest.
pub fn digest256(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Fast non-cryptographic 32-bit hash (XXH32, seed 0).
pub fn fast_hash32(data: &[u8]) -> u32 {
    xxhash_rust::xxh32::xxh32(data, 0)
}

/// Fast non-cryptographic 64-bit hash (XXH3).
pub fn fast_hash64(data: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(data)
}

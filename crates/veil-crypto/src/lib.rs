//! veil-crypto: key material, hashing, and name obfuscation for VeilFS
//!
//! Per-node key material:
//! ```text
//! NodeRecord
//!   ├── encryption key  (512-bit random, encrypts this node's content)
//!   ├── dir salt        (160-bit random, scopes cloud-name derivation
//!   │                    for this node's *children*)
//!   └── dir prefix      (128-bit random, hex; path segment under which
//!                        the children are addressed)
//! ```
//!
//! Cloud names are derived as `zb32(blake3(name ‖ dirSalt)[..20])`, so a
//! derived name is 32 z-base-32 characters — the same length and alphabet
//! as a randomly generated one. Nobody without the salt can distinguish
//! the two or guess which cleartext name produced a given cloud name.

pub mod encoding;
pub mod hashing;
pub mod keys;
pub mod names;
pub mod recovery;

pub use bip39::Language;
pub use encoding::{hex_decode, hex_encode, zb32_decode, zb32_encode};
pub use hashing::{digest256, fast_hash32, fast_hash64};
pub use keys::{random_dir_prefix, DirSalt, EncryptionKey};
pub use names::{derive_cloud_name, random_cloud_name};
pub use recovery::{key_to_mnemonic, mnemonic_to_key, mnemonic_to_seed};

use thiserror::Error;

/// Size of a node content-encryption key in bytes (512-bit)
pub const ENCRYPTION_KEY_LEN: usize = 64;

/// Size of a directory salt in bytes (160-bit)
pub const DIR_SALT_LEN: usize = 20;

/// Size of a directory prefix in bytes (128-bit, rendered as 32 hex chars)
pub const DIR_PREFIX_LEN: usize = 16;

/// Size of a cloud name in bytes (160-bit, rendered as 32 z-base-32 chars)
pub const CLOUD_NAME_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// The OS secure random source failed. This is the one unrecoverable
    /// condition in the core: node creation cannot proceed without it.
    #[error("secure random source unavailable: {0}")]
    RngUnavailable(String),

    #[error("invalid key length: {got} bytes (expected {expected})")]
    InvalidKeyLength { got: usize, expected: usize },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("mnemonic error: {0}")]
    Mnemonic(String),
}

pub(crate) fn random_bytes(buf: &mut [u8]) -> Result<(), CryptoError> {
    use rand::RngCore;
    rand::rngs::OsRng
        .try_fill_bytes(buf)
        .map_err(|e| CryptoError::RngUnavailable(e.to_string()))
}

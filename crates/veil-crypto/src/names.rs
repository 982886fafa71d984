//! Deterministic cloud-name derivation.
//!
//! Two peers that both know a node's cleartext name and its parent's
//! dirSalt must compute the same cloud name independently, so the scheme
//! is fixed: `zb32( blake3( name_bytes ‖ salt_bytes )[..20] )`.
//! The concatenation order (name first, then salt) is part of the wire
//! contract and must not change.
//!
//! A derived name is 32 z-base-32 characters — identical in length and
//! alphabet to a randomly generated one, so an observer of the remote
//! namespace cannot tell hashed names from random tokens.

use crate::encoding::zb32_encode;
use crate::keys::DirSalt;
use crate::{random_bytes, CryptoError, CLOUD_NAME_LEN};

/// Derive the cloud-visible name for `name` under the parent's salt.
///
/// Pure function: same inputs always produce the same 32-character output.
pub fn derive_cloud_name(name: &str, parent_salt: &DirSalt) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(name.as_bytes());
    hasher.update(parent_salt.as_bytes());
    let digest = hasher.finalize();
    zb32_encode(&digest.as_bytes()[..CLOUD_NAME_LEN])
}

/// Generate a random cloud name: 160 bits as 32 z-base-32 characters.
pub fn random_cloud_name() -> Result<String, CryptoError> {
    let mut bytes = [0u8; CLOUD_NAME_LEN];
    random_bytes(&mut bytes)?;
    Ok(zb32_encode(&bytes))
}

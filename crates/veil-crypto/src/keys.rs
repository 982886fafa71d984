//! Per-node key material: content-encryption key, directory salt, and
//! directory prefix. All three are generated exactly once at node
//! creation and never mutated afterwards.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

use crate::{random_bytes, CryptoError, DIR_PREFIX_LEN, DIR_SALT_LEN, ENCRYPTION_KEY_LEN};

/// A per-node 512-bit content-encryption key. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; ENCRYPTION_KEY_LEN]);

impl EncryptionKey {
    /// Generate a fresh random key. Fails only if the OS RNG is unavailable.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; ENCRYPTION_KEY_LEN];
        random_bytes(&mut bytes)?;
        Ok(EncryptionKey(bytes))
    }

    pub fn from_bytes(bytes: [u8; ENCRYPTION_KEY_LEN]) -> Self {
        EncryptionKey(bytes)
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; ENCRYPTION_KEY_LEN] =
            slice.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                got: slice.len(),
                expected: ENCRYPTION_KEY_LEN,
            })?;
        Ok(EncryptionKey(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ENCRYPTION_KEY_LEN] {
        &self.0
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl Serialize for EncryptionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;
        serializer.serialize_str(&STANDARD.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for EncryptionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;
        let s = String::deserialize(deserializer)?;
        let mut raw = STANDARD
            .decode(&s)
            .map_err(|e| D::Error::custom(format!("encryption key base64: {e}")))?;
        let key = EncryptionKey::from_slice(&raw).map_err(D::Error::custom);
        raw.zeroize();
        key
    }
}

/// A per-node 160-bit salt scoping cloud-name derivation for the node's
/// children. Secret (knowing it allows dictionary attacks on child names).
#[derive(Clone, PartialEq, Eq)]
pub struct DirSalt([u8; DIR_SALT_LEN]);

impl DirSalt {
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; DIR_SALT_LEN];
        random_bytes(&mut bytes)?;
        Ok(DirSalt(bytes))
    }

    pub fn from_bytes(bytes: [u8; DIR_SALT_LEN]) -> Self {
        DirSalt(bytes)
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; DIR_SALT_LEN] =
            slice.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                got: slice.len(),
                expected: DIR_SALT_LEN,
            })?;
        Ok(DirSalt(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; DIR_SALT_LEN] {
        &self.0
    }
}

impl Drop for DirSalt {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for DirSalt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirSalt").field("bytes", &"[REDACTED]").finish()
    }
}

impl Serialize for DirSalt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&crate::encoding::hex_encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for DirSalt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = crate::encoding::hex_decode(&s).map_err(D::Error::custom)?;
        DirSalt::from_slice(&raw).map_err(D::Error::custom)
    }
}

/// Generate a random directory prefix: 128 bits as 32 hex characters.
/// This is the path segment under which a node's children are addressed.
pub fn random_dir_prefix() -> Result<String, CryptoError> {
    let mut bytes = [0u8; DIR_PREFIX_LEN];
    random_bytes(&mut bytes)?;
    Ok(crate::encoding::hex_encode(&bytes))
}

//! Mnemonic key-backup codec.
//!
//! Converts a byte key into a human-readable word sequence (and back) so a
//! user can write down their access key. The word list language is
//! selectable; an optional passphrase hardens the derived seed. This is a
//! sibling utility to the sync core — nothing in the treesystem depends
//! on it.

use bip39::{Language, Mnemonic};

use crate::CryptoError;

/// Entropy lengths accepted by the codec: 128–256 bits in 32-bit steps.
const VALID_LENS: [usize; 5] = [16, 20, 24, 28, 32];

/// Encode a byte key as a mnemonic word sequence in the given language.
///
/// Errors on any length other than 16/20/24/28/32 bytes.
pub fn key_to_mnemonic(key: &[u8], language: Language) -> Result<String, CryptoError> {
    if !VALID_LENS.contains(&key.len()) {
        return Err(CryptoError::InvalidKeyLength {
            got: key.len(),
            expected: 32,
        });
    }
    let mnemonic = Mnemonic::from_entropy_in(language, key)
        .map_err(|e| CryptoError::Mnemonic(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// Decode a mnemonic word sequence back into the original key bytes.
///
/// Errors on unknown words, wrong word counts, and checksum mismatch.
pub fn mnemonic_to_key(words: &str, language: Language) -> Result<Vec<u8>, CryptoError> {
    let mnemonic = Mnemonic::parse_in_normalized(language, words)
        .map_err(|e| CryptoError::Mnemonic(e.to_string()))?;
    Ok(mnemonic.to_entropy())
}

/// Derive a 512-bit seed from a mnemonic plus an optional passphrase.
///
/// The passphrase never leaves the device; without it the seed cannot be
/// reproduced even with the written-down words.
pub fn mnemonic_to_seed(
    words: &str,
    language: Language,
    passphrase: &str,
) -> Result<[u8; 64], CryptoError> {
    let mnemonic = Mnemonic::parse_in_normalized(language, words)
        .map_err(|e| CryptoError::Mnemonic(e.to_string()))?;
    Ok(mnemonic.to_seed(passphrase))
}

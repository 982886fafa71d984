//! Binary↔text encodings used on the wire-visible side.
//!
//! Directory prefixes are hex; cloud names use z-base-32
//! (`ybndrfg8ejkmcpqxot1uwisza345h769`), chosen so 160 bits encode to
//! exactly 32 characters with no padding.

use crate::CryptoError;
use data_encoding::{Encoding, Specification};
use std::sync::LazyLock;

static ZBASE32: LazyLock<Encoding> = LazyLock::new(|| {
    let mut spec = Specification::new();
    spec.symbols.push_str("ybndrfg8ejkmcpqxot1uwisza345h769");
    spec.encoding().expect("z-base-32 alphabet is a valid base-32 spec")
});

pub fn hex_encode(data: &[u8]) -> String {
    data_encoding::HEXLOWER.encode(data)
}

pub fn hex_decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    data_encoding::HEXLOWER
        .decode(s.as_bytes())
        .map_err(|e| CryptoError::Encoding(format!("hex decode: {e}")))
}

pub fn zb32_encode(data: &[u8]) -> String {
    ZBASE32.encode(data)
}

pub fn zb32_decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    ZBASE32
        .decode(s.as_bytes())
        .map_err(|e| CryptoError::Encoding(format!("z-base-32 decode: {e}")))
}

/// The z-base-32 alphabet, exposed so callers can validate cloud-name shape.
pub fn zb32_alphabet() -> &'static str {
    "ybndrfg8ejkmcpqxot1uwisza345h769"
}

use thiserror::Error;

pub type VeilResult<T> = Result<T, VeilError>;

/// Broad error umbrella for callers that span multiple VeilFS crates.
///
/// The domain crates define their own precise enums (`CryptoError`,
/// `TreeError`, `TransferError`); this type exists for surfaces that need
/// to carry any of them without caring which.
#[derive(Debug, Error)]
pub enum VeilError {
    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("tree error: {0}")]
    Tree(String),

    #[error("sync error: {0}")]
    Sync(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

//! The seams toward the transport layer.
//!
//! The sync engine never performs I/O itself. Push and pull are
//! expressed as traits the embedding application implements against its
//! actual storage provider; the engine consumes their receipts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use veil_core::types::CloudId;
use veil_tree::{CloudPath, RemoteNodeRecord};

/// Server receipt for a metadata record upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaReceipt {
    /// Server-assigned node identity. Constant for the node's lifetime;
    /// the store enforces write-once on apply.
    pub cloud_id: CloudId,
    pub etag_meta: String,
    pub modified_at: u64,
}

/// Server receipt for a content blob upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentReceipt {
    pub etag_content: String,
    pub byte_count: u64,
    /// Fast fingerprint of the plaintext, computed before encryption.
    pub fingerprint64: u64,
    pub modified_at: u64,
}

/// One node's worth of a pull: the remote record plus the content
/// fork's current state as listed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteChange {
    pub record: RemoteNodeRecord,
    #[serde(default)]
    pub etag_content: Option<String>,
    #[serde(default)]
    pub modified_content_at: Option<u64>,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("remote object not found: {0}")]
    NotFound(String),
    #[error("transfer cancelled")]
    Cancelled,
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Pushes metadata records to the provider.
pub trait RecordUploader {
    fn upload_record(
        &self,
        path: &CloudPath,
        record_bytes: &[u8],
    ) -> impl std::future::Future<Output = Result<MetaReceipt, TransferError>> + Send;
}

/// Fetches content blobs from the provider.
pub trait ContentDownloader {
    fn download_content(
        &self,
        path: &CloudPath,
    ) -> impl std::future::Future<Output = Result<(Vec<u8>, ContentReceipt), TransferError>> + Send;
}

/// Yields remote changes in server order. `None` ends the pull.
pub trait PullSource {
    fn next_change(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Option<RemoteChange>, TransferError>> + Send;
}

//! veil-sync: the push/pull engine over a veil-tree store.
//!
//! Change detection is etag-based and per fork (metadata record vs
//! content blob). The engine owns classification and bookkeeping only;
//! actual transfers happen behind the traits in [`remote`], implemented
//! by the embedding application against its storage provider.
//!
//! - [`tracker`]: last-synced etags, pending writes, conflict detection
//! - [`remote`]: transfer receipts and the transport-facing traits
//! - [`session`]: one sync pass, keeping store and tracker in step

pub mod error;
pub mod remote;
pub mod session;
pub mod tracker;

pub use error::SyncError;
pub use remote::{
    ContentDownloader, ContentReceipt, MetaReceipt, PullSource, RecordUploader, RemoteChange,
    TransferError,
};
pub use session::{PullReport, PullSummary, SyncSession};
pub use tracker::{Conflict, ConflictTracker, EtagState, Observation};

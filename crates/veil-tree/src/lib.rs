//! veil-tree: the treesystem core.
//!
//! A user-visible tree of named nodes maps onto a flat, privacy-preserving
//! namespace in the remote object store. Each node's remote address is
//! `{appPrefix}/{parent.dirPrefix}/{cloudName}[.{ext}]`, where the cloud
//! name is deterministically derived from the cleartext name and the
//! parent's directory salt. The storage provider never sees cleartext
//! names or the directory structure.
//!
//! - [`node`]: the per-node metadata record and its invariants
//! - [`cloudpath`]: encode/parse/compare of the three-segment address
//! - [`store`]: the arena of records, sole mutator of structural fields
//! - [`resolver`]: pointer and cross-tree graft resolution

pub mod cloudpath;
pub mod error;
pub mod node;
pub mod resolver;
pub mod store;

pub use cloudpath::{CloudPath, Components, NameMatch, CONTENT_EXT, RECORD_EXT};
pub use error::TreeError;
pub use node::{Anchor, Capability, ContentInfo, NodeRecord, ShareList};
pub use resolver::{
    AnchorResolver, ForeignTreeProvider, NoForeignTrees, Resolution, ResolvedTarget,
};
pub use store::{Applied, NodeStore, RemoteNodeRecord, ROOT_DIR_PREFIX};

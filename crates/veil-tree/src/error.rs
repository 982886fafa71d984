use thiserror::Error;
use veil_core::types::{CloudId, NodeId};

/// Structural-mutation and path-derivation failures.
///
/// All of these are explicit result values the caller recovers from; the
/// sole unrecoverable condition (`Crypto` wrapping an RNG failure) comes
/// from below and is propagated untouched.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("invalid parent: {0}")]
    InvalidParent(String),

    #[error("cycle detected: {parent} is {node} or one of its descendants")]
    CycleDetected { node: NodeId, parent: NodeId },

    #[error("node {0} has children; pass cascade=true to delete the subtree")]
    HasChildren(NodeId),

    #[error("cloud-name collision under {parent}: {name:?} collides with existing {existing:?}")]
    NameCollision {
        parent: NodeId,
        name: String,
        existing: String,
    },

    #[error("cloud id for {node} is frozen at {current}; rejected {proposed}")]
    CloudIdFrozen {
        node: NodeId,
        current: CloudId,
        proposed: CloudId,
    },

    #[error("node {0} has no cleartext name to derive a cloud name from")]
    Unnamed(NodeId),

    #[error(transparent)]
    Crypto(#[from] veil_crypto::CryptoError),
}

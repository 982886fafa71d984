//! The per-node metadata record.
//!
//! A `NodeRecord` is everything the treesystem needs to sync a node —
//! parentage, cleartext name, permissions, key material, and the
//! server-reported state of its two remote forks (metadata record and
//! content blob). The node's actual content never passes through here.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use veil_core::types::{CloudId, NodeId, OwnerId, TreeId};
use veil_crypto::{random_dir_prefix, CryptoError, DirSalt, EncryptionKey};

/// Persisted schema version. Unknown or missing fields deserialize to
/// their defaults; new fields must be additive.
pub const SCHEMA_VERSION: u32 = 1;

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

/// A capability granted to another user on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    Write,
    Share,
}

/// Per-node sharing permissions: grantee → capability set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareList(BTreeMap<OwnerId, BTreeSet<Capability>>);

impl ShareList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, grantee: OwnerId, capability: Capability) {
        self.0.entry(grantee).or_default().insert(capability);
    }

    pub fn revoke(&mut self, grantee: &OwnerId) {
        self.0.remove(grantee);
    }

    pub fn allows(&self, grantee: &OwnerId, capability: Capability) -> bool {
        self.0.get(grantee).is_some_and(|caps| caps.contains(&capability))
    }

    pub fn grantees(&self) -> impl Iterator<Item = &OwnerId> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A reference to a root location in a foreign tree (different owner or
/// different tree id). The node carrying an anchor is the graft root;
/// its subtree inherits resolution through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub owner_id: OwnerId,
    pub tree_id: TreeId,
    /// Identifies the grafted location inside the foreign tree.
    pub dir_prefix: String,
}

/// Last-observed descriptor of the remote content blob. Advisory only —
/// refreshed exclusively by a completed download, never inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentInfo {
    pub etag: String,
    pub byte_count: u64,
    /// Fast (non-cryptographic) fingerprint of the plaintext bytes.
    pub fingerprint64: u64,
    pub observed_at: u64,
}

/// Metadata for one node of the treesystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default = "schema_version")]
    pub version: u32,

    /// Local-only identity; never transmitted.
    pub id: NodeId,
    pub owner_id: OwnerId,
    /// `None` denotes a root.
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    /// Cleartext display name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: ShareList,
    /// Scheduled best-effort remote deletion time (unix secs).
    #[serde(default)]
    pub burn_at: Option<u64>,

    // Set exactly once at creation, immutable afterwards.
    pub encryption_key: EncryptionKey,
    pub dir_salt: DirSalt,
    pub dir_prefix: String,

    /// Server-assigned identity; write-once, then frozen.
    #[serde(default)]
    cloud_id: Option<CloudId>,

    #[serde(default)]
    pub etag_meta: Option<String>,
    #[serde(default)]
    pub etag_content: Option<String>,
    #[serde(default)]
    pub modified_meta_at: Option<u64>,
    #[serde(default)]
    pub modified_content_at: Option<u64>,
    #[serde(default)]
    pub cached_content_info: Option<ContentInfo>,

    /// Override stored when a non-conforming remote writer used a cloud
    /// name that doesn't match the derived hash. Not an error.
    #[serde(default)]
    pub explicit_cloud_name: Option<String>,

    #[serde(default)]
    pub anchor: Option<Anchor>,
    /// Same-tree pointer target; presence defines `is_pointer`.
    #[serde(default)]
    pub pointee_id: Option<NodeId>,

    /// Inbound messaging: who sent this node.
    #[serde(default)]
    pub sender_id: Option<OwnerId>,
    /// Outbound fan-out still in flight.
    #[serde(default)]
    pub pending_recipients: BTreeSet<OwnerId>,
}

impl NodeRecord {
    /// Create a record with freshly generated key material.
    ///
    /// Fails only when the OS random source is unavailable — that is
    /// fatal for node creation, with no weaker fallback.
    pub fn new(
        owner_id: OwnerId,
        parent_id: Option<NodeId>,
        name: Option<String>,
    ) -> Result<Self, CryptoError> {
        Ok(NodeRecord {
            version: SCHEMA_VERSION,
            id: NodeId::generate(),
            owner_id,
            parent_id,
            name,
            permissions: ShareList::new(),
            burn_at: None,
            encryption_key: EncryptionKey::generate()?,
            dir_salt: DirSalt::generate()?,
            dir_prefix: random_dir_prefix()?,
            cloud_id: None,
            etag_meta: None,
            etag_content: None,
            modified_meta_at: None,
            modified_content_at: None,
            cached_content_info: None,
            explicit_cloud_name: None,
            anchor: None,
            pointee_id: None,
            sender_id: None,
            pending_recipients: BTreeSet::new(),
        })
    }

    /// Rebuild a record from key material received over a pull (the remote
    /// writer generated the material; we keep it verbatim).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_remote_material(
        owner_id: OwnerId,
        parent_id: Option<NodeId>,
        name: Option<String>,
        encryption_key: EncryptionKey,
        dir_salt: DirSalt,
        dir_prefix: String,
        cloud_id: CloudId,
    ) -> Self {
        NodeRecord {
            version: SCHEMA_VERSION,
            id: NodeId::generate(),
            owner_id,
            parent_id,
            name,
            permissions: ShareList::new(),
            burn_at: None,
            encryption_key,
            dir_salt,
            dir_prefix,
            cloud_id: Some(cloud_id),
            etag_meta: None,
            etag_content: None,
            modified_meta_at: None,
            modified_content_at: None,
            cached_content_info: None,
            explicit_cloud_name: None,
            anchor: None,
            pointee_id: None,
            sender_id: None,
            pending_recipients: BTreeSet::new(),
        }
    }

    pub fn cloud_id(&self) -> Option<&CloudId> {
        self.cloud_id.as_ref()
    }

    /// Write-once assignment. Re-assigning the same value is a no-op;
    /// a different value is rejected — the server never changes it, so a
    /// mismatch means somebody confused two nodes.
    pub fn assign_cloud_id(&mut self, cloud_id: CloudId) -> Result<(), crate::TreeError> {
        match &self.cloud_id {
            None => {
                self.cloud_id = Some(cloud_id);
                Ok(())
            }
            Some(current) if *current == cloud_id => Ok(()),
            Some(current) => Err(crate::TreeError::CloudIdFrozen {
                node: self.id.clone(),
                current: current.clone(),
                proposed: cloud_id,
            }),
        }
    }

    pub fn is_pointer(&self) -> bool {
        self.pointee_id.is_some()
    }

    /// The later of the two fork modification times.
    pub fn last_modified(&self) -> Option<u64> {
        match (self.modified_meta_at, self.modified_content_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

//! The node store: an arena of [`NodeRecord`]s keyed by local id, with a
//! children index, a cloud-id secondary index, and a root set.
//!
//! The store is the sole mutator of structural fields. Every mutation
//! validates first and then updates the record and all indexes together,
//! so a reader never observes a node referencing a parent that does not
//! list it (or vice versa). A tree is single-writer: mutations take
//! `&mut self`, which serializes them; reads go through `&self`.
//!
//! Reconciliation with the remote side keys strictly on `cloud_id`,
//! never on a computed cloud path — a rename changes the path but not
//! the identity.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use veil_core::types::{CloudId, NodeId, OwnerId, TreeId};
use veil_crypto::{derive_cloud_name, DirSalt, EncryptionKey};

use crate::cloudpath::{set_extension, CloudPath};
use crate::node::{Anchor, ContentInfo, NodeRecord, ShareList};
use crate::TreeError;

/// Reserved dir prefix under which root nodes are addressed (roots have
/// no parent to supply one).
pub const ROOT_DIR_PREFIX: &str = "00000000000000000000000000000000";

/// Outcome of [`NodeStore::apply_remote_record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The cloud id was unseen; exactly one new record was created.
    Created(NodeId),
    /// The cloud id was known; the existing record was updated in place.
    Updated(NodeId),
}

impl Applied {
    pub fn node_id(&self) -> &NodeId {
        match self {
            Applied::Created(id) | Applied::Updated(id) => id,
        }
    }
}

/// A node's metadata as observed on a pull. Parentage is expressed in
/// cloud ids because local ids never cross the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteNodeRecord {
    pub cloud_id: CloudId,
    #[serde(default)]
    pub parent_cloud_id: Option<CloudId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: ShareList,
    #[serde(default)]
    pub burn_at: Option<u64>,
    pub encryption_key: EncryptionKey,
    pub dir_salt: DirSalt,
    pub dir_prefix: String,
    #[serde(default)]
    pub etag_meta: Option<String>,
    #[serde(default)]
    pub modified_meta_at: Option<u64>,
    /// Set when the remote writer's cloud name doesn't match the derived
    /// hash; stored as an override, not treated as an error.
    #[serde(default)]
    pub explicit_cloud_name: Option<String>,
    #[serde(default)]
    pub anchor: Option<Anchor>,
    #[serde(default)]
    pub sender_id: Option<OwnerId>,
}

/// The tree of node records for one owner context.
pub struct NodeStore {
    owner_id: OwnerId,
    app_prefix: TreeId,
    nodes: HashMap<NodeId, NodeRecord>,
    children: HashMap<NodeId, BTreeSet<NodeId>>,
    by_cloud_id: HashMap<CloudId, NodeId>,
    roots: BTreeSet<NodeId>,
}

impl NodeStore {
    pub fn new(owner_id: OwnerId, app_prefix: TreeId) -> Self {
        NodeStore {
            owner_id,
            app_prefix,
            nodes: HashMap::new(),
            children: HashMap::new(),
            by_cloud_id: HashMap::new(),
            roots: BTreeSet::new(),
        }
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn app_prefix(&self) -> &TreeId {
        &self.app_prefix
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ── Creation ────────────────────────────────────────────────────────

    /// Create a root node (no parent).
    pub fn create_root(&mut self, name: Option<&str>) -> Result<NodeId, TreeError> {
        let record = NodeRecord::new(self.owner_id.clone(), None, name.map(String::from))?;
        let id = record.id.clone();
        self.nodes.insert(id.clone(), record);
        self.roots.insert(id.clone());
        debug!(node = %id, "created root");
        Ok(id)
    }

    /// Create a node under `parent`. Allocates id and key material;
    /// rejects an unresolvable parent and intra-directory cloud-name
    /// collisions.
    pub fn create(&mut self, parent: &NodeId, name: &str) -> Result<NodeId, TreeError> {
        if !self.nodes.contains_key(parent) {
            return Err(TreeError::InvalidParent(format!("no such node: {parent}")));
        }
        self.check_sibling_collision(parent, name, None)?;

        let record =
            NodeRecord::new(self.owner_id.clone(), Some(parent.clone()), Some(name.into()))?;
        let id = record.id.clone();
        self.children.entry(parent.clone()).or_default().insert(id.clone());
        self.nodes.insert(id.clone(), record);
        debug!(node = %id, parent = %parent, "created node");
        Ok(id)
    }

    /// Create a pointer node: its content is a reference to `pointee`
    /// (same tree) rather than data of its own.
    pub fn create_pointer(
        &mut self,
        parent: &NodeId,
        name: &str,
        pointee: &NodeId,
    ) -> Result<NodeId, TreeError> {
        if !self.nodes.contains_key(pointee) {
            return Err(TreeError::UnknownNode(pointee.clone()));
        }
        let id = self.create(parent, name)?;
        if let Some(record) = self.nodes.get_mut(&id) {
            record.pointee_id = Some(pointee.clone());
        }
        Ok(id)
    }

    /// Create a graft root: a node anchored to a location in a foreign
    /// tree. Resolution of the subtree goes through the anchor.
    pub fn create_graft(
        &mut self,
        parent: &NodeId,
        name: &str,
        anchor: Anchor,
    ) -> Result<NodeId, TreeError> {
        let id = self.create(parent, name)?;
        if let Some(record) = self.nodes.get_mut(&id) {
            record.anchor = Some(anchor);
        }
        Ok(id)
    }

    /// Retarget (or clear) a pointer. A new target must exist.
    pub fn set_pointee(
        &mut self,
        id: &NodeId,
        pointee: Option<NodeId>,
    ) -> Result<(), TreeError> {
        if let Some(target) = &pointee {
            if !self.nodes.contains_key(target) {
                return Err(TreeError::UnknownNode(target.clone()));
            }
        }
        let record = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        record.pointee_id = pointee;
        Ok(())
    }

    /// Retarget (or clear) a graft's anchor.
    pub fn set_anchor(&mut self, id: &NodeId, anchor: Option<Anchor>) -> Result<(), TreeError> {
        let record = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        record.anchor = anchor;
        Ok(())
    }

    // ── Structural mutation ─────────────────────────────────────────────

    /// Change a node's cleartext name. The derived cloud name (and thus
    /// the cloud path) changes; the local id and cloud id do not.
    pub fn rename(&mut self, id: &NodeId, new_name: &str) -> Result<(), TreeError> {
        let parent = self
            .nodes
            .get(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?
            .parent_id
            .clone();
        if let Some(parent) = &parent {
            self.check_sibling_collision(parent, new_name, Some(id))?;
        }
        if let Some(record) = self.nodes.get_mut(id) {
            record.name = Some(new_name.to_string());
        }
        info!(node = %id, "renamed node");
        Ok(())
    }

    /// Reparent a node. Fails with `CycleDetected` when the candidate
    /// parent is the node itself or one of its descendants; the check
    /// walks the candidate's ancestors, bounded by tree depth.
    pub fn move_node(&mut self, id: &NodeId, new_parent: &NodeId) -> Result<(), TreeError> {
        let record = self
            .nodes
            .get(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        let old_parent = record.parent_id.clone();
        let name = record.name.clone();
        if !self.nodes.contains_key(new_parent) {
            return Err(TreeError::InvalidParent(format!("no such node: {new_parent}")));
        }
        if self.is_self_or_descendant(new_parent, id) {
            return Err(TreeError::CycleDetected {
                node: id.clone(),
                parent: new_parent.clone(),
            });
        }
        if let Some(name) = &name {
            self.check_sibling_collision(new_parent, name, Some(id))?;
        }

        self.detach(id, old_parent.as_ref());
        self.children.entry(new_parent.clone()).or_default().insert(id.clone());
        if let Some(record) = self.nodes.get_mut(id) {
            record.parent_id = Some(new_parent.clone());
        }
        info!(node = %id, new_parent = %new_parent, "moved node");
        Ok(())
    }

    /// Remove a node. With `cascade=false` the node must be childless
    /// (`HasChildren` otherwise); with `cascade=true` the whole subtree
    /// goes. Returns the removed ids, leaf-to-root, for tombstoning.
    pub fn delete(&mut self, id: &NodeId, cascade: bool) -> Result<Vec<NodeId>, TreeError> {
        let record = self
            .nodes
            .get(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        let parent = record.parent_id.clone();
        let has_children = self.children.get(id).is_some_and(|c| !c.is_empty());
        if has_children && !cascade {
            return Err(TreeError::HasChildren(id.clone()));
        }

        let mut removed = Vec::new();
        self.collect_subtree(id, &mut removed);
        removed.reverse(); // leaves first

        for victim in &removed {
            if let Some(record) = self.nodes.remove(victim) {
                if let Some(cloud_id) = record.cloud_id() {
                    self.by_cloud_id.remove(cloud_id);
                }
            }
            self.children.remove(victim);
            self.roots.remove(victim);
        }
        self.detach(id, parent.as_ref());
        info!(node = %id, removed = removed.len(), cascade, "deleted subtree");
        Ok(removed)
    }

    /// Schedule best-effort remote deletion. The server deletes on its
    /// own batch cadence, not at the exact time.
    pub fn mark_for_burn(&mut self, id: &NodeId, at: u64) -> Result<(), TreeError> {
        let record = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        record.burn_at = Some(at);
        Ok(())
    }

    pub fn clear_burn(&mut self, id: &NodeId) -> Result<(), TreeError> {
        let record = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        record.burn_at = None;
        Ok(())
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    pub fn node(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    pub fn node_by_cloud_id(&self, cloud_id: &CloudId) -> Option<&NodeRecord> {
        self.by_cloud_id.get(cloud_id).and_then(|id| self.nodes.get(id))
    }

    /// Resolve a sequence of cleartext names, root to leaf, by walking
    /// `parent_id` links — never via the cloud path.
    pub fn node_at_local_path(&self, names: &[&str]) -> Option<&NodeRecord> {
        let first = names.first()?;
        let mut current = self.roots.iter().find_map(|id| {
            let record = self.nodes.get(id)?;
            (record.name.as_deref() == Some(*first)).then_some(record)
        })?;
        for name in &names[1..] {
            let kids = self.children.get(&current.id)?;
            current = kids.iter().find_map(|id| {
                let record = self.nodes.get(id)?;
                (record.name.as_deref() == Some(*name)).then_some(record)
            })?;
        }
        Some(current)
    }

    /// Find a node by its dir prefix (used by anchor resolution, where
    /// the foreign location is identified by prefix).
    pub fn find_by_dir_prefix(&self, dir_prefix: &str) -> Option<&NodeRecord> {
        self.nodes.values().find(|record| record.dir_prefix == dir_prefix)
    }

    pub fn children_of(&self, id: &NodeId) -> Vec<&NodeRecord> {
        self.children
            .get(id)
            .map(|kids| kids.iter().filter_map(|k| self.nodes.get(k)).collect())
            .unwrap_or_default()
    }

    pub fn roots(&self) -> impl Iterator<Item = &NodeRecord> {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// True when `ancestor` appears on `node`'s parent chain.
    pub fn is_ancestor(&self, ancestor: &NodeId, node: &NodeId) -> bool {
        let mut current = self.nodes.get(node).and_then(|r| r.parent_id.clone());
        let mut steps = 0;
        while let Some(id) = current {
            if &id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                break; // parent chain longer than the tree: corrupt, stop
            }
            current = self.nodes.get(&id).and_then(|r| r.parent_id.clone());
        }
        false
    }

    // ── Cloud addressing ────────────────────────────────────────────────

    /// The node's cloud-visible file name. An `explicit_cloud_name`
    /// override (stored when a remote writer didn't follow the hashing
    /// convention) wins over derivation.
    pub fn cloud_name_for(&self, id: &NodeId) -> Result<String, TreeError> {
        let record = self
            .nodes
            .get(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        if let Some(explicit) = &record.explicit_cloud_name {
            return Ok(explicit.clone());
        }
        let name = record
            .name
            .as_deref()
            .ok_or_else(|| TreeError::Unnamed(id.clone()))?;
        let salt = match &record.parent_id {
            Some(parent) => {
                &self
                    .nodes
                    .get(parent)
                    .ok_or_else(|| TreeError::InvalidParent(format!("no such node: {parent}")))?
                    .dir_salt
            }
            // Trunk convention: a root derives under its own salt.
            None => &record.dir_salt,
        };
        Ok(derive_cloud_name(name, salt))
    }

    /// The node's full cloud path, optionally with an extension
    /// (`rcrd` for the metadata record, `data` for the content blob).
    pub fn cloud_path_for(&self, id: &NodeId, ext: Option<&str>) -> Result<CloudPath, TreeError> {
        let record = self
            .nodes
            .get(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        let dir_prefix = match &record.parent_id {
            Some(parent) => self
                .nodes
                .get(parent)
                .ok_or_else(|| TreeError::InvalidParent(format!("no such node: {parent}")))?
                .dir_prefix
                .clone(),
            None => ROOT_DIR_PREFIX.to_string(),
        };
        let cloud_name = self.cloud_name_for(id)?;
        Ok(CloudPath::new(
            self.app_prefix.as_str(),
            dir_prefix,
            set_extension(&cloud_name, ext),
        ))
    }

    pub fn set_explicit_cloud_name(
        &mut self,
        id: &NodeId,
        cloud_name: Option<String>,
    ) -> Result<(), TreeError> {
        let record = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        record.explicit_cloud_name = cloud_name;
        Ok(())
    }

    // ── Sync bookkeeping ────────────────────────────────────────────────

    /// Record a successful metadata upload: the server's id assignment
    /// (write-once) plus the new record-fork etag and time.
    pub fn record_metadata_upload(
        &mut self,
        id: &NodeId,
        cloud_id: CloudId,
        etag_meta: String,
        modified_at: u64,
    ) -> Result<(), TreeError> {
        let record = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        record.assign_cloud_id(cloud_id.clone())?;
        record.etag_meta = Some(etag_meta);
        record.modified_meta_at = Some(modified_at);
        self.by_cloud_id.insert(cloud_id, id.clone());
        debug!(node = %id, "metadata upload recorded");
        Ok(())
    }

    /// Record a successful content upload (content-fork etag and time).
    pub fn record_content_upload(
        &mut self,
        id: &NodeId,
        etag_content: String,
        modified_at: u64,
    ) -> Result<(), TreeError> {
        let record = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        record.etag_content = Some(etag_content);
        record.modified_content_at = Some(modified_at);
        Ok(())
    }

    /// Record a pull's observation of the remote content fork (etag and
    /// time only — the bytes themselves are the downloader's business).
    pub fn note_remote_content(
        &mut self,
        id: &NodeId,
        etag_content: String,
        modified_at: Option<u64>,
    ) -> Result<(), TreeError> {
        let record = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        record.etag_content = Some(etag_content);
        if let Some(at) = modified_at {
            record.modified_content_at = Some(at);
        }
        Ok(())
    }

    /// Refresh the cached content descriptor. Only a completed download
    /// calls this — the cache is never inferred.
    pub fn update_content_info(&mut self, id: &NodeId, info: ContentInfo) -> Result<(), TreeError> {
        let record = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        record.etag_content = Some(info.etag.clone());
        record.modified_content_at = Some(info.observed_at);
        record.cached_content_info = Some(info);
        Ok(())
    }

    /// Reconciliation entry point for the pull collaborator. Keys on
    /// `cloud_id` only: an unseen id creates exactly one record; a known
    /// id updates the existing record's mutable fields in place — even
    /// when the remote name or parent differ from the derived
    /// expectation, that is a rename/move, not a create/delete.
    pub fn apply_remote_record(&mut self, remote: RemoteNodeRecord) -> Result<Applied, TreeError> {
        let parent_local = match &remote.parent_cloud_id {
            Some(pcid) => Some(
                self.by_cloud_id
                    .get(pcid)
                    .cloned()
                    .ok_or_else(|| {
                        TreeError::InvalidParent(format!("unknown parent cloud id: {pcid}"))
                    })?,
            ),
            None => None,
        };

        if let Some(id) = self.by_cloud_id.get(&remote.cloud_id).cloned() {
            let old_parent = self
                .nodes
                .get(&id)
                .ok_or_else(|| TreeError::UnknownNode(id.clone()))?
                .parent_id
                .clone();
            if old_parent != parent_local {
                // A pulled reparent obeys the same acyclicity rule as a
                // local move; a server sending a node under its own
                // descendant gets rejected, not applied.
                if let Some(parent) = &parent_local {
                    if self.is_self_or_descendant(parent, &id) {
                        return Err(TreeError::CycleDetected {
                            node: id.clone(),
                            parent: parent.clone(),
                        });
                    }
                }
                self.detach(&id, old_parent.as_ref());
                self.attach(&id, parent_local.as_ref());
            }
            if let Some(record) = self.nodes.get_mut(&id) {
                record.parent_id = parent_local;
                record.name = remote.name;
                record.permissions = remote.permissions;
                record.burn_at = remote.burn_at;
                record.etag_meta = remote.etag_meta;
                record.modified_meta_at = remote.modified_meta_at;
                record.explicit_cloud_name = remote.explicit_cloud_name;
                record.anchor = remote.anchor;
                record.sender_id = remote.sender_id;
            }
            debug!(node = %id, cloud_id = %remote.cloud_id, "remote record reconciled");
            Ok(Applied::Updated(id))
        } else {
            let mut record = NodeRecord::from_remote_material(
                self.owner_id.clone(),
                parent_local.clone(),
                remote.name,
                remote.encryption_key,
                remote.dir_salt,
                remote.dir_prefix,
                remote.cloud_id.clone(),
            );
            record.permissions = remote.permissions;
            record.burn_at = remote.burn_at;
            record.etag_meta = remote.etag_meta;
            record.modified_meta_at = remote.modified_meta_at;
            record.explicit_cloud_name = remote.explicit_cloud_name;
            record.anchor = remote.anchor;
            record.sender_id = remote.sender_id;

            let id = record.id.clone();
            self.attach(&id, parent_local.as_ref());
            self.by_cloud_id.insert(remote.cloud_id.clone(), id.clone());
            self.nodes.insert(id.clone(), record);
            info!(node = %id, cloud_id = %remote.cloud_id, "remote record created local node");
            Ok(Applied::Created(id))
        }
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn detach(&mut self, id: &NodeId, parent: Option<&NodeId>) {
        match parent {
            Some(parent) => {
                if let Some(kids) = self.children.get_mut(parent) {
                    kids.remove(id);
                }
            }
            None => {
                self.roots.remove(id);
            }
        }
    }

    fn attach(&mut self, id: &NodeId, parent: Option<&NodeId>) {
        match parent {
            Some(parent) => {
                self.children.entry(parent.clone()).or_default().insert(id.clone());
            }
            None => {
                self.roots.insert(id.clone());
            }
        }
    }

    fn is_self_or_descendant(&self, candidate: &NodeId, node: &NodeId) -> bool {
        candidate == node || self.is_ancestor(node, candidate)
    }

    fn collect_subtree(&self, id: &NodeId, out: &mut Vec<NodeId>) {
        out.push(id.clone());
        if let Some(kids) = self.children.get(id) {
            for kid in kids {
                self.collect_subtree(kid, out);
            }
        }
    }

    /// Reject a cleartext name whose derived cloud name collides with a
    /// sibling's. The digest space makes accidental collisions between
    /// distinct names practically impossible, so in practice this fires
    /// on duplicate names in one directory; either way it is surfaced,
    /// never silently resolved.
    fn check_sibling_collision(
        &self,
        parent: &NodeId,
        name: &str,
        exclude: Option<&NodeId>,
    ) -> Result<(), TreeError> {
        let parent_record = self
            .nodes
            .get(parent)
            .ok_or_else(|| TreeError::InvalidParent(format!("no such node: {parent}")))?;
        let derived = derive_cloud_name(name, &parent_record.dir_salt);
        let Some(kids) = self.children.get(parent) else {
            return Ok(());
        };
        for kid in kids {
            if exclude == Some(kid) {
                continue;
            }
            let Some(sibling) = self.nodes.get(kid) else {
                continue;
            };
            let sibling_cloud = match (&sibling.explicit_cloud_name, &sibling.name) {
                (Some(explicit), _) => explicit.clone(),
                (None, Some(sib_name)) => derive_cloud_name(sib_name, &parent_record.dir_salt),
                (None, None) => continue,
            };
            if sibling_cloud == derived {
                return Err(TreeError::NameCollision {
                    parent: parent.clone(),
                    name: name.to_string(),
                    existing: sibling.name.clone().unwrap_or(sibling_cloud),
                });
            }
        }
        Ok(())
    }
}

//! Etag-based change and conflict detection.
//!
//! The tracker remembers, per node, the etags of the last versions this
//! client synced (one per fork) and whether a local write is still
//! waiting to be pushed. Comparing a pull's etags against that memory
//! classifies the situation:
//!
//! - remote etag differs, no pending local write: we are merely stale;
//!   pull the newer version.
//! - remote etag differs, pending local write: both sides changed the
//!   same fork since our last sync. That is a conflict, and it is
//!   surfaced, never auto-resolved.
//!
//! Observation is read-only. Stored etags advance only when a sync
//! completes ([`ConflictTracker::record_synced_meta`] /
//! [`record_synced_content`](ConflictTracker::record_synced_content)),
//! so repeated observations of the same pull stay idempotent.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use veil_core::types::NodeId;

/// Last-synced etags and the pending-write flag for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtagState {
    #[serde(default)]
    pub etag_meta: Option<String>,
    #[serde(default)]
    pub etag_content: Option<String>,
    #[serde(default)]
    pub pending_local_write: bool,
}

/// A detected write-write conflict on the metadata fork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub node_id: NodeId,
    /// The remote etag that lost against our pending write (or that our
    /// pending write must be rebased onto; policy is the caller's).
    pub remote_etag_meta: Option<String>,
}

/// Outcome of classifying one pull observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// The remote metadata fork moved past what we last synced.
    pub meta_stale: bool,
    /// The remote content fork moved past what we last synced.
    pub content_stale: bool,
    /// Set when `meta_stale` coincides with a pending local write.
    pub conflict: Option<Conflict>,
}

impl Observation {
    pub fn unchanged() -> Self {
        Observation {
            meta_stale: false,
            content_stale: false,
            conflict: None,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        !self.meta_stale && !self.content_stale
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictTracker {
    #[serde(default)]
    states: HashMap<NodeId, EtagState>,
}

impl ConflictTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, id: &NodeId) -> Option<&EtagState> {
        self.states.get(id)
    }

    /// Mark a local edit that has not been pushed yet. Until a completed
    /// upload clears it, any observed remote metadata change conflicts.
    pub fn note_local_pending_write(&mut self, id: &NodeId) {
        self.states.entry(id.clone()).or_default().pending_local_write = true;
        debug!(node = %id, "local write pending");
    }

    pub fn has_pending(&self, id: &NodeId) -> bool {
        self.states.get(id).is_some_and(|s| s.pending_local_write)
    }

    /// Classify a pull's view of the node against our sync memory.
    /// Read-only: stored etags do not advance here.
    pub fn observe_remote(
        &self,
        id: &NodeId,
        remote_etag_meta: Option<&str>,
        remote_etag_content: Option<&str>,
    ) -> Observation {
        let state = self.states.get(id);
        let stored_meta = state.and_then(|s| s.etag_meta.as_deref());
        let stored_content = state.and_then(|s| s.etag_content.as_deref());
        let pending = state.is_some_and(|s| s.pending_local_write);

        // A fork is stale when the remote reports an etag and it is not
        // the one we last synced. An absent remote etag says nothing.
        let meta_stale = remote_etag_meta.is_some() && remote_etag_meta != stored_meta;
        let content_stale = remote_etag_content.is_some() && remote_etag_content != stored_content;

        let conflict = if meta_stale && pending {
            warn!(node = %id, "remote metadata changed under a pending local write");
            Some(Conflict {
                node_id: id.clone(),
                remote_etag_meta: remote_etag_meta.map(String::from),
            })
        } else {
            None
        };

        Observation {
            meta_stale,
            content_stale,
            conflict,
        }
    }

    /// A metadata sync (push or pull) completed at `etag`: advance the
    /// stored etag and clear the pending flag.
    pub fn record_synced_meta(&mut self, id: &NodeId, etag: impl Into<String>) {
        let state = self.states.entry(id.clone()).or_default();
        state.etag_meta = Some(etag.into());
        state.pending_local_write = false;
    }

    /// A content sync completed at `etag`.
    pub fn record_synced_content(&mut self, id: &NodeId, etag: impl Into<String>) {
        let state = self.states.entry(id.clone()).or_default();
        state.etag_content = Some(etag.into());
    }

    /// Drop all memory of a node (deleted or tombstoned).
    pub fn forget(&mut self, id: &NodeId) {
        self.states.remove(id);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> NodeId {
        NodeId::generate()
    }

    #[test]
    fn unseen_node_with_remote_etag_is_stale_not_conflicted() {
        let tracker = ConflictTracker::new();
        let node = id();
        let obs = tracker.observe_remote(&node, Some("e1"), None);
        assert!(obs.meta_stale);
        assert!(!obs.content_stale);
        assert!(obs.conflict.is_none());
    }

    #[test]
    fn matching_etags_are_unchanged() {
        let mut tracker = ConflictTracker::new();
        let node = id();
        tracker.record_synced_meta(&node, "e1");
        tracker.record_synced_content(&node, "c1");
        let obs = tracker.observe_remote(&node, Some("e1"), Some("c1"));
        assert!(obs.is_unchanged());
        assert!(obs.conflict.is_none());
    }

    #[test]
    fn absent_remote_etag_says_nothing() {
        let mut tracker = ConflictTracker::new();
        let node = id();
        tracker.record_synced_meta(&node, "e1");
        let obs = tracker.observe_remote(&node, None, None);
        assert!(obs.is_unchanged());
    }

    #[test]
    fn staleness_without_pending_write_is_not_a_conflict() {
        let mut tracker = ConflictTracker::new();
        let node = id();
        tracker.record_synced_meta(&node, "e1");
        let obs = tracker.observe_remote(&node, Some("e2"), None);
        assert!(obs.meta_stale);
        assert!(obs.conflict.is_none());
    }

    #[test]
    fn pending_write_plus_remote_change_is_a_conflict() {
        let mut tracker = ConflictTracker::new();
        let node = id();
        tracker.record_synced_meta(&node, "e1");
        tracker.note_local_pending_write(&node);

        let obs = tracker.observe_remote(&node, Some("e2"), None);
        let conflict = obs.conflict.expect("conflict expected");
        assert_eq!(conflict.node_id, node);
        assert_eq!(conflict.remote_etag_meta.as_deref(), Some("e2"));
    }

    #[test]
    fn pending_write_with_unchanged_remote_is_fine() {
        let mut tracker = ConflictTracker::new();
        let node = id();
        tracker.record_synced_meta(&node, "e1");
        tracker.note_local_pending_write(&node);
        let obs = tracker.observe_remote(&node, Some("e1"), None);
        assert!(obs.is_unchanged());
        assert!(obs.conflict.is_none());
    }

    #[test]
    fn observation_is_read_only_and_idempotent() {
        let mut tracker = ConflictTracker::new();
        let node = id();
        tracker.record_synced_meta(&node, "e1");
        let first = tracker.observe_remote(&node, Some("e2"), Some("c2"));
        let second = tracker.observe_remote(&node, Some("e2"), Some("c2"));
        assert_eq!(first, second);
        assert!(first.meta_stale && first.content_stale);
    }

    #[test]
    fn completed_sync_advances_and_clears_pending() {
        let mut tracker = ConflictTracker::new();
        let node = id();
        tracker.note_local_pending_write(&node);
        tracker.record_synced_meta(&node, "e2");
        assert!(!tracker.has_pending(&node));
        assert!(tracker.observe_remote(&node, Some("e2"), None).is_unchanged());
    }

    #[test]
    fn content_staleness_tracked_independently() {
        let mut tracker = ConflictTracker::new();
        let node = id();
        tracker.record_synced_meta(&node, "e1");
        tracker.record_synced_content(&node, "c1");
        let obs = tracker.observe_remote(&node, Some("e1"), Some("c2"));
        assert!(!obs.meta_stale);
        assert!(obs.content_stale);
        assert!(obs.conflict.is_none());
    }

    #[test]
    fn forget_drops_state() {
        let mut tracker = ConflictTracker::new();
        let node = id();
        tracker.record_synced_meta(&node, "e1");
        tracker.forget(&node);
        assert!(tracker.state(&node).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn serde_roundtrip() {
        let mut tracker = ConflictTracker::new();
        let node = id();
        tracker.record_synced_meta(&node, "e1");
        tracker.note_local_pending_write(&node);
        let json = serde_json::to_string(&tracker).unwrap();
        let back: ConflictTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(back.state(&node), tracker.state(&node));
        assert!(back.has_pending(&node));
    }
}

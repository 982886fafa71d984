//! Orchestration of one sync pass over a tree.
//!
//! A [`SyncSession`] borrows the node store and the conflict tracker
//! and keeps them in step: pull observations are classified against the
//! tracker before any structural change lands in the store, and
//! completed transfers advance both together. Conflicted records are
//! reported and left unapplied; resolution policy belongs to the
//! caller.

use tracing::{debug, info, warn};

use veil_core::types::NodeId;
use veil_tree::{Applied, ContentInfo, NodeStore, TreeError};

use crate::error::SyncError;
use crate::remote::{ContentReceipt, MetaReceipt, PullSource, RemoteChange};
use crate::tracker::{Conflict, ConflictTracker, Observation};

/// What one pulled change did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
    /// `None` when the change was deferred because of a conflict.
    pub applied: Option<Applied>,
    pub observation: Observation,
}

impl PullReport {
    pub fn is_deferred(&self) -> bool {
        self.applied.is_none()
    }
}

/// Tally of a drained pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullSummary {
    pub created: usize,
    pub updated: usize,
    pub conflicts: Vec<Conflict>,
}

pub struct SyncSession<'a> {
    store: &'a mut NodeStore,
    tracker: &'a mut ConflictTracker,
}

impl<'a> SyncSession<'a> {
    pub fn new(store: &'a mut NodeStore, tracker: &'a mut ConflictTracker) -> Self {
        SyncSession { store, tracker }
    }

    /// Reconcile one pulled change.
    ///
    /// For a node we already track, the change is classified first; a
    /// conflict defers the structural apply entirely (the local record
    /// keeps the pending edit) and only reports. Otherwise the record is
    /// applied keyed on its cloud id and the tracker advances to the
    /// pulled metadata etag. Content is noted but not downloaded, so its
    /// staleness survives until a download completes.
    pub fn apply_pull(&mut self, change: RemoteChange) -> Result<PullReport, TreeError> {
        let cloud_id = change.record.cloud_id.clone();
        let remote_meta = change.record.etag_meta.clone();

        if let Some(existing) = self.store.node_by_cloud_id(&cloud_id) {
            let id = existing.id.clone();
            let observation = self.tracker.observe_remote(
                &id,
                remote_meta.as_deref(),
                change.etag_content.as_deref(),
            );
            if observation.conflict.is_some() {
                warn!(node = %id, cloud_id = %cloud_id, "pull deferred on conflict");
                return Ok(PullReport {
                    applied: None,
                    observation,
                });
            }
            if observation.is_unchanged() {
                debug!(node = %id, cloud_id = %cloud_id, "pull observed no change");
                return Ok(PullReport {
                    applied: Some(Applied::Updated(id)),
                    observation,
                });
            }

            let applied = self.store.apply_remote_record(change.record)?;
            self.finish_pull(&id, remote_meta, &change.etag_content, change.modified_content_at)?;
            Ok(PullReport {
                applied: Some(applied),
                observation,
            })
        } else {
            let applied = self.store.apply_remote_record(change.record)?;
            let id = applied.node_id().clone();
            // A brand-new node has no sync memory; everything the remote
            // reports is by definition new to us.
            let observation = Observation {
                meta_stale: remote_meta.is_some(),
                content_stale: change.etag_content.is_some(),
                conflict: None,
            };
            self.finish_pull(&id, remote_meta, &change.etag_content, change.modified_content_at)?;
            Ok(PullReport {
                applied: Some(applied),
                observation,
            })
        }
    }

    fn finish_pull(
        &mut self,
        id: &NodeId,
        remote_meta: Option<String>,
        etag_content: &Option<String>,
        modified_content_at: Option<u64>,
    ) -> Result<(), TreeError> {
        if let Some(etag) = remote_meta {
            self.tracker.record_synced_meta(id, etag);
        }
        if let Some(etag) = etag_content {
            self.store
                .note_remote_content(id, etag.clone(), modified_content_at)?;
        }
        Ok(())
    }

    /// A metadata record upload finished: freeze the server identity,
    /// advance both the store's fork state and the tracker, and clear
    /// the pending-write flag.
    pub fn complete_record_upload(
        &mut self,
        id: &NodeId,
        receipt: MetaReceipt,
    ) -> Result<(), TreeError> {
        self.store.record_metadata_upload(
            id,
            receipt.cloud_id,
            receipt.etag_meta.clone(),
            receipt.modified_at,
        )?;
        self.tracker.record_synced_meta(id, receipt.etag_meta);
        info!(node = %id, "record upload complete");
        Ok(())
    }

    /// A content upload finished.
    pub fn complete_content_upload(
        &mut self,
        id: &NodeId,
        receipt: ContentReceipt,
    ) -> Result<(), TreeError> {
        self.store
            .record_content_upload(id, receipt.etag_content.clone(), receipt.modified_at)?;
        self.tracker.record_synced_content(id, receipt.etag_content);
        info!(node = %id, bytes = receipt.byte_count, "content upload complete");
        Ok(())
    }

    /// A content download finished. This is the only place the cached
    /// content descriptor refreshes.
    pub fn complete_download(
        &mut self,
        id: &NodeId,
        receipt: ContentReceipt,
    ) -> Result<(), TreeError> {
        self.store.update_content_info(
            id,
            ContentInfo {
                etag: receipt.etag_content.clone(),
                byte_count: receipt.byte_count,
                fingerprint64: receipt.fingerprint64,
                observed_at: receipt.modified_at,
            },
        )?;
        self.tracker.record_synced_content(id, receipt.etag_content);
        debug!(node = %id, "content download complete");
        Ok(())
    }

    /// A node was deleted (locally or via tombstone): drop its sync
    /// memory along with it.
    pub fn forget(&mut self, id: &NodeId) {
        self.tracker.forget(id);
    }

    /// Drain a pull source to exhaustion, applying each change in server
    /// order. Conflicted changes are collected, not applied.
    pub async fn drain_pull<S: PullSource>(
        &mut self,
        source: &mut S,
    ) -> Result<PullSummary, SyncError> {
        let mut summary = PullSummary::default();
        while let Some(change) = source.next_change().await? {
            let report = self.apply_pull(change)?;
            if let Some(conflict) = report.observation.conflict {
                summary.conflicts.push(conflict);
                continue;
            }
            match report.applied {
                Some(Applied::Created(_)) => summary.created += 1,
                Some(Applied::Updated(_)) => summary.updated += 1,
                None => {}
            }
        }
        info!(
            created = summary.created,
            updated = summary.updated,
            conflicts = summary.conflicts.len(),
            "pull drained"
        );
        Ok(summary)
    }
}

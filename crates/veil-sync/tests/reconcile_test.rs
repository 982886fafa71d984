//! End-to-end reconciliation scenarios: a local tree pushed to the
//! provider, pulls from a mock server, and conflict sequencing.

use std::collections::VecDeque;

use veil_core::types::{CloudId, OwnerId, TreeId};
use veil_crypto::{derive_cloud_name, DirSalt, EncryptionKey};
use veil_sync::{
    ConflictTracker, ContentReceipt, MetaReceipt, PullSource, RemoteChange, SyncSession,
    TransferError,
};
use veil_tree::{Applied, NodeStore, RemoteNodeRecord, ShareList, CONTENT_EXT, RECORD_EXT};

struct VecSource(VecDeque<RemoteChange>);

impl VecSource {
    fn new(changes: Vec<RemoteChange>) -> Self {
        VecSource(changes.into())
    }
}

impl PullSource for VecSource {
    async fn next_change(&mut self) -> Result<Option<RemoteChange>, TransferError> {
        Ok(self.0.pop_front())
    }
}

fn remote_record(cloud_id: &str, parent: Option<&str>, name: &str, etag: &str) -> RemoteNodeRecord {
    RemoteNodeRecord {
        cloud_id: CloudId::new(cloud_id),
        parent_cloud_id: parent.map(CloudId::new),
        name: Some(name.into()),
        permissions: ShareList::new(),
        burn_at: None,
        encryption_key: EncryptionKey::generate().unwrap(),
        dir_salt: DirSalt::generate().unwrap(),
        dir_prefix: veil_crypto::random_dir_prefix().unwrap(),
        etag_meta: Some(etag.into()),
        modified_meta_at: Some(1_000),
        explicit_cloud_name: None,
        anchor: None,
        sender_id: None,
    }
}

fn change(record: RemoteNodeRecord, etag_content: Option<&str>) -> RemoteChange {
    RemoteChange {
        record,
        etag_content: etag_content.map(String::from),
        modified_content_at: etag_content.map(|_| 1_000),
    }
}

#[test]
fn push_yields_stable_obfuscated_paths() {
    let mut store = NodeStore::new(OwnerId::new("alice"), TreeId::new("veil"));
    let mut tracker = ConflictTracker::new();

    let root = store.create_root(Some("home")).unwrap();
    let notes = store.create(&root, "notes.txt").unwrap();
    tracker.note_local_pending_write(&notes);

    // The record path is derived from the parent's salt and prefix, and
    // two independent computations agree.
    let rcrd = store.cloud_path_for(&notes, Some(RECORD_EXT)).unwrap();
    let again = store.cloud_path_for(&notes, Some(RECORD_EXT)).unwrap();
    assert_eq!(rcrd, again);

    let parent = store.node(&root).unwrap();
    assert_eq!(
        rcrd.file_name_without_ext(),
        derive_cloud_name("notes.txt", &parent.dir_salt)
    );
    assert_eq!(rcrd.dir_prefix, parent.dir_prefix);
    // The cleartext never appears in the cloud address.
    assert!(!rcrd.path().contains("notes"));

    // Both forks live at the same stem.
    let data = store.cloud_path_for(&notes, Some(CONTENT_EXT)).unwrap();
    assert!(rcrd.eq_ignoring_extension(&data));

    // Upload receipts settle the node: identity frozen, pending cleared.
    let mut session = SyncSession::new(&mut store, &mut tracker);
    session
        .complete_record_upload(
            &notes,
            MetaReceipt {
                cloud_id: CloudId::new("srv-notes"),
                etag_meta: "e1".into(),
                modified_at: 2_000,
            },
        )
        .unwrap();
    session
        .complete_content_upload(
            &notes,
            ContentReceipt {
                etag_content: "c1".into(),
                byte_count: 42,
                fingerprint64: 7,
                modified_at: 2_000,
            },
        )
        .unwrap();

    assert!(!tracker.has_pending(&notes));
    let record = store.node(&notes).unwrap();
    assert_eq!(record.cloud_id().unwrap().as_str(), "srv-notes");
    assert_eq!(record.etag_meta.as_deref(), Some("e1"));
    assert_eq!(record.etag_content.as_deref(), Some("c1"));
}

#[test]
fn rename_changes_path_but_not_identity() {
    let mut store = NodeStore::new(OwnerId::new("alice"), TreeId::new("veil"));
    let root = store.create_root(Some("home")).unwrap();
    let notes = store.create(&root, "notes.txt").unwrap();
    store
        .record_metadata_upload(&notes, CloudId::new("srv-notes"), "e1".into(), 1_000)
        .unwrap();

    let before = store.cloud_path_for(&notes, Some(RECORD_EXT)).unwrap();
    store.rename(&notes, "notes-v2.txt").unwrap();
    let after = store.cloud_path_for(&notes, Some(RECORD_EXT)).unwrap();

    assert_ne!(before.file_name, after.file_name);
    assert_eq!(before.dir_prefix, after.dir_prefix);
    let record = store.node(&notes).unwrap();
    assert_eq!(record.id, notes);
    assert_eq!(record.cloud_id().unwrap().as_str(), "srv-notes");
}

#[tokio::test]
async fn pull_creates_then_updates_by_cloud_id() {
    let mut store = NodeStore::new(OwnerId::new("alice"), TreeId::new("veil"));
    let mut tracker = ConflictTracker::new();
    let mut session = SyncSession::new(&mut store, &mut tracker);

    let mut source = VecSource::new(vec![
        change(remote_record("srv-root", None, "home", "r1"), None),
        change(
            remote_record("srv-doc", Some("srv-root"), "doc.md", "d1"),
            Some("c1"),
        ),
    ]);
    let summary = session.drain_pull(&mut source).await.unwrap();
    assert_eq!(summary.created, 2);
    assert_eq!(summary.updated, 0);
    assert!(summary.conflicts.is_empty());
    assert_eq!(store.len(), 2);

    // Second pull: same cloud id, new name and etag. Rename in place.
    let mut tracker2 = tracker;
    let mut session = SyncSession::new(&mut store, &mut tracker2);
    let mut source = VecSource::new(vec![change(
        remote_record("srv-doc", Some("srv-root"), "doc-final.md", "d2"),
        Some("c1"),
    )]);
    let summary = session.drain_pull(&mut source).await.unwrap();
    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 1);
    assert_eq!(store.len(), 2);

    let doc = store.node_by_cloud_id(&CloudId::new("srv-doc")).unwrap();
    assert_eq!(doc.name.as_deref(), Some("doc-final.md"));
    assert_eq!(doc.etag_meta.as_deref(), Some("d2"));
}

#[tokio::test]
async fn conflicting_pull_is_deferred_until_resolved() {
    let mut store = NodeStore::new(OwnerId::new("alice"), TreeId::new("veil"));
    let mut tracker = ConflictTracker::new();

    // Seed from the server, then edit locally without pushing.
    {
        let mut session = SyncSession::new(&mut store, &mut tracker);
        let mut source = VecSource::new(vec![change(
            remote_record("srv-doc", None, "doc.md", "d1"),
            None,
        )]);
        session.drain_pull(&mut source).await.unwrap();
    }
    let doc = store.node_by_cloud_id(&CloudId::new("srv-doc")).unwrap().id.clone();
    store.rename(&doc, "doc-local.md").unwrap();
    tracker.note_local_pending_write(&doc);

    // The server moved too. The pull must not clobber the local edit.
    let mut session = SyncSession::new(&mut store, &mut tracker);
    let mut source = VecSource::new(vec![change(
        remote_record("srv-doc", None, "doc-remote.md", "d2"),
        None,
    )]);
    let summary = session.drain_pull(&mut source).await.unwrap();
    assert_eq!(summary.created + summary.updated, 0);
    assert_eq!(summary.conflicts.len(), 1);
    assert_eq!(summary.conflicts[0].node_id, doc);
    assert_eq!(summary.conflicts[0].remote_etag_meta.as_deref(), Some("d2"));
    assert_eq!(
        store.node(&doc).unwrap().name.as_deref(),
        Some("doc-local.md")
    );

    // Resolution: the local edit wins and is pushed; the tracker
    // advances to the push receipt and the next pull of that etag is
    // quiet.
    let mut session = SyncSession::new(&mut store, &mut tracker);
    session
        .complete_record_upload(
            &doc,
            MetaReceipt {
                cloud_id: CloudId::new("srv-doc"),
                etag_meta: "d3".into(),
                modified_at: 3_000,
            },
        )
        .unwrap();
    let mut source = VecSource::new(vec![change(
        remote_record("srv-doc", None, "doc-local.md", "d3"),
        None,
    )]);
    let summary = session.drain_pull(&mut source).await.unwrap();
    assert!(summary.conflicts.is_empty());
    assert_eq!(summary.updated, 1);
}

#[tokio::test]
async fn staleness_without_local_edit_just_updates() {
    let mut store = NodeStore::new(OwnerId::new("alice"), TreeId::new("veil"));
    let mut tracker = ConflictTracker::new();
    let mut session = SyncSession::new(&mut store, &mut tracker);

    let mut source = VecSource::new(vec![change(
        remote_record("srv-doc", None, "doc.md", "d1"),
        Some("c1"),
    )]);
    session.drain_pull(&mut source).await.unwrap();

    // Remote content changed; no local edit anywhere.
    let mut source = VecSource::new(vec![change(
        remote_record("srv-doc", None, "doc.md", "d2"),
        Some("c2"),
    )]);
    let summary = session.drain_pull(&mut source).await.unwrap();
    assert!(summary.conflicts.is_empty());
    assert_eq!(summary.updated, 1);

    let doc = store.node_by_cloud_id(&CloudId::new("srv-doc")).unwrap();
    assert_eq!(doc.etag_content.as_deref(), Some("c2"));

    // A download settles the content fork and fills the cache.
    let id = doc.id.clone();
    let mut session = SyncSession::new(&mut store, &mut tracker);
    session
        .complete_download(
            &id,
            ContentReceipt {
                etag_content: "c2".into(),
                byte_count: 128,
                fingerprint64: 99,
                modified_at: 4_000,
            },
        )
        .unwrap();
    let doc = store.node(&id).unwrap();
    let cache = doc.cached_content_info.as_ref().unwrap();
    assert_eq!(cache.etag, "c2");
    assert_eq!(cache.byte_count, 128);
    assert!(tracker
        .observe_remote(&id, Some("d2"), Some("c2"))
        .is_unchanged());
}

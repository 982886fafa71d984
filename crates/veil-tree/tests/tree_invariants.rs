//! Structural invariants under random mutation sequences.
//!
//! Whatever order of creates, renames, moves, and deletes is applied
//! (including ones the store rejects), the tree stays acyclic and the
//! parent links and children index never disagree.

use proptest::prelude::*;

use veil_core::types::{NodeId, OwnerId, TreeId};
use veil_tree::NodeStore;

#[derive(Debug, Clone)]
enum Op {
    Create { parent: usize, name: usize },
    Rename { node: usize, name: usize },
    Move { node: usize, parent: usize },
    Delete { node: usize, cascade: bool },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..24usize, 0..8usize).prop_map(|(parent, name)| Op::Create { parent, name }),
        1 => (0..24usize, 0..8usize).prop_map(|(node, name)| Op::Rename { node, name }),
        2 => (0..24usize, 0..24usize).prop_map(|(node, parent)| Op::Move { node, parent }),
        1 => (0..24usize, any::<bool>()).prop_map(|(node, cascade)| Op::Delete { node, cascade }),
    ]
}

fn name(i: usize) -> String {
    format!("name-{i}")
}

fn pick(ids: &[NodeId], i: usize) -> Option<&NodeId> {
    if ids.is_empty() {
        None
    } else {
        Some(&ids[i % ids.len()])
    }
}

fn apply(store: &mut NodeStore, ids: &mut Vec<NodeId>, op: &Op) {
    match op {
        Op::Create { parent, name: n } => {
            if let Some(parent) = pick(ids, *parent).cloned() {
                if let Ok(id) = store.create(&parent, &name(*n)) {
                    ids.push(id);
                }
            }
        }
        Op::Rename { node, name: n } => {
            if let Some(node) = pick(ids, *node).cloned() {
                let _ = store.rename(&node, &name(*n));
            }
        }
        Op::Move { node, parent } => {
            if let (Some(node), Some(parent)) =
                (pick(ids, *node).cloned(), pick(ids, *parent).cloned())
            {
                let _ = store.move_node(&node, &parent);
            }
        }
        Op::Delete { node, cascade } => {
            if let Some(node) = pick(ids, *node).cloned() {
                let _ = store.delete(&node, *cascade);
            }
        }
    }
}

/// Every parent link terminates at a root without revisiting a node.
fn assert_acyclic(store: &NodeStore) {
    let bound = store.len();
    for record in store.iter() {
        let mut current = record.parent_id.clone();
        let mut steps = 0;
        while let Some(id) = current {
            assert_ne!(id, record.id, "node {} is its own ancestor", record.id);
            steps += 1;
            assert!(steps <= bound, "parent chain of {} does not terminate", record.id);
            current = store
                .node(&id)
                .unwrap_or_else(|| panic!("dangling parent link {id}"))
                .parent_id
                .clone();
        }
    }
}

/// `parent_id` and the children index agree in both directions.
fn assert_links_consistent(store: &NodeStore) {
    for record in store.iter() {
        match &record.parent_id {
            Some(parent) => {
                let listed = store
                    .children_of(parent)
                    .iter()
                    .any(|child| child.id == record.id);
                assert!(listed, "{} not listed under its parent {parent}", record.id);
            }
            None => {
                let is_root = store.roots().any(|root| root.id == record.id);
                assert!(is_root, "parentless {} missing from roots", record.id);
            }
        }
    }
    for parent in store.iter() {
        for child in store.children_of(&parent.id) {
            assert_eq!(
                child.parent_id.as_ref(),
                Some(&parent.id),
                "children index lists {} under {} but the child disagrees",
                child.id,
                parent.id
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_mutations_preserve_tree_shape(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut store = NodeStore::new(OwnerId::new("alice"), TreeId::new("app"));
        let mut ids = Vec::new();
        let root = store.create_root(Some("root")).unwrap();
        ids.push(root);

        for op in &ops {
            apply(&mut store, &mut ids, op);
            assert_acyclic(&store);
        }
        assert_links_consistent(&store);
    }

    #[test]
    fn cloud_paths_stay_stable_across_unrelated_mutations(
        ops in prop::collection::vec(op_strategy(), 1..40)
    ) {
        let mut store = NodeStore::new(OwnerId::new("alice"), TreeId::new("app"));
        let root = store.create_root(Some("root")).unwrap();
        let pinned = store.create(&root, "pinned").unwrap();
        let before = store.cloud_path_for(&pinned, None).unwrap();

        // Mutations on other nodes; the pinned node and its parent are
        // excluded from the id pool.
        let mut ids = Vec::new();
        let sandbox = store.create(&root, "sandbox").unwrap();
        ids.push(sandbox);
        for op in &ops {
            apply(&mut store, &mut ids, op);
        }

        let after = store.cloud_path_for(&pinned, None).unwrap();
        prop_assert_eq!(before, after);
    }
}

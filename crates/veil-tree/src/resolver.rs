//! Pointer and graft resolution.
//!
//! Two indirections exist: `pointee_id` (a pointer to another node in
//! the same tree) and `anchor` (a graft onto a location in a foreign
//! tree). Resolution follows both until it lands on a plain node,
//! bounded by a hop budget so that reference cycles terminate.

use veil_core::types::{NodeId, OwnerId};

use crate::node::{Anchor, NodeRecord};
use crate::store::NodeStore;

/// Default hop budget; mirrors `ResolverConfig::max_hops`.
pub const DEFAULT_MAX_HOPS: usize = 32;

/// Supplies the local replica of a foreign tree, if one is synced.
/// Anchors into trees we have no replica of resolve to `NotFound`.
pub trait ForeignTreeProvider {
    fn store_for(&self, anchor: &Anchor) -> Option<&NodeStore>;
}

/// Provider for a single-tree deployment: every anchor is unresolvable.
pub struct NoForeignTrees;

impl ForeignTreeProvider for NoForeignTrees {
    fn store_for(&self, _anchor: &Anchor) -> Option<&NodeStore> {
        None
    }
}

/// Where resolution landed.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedTarget<'a> {
    /// Owner of the tree the target lives in (the home owner unless an
    /// anchor was crossed).
    pub owner_id: &'a OwnerId,
    pub record: &'a NodeRecord,
    /// Indirections followed; zero for a plain node.
    pub hops: usize,
}

#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    Found(ResolvedTarget<'a>),
    /// A link in the chain was dangling, or a foreign replica is absent.
    NotFound,
    /// The hop budget ran out; treated as a cycle.
    CycleDetected,
}

impl Resolution<'_> {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

pub struct AnchorResolver<'a, P: ForeignTreeProvider> {
    home: &'a NodeStore,
    provider: &'a P,
    max_hops: usize,
}

impl<'a, P: ForeignTreeProvider> AnchorResolver<'a, P> {
    pub fn new(home: &'a NodeStore, provider: &'a P) -> Self {
        AnchorResolver {
            home,
            provider,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Follow indirections starting at `id` until a plain node, a
    /// dangling link, or the hop budget.
    pub fn resolve(&self, id: &NodeId) -> Resolution<'a> {
        let mut store = self.home;
        let mut current = match store.node(id) {
            Some(record) => record,
            None => return Resolution::NotFound,
        };
        let mut hops = 0;

        loop {
            if let Some(pointee) = &current.pointee_id {
                hops += 1;
                if hops > self.max_hops {
                    return Resolution::CycleDetected;
                }
                match store.node(pointee) {
                    Some(next) => {
                        current = next;
                        continue;
                    }
                    None => return Resolution::NotFound,
                }
            }

            if let Some(anchor) = &current.anchor {
                hops += 1;
                if hops > self.max_hops {
                    return Resolution::CycleDetected;
                }
                let Some(foreign) = self.provider.store_for(anchor) else {
                    return Resolution::NotFound;
                };
                match foreign.find_by_dir_prefix(&anchor.dir_prefix) {
                    Some(next) => {
                        store = foreign;
                        current = next;
                        continue;
                    }
                    None => return Resolution::NotFound,
                }
            }

            return Resolution::Found(ResolvedTarget {
                owner_id: store.owner_id(),
                record: current,
                hops,
            });
        }
    }
}

//! Folds over update logs.
//!
//! [`Heap::accept`] folds a collection's log from the oldest node to the
//! newest with a [`LogVisitor`]. A visitor may memoize its result per node.
//! Every folded node is remembered, so a later fold only visits the nodes
//! appended after the newest memoized one, and a history shared by several
//! branches is folded once.
//!
//! Two visitors are provided:
//! - [`RegionBuilder`]: a conservative [`KeyRegion`] of the touched keys.
//! - [`ElementsCollector`]: the literal list of touched keys plus an
//!   `is_input` taint.

use log::trace;

use crate::collection::{Collection, CollectionIdentity, Heap};
use crate::reference::NodeId;
use crate::region::{KeyRegion, Region};
use crate::update::{Key, Update, UpdateNode};

pub trait LogVisitor {
    type Acc: Clone;

    /// Accumulator for the empty log.
    fn visit_initial(&self, identity: &CollectionIdentity) -> Self::Acc;

    /// Fold one node into the accumulator of its predecessors.
    fn visit_update(&self, prev: Self::Acc, identity: &CollectionIdentity, node: &UpdateNode) -> Self::Acc;

    /// Resolve a read in the middle of a fold.
    ///
    /// # Panics
    ///
    /// Folds over write history never read; reaching this is a contract
    /// violation of the caller.
    fn visit_select(&self, collection: Collection, key: &Key) -> Self::Acc {
        panic!(
            "visit_select called on a write-only log visitor (collection = {}, key = {})",
            collection, key
        );
    }

    /// Memoized accumulator of the log ending at `id`, if any.
    fn lookup(&self, _id: NodeId) -> Option<Self::Acc> {
        None
    }

    /// Memoize the accumulator of the log ending at `id`.
    fn remember(&self, _id: NodeId, _acc: &Self::Acc) {}
}

impl Heap {
    /// Fold the log of `collection` with `visitor`, oldest node first.
    pub fn accept<V: LogVisitor>(&self, collection: Collection, visitor: &V) -> V::Acc {
        let identity = collection.identity();

        // Walk back to the newest memoized node (or the start of the log).
        let mut pending = Vec::new();
        let mut current = collection.tail();
        let mut acc = loop {
            match current {
                None => break visitor.visit_initial(&identity),
                Some(id) => {
                    if let Some(acc) = visitor.lookup(id) {
                        break acc;
                    }
                    pending.push(id);
                    current = self.node(id).prev;
                }
            }
        };

        trace!("accept(c = {}): folding {} nodes", collection, pending.len());
        if pending.is_empty() {
            return acc;
        }

        for &id in pending.iter().rev() {
            let node = self.node(id);
            acc = visitor.visit_update(acc, &identity, &node);
            visitor.remember(id, &acc);
        }
        acc
    }
}

/// Builds the conservative region of a log.
pub struct RegionBuilder<'h> {
    heap: &'h Heap,
}

impl<'h> RegionBuilder<'h> {
    pub fn new(heap: &'h Heap) -> Self {
        Self { heap }
    }
}

impl LogVisitor for RegionBuilder<'_> {
    type Acc = KeyRegion;

    fn visit_initial(&self, identity: &CollectionIdentity) -> KeyRegion {
        identity.base_region()
    }

    fn visit_update(&self, prev: KeyRegion, identity: &CollectionIdentity, node: &UpdateNode) -> KeyRegion {
        let terms = self.heap.terms();
        if terms.is_false(node.update.guard()) {
            return prev;
        }
        match node.update {
            // A false value still counts: removal is not tracked precisely.
            Update::Pinpoint { key, .. } => prev.union(&identity.key_region(terms, &key)),
            Update::Ranged { adapter, .. } => prev.union(&adapter.region(self.heap, identity)),
        }
    }

    fn lookup(&self, id: NodeId) -> Option<KeyRegion> {
        self.heap.region_cache().borrow_mut().get(&id)
    }

    fn remember(&self, id: NodeId, acc: &KeyRegion) {
        self.heap.region_cache().borrow_mut().insert(id, acc.clone());
    }
}

/// Keys literally touched by a log.
///
/// When `is_input` is false the list is a complete enumeration of every key
/// that may be a member; otherwise it is only a hint and anything not listed
/// must still be resolved symbolically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Elements {
    pub keys: Vec<Key>,
    pub is_input: bool,
}

impl Elements {
    pub fn is_complete(&self) -> bool {
        !self.is_input
    }
}

/// Collects the keys touched by a log.
pub struct ElementsCollector<'h> {
    heap: &'h Heap,
}

impl<'h> ElementsCollector<'h> {
    pub fn new(heap: &'h Heap) -> Self {
        Self { heap }
    }
}

impl LogVisitor for ElementsCollector<'_> {
    type Acc = Elements;

    fn visit_initial(&self, identity: &CollectionIdentity) -> Elements {
        Elements {
            keys: Vec::new(),
            is_input: identity.is_input(),
        }
    }

    fn visit_update(&self, mut prev: Elements, identity: &CollectionIdentity, node: &UpdateNode) -> Elements {
        if self.heap.terms().is_false(node.update.guard()) {
            return prev;
        }
        match node.update {
            Update::Pinpoint { key, .. } => prev.keys.push(key),
            Update::Ranged { adapter, .. } => adapter.collect_elements_into(self.heap, identity, &mut prev),
        }
        prev
    }

    fn lookup(&self, id: NodeId) -> Option<Elements> {
        self.heap.elements_cache().borrow_mut().get(&id)
    }

    fn remember(&self, id: NodeId, acc: &Elements) {
        self.heap.elements_cache().borrow_mut().insert(id, acc.clone());
    }
}

//! Memory regions of set collections.
//!
//! The interpreter keeps one [`SetRegion`] per region of the heap it models
//! and republishes it after every mutation. A region routes each owner
//! reference to a collection: a concrete address selects the allocated
//! collection of that address, anything else selects the region's single
//! input collection. A materialized region keeps every owner, concrete or
//! not, in one collection keyed by `(owner, element)`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::debug;

use crate::collection::{Collection, CollectionIdentity, Heap};
use crate::composer::Composer;
use crate::expr::Terms;
use crate::reference::Term;
use crate::types::{Address, Sort};

/// Name of a set region.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RegionId {
    element_sort: Sort,
}

impl RegionId {
    pub const fn new(element_sort: Sort) -> Self {
        Self { element_sort }
    }

    pub fn element_sort(&self) -> Sort {
        self.element_sort
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "set<{}>", self.element_sort)
    }
}

/// Access to the memory regions of an execution state.
pub trait MutableMemory {
    fn get_region(&self, id: RegionId) -> SetRegion;
    fn set_region(&mut self, id: RegionId, region: SetRegion);
}

/// The collections of one set region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetRegion {
    element_sort: Sort,
    allocated: BTreeMap<Address, Collection>,
    /// Sets of symbolic owners, or of every owner in a materialized region.
    input: Collection,
}

impl SetRegion {
    pub fn new(element_sort: Sort) -> Self {
        Self {
            element_sort,
            allocated: BTreeMap::new(),
            input: Collection::input(element_sort),
        }
    }

    /// An empty region holding the sets of all owners in one materialized
    /// collection.
    pub fn materialized(element_sort: Sort) -> Self {
        Self {
            element_sort,
            allocated: BTreeMap::new(),
            input: Collection::materialized(element_sort),
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.input.identity().is_materialized()
    }

    pub fn element_sort(&self) -> Sort {
        self.element_sort
    }

    pub fn input(&self) -> Collection {
        self.input
    }

    /// The collection of a concrete owner, empty on first touch.
    pub fn allocated(&self, owner: Address) -> Collection {
        self.allocated
            .get(&owner)
            .copied()
            .unwrap_or_else(|| Collection::allocated(owner, self.element_sort))
    }

    /// The collection holding the set of `owner`.
    pub fn collection_for(&self, terms: &Terms, owner: Term) -> Collection {
        if self.is_materialized() {
            return self.input;
        }
        match terms.as_address(owner) {
            Some(address) => self.allocated(address),
            None => self.input,
        }
    }

    fn publish(&mut self, collection: Collection) {
        match collection.identity() {
            CollectionIdentity::Allocated { owner, .. } => {
                self.allocated.insert(owner, collection);
            }
            CollectionIdentity::Input { .. } | CollectionIdentity::Materialized { .. } => self.input = collection,
        }
    }

    /// Set the membership of `element` in the set of `owner` to `value` when
    /// `guard` holds.
    pub fn write(&mut self, heap: &Heap, owner: Term, element: Term, value: Term, guard: Term) {
        let collection = self.collection_for(heap.terms(), owner);
        let key = collection.identity().key_for(owner, element);
        let collection = heap.write(collection, key, value, guard);
        self.publish(collection);
    }

    /// Merge the set of `src_owner` into the set of `dst_owner` when `guard`
    /// holds.
    pub fn union(&mut self, heap: &Heap, src_owner: Term, dst_owner: Term, guard: Term) {
        let src = self.collection_for(heap.terms(), src_owner);
        let dst = self.collection_for(heap.terms(), dst_owner);
        debug!("SetRegion::union: {} into {}", src, dst);
        let collection = heap.union(dst, src, src_owner, dst_owner, guard);
        self.publish(collection);
    }

    /// Copy the set of `src_owner` in `src`, a collection of any region, into
    /// the set of `dst_owner` when `guard` holds. See [`Heap::apply_union`].
    pub fn merge<C>(&mut self, heap: &Heap, src: Collection, src_owner: Term, dst_owner: Term, guard: Term, composer: &C)
    where
        C: Composer + ?Sized,
    {
        let dst = self.collection_for(heap.terms(), dst_owner);
        debug!("SetRegion::merge: {} into {}", src, dst);
        let collection = heap.apply_union(dst, src, src_owner, dst_owner, guard, composer);
        self.publish(collection);
    }

    /// Membership of `element` in the set of `owner`.
    pub fn read(&self, heap: &Heap, owner: Term, element: Term, composer: Option<&dyn Composer>) -> Term {
        let collection = self.collection_for(heap.terms(), owner);
        let key = collection.identity().key_for(owner, element);
        heap.read(collection, key, composer)
    }

    /// All collections of the region, allocated ones first.
    pub fn collections(&self) -> impl Iterator<Item = Collection> + '_ {
        self.allocated.values().copied().chain(std::iter::once(self.input))
    }
}

/// Memory holding set regions only. Missing regions read as empty.
#[derive(Debug, Clone, Default)]
pub struct SetMemory {
    regions: HashMap<RegionId, SetRegion>,
}

impl SetMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl MutableMemory for SetMemory {
    fn get_region(&self, id: RegionId) -> SetRegion {
        self.regions
            .get(&id)
            .cloned()
            .unwrap_or_else(|| SetRegion::new(id.element_sort()))
    }

    fn set_region(&mut self, id: RegionId, region: SetRegion) {
        assert_eq!(
            id.element_sort(),
            region.element_sort(),
            "Region {} cannot hold elements of sort {}",
            id,
            region.element_sort()
        );
        self.regions.insert(id, region);
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::composer::IdentityComposer;
    use crate::region::Region;

    const INTS: RegionId = RegionId::new(Sort::Int);

    #[test]
    fn test_routing() {
        let heap = Heap::default();
        let terms = heap.terms();
        let region = SetRegion::new(Sort::Int);

        let a = region.collection_for(terms, terms.mk_addr(Address::new(1)));
        assert_eq!(a.identity().owner(), Some(Address::new(1)));

        let r = terms.mk_var("r", Sort::Addr);
        assert!(region.collection_for(terms, r).identity().is_input());
    }

    #[test]
    fn test_write_publishes() {
        let heap = Heap::default();
        let terms = heap.terms();
        let owner = terms.mk_addr(Address::new(1));
        let mut region = SetRegion::new(Sort::Int);

        region.write(&heap, owner, terms.mk_int(5), terms.mk_true(), terms.mk_true());
        assert!(terms.is_true(region.read(&heap, owner, terms.mk_int(5), None)));
        assert!(terms.is_false(region.read(&heap, owner, terms.mk_int(6), None)));
        assert_eq!(region.collections().count(), 2);
    }

    #[test]
    fn test_symbolic_owner_reads_input() {
        let heap = Heap::default();
        let terms = heap.terms();
        let r = terms.mk_var("r", Sort::Addr);
        let mut region = SetRegion::new(Sort::Int);

        region.write(&heap, r, terms.mk_int(1), terms.mk_true(), terms.mk_true());
        assert!(terms.is_true(region.read(&heap, r, terms.mk_int(1), None)));
        let e = terms.mk_int(2);
        assert_eq!(region.read(&heap, r, e, None), terms.mk_contains(r, e));
    }

    #[test]
    fn test_region_union() {
        let heap = Heap::default();
        let terms = heap.terms();
        let a = terms.mk_addr(Address::new(1));
        let b = terms.mk_addr(Address::new(2));
        let mut region = SetRegion::new(Sort::Int);

        region.write(&heap, a, terms.mk_int(1), terms.mk_true(), terms.mk_true());
        region.union(&heap, a, b, terms.mk_true());
        assert!(terms.is_true(region.read(&heap, b, terms.mk_int(1), None)));
    }

    #[test]
    fn test_materialized_region_keys_every_owner() {
        let heap = Heap::default();
        let terms = heap.terms();
        let a = terms.mk_addr(Address::new(1));
        let r = terms.mk_var("r", Sort::Addr);
        let region = SetRegion::materialized(Sort::Int);

        assert!(region.is_materialized());
        assert_eq!(region.collection_for(terms, a), region.input());
        assert_eq!(region.collection_for(terms, r), region.input());
        // Nothing is in a fresh copy, not even for symbolic owners.
        assert!(terms.is_false(region.read(&heap, r, terms.mk_int(1), None)));
        assert!(heap.region(region.input()).is_bottom());
    }

    #[test]
    fn test_merge_copies_sets_by_owner() {
        let heap = Heap::default();
        let terms = heap.terms();
        let a = terms.mk_addr(Address::new(1));
        let b = terms.mk_addr(Address::new(2));
        let mut source = SetRegion::new(Sort::Int);
        source.write(&heap, a, terms.mk_int(1), terms.mk_true(), terms.mk_true());
        source.write(&heap, b, terms.mk_int(2), terms.mk_true(), terms.mk_true());

        let mut copy = SetRegion::materialized(Sort::Int);
        for owner in [a, b] {
            let src = source.collection_for(terms, owner);
            copy.merge(&heap, src, owner, owner, terms.mk_true(), &IdentityComposer);
        }

        for owner in [a, b] {
            for x in [1, 2, 3] {
                let e = terms.mk_int(x);
                assert_eq!(copy.read(&heap, owner, e, None), source.read(&heap, owner, e, None));
            }
        }
        assert_eq!(copy.collections().count(), 1);
    }

    #[test]
    fn test_set_memory_defaults() {
        let mut memory = SetMemory::new();
        assert!(memory.is_empty());
        assert_eq!(memory.get_region(INTS), SetRegion::new(Sort::Int));

        let mut region = memory.get_region(INTS);
        let heap = Heap::default();
        let terms = heap.terms();
        region.write(&heap, terms.mk_addr(Address::new(1)), terms.mk_int(1), terms.mk_true(), terms.mk_true());
        memory.set_region(INTS, region.clone());
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.get_region(INTS), region);
    }

    #[test]
    #[should_panic(expected = "cannot hold elements of sort")]
    fn test_set_memory_sort_mismatch() {
        let mut memory = SetMemory::new();
        memory.set_region(INTS, SetRegion::new(Sort::Bool));
    }
}

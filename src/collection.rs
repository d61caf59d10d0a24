//! Symbolic set collections and the [`Heap`] manager.
//!
//! A [`Collection`] is an immutable handle: an identity plus the tail of its
//! update log. Every mutator on the [`Heap`] returns a *new* handle and
//! leaves the old one valid, so forked execution branches share their common
//! history by simply copying the handle.
//!
//! ```
//! use symset_rs::collection::{Collection, Heap};
//! use symset_rs::types::{Address, Sort};
//! use symset_rs::update::Key;
//!
//! let heap = Heap::default();
//! let terms = heap.terms();
//!
//! let s = Collection::allocated(Address::new(1), Sort::Int);
//! let s = heap.write(s, Key::Element(terms.mk_int(5)), terms.mk_true(), terms.mk_true());
//!
//! assert!(terms.is_true(heap.read(s, Key::Element(terms.mk_int(5)), None)));
//! assert!(terms.is_false(heap.read(s, Key::Element(terms.mk_int(6)), None)));
//! ```

use std::cell::RefCell;
use std::cmp::min;
use std::fmt::{self, Debug};

use log::debug;

use crate::cache::Cache;
use crate::composer::{CollectionComposer, Composer, IdentityComposer};
use crate::expr::Terms;
use crate::reference::{NodeId, Term};
use crate::region::{KeyRegion, Region, ValueRegion};
use crate::table::Table;
use crate::types::{Address, Sort, Value};
use crate::update::{Key, SetUnionAdapter, Update, UpdateNode};
use crate::visitor::{Elements, ElementsCollector, RegionBuilder};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum CollectionIdentity {
    /// The set of one concrete owner, keyed by element only.
    Allocated { owner: Address, element_sort: Sort },
    /// The unconstrained prior heap, keyed by `(owner, element)`.
    Input { element_sort: Sort },
    /// Sets copied out of a memory region for a cross-set query, keyed by
    /// `(owner, element)`. Empty before its first update.
    Materialized { element_sort: Sort },
}

impl CollectionIdentity {
    pub fn element_sort(&self) -> Sort {
        match *self {
            CollectionIdentity::Allocated { element_sort, .. }
            | CollectionIdentity::Input { element_sort }
            | CollectionIdentity::Materialized { element_sort } => element_sort,
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, CollectionIdentity::Input { .. })
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self, CollectionIdentity::Materialized { .. })
    }

    /// Whether keys carry their owner, `(owner, element)`.
    pub fn is_owned(&self) -> bool {
        !matches!(self, CollectionIdentity::Allocated { .. })
    }

    pub fn owner(&self) -> Option<Address> {
        match *self {
            CollectionIdentity::Allocated { owner, .. } => Some(owner),
            CollectionIdentity::Input { .. } | CollectionIdentity::Materialized { .. } => None,
        }
    }

    /// Region of the empty log: everything for the unconstrained input heap,
    /// nothing otherwise.
    pub fn base_region(&self) -> KeyRegion {
        match self {
            CollectionIdentity::Input { .. } => KeyRegion::top(),
            CollectionIdentity::Allocated { .. } | CollectionIdentity::Materialized { .. } => KeyRegion::bottom(),
        }
    }

    /// Region of a single key.
    ///
    /// # Panics
    ///
    /// Panics if the key shape does not match the identity.
    pub fn key_region(&self, terms: &Terms, key: &Key) -> KeyRegion {
        self.check_key(key);
        match (*self, *key) {
            (CollectionIdentity::Allocated { owner, .. }, Key::Element(e)) => {
                KeyRegion::new(ValueRegion::singleton(Value::Addr(owner)), ValueRegion::of_term(terms, e))
            }
            (_, Key::Owned(r, e)) => KeyRegion::new(ValueRegion::of_term(terms, r), ValueRegion::of_term(terms, e)),
            _ => unreachable!("key shape is checked above"),
        }
    }

    /// Build a key of the right shape for this identity.
    pub fn key_for(&self, owner: Term, element: Term) -> Key {
        if self.is_owned() {
            Key::Owned(owner, element)
        } else {
            Key::Element(element)
        }
    }

    pub fn check_key(&self, key: &Key) {
        let ok = self.is_owned() == matches!(key, Key::Owned(_, _));
        assert!(ok, "Key shape does not match collection identity: {} vs {:?}", key, self);
    }
}

/// Handle of a symbolic set collection.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Collection {
    identity: CollectionIdentity,
    tail: Option<NodeId>,
}

impl Collection {
    pub fn new(identity: CollectionIdentity, tail: Option<NodeId>) -> Self {
        Self { identity, tail }
    }

    /// Empty set of a concrete owner.
    pub fn allocated(owner: Address, element_sort: Sort) -> Self {
        Self::new(CollectionIdentity::Allocated { owner, element_sort }, None)
    }

    /// Unconstrained input sets of every symbolic owner.
    pub fn input(element_sort: Sort) -> Self {
        Self::new(CollectionIdentity::Input { element_sort }, None)
    }

    /// Empty sets of every owner, filled by copying other collections in.
    pub fn materialized(element_sort: Sort) -> Self {
        Self::new(CollectionIdentity::Materialized { element_sort }, None)
    }

    pub fn identity(&self) -> CollectionIdentity {
        self.identity
    }

    pub fn tail(&self) -> Option<NodeId> {
        self.tail
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.tail.is_none()
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identity {
            CollectionIdentity::Allocated { owner, element_sort } => write!(f, "alloc[{}: {}]", owner, element_sort)?,
            CollectionIdentity::Input { element_sort } => write!(f, "input[{}]", element_sort)?,
            CollectionIdentity::Materialized { element_sort } => write!(f, "mat[{}]", element_sort)?,
        }
        match self.tail {
            Some(id) => write!(f, "@{}", id),
            None => write!(f, "@empty"),
        }
    }
}

/// The collection manager.
///
/// Owns the term arena, the append-only update-log arena and the memo caches
/// of the log folds. All methods take `&self`; interior mutability is
/// confined to the arenas and caches, which only ever grow.
///
/// The arenas and caches live in [`RefCell`]s, so a `Heap` is not `Sync`:
/// states stepped on separate worker threads cannot share one, nor the
/// collection logs it owns. Every worker thread needs its own `Heap`.
///
/// ```compile_fail
/// fn shared<T: Sync>() {}
/// shared::<symset_rs::collection::Heap>();
/// ```
pub struct Heap {
    terms: Terms,
    log: RefCell<Table<UpdateNode>>,
    region_cache: RefCell<Cache<NodeId, KeyRegion>>,
    elements_cache: RefCell<Cache<NodeId, Elements>>,
    read_cache: RefCell<Cache<(Collection, Key), Term>>,
}

impl Heap {
    pub fn new(storage_bits: usize) -> Self {
        assert!(storage_bits <= 31, "Storage bits should be in the range 0..=31");

        let cache_bits = min(storage_bits, 10);

        Self {
            terms: Terms::new(storage_bits),
            log: RefCell::new(Table::new(storage_bits)),
            region_cache: RefCell::new(Cache::new(cache_bits)),
            elements_cache: RefCell::new(Cache::new(cache_bits)),
            read_cache: RefCell::new(Cache::new(cache_bits)),
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new(16)
    }
}

impl Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("terms", &self.terms.size())
            .field("nodes", &self.num_nodes())
            .finish()
    }
}

impl Heap {
    pub fn terms(&self) -> &Terms {
        &self.terms
    }

    pub fn node(&self, id: NodeId) -> UpdateNode {
        *self.log.borrow().value(id.index())
    }

    /// Number of update nodes ever appended, across all collections.
    pub fn num_nodes(&self) -> usize {
        self.log.borrow().size()
    }

    pub fn region_cache(&self) -> &RefCell<Cache<NodeId, KeyRegion>> {
        &self.region_cache
    }

    pub fn elements_cache(&self) -> &RefCell<Cache<NodeId, Elements>> {
        &self.elements_cache
    }

    pub fn read_cache(&self) -> &RefCell<Cache<(Collection, Key), Term>> {
        &self.read_cache
    }

    fn append(&self, collection: Collection, update: Update) -> Collection {
        let node = UpdateNode {
            update,
            prev: collection.tail(),
        };
        let id = self.log.borrow_mut().add(node);
        Collection::new(collection.identity(), Some(NodeId::new(id as u32)))
    }

    /// Number of nodes in the log of `collection`.
    pub fn log_len(&self, collection: Collection) -> usize {
        let mut len = 0;
        let mut current = collection.tail();
        while let Some(id) = current {
            len += 1;
            current = self.node(id).prev;
        }
        len
    }
}

impl Heap {
    /// Conditionally set the membership of `key` to `value`.
    pub fn write(&self, collection: Collection, key: Key, value: Term, guard: Term) -> Collection {
        debug!(
            "write(c = {}, key = {}, value = {}, guard = {})",
            collection,
            key.to_sexpr(&self.terms),
            self.terms.to_sexpr(value),
            self.terms.to_sexpr(guard)
        );
        collection.identity().check_key(&key);
        self.append(collection, Update::Pinpoint { key, value, guard })
    }

    /// Conditionally merge the set of `src_owner` in `src` into the set of
    /// `dst_owner` in `dst`.
    ///
    /// Always appends a lazy [`Update::Ranged`] node: nothing of `src` is
    /// copied. See [`Heap::apply_union`] for the eager variant.
    ///
    /// # Panics
    ///
    /// Panics if an owner term is a concrete address that differs from the
    /// owner of the corresponding allocated collection.
    pub fn union(&self, dst: Collection, src: Collection, src_owner: Term, dst_owner: Term, guard: Term) -> Collection {
        debug!(
            "union(dst = {}, src = {}, src_owner = {}, dst_owner = {}, guard = {})",
            dst,
            src,
            self.terms.to_sexpr(src_owner),
            self.terms.to_sexpr(dst_owner),
            self.terms.to_sexpr(guard)
        );
        self.check_owner(src, src_owner);
        self.check_owner(dst, dst_owner);
        let adapter = SetUnionAdapter {
            source: src,
            source_owner: src_owner,
            target_owner: dst_owner,
        };
        self.append(dst, Update::Ranged { adapter, guard })
    }

    fn check_owner(&self, collection: Collection, owner: Term) {
        if let (Some(expected), Some(actual)) = (collection.identity().owner(), self.terms.as_address(owner)) {
            assert_eq!(
                expected, actual,
                "Owner {} does not match the owner of collection {}",
                actual, collection
            );
        }
    }

    /// Conservative region of the keys touched by the log of `collection`.
    pub fn region(&self, collection: Collection) -> KeyRegion {
        self.accept(collection, &RegionBuilder::new(self))
    }

    /// Keys literally touched by the log of `collection`.
    pub fn elements(&self, collection: Collection) -> Elements {
        self.accept(collection, &ElementsCollector::new(self))
    }

    /// Membership of `key` in `collection`.
    ///
    /// With `composer = None` the read is resolved as is and cached in the
    /// heap. With a composer every guard, key and value of the log is first
    /// composed, see [`CollectionComposer`].
    pub fn read(&self, collection: Collection, key: Key, composer: Option<&dyn Composer>) -> Term {
        debug!("read(c = {}, key = {})", collection, key.to_sexpr(&self.terms));
        collection.identity().check_key(&key);

        match composer {
            Some(composer) => {
                let session = CollectionComposer::new(self, composer);
                let key = session.compose_key(&key);
                session.compose(collection, key)
            }
            None => {
                if let Some(res) = self.read_cache.borrow_mut().get(&(collection, key)) {
                    debug!("cache: read(c = {}, key = {}) -> {}", collection, key, res);
                    return res;
                }
                let res = CollectionComposer::new(self, &IdentityComposer).compose(collection, key);
                self.read_cache.borrow_mut().insert((collection, key), res);
                res
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_write_is_persistent() {
        let heap = Heap::default();
        let terms = heap.terms();
        let s0 = Collection::allocated(Address::new(1), Sort::Int);
        let s1 = heap.write(s0, Key::Element(terms.mk_int(1)), terms.mk_true(), terms.mk_true());
        let s2 = heap.write(s1, Key::Element(terms.mk_int(2)), terms.mk_true(), terms.mk_true());

        assert!(s0.is_empty());
        assert_eq!(heap.log_len(s0), 0);
        assert_eq!(heap.log_len(s1), 1);
        assert_eq!(heap.log_len(s2), 2);
        assert_eq!(heap.node(s2.tail().unwrap()).prev, s1.tail());

        // The old handle still sees the old contents.
        assert!(terms.is_false(heap.read(s1, Key::Element(terms.mk_int(2)), None)));
        assert!(terms.is_true(heap.read(s2, Key::Element(terms.mk_int(2)), None)));
    }

    #[test]
    fn test_branches_share_history() {
        let heap = Heap::default();
        let terms = heap.terms();
        let base = Collection::allocated(Address::new(1), Sort::Int);
        let base = heap.write(base, Key::Element(terms.mk_int(1)), terms.mk_true(), terms.mk_true());

        let left = heap.write(base, Key::Element(terms.mk_int(2)), terms.mk_true(), terms.mk_true());
        let right = heap.write(base, Key::Element(terms.mk_int(3)), terms.mk_true(), terms.mk_true());

        assert_eq!(heap.num_nodes(), 3);
        assert_eq!(heap.node(left.tail().unwrap()).prev, base.tail());
        assert_eq!(heap.node(right.tail().unwrap()).prev, base.tail());
        assert!(terms.is_false(heap.read(left, Key::Element(terms.mk_int(3)), None)));
        assert!(terms.is_true(heap.read(right, Key::Element(terms.mk_int(3)), None)));
    }

    #[test]
    fn test_base_regions() {
        let allocated = CollectionIdentity::Allocated {
            owner: Address::new(1),
            element_sort: Sort::Int,
        };
        let input = CollectionIdentity::Input { element_sort: Sort::Int };
        assert!(allocated.base_region().is_bottom());
        assert!(input.base_region().is_top());
    }

    #[test]
    fn test_input_base_read() {
        let heap = Heap::default();
        let terms = heap.terms();
        let r = terms.mk_var("r", Sort::Addr);
        let e = terms.mk_int(4);
        let s = Collection::input(Sort::Int);
        assert_eq!(heap.read(s, Key::Owned(r, e), None), terms.mk_contains(r, e));
    }

    #[test]
    fn test_materialized_base_is_empty() {
        let heap = Heap::default();
        let terms = heap.terms();
        let r = terms.mk_var("r", Sort::Addr);
        let s = Collection::materialized(Sort::Int);

        assert!(s.identity().base_region().is_bottom());
        assert!(terms.is_false(heap.read(s, Key::Owned(r, terms.mk_int(4)), None)));
        assert_eq!(s.to_string(), "mat[Int]@empty");

        let s = heap.write(s, Key::Owned(r, terms.mk_int(4)), terms.mk_true(), terms.mk_true());
        assert!(terms.is_true(heap.read(s, Key::Owned(r, terms.mk_int(4)), None)));
        assert!(terms.is_false(heap.read(s, Key::Owned(r, terms.mk_int(5)), None)));
    }

    #[test]
    fn test_read_cached() {
        let heap = Heap::default();
        let terms = heap.terms();
        let s = Collection::allocated(Address::new(1), Sort::Int);
        let s = heap.write(s, Key::Element(terms.mk_int(1)), terms.mk_true(), terms.mk_true());
        let key = Key::Element(terms.mk_int(1));
        let a = heap.read(s, key, None);
        let b = heap.read(s, key, None);
        assert_eq!(a, b);
        assert_eq!(heap.read_cache().borrow().hits(), 1);
    }

    #[test]
    fn test_collection_display() {
        let s = Collection::allocated(Address::new(3), Sort::Int);
        assert_eq!(s.to_string(), "alloc[#3: Int]@empty");
        assert_eq!(Collection::input(Sort::Bool).to_string(), "input[Bool]@empty");
    }

    #[test]
    #[should_panic(expected = "Key shape does not match collection identity")]
    fn test_write_wrong_key_shape() {
        let heap = Heap::default();
        let terms = heap.terms();
        let s = Collection::allocated(Address::new(1), Sort::Int);
        let r = terms.mk_addr(Address::new(1));
        heap.write(s, Key::Owned(r, terms.mk_int(1)), terms.mk_true(), terms.mk_true());
    }

    #[test]
    #[should_panic(expected = "Key shape does not match collection identity")]
    fn test_read_wrong_key_shape() {
        let heap = Heap::default();
        let terms = heap.terms();
        heap.read(Collection::input(Sort::Int), Key::Element(terms.mk_int(1)), None);
    }

    #[test]
    #[should_panic(expected = "does not match the owner")]
    fn test_union_owner_mismatch() {
        let heap = Heap::default();
        let terms = heap.terms();
        let dst = Collection::allocated(Address::new(1), Sort::Int);
        let src = Collection::allocated(Address::new(2), Sort::Int);
        heap.union(
            dst,
            src,
            terms.mk_addr(Address::new(2)),
            terms.mk_addr(Address::new(7)),
            terms.mk_true(),
        );
    }
}

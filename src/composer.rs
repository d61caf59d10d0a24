//! Resolving reads against a composer.
//!
//! A [`Composer`] rewrites terms, typically by substituting a candidate
//! model into them. A [`CollectionComposer`] lifts a composer to whole
//! collections: `compose(collection, key)` walks the update log newest to
//! oldest, composes every guard, key and value on the way, and folds the
//! surviving nodes into one membership term.
//!
//! Cross-collection queries are tiered, cheapest first:
//!
//! 1. the first set is concrete and fully enumerable: enumerate candidates
//!    and test each of them for membership directly;
//! 2. same with the second set;
//! 3. copy both sets into a temporary materialized region, keyed by their
//!    owners, and emit one `intersection-size` term over it.

use std::cell::RefCell;
use std::collections::HashMap;

use log::{debug, trace};

use crate::collection::{Collection, CollectionIdentity, Heap};
use crate::expr::Terms;
use crate::memory::{MutableMemory, RegionId, SetRegion};
use crate::reference::Term;
use crate::region::Region;
use crate::update::{Key, Update};

/// Term rewriting primitive provided by the execution engine.
pub trait Composer {
    fn compose(&self, terms: &Terms, t: Term) -> Term;
}

/// Leaves every term as is.
#[derive(Debug, Copy, Clone, Default)]
pub struct IdentityComposer;

impl Composer for IdentityComposer {
    fn compose(&self, _terms: &Terms, t: Term) -> Term {
        t
    }
}

/// Replaces terms by other terms, bottom-up.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    map: HashMap<Term, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, from: Term, to: Term) -> Self {
        self.insert(from, to);
        self
    }

    pub fn insert(&mut self, from: Term, to: Term) {
        self.map.insert(from, to);
    }

    pub fn get(&self, t: Term) -> Option<Term> {
        self.map.get(&t).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Composer for Substitution {
    fn compose(&self, terms: &Terms, t: Term) -> Term {
        if self.map.is_empty() {
            return t;
        }
        terms.substitute(t, &mut |_, s| self.get(s))
    }
}

enum Frame {
    /// `ite(cond, value, rest)`
    Write(Term, Term),
    /// `included ∨ rest`
    Merge(Term),
}

/// One composition session: a composer applied to collections.
///
/// Results are memoized per `(collection, key)` for the lifetime of the
/// session. Keys passed to [`CollectionComposer::compose`] must already be
/// composed.
pub struct CollectionComposer<'h, C: ?Sized> {
    heap: &'h Heap,
    composer: &'h C,
    cache: RefCell<HashMap<(Collection, Key), Term>>,
}

impl<'h, C> CollectionComposer<'h, C>
where
    C: Composer + ?Sized,
{
    pub fn new(heap: &'h Heap, composer: &'h C) -> Self {
        Self {
            heap,
            composer,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn heap(&self) -> &'h Heap {
        self.heap
    }

    pub fn compose_term(&self, t: Term) -> Term {
        self.composer.compose(self.heap.terms(), t)
    }

    pub fn compose_key(&self, key: &Key) -> Key {
        key.map(|t| self.compose_term(t))
    }

    /// Symbolic equality of two keys of the same shape.
    pub fn keys_equal(&self, a: &Key, b: &Key) -> Term {
        let terms = self.heap.terms();
        match (*a, *b) {
            (Key::Element(x), Key::Element(y)) => terms.mk_eq(x, y),
            (Key::Owned(r1, e1), Key::Owned(r2, e2)) => terms.mk_and(terms.mk_eq(r1, r2), terms.mk_eq(e1, e2)),
            _ => unreachable!("keys of one collection have one shape"),
        }
    }

    /// Membership of the (composed) `key` in `collection`.
    pub fn compose(&self, collection: Collection, key: Key) -> Term {
        if let Some(&res) = self.cache.borrow().get(&(collection, key)) {
            return res;
        }
        let res = self.resolve(collection, key);
        trace!("compose(c = {}, key = {}) = {}", collection, key, res);
        self.cache.borrow_mut().insert((collection, key), res);
        res
    }

    fn resolve(&self, collection: Collection, key: Key) -> Term {
        let terms = self.heap.terms();
        let identity = collection.identity();
        let key_region = identity.key_region(terms, &key);

        let mut frames = Vec::new();
        let mut result = None;
        let mut current = collection.tail();

        while let Some(id) = current {
            let node = self.heap.node(id);
            current = node.prev;

            let guard = self.compose_term(node.update.guard());
            if terms.is_false(guard) {
                continue;
            }

            match node.update {
                Update::Pinpoint { key: written, value, .. } => {
                    let written = self.compose_key(&written);
                    let eq = self.keys_equal(&written, &key);
                    if terms.is_false(eq) {
                        continue;
                    }
                    let cond = terms.mk_and(guard, eq);
                    let value = self.compose_term(value);
                    if terms.is_true(cond) {
                        result = Some(value);
                        break;
                    }
                    frames.push(Frame::Write(cond, value));
                }
                Update::Ranged { adapter, .. } => {
                    if !adapter.region(self.heap, &identity).intersects(&key_region) {
                        trace!("compose: {} is out of the region of {}", key, id);
                        continue;
                    }
                    let included = terms.mk_and(guard, adapter.includes_symbolically(self, &key));
                    if terms.is_false(included) {
                        continue;
                    }
                    if terms.is_true(included) {
                        result = Some(included);
                        break;
                    }
                    frames.push(Frame::Merge(included));
                }
            }
        }

        let mut acc = result.unwrap_or_else(|| self.initial(&identity, &key));
        for frame in frames.into_iter().rev() {
            acc = match frame {
                Frame::Write(cond, value) => terms.mk_ite(cond, value, acc),
                Frame::Merge(included) => terms.mk_or(included, acc),
            };
        }
        acc
    }

    /// Membership before any update.
    fn initial(&self, identity: &CollectionIdentity, key: &Key) -> Term {
        let terms = self.heap.terms();
        match (identity, *key) {
            (CollectionIdentity::Allocated { .. } | CollectionIdentity::Materialized { .. }, _) => terms.mk_false(),
            (CollectionIdentity::Input { .. }, Key::Owned(r, e)) => self.compose_term(terms.mk_contains(r, e)),
            (CollectionIdentity::Input { .. }, Key::Element(_)) => {
                unreachable!("input collections are keyed by (owner, element)")
            }
        }
    }

    /// Count the elements shared by the set of `a_owner` in `a` and the set
    /// of `b_owner` in `b`, provided `a` is concrete and fully enumerable.
    ///
    /// Owners must be composed.
    fn enumerate_intersection(&self, a: Collection, a_owner: Term, b: Collection, b_owner: Term) -> Option<Term> {
        if a.identity().is_input() {
            return None;
        }
        let a_elements = self.heap.elements(a);
        if !a_elements.is_complete() {
            return None;
        }
        let b_elements = self.heap.elements(b);

        let mut candidates: Vec<Term> = Vec::new();
        for key in a_elements.keys.iter().chain(b_elements.keys.iter()) {
            let e = self.compose_term(key.element());
            if !candidates.contains(&e) {
                candidates.push(e);
            }
        }
        debug!("enumerate_intersection: {} candidates from {}", candidates.len(), a);

        let terms = self.heap.terms();
        let one = terms.mk_int(1);
        let zero = terms.mk_int(0);
        let mut summands = Vec::new();
        for (i, &e) in candidates.iter().enumerate() {
            let in_a = self.compose(a, a.identity().key_for(a_owner, e));
            if terms.is_false(in_a) {
                continue;
            }
            let in_b = self.compose(b, b.identity().key_for(b_owner, e));
            // Count aliasing candidates once.
            let fresh = terms.mk_and_all(candidates[..i].iter().map(|&p| terms.mk_not(terms.mk_eq(p, e))));
            let cond = terms.mk_and_all([in_a, in_b, fresh]);
            summands.push(terms.mk_ite(cond, one, zero));
        }
        Some(terms.mk_sum(summands))
    }
}

impl Heap {
    /// Merge the set of `src_owner` in `src` into the set of `dst_owner` in
    /// `dst`, eagerly when possible.
    ///
    /// A concrete, fully enumerable source is expanded into pinpoint writes
    /// of `true` under `guard ∧ src(e)`; any other source falls back to a
    /// lazy ranged update, exactly as [`Heap::union`].
    pub fn apply_union<C>(
        &self,
        dst: Collection,
        src: Collection,
        src_owner: Term,
        dst_owner: Term,
        guard: Term,
        composer: &C,
    ) -> Collection
    where
        C: Composer + ?Sized,
    {
        let session = CollectionComposer::new(self, composer);
        let src_owner = session.compose_term(src_owner);
        let dst_owner = session.compose_term(dst_owner);
        let guard = session.compose_term(guard);

        let elements = self.elements(src);
        if !elements.is_complete() {
            debug!("apply_union: {} is not enumerable, merging lazily", src);
            return self.union(dst, src, src_owner, dst_owner, guard);
        }
        debug!("apply_union: expanding {} keys of {} into {}", elements.keys.len(), src, dst);

        let terms = self.terms();
        let mut seen = Vec::new();
        let mut result = dst;
        for key in &elements.keys {
            let e = session.compose_term(key.element());
            if seen.contains(&e) {
                continue;
            }
            seen.push(e);
            let member = session.compose(src, src.identity().key_for(src_owner, e));
            let g = terms.mk_and(guard, member);
            if terms.is_false(g) {
                continue;
            }
            result = self.write(result, dst.identity().key_for(dst_owner, e), terms.mk_true(), g);
        }
        result
    }

    /// Number of elements shared by the sets of `first` and `second` in the
    /// set region `region` of `memory`.
    pub fn intersection_size<M, C>(&self, memory: &M, region: RegionId, first: Term, second: Term, composer: &C) -> Term
    where
        M: MutableMemory + ?Sized,
        C: Composer + ?Sized,
    {
        debug!(
            "intersection_size(region = {}, first = {}, second = {})",
            region,
            self.terms().to_sexpr(first),
            self.terms().to_sexpr(second)
        );
        let set_region = memory.get_region(region);
        let a = set_region.collection_for(self.terms(), first);
        let b = set_region.collection_for(self.terms(), second);

        let session = CollectionComposer::new(self, composer);
        let a_owner = session.compose_term(first);
        let b_owner = session.compose_term(second);

        if let Some(size) = session.enumerate_intersection(a, a_owner, b, b_owner) {
            debug!("intersection_size: enumerated first set");
            return size;
        }
        if let Some(size) = session.enumerate_intersection(b, b_owner, a, a_owner) {
            debug!("intersection_size: enumerated second set");
            return size;
        }

        debug!("intersection_size: materializing both sets");
        let materialized = self.materialize(&set_region, &[first, second], composer);
        self.terms().mk_intersection_size(materialized.input(), a_owner, b_owner)
    }

    /// Copy the sets of `owners` in `region` into a fresh materialized
    /// region. The copy of each owner reads as the original set.
    ///
    /// A concrete owner that may alias a symbolic one also picks up the
    /// input set of that address under the aliasing condition: the source
    /// region keeps the two in different collections.
    pub fn materialize<C>(&self, region: &SetRegion, owners: &[Term], composer: &C) -> SetRegion
    where
        C: Composer + ?Sized,
    {
        let mut materialized = SetRegion::materialized(region.element_sort());
        for &owner in owners {
            let src = region.collection_for(self.terms(), owner);
            materialized.merge(self, src, owner, owner, self.terms().mk_true(), composer);
        }
        materialized
    }
}

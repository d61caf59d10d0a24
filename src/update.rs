//! Update nodes of the append-only log.
//!
//! A collection's history is a singly linked chain of [`UpdateNode`]s, each
//! pointing at the previous tail. Nodes are stored in the heap arena and
//! never mutated, so any number of collections (execution branches) can
//! share a common prefix of history.

use std::fmt;

use crate::collection::{Collection, CollectionIdentity, Heap};
use crate::composer::{CollectionComposer, Composer};
use crate::expr::Terms;
use crate::reference::{NodeId, Term};
use crate::region::{KeyRegion, Region, ValueRegion};
use crate::types::Value;
use crate::visitor::Elements;

/// Key of a set collection.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    /// Key of an Allocated collection: the owner is fixed by the collection.
    Element(Term),
    /// Key of an Input collection: `(owner, element)`.
    Owned(Term, Term),
}

impl Key {
    pub fn element(&self) -> Term {
        match *self {
            Key::Element(e) | Key::Owned(_, e) => e,
        }
    }

    pub fn owner(&self) -> Option<Term> {
        match *self {
            Key::Element(_) => None,
            Key::Owned(r, _) => Some(r),
        }
    }

    /// Apply `f` to every component of the key.
    pub fn map(&self, mut f: impl FnMut(Term) -> Term) -> Key {
        match *self {
            Key::Element(e) => Key::Element(f(e)),
            Key::Owned(r, e) => {
                let r = f(r);
                Key::Owned(r, f(e))
            }
        }
    }

    /// Render the key with its components as s-expressions.
    pub fn to_sexpr(&self, terms: &Terms) -> String {
        match *self {
            Key::Element(e) => terms.to_sexpr(e),
            Key::Owned(r, e) => format!("({}, {})", terms.to_sexpr(r), terms.to_sexpr(e)),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Element(e) => write!(f, "{}", e),
            Key::Owned(r, e) => write!(f, "({}, {})", r, e),
        }
    }
}

/// "Every key of `source`", viewed from the target collection.
///
/// The adapter never copies the source's membership: its region, its
/// elements and its reads are all delegated to the source collection, so a
/// merged history is computed once no matter how often it is merged.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SetUnionAdapter {
    pub source: Collection,
    /// Owner of the merged set inside `source`.
    pub source_owner: Term,
    /// Owner of the receiving set inside the target collection.
    pub target_owner: Term,
}

impl SetUnionAdapter {
    /// Region of the merged keys, in the target's key space.
    pub fn region(&self, heap: &Heap, target: &CollectionIdentity) -> KeyRegion {
        let source = heap.region(self.source);
        if source.is_bottom() {
            return KeyRegion::bottom();
        }
        let owner = match *target {
            CollectionIdentity::Allocated { owner, .. } => ValueRegion::singleton(Value::Addr(owner)),
            CollectionIdentity::Input { .. } | CollectionIdentity::Materialized { .. } => {
                ValueRegion::of_term(heap.terms(), self.target_owner)
            }
        };
        KeyRegion::new(owner, source.second().clone())
    }

    /// Append the source's touched keys, converted to the target's key shape.
    pub fn collect_elements_into(&self, heap: &Heap, target: &CollectionIdentity, acc: &mut Elements) {
        let source = heap.elements(self.source);
        acc.keys
            .extend(source.keys.iter().map(|k| target.key_for(self.target_owner, k.element())));
        acc.is_input |= source.is_input;
    }

    /// Membership of a (composed) target key in the merged set.
    pub fn includes_symbolically<C>(&self, session: &CollectionComposer<'_, C>, key: &Key) -> Term
    where
        C: Composer + ?Sized,
    {
        let terms = session.heap().terms();
        let cond = match *key {
            Key::Element(_) => terms.mk_true(),
            Key::Owned(r, _) => terms.mk_eq(r, session.compose_term(self.target_owner)),
        };
        if terms.is_false(cond) {
            return cond;
        }
        // Under `cond` the key's owner is the target owner, so a merge that
        // keeps the owner reads the source at the key's own owner.
        let source_owner = match *key {
            Key::Owned(r, _) if self.source_owner == self.target_owner => r,
            _ => session.compose_term(self.source_owner),
        };
        let source_key = self.source.identity().key_for(source_owner, key.element());
        let included = session.compose(self.source, source_key);
        terms.mk_and(cond, included)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Update {
    /// Conditional single-key write.
    Pinpoint { key: Key, value: Term, guard: Term },
    /// Conditional merge of another collection's membership.
    Ranged { adapter: SetUnionAdapter, guard: Term },
}

impl Update {
    pub fn guard(&self) -> Term {
        match *self {
            Update::Pinpoint { guard, .. } | Update::Ranged { guard, .. } => guard,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UpdateNode {
    pub update: Update,
    /// The previous tail of the log, older than this node.
    pub prev: Option<NodeId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sort;

    #[test]
    fn test_key_accessors() {
        let terms = Terms::default();
        let r = terms.mk_var("r", Sort::Addr);
        let e = terms.mk_int(3);

        let k = Key::Owned(r, e);
        assert_eq!(k.owner(), Some(r));
        assert_eq!(k.element(), e);
        assert_eq!(Key::Element(e).owner(), None);
        assert_eq!(k.to_sexpr(&terms), "(r, 3)");
    }

    #[test]
    fn test_key_map() {
        let terms = Terms::default();
        let x = terms.mk_var("x", Sort::Int);
        let k = Key::Element(x).map(|_| terms.mk_int(1));
        assert_eq!(k, Key::Element(terms.mk_int(1)));
    }

    #[test]
    fn test_update_guard() {
        let terms = Terms::default();
        let g = terms.mk_var("g", Sort::Bool);
        let u = Update::Pinpoint {
            key: Key::Element(terms.mk_int(1)),
            value: terms.mk_true(),
            guard: g,
        };
        assert_eq!(u.guard(), g);
    }
}

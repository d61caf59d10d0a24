//! Conservative key-space approximations.
//!
//! A [`Region`] over-approximates the set of keys an update log may have
//! touched. Regions only ever grow (there is no subtraction), which keeps
//! every operation sound without a solver: if a key's region does not
//! intersect the region of a merged collection, that collection cannot
//! influence the key.
//!
//! - [`ValueRegion`]: a finite set of ground values, or `Top`.
//! - [`ProductRegion`]: a generic pairing of two regions, used for composite
//!   `(owner, element)` keys. It does not know anything about sets and can
//!   be reused for any keyed collection (maps, arrays).
//!
//! # Laws
//!
//! - `a ∪ ⊥ = a`, `a ∪ ⊤ = ⊤`
//! - `a ⊆ a ∪ b` and `b ⊆ a ∪ b`
//! - `⊥` intersects nothing; `⊤` intersects everything but `⊥`

use std::collections::BTreeSet;
use std::fmt::{self, Debug};

use crate::expr::Terms;
use crate::reference::Term;
use crate::types::Value;

pub trait Region: Clone + Debug + PartialEq {
    /// Create the top element (⊤): every key.
    fn top() -> Self;

    /// Create the bottom element (⊥): no key.
    fn bottom() -> Self;

    /// Join (`∪`): the smallest region containing both inputs.
    fn union(&self, other: &Self) -> Self;

    fn is_top(&self) -> bool;

    fn is_bottom(&self) -> bool;

    /// Check if some key may belong to both regions.
    fn intersects(&self, other: &Self) -> bool;

    /// Partial order: `other ⊆ self`.
    fn includes(&self, other: &Self) -> bool;

    /// Join multiple regions.
    fn union_many<I>(regions: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        regions.into_iter().fold(Self::bottom(), |acc, r| acc.union(&r))
    }
}

/// A finite set of ground values, or every value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueRegion {
    Values(BTreeSet<Value>),
    Top,
}

impl ValueRegion {
    pub fn singleton(value: Value) -> Self {
        ValueRegion::Values(BTreeSet::from([value]))
    }

    /// The region of a term: a singleton for constants, `Top` otherwise.
    pub fn of_term(terms: &Terms, t: Term) -> Self {
        match terms.value(t) {
            Some(v) => Self::singleton(v),
            None => ValueRegion::Top,
        }
    }

    /// The values of a finite region.
    pub fn values(&self) -> Option<&BTreeSet<Value>> {
        match self {
            ValueRegion::Values(values) => Some(values),
            ValueRegion::Top => None,
        }
    }
}

impl Region for ValueRegion {
    fn top() -> Self {
        ValueRegion::Top
    }

    fn bottom() -> Self {
        ValueRegion::Values(BTreeSet::new())
    }

    fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (ValueRegion::Values(a), ValueRegion::Values(b)) => ValueRegion::Values(a.union(b).cloned().collect()),
            _ => ValueRegion::Top,
        }
    }

    fn is_top(&self) -> bool {
        matches!(self, ValueRegion::Top)
    }

    fn is_bottom(&self) -> bool {
        matches!(self, ValueRegion::Values(values) if values.is_empty())
    }

    fn intersects(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueRegion::Values(a), ValueRegion::Values(b)) => !a.is_disjoint(b),
            (ValueRegion::Top, r) | (r, ValueRegion::Top) => !r.is_bottom(),
        }
    }

    fn includes(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueRegion::Top, _) => true,
            (ValueRegion::Values(a), ValueRegion::Values(b)) => a.is_superset(b),
            (ValueRegion::Values(_), ValueRegion::Top) => false,
        }
    }
}

impl fmt::Display for ValueRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRegion::Top => write!(f, "⊤"),
            ValueRegion::Values(values) => {
                write!(f, "{{")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Product of two regions, over-approximating a set of pairs by the pair of
/// its projections.
///
/// A product with a bottom component denotes no pair at all and is
/// normalized to `(⊥, ⊥)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRegion<A, B> {
    first: A,
    second: B,
}

impl<A: Region, B: Region> ProductRegion<A, B> {
    pub fn new(first: A, second: B) -> Self {
        if first.is_bottom() || second.is_bottom() {
            Self::bottom()
        } else {
            Self { first, second }
        }
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }
}

impl<A: Region, B: Region> Region for ProductRegion<A, B> {
    fn top() -> Self {
        Self {
            first: A::top(),
            second: B::top(),
        }
    }

    fn bottom() -> Self {
        Self {
            first: A::bottom(),
            second: B::bottom(),
        }
    }

    fn union(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Self {
            first: self.first.union(&other.first),
            second: self.second.union(&other.second),
        }
    }

    fn is_top(&self) -> bool {
        self.first.is_top() && self.second.is_top()
    }

    fn is_bottom(&self) -> bool {
        self.first.is_bottom() || self.second.is_bottom()
    }

    fn intersects(&self, other: &Self) -> bool {
        self.first.intersects(&other.first) && self.second.intersects(&other.second)
    }

    fn includes(&self, other: &Self) -> bool {
        other.is_bottom() || (self.first.includes(&other.first) && self.second.includes(&other.second))
    }
}

impl<A: fmt::Display, B: fmt::Display> fmt::Display for ProductRegion<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} × {}", self.first, self.second)
    }
}

/// Region of set keys: owner references × elements.
pub type KeyRegion = ProductRegion<ValueRegion, ValueRegion>;

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::types::Address;

    /// Check the join-semilattice laws on a sample of regions.
    pub fn check_region_laws<R: Region>(samples: &[R]) {
        for a in samples {
            assert!(a.includes(a), "Reflexivity failed");
            assert_eq!(a.union(&R::bottom()), *a, "Join with bottom failed");
            assert!(a.union(&R::top()).is_top(), "Join with top failed");
            assert!(!a.intersects(&R::bottom()), "Bottom intersects");
            for b in samples {
                let ab = a.union(b);
                assert_eq!(ab, b.union(a), "Join commutativity failed");
                assert!(ab.includes(a), "Join is not upper bound for a");
                assert!(ab.includes(b), "Join is not upper bound for b");
                assert_eq!(a.intersects(b), b.intersects(a), "Intersects is not symmetric");
            }
        }
    }

    fn values(xs: &[i64]) -> ValueRegion {
        ValueRegion::Values(xs.iter().map(|&x| Value::from(x)).collect())
    }

    #[test]
    fn test_value_region_laws() {
        check_region_laws(&[
            ValueRegion::bottom(),
            ValueRegion::top(),
            values(&[1]),
            values(&[1, 2]),
            values(&[3]),
        ]);
    }

    #[test]
    fn test_product_region_laws() {
        let owner = ValueRegion::singleton(Value::from(Address::new(1)));
        check_region_laws(&[
            KeyRegion::bottom(),
            KeyRegion::top(),
            KeyRegion::new(owner.clone(), values(&[1])),
            KeyRegion::new(owner, values(&[2, 3])),
            KeyRegion::new(ValueRegion::Top, values(&[5])),
        ]);
    }

    #[test]
    fn test_value_region_intersects() {
        assert!(values(&[1, 2]).intersects(&values(&[2, 3])));
        assert!(!values(&[1]).intersects(&values(&[2])));
        assert!(ValueRegion::Top.intersects(&values(&[2])));
        assert!(!ValueRegion::Top.intersects(&ValueRegion::bottom()));
    }

    #[test]
    fn test_product_normalization() {
        let r = KeyRegion::new(ValueRegion::Top, ValueRegion::bottom());
        assert!(r.is_bottom());
        assert_eq!(r, KeyRegion::bottom());
    }

    #[test]
    fn test_of_term() {
        let terms = Terms::default();
        let x = terms.mk_var("x", crate::types::Sort::Int);
        assert_eq!(ValueRegion::of_term(&terms, terms.mk_int(4)), values(&[4]));
        assert!(ValueRegion::of_term(&terms, x).is_top());
    }

    #[test]
    fn test_display() {
        assert_eq!(values(&[1, 2]).to_string(), "{1, 2}");
        assert_eq!(KeyRegion::new(ValueRegion::Top, values(&[3])).to_string(), "⊤ × {3}");
    }
}

//! Solved models.
//!
//! A [`ModelEvaluator`] is what the solver layer hands back after a
//! satisfiable query. [`Model`] is a small in-memory implementation: a
//! variable assignment, an optional interpretation of the membership
//! predicate and an address renaming table.

use std::collections::{BTreeMap, HashMap};

use crate::composer::Composer;
use crate::expr::{TermNode, Terms, CONTAINS};
use crate::reference::Term;
use crate::types::{Address, Value};

pub trait ModelEvaluator {
    /// Evaluate `t` under the model.
    ///
    /// With `is_complete = false` unknown pieces stay symbolic; with
    /// `is_complete = true` they take default values.
    fn eval(&self, terms: &Terms, t: Term, is_complete: bool) -> Term;

    /// Interpretation of a function symbol, if the model has one.
    fn interpretation(&self, symbol: &str) -> Option<&Interpretation>;

    /// Address chosen by the solver for an analysis-time address.
    fn remap_address(&self, address: Address) -> Address {
        address
    }
}

/// Finite interpretation of the membership predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpretation {
    entries: BTreeMap<(Address, Value), bool>,
    default: bool,
}

impl Interpretation {
    pub fn new(default: bool) -> Self {
        Self {
            entries: BTreeMap::new(),
            default,
        }
    }

    pub fn with(mut self, owner: Address, element: impl Into<Value>, member: bool) -> Self {
        self.insert(owner, element.into(), member);
        self
    }

    pub fn insert(&mut self, owner: Address, element: Value, member: bool) {
        self.entries.insert((owner, element), member);
    }

    pub fn get(&self, owner: Address, element: &Value) -> bool {
        self.entries
            .get(&(owner, element.clone()))
            .copied()
            .unwrap_or(self.default)
    }

    pub fn entries(&self) -> &BTreeMap<(Address, Value), bool> {
        &self.entries
    }

    pub fn default_value(&self) -> bool {
        self.default
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    assignment: HashMap<String, Value>,
    contains: Option<Interpretation>,
    renaming: HashMap<Address, Address>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignment.insert(name.into(), value.into());
        self
    }

    pub fn with_contains(mut self, interpretation: Interpretation) -> Self {
        self.contains = Some(interpretation);
        self
    }

    pub fn rename(mut self, from: Address, to: Address) -> Self {
        self.renaming.insert(from, to);
        self
    }

    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.assignment.get(name)
    }
}

impl ModelEvaluator for Model {
    fn eval(&self, terms: &Terms, t: Term, is_complete: bool) -> Term {
        terms.substitute(t, &mut |terms, s| match terms.node(s) {
            TermNode::Var(name, sort) => match self.assignment.get(&name) {
                Some(value) => Some(terms.mk_value(value.clone())),
                None if is_complete => Some(terms.mk_value(Value::default_of(sort))),
                None => None,
            },
            TermNode::Contains(r, e) => {
                let member = match (terms.as_address(r), terms.value(e), &self.contains) {
                    (Some(owner), Some(element), Some(interpretation)) => interpretation.get(owner, &element),
                    _ if is_complete => false,
                    _ => return None,
                };
                Some(terms.mk_bool(member))
            }
            _ => None,
        })
    }

    fn interpretation(&self, symbol: &str) -> Option<&Interpretation> {
        if symbol == CONTAINS {
            self.contains.as_ref()
        } else {
            None
        }
    }

    fn remap_address(&self, address: Address) -> Address {
        self.renaming.get(&address).copied().unwrap_or(address)
    }
}

/// Partial evaluation under the model.
impl Composer for Model {
    fn compose(&self, terms: &Terms, t: Term) -> Term {
        self.eval(terms, t, false)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::Sort;

    #[test]
    fn test_partial_eval() {
        let terms = Terms::default();
        let x = terms.mk_var("x", Sort::Int);
        let y = terms.mk_var("y", Sort::Int);
        let model = Model::new().assign("x", 3i64);

        let t = terms.mk_add(x, y);
        assert_eq!(model.eval(&terms, t, false), terms.mk_add(terms.mk_int(3), y));
        assert_eq!(model.eval(&terms, t, true), terms.mk_int(3));
    }

    #[test]
    fn test_contains_interpretation() {
        let terms = Terms::default();
        let owner = terms.mk_addr(Address::new(1));
        let model = Model::new().with_contains(Interpretation::new(false).with(Address::new(1), 5i64, true));

        let hit = terms.mk_contains(owner, terms.mk_int(5));
        let miss = terms.mk_contains(owner, terms.mk_int(6));
        assert!(terms.is_true(model.eval(&terms, hit, false)));
        assert!(terms.is_false(model.eval(&terms, miss, false)));
    }

    #[test]
    fn test_contains_without_interpretation() {
        let terms = Terms::default();
        let app = terms.mk_contains(terms.mk_addr(Address::new(1)), terms.mk_int(5));
        let model = Model::new();
        assert_eq!(model.eval(&terms, app, false), app);
        assert!(terms.is_false(model.eval(&terms, app, true)));
        assert!(model.interpretation(CONTAINS).is_none());
    }

    #[test]
    fn test_symbolic_owner_stays_partial() {
        let terms = Terms::default();
        let r = terms.mk_var("r", Sort::Addr);
        let app = terms.mk_contains(r, terms.mk_int(5));
        let model = Model::new().with_contains(Interpretation::new(true));
        assert_eq!(model.eval(&terms, app, false), app);
        // Complete evaluation maps r to the null address.
        assert!(terms.is_true(model.eval(&terms, app, true)));
    }

    #[test]
    fn test_remap_address() {
        let model = Model::new().rename(Address::new(1), Address::new(42));
        assert_eq!(model.remap_address(Address::new(1)), Address::new(42));
        assert_eq!(model.remap_address(Address::new(2)), Address::new(2));
    }
}

//! Projecting solved models to finite tables.
//!
//! The key domain of a set is unbounded, so a model cannot be enumerated.
//! Instead the decoder scans the asserted formulas for literal applications
//! of the membership predicate and reports the ones the model makes true.
//! Every other key reads as the default, `false`.

use std::collections::{BTreeMap, HashSet};

use log::{debug, trace};

use crate::collection::Heap;
use crate::expr::{TermNode, Terms, CONTAINS};
use crate::model::ModelEvaluator;
use crate::reference::Term;
use crate::types::{Address, Value};

/// Decoded membership table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetEntries {
    entries: BTreeMap<(Address, Value), bool>,
    default: bool,
}

impl SetEntries {
    /// Membership of `element` in the set of `owner`.
    pub fn get(&self, owner: Address, element: &Value) -> bool {
        self.entries
            .get(&(owner, element.clone()))
            .copied()
            .unwrap_or(self.default)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Address, Value), &bool)> {
        self.entries.iter()
    }

    pub fn default_value(&self) -> bool {
        self.default
    }
}

/// Literal applications of the membership predicate in `assertions`.
fn contains_applications(terms: &Terms, assertions: &[Term]) -> Vec<Term> {
    let mut visited = HashSet::new();
    let mut stack: Vec<Term> = assertions.iter().rev().copied().collect();
    let mut result = Vec::new();

    while let Some(t) = stack.pop() {
        if !visited.insert(t) {
            continue;
        }
        if let TermNode::Contains(_, _) = terms.node(t) {
            result.push(t);
        }
        stack.extend(terms.children(t).into_iter().rev());
    }
    result
}

/// Decode the sets of `model` restricted to the keys mentioned in
/// `assertions`.
pub fn decode<M>(terms: &Terms, model: &M, assertions: &[Term]) -> SetEntries
where
    M: ModelEvaluator + ?Sized,
{
    if model.interpretation(CONTAINS).is_none() {
        debug!("decode: no interpretation for '{}', all sets are empty", CONTAINS);
        return SetEntries::default();
    }

    let mut entries = BTreeMap::new();
    for app in contains_applications(terms, assertions) {
        let TermNode::Contains(r, e) = terms.node(app) else {
            unreachable!("only membership applications are collected");
        };
        let owner = model.eval(terms, r, false);
        let element = model.eval(terms, e, false);
        let (Some(owner), Some(element)) = (terms.as_address(owner), terms.value(element)) else {
            trace!("decode: skipping non-concrete {}", terms.to_sexpr(app));
            continue;
        };
        if !terms.is_true(model.eval(terms, app, false)) {
            continue;
        }

        let owner = model.remap_address(owner);
        let element = match element {
            Value::Addr(address) => Value::Addr(model.remap_address(address)),
            other => other,
        };
        trace!("decode: {}[{}] = true", owner, element);
        entries.insert((owner, element), true);
    }

    debug!("decode: {} entries", entries.len());
    SetEntries { entries, default: false }
}

impl Heap {
    pub fn decode<M>(&self, model: &M, assertions: &[Term]) -> SetEntries
    where
        M: ModelEvaluator + ?Sized,
    {
        decode(self.terms(), model, assertions)
    }
}

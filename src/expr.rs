//! Hash-consed term language.
//!
//! Guards, keys, stored values and resolved reads are all [`Term`]s living in
//! one [`Terms`] arena. Every constructor goes through the arena, so two
//! structurally equal terms always get the same handle, and every
//! constructor performs local simplification (constant folding, boolean
//! identities), so concrete reasoning never needs a solver:
//!
//! ```
//! use symset_rs::expr::Terms;
//! use symset_rs::types::Sort;
//!
//! let terms = Terms::default();
//! let x = terms.mk_var("x", Sort::Bool);
//! let five = terms.mk_int(5);
//!
//! assert_eq!(terms.mk_and(x, terms.mk_true()), x);
//! assert!(terms.is_false(terms.mk_eq(five, terms.mk_int(6))));
//! assert_eq!(terms.mk_ite(x, terms.mk_true(), terms.mk_false()), x);
//! ```
//!
//! The membership predicate `contains(owner, element)` and the
//! `intersection-size` theory primitive are ordinary term constructors; the
//! solver that would interpret them is outside this crate.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Write as _};

use log::debug;
use num_bigint::BigInt;

use crate::collection::Collection;
use crate::reference::Term;
use crate::table::Table;
use crate::types::{Address, Sort, Value};
use crate::utils::{pairing3, pairing4, std_hash, MyHash};

/// Name of the membership predicate symbol.
pub const CONTAINS: &str = "contains";

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum TermNode {
    Const(Value),
    Var(String, Sort),
    Not(Term),
    And(Term, Term),
    Or(Term, Term),
    Ite(Term, Term, Term),
    Eq(Term, Term),
    Add(Term, Term),
    /// Application of the membership predicate to `(owner, element)`.
    Contains(Term, Term),
    /// Number of elements shared by the sets of two owners in a materialized
    /// set collection.
    IntersectionSize(Collection, Term, Term),
}

impl MyHash for TermNode {
    fn hash(&self) -> u64 {
        let t = |x: &Term| x.get() as u64;
        match self {
            TermNode::Const(v) => pairing3(1, std_hash(v), 0),
            TermNode::Var(name, sort) => pairing3(2, std_hash(name), *sort as u64),
            TermNode::Not(a) => pairing3(3, t(a), 0),
            TermNode::And(a, b) => pairing3(4, t(a), t(b)),
            TermNode::Or(a, b) => pairing3(5, t(a), t(b)),
            TermNode::Ite(a, b, c) => pairing4(6, t(a), t(b), t(c)),
            TermNode::Eq(a, b) => pairing3(7, t(a), t(b)),
            TermNode::Add(a, b) => pairing3(8, t(a), t(b)),
            TermNode::Contains(a, b) => pairing3(9, t(a), t(b)),
            TermNode::IntersectionSize(c, a, b) => pairing4(10, std_hash(c), t(a), t(b)),
        }
    }
}

/// The term manager.
pub struct Terms {
    storage: RefCell<Table<TermNode>>,
    tt: Term,
    ff: Term,
}

impl Terms {
    pub fn new(storage_bits: usize) -> Self {
        let mut storage = Table::new(storage_bits);
        let tt = Term::new(storage.put(TermNode::Const(Value::Bool(true))) as u32);
        let ff = Term::new(storage.put(TermNode::Const(Value::Bool(false))) as u32);
        Self {
            storage: RefCell::new(storage),
            tt,
            ff,
        }
    }
}

impl Default for Terms {
    fn default() -> Self {
        Terms::new(12)
    }
}

impl Debug for Terms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terms").field("size", &self.size()).finish()
    }
}

impl Terms {
    /// Number of distinct terms created so far.
    pub fn size(&self) -> usize {
        self.storage.borrow().size()
    }

    pub fn node(&self, t: Term) -> TermNode {
        self.storage.borrow().value(t.index()).clone()
    }

    fn put(&self, node: TermNode) -> Term {
        let i = self.storage.borrow_mut().put(node);
        Term::new(i as u32)
    }

    pub fn mk_true(&self) -> Term {
        self.tt
    }
    pub fn mk_false(&self) -> Term {
        self.ff
    }
    pub fn mk_bool(&self, b: bool) -> Term {
        if b {
            self.tt
        } else {
            self.ff
        }
    }

    pub fn mk_int(&self, n: impl Into<BigInt>) -> Term {
        self.put(TermNode::Const(Value::Int(n.into())))
    }

    pub fn mk_addr(&self, address: impl Into<Address>) -> Term {
        self.put(TermNode::Const(Value::Addr(address.into())))
    }

    pub fn mk_value(&self, value: Value) -> Term {
        match value {
            Value::Bool(b) => self.mk_bool(b),
            value => self.put(TermNode::Const(value)),
        }
    }

    pub fn mk_var(&self, name: impl Into<String>, sort: Sort) -> Term {
        self.put(TermNode::Var(name.into(), sort))
    }

    pub fn is_true(&self, t: Term) -> bool {
        t == self.tt
    }
    pub fn is_false(&self, t: Term) -> bool {
        t == self.ff
    }

    /// The constant denoted by `t`, if `t` is a constant.
    pub fn value(&self, t: Term) -> Option<Value> {
        match self.node(t) {
            TermNode::Const(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_const(&self, t: Term) -> bool {
        matches!(self.node(t), TermNode::Const(_))
    }

    /// The concrete address denoted by `t`, if `t` is an address constant.
    pub fn as_address(&self, t: Term) -> Option<Address> {
        self.value(t).and_then(|v| v.as_addr())
    }

    pub fn sort(&self, t: Term) -> Sort {
        match self.node(t) {
            TermNode::Const(v) => v.sort(),
            TermNode::Var(_, sort) => sort,
            TermNode::Not(_)
            | TermNode::And(_, _)
            | TermNode::Or(_, _)
            | TermNode::Eq(_, _)
            | TermNode::Contains(_, _) => Sort::Bool,
            TermNode::Add(_, _) | TermNode::IntersectionSize(_, _, _) => Sort::Int,
            TermNode::Ite(_, a, _) => self.sort(a),
        }
    }

    /// Direct subterms of `t`.
    pub fn children(&self, t: Term) -> Vec<Term> {
        match self.node(t) {
            TermNode::Const(_) | TermNode::Var(_, _) => vec![],
            TermNode::Not(a) => vec![a],
            TermNode::And(a, b)
            | TermNode::Or(a, b)
            | TermNode::Eq(a, b)
            | TermNode::Add(a, b)
            | TermNode::Contains(a, b)
            | TermNode::IntersectionSize(_, a, b) => vec![a, b],
            TermNode::Ite(a, b, c) => vec![a, b, c],
        }
    }

    fn is_negation_of(&self, a: Term, b: Term) -> bool {
        matches!(self.node(a), TermNode::Not(x) if x == b) || matches!(self.node(b), TermNode::Not(x) if x == a)
    }

    pub fn mk_not(&self, a: Term) -> Term {
        if self.is_true(a) {
            return self.ff;
        }
        if self.is_false(a) {
            return self.tt;
        }
        match self.node(a) {
            TermNode::Not(x) => x,
            _ => self.put(TermNode::Not(a)),
        }
    }

    pub fn mk_and(&self, a: Term, b: Term) -> Term {
        if self.is_false(a) || self.is_false(b) {
            return self.ff;
        }
        if self.is_true(a) {
            return b;
        }
        if self.is_true(b) || a == b {
            return a;
        }
        if self.is_negation_of(a, b) {
            return self.ff;
        }
        // Absorption: a ∧ (a ∨ x) = a
        if self.is_operand_of_or(a, b) {
            return a;
        }
        if self.is_operand_of_or(b, a) {
            return b;
        }
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        self.put(TermNode::And(a, b))
    }

    pub fn mk_or(&self, a: Term, b: Term) -> Term {
        if self.is_true(a) || self.is_true(b) {
            return self.tt;
        }
        if self.is_false(a) {
            return b;
        }
        if self.is_false(b) || a == b {
            return a;
        }
        if self.is_negation_of(a, b) {
            return self.tt;
        }
        // Absorption: a ∨ (a ∧ x) = a
        if self.is_operand_of_and(a, b) {
            return a;
        }
        if self.is_operand_of_and(b, a) {
            return b;
        }
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        self.put(TermNode::Or(a, b))
    }

    fn is_operand_of_and(&self, a: Term, b: Term) -> bool {
        matches!(self.node(b), TermNode::And(x, y) if x == a || y == a)
    }

    fn is_operand_of_or(&self, a: Term, b: Term) -> bool {
        matches!(self.node(b), TermNode::Or(x, y) if x == a || y == a)
    }

    pub fn mk_and_all(&self, terms: impl IntoIterator<Item = Term>) -> Term {
        terms.into_iter().fold(self.tt, |acc, t| self.mk_and(acc, t))
    }

    pub fn mk_or_all(&self, terms: impl IntoIterator<Item = Term>) -> Term {
        terms.into_iter().fold(self.ff, |acc, t| self.mk_or(acc, t))
    }

    /// If-then-else over terms of any sort.
    ///
    /// ```text
    /// ITE(c, a, b) = (c ∧ a) ∨ (¬c ∧ b)    (for boolean branches)
    /// ```
    pub fn mk_ite(&self, c: Term, a: Term, b: Term) -> Term {
        if self.is_true(c) {
            return a;
        }
        if self.is_false(c) {
            return b;
        }
        if a == b {
            return a;
        }
        if let TermNode::Not(c) = self.node(c) {
            debug!("ite(~C,A,B) => ite(C,B,A)");
            return self.mk_ite(c, b, a);
        }
        if self.sort(a) == Sort::Bool {
            if self.is_true(a) && self.is_false(b) {
                return c;
            }
            if self.is_false(a) && self.is_true(b) {
                return self.mk_not(c);
            }
            if self.is_true(a) {
                debug!("ite(C,1,B) => C ∨ B");
                return self.mk_or(c, b);
            }
            if self.is_false(b) {
                debug!("ite(C,A,0) => C ∧ A");
                return self.mk_and(c, a);
            }
            if self.is_false(a) {
                debug!("ite(C,0,B) => ~C ∧ B");
                return self.mk_and(self.mk_not(c), b);
            }
            if self.is_true(b) {
                debug!("ite(C,A,1) => ~C ∨ A");
                return self.mk_or(self.mk_not(c), a);
            }
        }
        self.put(TermNode::Ite(c, a, b))
    }

    pub fn mk_eq(&self, a: Term, b: Term) -> Term {
        if a == b {
            return self.tt;
        }
        if self.is_const(a) && self.is_const(b) {
            // Constants are hash-consed: different handles, different values.
            return self.ff;
        }
        if self.is_true(a) {
            return b;
        }
        if self.is_true(b) {
            return a;
        }
        if self.is_false(a) {
            return self.mk_not(b);
        }
        if self.is_false(b) {
            return self.mk_not(a);
        }
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        self.put(TermNode::Eq(a, b))
    }

    pub fn mk_add(&self, a: Term, b: Term) -> Term {
        match (self.value(a), self.value(b)) {
            (Some(Value::Int(x)), Some(Value::Int(y))) => return self.mk_int(x + y),
            (Some(Value::Int(x)), _) if x == BigInt::ZERO => return b,
            (_, Some(Value::Int(y))) if y == BigInt::ZERO => return a,
            _ => {}
        }
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        self.put(TermNode::Add(a, b))
    }

    pub fn mk_sum(&self, terms: impl IntoIterator<Item = Term>) -> Term {
        let zero = self.mk_int(0);
        terms.into_iter().fold(zero, |acc, t| self.mk_add(acc, t))
    }

    pub fn mk_contains(&self, owner: Term, element: Term) -> Term {
        self.put(TermNode::Contains(owner, element))
    }

    pub fn mk_intersection_size(&self, collection: Collection, first: Term, second: Term) -> Term {
        self.put(TermNode::IntersectionSize(collection, first, second))
    }
}

impl Terms {
    /// Bottom-up rewriting.
    ///
    /// Every subterm is rebuilt from its rewritten children through the
    /// simplifying constructors, then offered to `f`, which may replace it.
    /// Results are memoized per call, so shared subterms are visited once.
    pub fn substitute<F>(&self, t: Term, f: &mut F) -> Term
    where
        F: FnMut(&Terms, Term) -> Option<Term>,
    {
        let mut memo = HashMap::new();
        self.substitute_rec(t, f, &mut memo)
    }

    fn substitute_rec<F>(&self, t: Term, f: &mut F, memo: &mut HashMap<Term, Term>) -> Term
    where
        F: FnMut(&Terms, Term) -> Option<Term>,
    {
        if let Some(&res) = memo.get(&t) {
            return res;
        }

        let rebuilt = match self.node(t) {
            TermNode::Const(_) | TermNode::Var(_, _) => t,
            TermNode::Not(a) => {
                let a = self.substitute_rec(a, f, memo);
                self.mk_not(a)
            }
            TermNode::And(a, b) => {
                let a = self.substitute_rec(a, f, memo);
                if self.is_false(a) {
                    self.ff
                } else {
                    let b = self.substitute_rec(b, f, memo);
                    self.mk_and(a, b)
                }
            }
            TermNode::Or(a, b) => {
                let a = self.substitute_rec(a, f, memo);
                if self.is_true(a) {
                    self.tt
                } else {
                    let b = self.substitute_rec(b, f, memo);
                    self.mk_or(a, b)
                }
            }
            TermNode::Ite(c, a, b) => {
                let c = self.substitute_rec(c, f, memo);
                if self.is_true(c) {
                    self.substitute_rec(a, f, memo)
                } else if self.is_false(c) {
                    self.substitute_rec(b, f, memo)
                } else {
                    let a = self.substitute_rec(a, f, memo);
                    let b = self.substitute_rec(b, f, memo);
                    self.mk_ite(c, a, b)
                }
            }
            TermNode::Eq(a, b) => {
                let a = self.substitute_rec(a, f, memo);
                let b = self.substitute_rec(b, f, memo);
                self.mk_eq(a, b)
            }
            TermNode::Add(a, b) => {
                let a = self.substitute_rec(a, f, memo);
                let b = self.substitute_rec(b, f, memo);
                self.mk_add(a, b)
            }
            TermNode::Contains(r, e) => {
                let r = self.substitute_rec(r, f, memo);
                let e = self.substitute_rec(e, f, memo);
                self.mk_contains(r, e)
            }
            TermNode::IntersectionSize(c, r1, r2) => {
                let r1 = self.substitute_rec(r1, f, memo);
                let r2 = self.substitute_rec(r2, f, memo);
                self.mk_intersection_size(c, r1, r2)
            }
        };

        let res = f(self, rebuilt).unwrap_or(rebuilt);
        memo.insert(t, res);
        res
    }

    /// Render a term as an s-expression.
    pub fn to_sexpr(&self, t: Term) -> String {
        let mut s = String::new();
        self.write_sexpr(&mut s, t);
        s
    }

    fn write_sexpr(&self, s: &mut String, t: Term) {
        let (op, args) = match self.node(t) {
            TermNode::Const(v) => {
                let _ = write!(s, "{}", v);
                return;
            }
            TermNode::Var(name, _) => {
                s.push_str(&name);
                return;
            }
            TermNode::IntersectionSize(c, a, b) => {
                let _ = write!(s, "(intersection-size {} ", c);
                self.write_sexpr(s, a);
                s.push(' ');
                self.write_sexpr(s, b);
                s.push(')');
                return;
            }
            TermNode::Not(a) => ("not", vec![a]),
            TermNode::And(a, b) => ("and", vec![a, b]),
            TermNode::Or(a, b) => ("or", vec![a, b]),
            TermNode::Ite(a, b, c) => ("ite", vec![a, b, c]),
            TermNode::Eq(a, b) => ("=", vec![a, b]),
            TermNode::Add(a, b) => ("+", vec![a, b]),
            TermNode::Contains(a, b) => (CONTAINS, vec![a, b]),
        };
        s.push('(');
        s.push_str(op);
        for a in args {
            s.push(' ');
            self.write_sexpr(s, a);
        }
        s.push(')');
    }
}

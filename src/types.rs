//! Ground values and sorts of the term language.
//!
//! This module provides the small vocabulary shared by terms, regions and
//! decoded tables: the [`Sort`] of a term, concrete heap addresses
//! ([`Address`]) and ground constants ([`Value`]).
use std::fmt;

use num_bigint::BigInt;

/// Sort of a term.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Sort {
    Bool,
    Int,
    /// Heap references.
    Addr,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Addr => write!(f, "Addr"),
        }
    }
}

/// A concrete heap address.
///
/// Concrete addresses are produced by allocation; symbolic references are
/// plain variables of sort [`Sort::Addr`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Address(u64);

impl Address {
    pub const NULL: Address = Address(0);

    pub const fn new(raw: u64) -> Self {
        Address(raw)
    }

    /// Returns the raw address.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for Address {
    fn from(raw: u64) -> Self {
        Address(raw)
    }
}

/// A ground constant.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Value {
    Bool(bool),
    Int(BigInt),
    Addr(Address),
}

impl Value {
    pub fn sort(&self) -> Sort {
        match self {
            Value::Bool(_) => Sort::Bool,
            Value::Int(_) => Sort::Int,
            Value::Addr(_) => Sort::Addr,
        }
    }

    /// Default value of a sort, used to complete partial models.
    pub fn default_of(sort: Sort) -> Self {
        match sort {
            Sort::Bool => Value::Bool(false),
            Sort::Int => Value::Int(BigInt::ZERO),
            Sort::Addr => Value::Addr(Address::NULL),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_addr(&self) -> Option<Address> {
        match self {
            Value::Addr(a) => Some(*a),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Addr(a) => write!(f, "{}", a),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(BigInt::from(n))
    }
}

impl From<Address> for Value {
    fn from(a: Address) -> Self {
        Value::Addr(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_sort() {
        assert_eq!(Value::from(true).sort(), Sort::Bool);
        assert_eq!(Value::from(5i64).sort(), Sort::Int);
        assert_eq!(Value::from(Address::new(1)).sort(), Sort::Addr);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Value::default_of(Sort::Bool), Value::Bool(false));
        assert_eq!(Value::default_of(Sort::Int), Value::from(0i64));
        assert_eq!(Value::default_of(Sort::Addr), Value::Addr(Address::NULL));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(Address::new(3)).to_string(), "#3");
        assert_eq!(Value::from(-4i64).to_string(), "-4");
        assert_eq!(Sort::Addr.to_string(), "Addr");
    }

    #[test]
    fn test_ordering() {
        // Values of different sorts never compare equal.
        assert_ne!(Value::from(1i64), Value::from(Address::new(1)));
        assert!(Value::from(1i64) < Value::from(2i64));
    }
}

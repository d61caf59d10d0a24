use std::fmt::{Display, Formatter};

/// Handle of a hash-consed term in the [`Terms`][crate::expr::Terms] arena.
///
/// Two handles are equal iff the terms are structurally equal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Term(u32);

impl Term {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the index of the term in the arena.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Handle of an update node in the [`Heap`][crate::collection::Heap] log arena.
///
/// Update nodes are never deduplicated: equal handles mean *the same* node,
/// which is what the per-node memo caches are keyed by.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the index of the node in the arena.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "u{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Term::new(7).to_string(), "t7");
        assert_eq!(NodeId::new(3).to_string(), "u3");
    }

    #[test]
    fn test_index() {
        let t = Term::new(42);
        assert_eq!(t.index(), 42);
        assert_eq!(t.get(), 42);
        assert!(Term::new(1) < Term::new(2));
    }
}

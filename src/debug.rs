//! Debug utilities for inspecting update logs.
//!
//! These are primarily useful in tests, in the demo, and during
//! development.

use std::fmt::{self, Write};

use crate::collection::{Collection, Heap};
use crate::reference::NodeId;
use crate::update::Update;

/// Rendering of a single update node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub id: NodeId,
    /// "pinpoint" or "ranged"
    pub kind: &'static str,
    pub guard: String,
    /// Written key (pinpoint only)
    pub key: Option<String>,
    /// Written value (pinpoint only)
    pub value: Option<String>,
    /// Merged collection (ranged only)
    pub source: Option<Collection>,
}

impl fmt::Display for UpdateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.kind)?;
        if let (Some(key), Some(value)) = (&self.key, &self.value) {
            write!(f, " {} := {}", key, value)?;
        }
        if let Some(source) = &self.source {
            write!(f, " from {}", source)?;
        }
        write!(f, " if {}", self.guard)
    }
}

/// The log of one collection, newest node first.
#[derive(Debug, Clone)]
pub struct LogTrace {
    pub collection: Collection,
    pub updates: Vec<UpdateInfo>,
}

impl fmt::Display for LogTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Log of {} ({} updates):", self.collection, self.updates.len())?;
        for info in &self.updates {
            writeln!(f, "  {}", info)?;
        }
        Ok(())
    }
}

/// Arena sizes and cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub terms: usize,
    pub nodes: usize,
    pub region_cache_size: usize,
    pub region_cache_hits: usize,
    pub region_cache_misses: usize,
    pub elements_cache_size: usize,
    pub elements_cache_hits: usize,
    pub elements_cache_misses: usize,
    pub read_cache_size: usize,
    pub read_cache_hits: usize,
    pub read_cache_misses: usize,
}

impl fmt::Display for HeapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "terms: {}, nodes: {}", self.terms, self.nodes)?;
        writeln!(
            f,
            "region cache: {} entries, {} hits, {} misses",
            self.region_cache_size, self.region_cache_hits, self.region_cache_misses
        )?;
        writeln!(
            f,
            "elements cache: {} entries, {} hits, {} misses",
            self.elements_cache_size, self.elements_cache_hits, self.elements_cache_misses
        )?;
        write!(
            f,
            "read cache: {} entries, {} hits, {} misses",
            self.read_cache_size, self.read_cache_hits, self.read_cache_misses
        )
    }
}

impl Heap {
    pub fn update_info(&self, id: NodeId) -> UpdateInfo {
        let terms = self.terms();
        let node = self.node(id);
        match node.update {
            Update::Pinpoint { key, value, guard } => UpdateInfo {
                id,
                kind: "pinpoint",
                guard: terms.to_sexpr(guard),
                key: Some(key.to_sexpr(terms)),
                value: Some(terms.to_sexpr(value)),
                source: None,
            },
            Update::Ranged { adapter, guard } => UpdateInfo {
                id,
                kind: "ranged",
                guard: terms.to_sexpr(guard),
                key: None,
                value: None,
                source: Some(adapter.source),
            },
        }
    }

    /// Walk the log of `collection`, newest node first.
    pub fn debug_log(&self, collection: Collection) -> LogTrace {
        let mut updates = Vec::new();
        let mut current = collection.tail();
        while let Some(id) = current {
            updates.push(self.update_info(id));
            current = self.node(id).prev;
        }
        LogTrace { collection, updates }
    }

    pub fn stats(&self) -> HeapStats {
        let region = self.region_cache().borrow();
        let elements = self.elements_cache().borrow();
        let read = self.read_cache().borrow();
        HeapStats {
            terms: self.terms().size(),
            nodes: self.num_nodes(),
            region_cache_size: region.len(),
            region_cache_hits: region.hits(),
            region_cache_misses: region.misses(),
            elements_cache_size: elements.len(),
            elements_cache_hits: elements.hits(),
            elements_cache_misses: elements.misses(),
            read_cache_size: read.len(),
            read_cache_hits: read.hits(),
            read_cache_misses: read.misses(),
        }
    }

    /// Dump the whole update arena, oldest node first.
    pub fn dump_state(&self) -> String {
        let mut result = String::new();
        writeln!(result, "Heap state:").unwrap();
        for line in self.stats().to_string().lines() {
            writeln!(result, "  {}", line).unwrap();
        }
        for i in 1..=self.num_nodes() {
            let id = NodeId::new(i as u32);
            let prev = self.node(id).prev.map_or("-".to_string(), |p| p.to_string());
            writeln!(result, "  {} (prev {})", self.update_info(id), prev).unwrap();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::{Address, Sort};
    use crate::update::Key;

    #[test]
    fn test_debug_log_newest_first() {
        let heap = Heap::default();
        let terms = heap.terms();
        let s = Collection::allocated(Address::new(1), Sort::Int);
        let s = heap.write(s, Key::Element(terms.mk_int(1)), terms.mk_true(), terms.mk_true());
        let g = terms.mk_var("g", Sort::Bool);
        let s = heap.write(s, Key::Element(terms.mk_int(2)), terms.mk_false(), g);

        let trace = heap.debug_log(s);
        assert_eq!(trace.updates.len(), 2);
        assert_eq!(trace.updates[0].key.as_deref(), Some("2"));
        assert_eq!(trace.updates[0].value.as_deref(), Some("false"));
        assert_eq!(trace.updates[0].guard, "g");
        assert_eq!(trace.updates[1].key.as_deref(), Some("1"));
        assert!(trace.to_string().starts_with("Log of alloc[#1: Int]"));
    }

    #[test]
    fn test_debug_log_ranged() {
        let heap = Heap::default();
        let terms = heap.terms();
        let src = Collection::input(Sort::Int);
        let dst = Collection::allocated(Address::new(1), Sort::Int);
        let r = terms.mk_var("r", Sort::Addr);
        let dst = heap.union(dst, src, r, terms.mk_addr(Address::new(1)), terms.mk_true());

        let info = &heap.debug_log(dst).updates[0];
        assert_eq!(info.kind, "ranged");
        assert_eq!(info.source, Some(src));
        assert_eq!(info.to_string(), format!("{}: ranged from {} if true", info.id, src));
    }

    #[test]
    fn test_stats() {
        let heap = Heap::default();
        let terms = heap.terms();
        let s = Collection::allocated(Address::new(1), Sort::Int);
        let s = heap.write(s, Key::Element(terms.mk_int(1)), terms.mk_true(), terms.mk_true());
        heap.region(s);
        heap.region(s);

        let stats = heap.stats();
        assert_eq!(stats.nodes, 1);
        assert_eq!(stats.region_cache_size, 1);
        assert_eq!(stats.region_cache_hits, 1);
        assert!(heap.dump_state().contains("pinpoint 1 := true"));
    }
}

//! Update logs to DOT (Graphviz) conversion.
//!
//! Renders the update-log DAG reachable from a set of collections, which
//! makes structural sharing between execution branches visible:
//! - **Pinpoint** nodes are boxes labeled `key := value`, with the guard
//!   below when it is not trivially true.
//! - **Ranged** nodes are diamonds labeled with the merged owners.
//! - **Edges**: solid lines go to the previous (older) node, dashed lines
//!   from a ranged node to the tail of the merged source collection.
//! - **Roots** (the rendered collections) are rectangles at the top.
//!
//! # Examples
//!
//! ```
//! use symset_rs::collection::{Collection, Heap};
//! use symset_rs::types::{Address, Sort};
//! use symset_rs::update::Key;
//!
//! let heap = Heap::default();
//! let terms = heap.terms();
//! let s = Collection::allocated(Address::new(1), Sort::Int);
//! let s = heap.write(s, Key::Element(terms.mk_int(1)), terms.mk_true(), terms.mk_true());
//!
//! let dot = heap.to_dot(&[s]).unwrap();
//! // Render with: dot -Tpng output.dot -o output.png
//! ```

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::collection::{Collection, Heap};
use crate::reference::NodeId;
use crate::update::Update;

/// Configuration options for DOT output generation.
///
/// ```
/// use symset_rs::dot::DotConfig;
///
/// let config = DotConfig {
///     rankdir: "LR",
///     ..DotConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for pinpoint nodes (default: "box")
    pub pinpoint_shape: &'static str,
    /// Shape for ranged nodes (default: "diamond")
    pub ranged_shape: &'static str,
    /// Shape for root nodes (default: "rect")
    pub root_shape: &'static str,
    /// Style for edges to the previous node (default: "solid")
    pub prev_edge_style: &'static str,
    /// Style for edges to a merged source (default: "dashed")
    pub source_edge_style: &'static str,
    /// Layout direction (default: "TB")
    pub rankdir: &'static str,
    /// Whether to print guards of pinpoint nodes (default: true)
    pub show_guards: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            pinpoint_shape: "box",
            ranged_shape: "diamond",
            root_shape: "rect",
            prev_edge_style: "solid",
            source_edge_style: "dashed",
            rankdir: "TB",
            show_guards: true,
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('"', "\\\"")
}

impl Heap {
    /// All update nodes reachable from `roots`, through predecessors and
    /// merged sources.
    pub fn reachable_nodes(&self, roots: &[Collection]) -> BTreeSet<NodeId> {
        let mut visited = BTreeSet::new();
        let mut stack: Vec<NodeId> = roots.iter().filter_map(|c| c.tail()).collect();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = self.node(id);
            if let Some(prev) = node.prev {
                stack.push(prev);
            }
            if let Update::Ranged { adapter, .. } = node.update {
                if let Some(source) = adapter.source.tail() {
                    stack.push(source);
                }
            }
        }
        visited
    }

    /// Converts the logs of `roots` to DOT format.
    pub fn to_dot(&self, roots: &[Collection]) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(roots, &DotConfig::default())
    }

    /// Converts the logs of `roots` to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, roots: &[Collection], config: &DotConfig) -> Result<String, std::fmt::Error> {
        let terms = self.terms();
        let nodes = self.reachable_nodes(roots);

        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "rankdir={};", config.rankdir)?;

        for &id in &nodes {
            let node = self.node(id);
            match node.update {
                Update::Pinpoint { key, value, guard } => {
                    let mut label = format!("{} := {}", key.to_sexpr(terms), terms.to_sexpr(value));
                    if config.show_guards && !terms.is_true(guard) {
                        write!(label, "\\nif {}", terms.to_sexpr(guard))?;
                    }
                    writeln!(
                        dot,
                        "{} [shape={}, label=\"{}\"];",
                        id,
                        config.pinpoint_shape,
                        escape(&label)
                    )?;
                }
                Update::Ranged { adapter, guard } => {
                    let mut label = format!(
                        "{} ∪= {}",
                        terms.to_sexpr(adapter.target_owner),
                        terms.to_sexpr(adapter.source_owner)
                    );
                    if config.show_guards && !terms.is_true(guard) {
                        write!(label, "\\nif {}", terms.to_sexpr(guard))?;
                    }
                    writeln!(
                        dot,
                        "{} [shape={}, label=\"{}\"];",
                        id,
                        config.ranged_shape,
                        escape(&label)
                    )?;
                }
            }
        }

        // Empty logs have no node to point at.
        writeln!(dot, "empty [shape=point];")?;

        for &id in &nodes {
            let node = self.node(id);
            match node.prev {
                Some(prev) => writeln!(dot, "{} -> {} [style={}];", id, prev, config.prev_edge_style)?,
                None => writeln!(dot, "{} -> empty [style={}];", id, config.prev_edge_style)?,
            }
            if let Update::Ranged { adapter, .. } = node.update {
                match adapter.source.tail() {
                    Some(source) => writeln!(dot, "{} -> {} [style={}];", id, source, config.source_edge_style)?,
                    None => writeln!(dot, "{} -> empty [style={}];", id, config.source_edge_style)?,
                }
            }
        }

        writeln!(dot, "{{ rank=source")?;
        for (i, root) in roots.iter().enumerate() {
            writeln!(dot, "r{} [shape={}, label=\"{}\"];", i, config.root_shape, escape(&root.to_string()))?;
        }
        writeln!(dot, "}}")?;

        for (i, root) in roots.iter().enumerate() {
            match root.tail() {
                Some(tail) => writeln!(dot, "r{} -> {};", i, tail)?,
                None => writeln!(dot, "r{} -> empty;", i)?,
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

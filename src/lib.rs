//! # symset-rs: Symbolic set collections
//!
//! **`symset-rs`** is the symbolic memory layer for sets in a symbolic execution engine.
//! It represents mutable sets whose membership is only partially known during the analysis,
//! resolves reads against candidate models, and decodes solved models back into finite tables.
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: All operations go through the [`Heap`][crate::collection::Heap] manager,
//!   which owns the hash-consed term arena, the update-log arena and the memo caches.
//! - **Persistent Logs**: A [`Collection`][crate::collection::Collection] is a lightweight `Copy` handle.
//!   Every write returns a new handle and the old one stays valid, so execution branches share history for free.
//! - **Conservative Regions**: Every log carries an over-approximation of the keys it touched
//!   ([`region`]), which prunes reads without ever asking a solver.
//! - **Lazy Unions**: Merging one set into another records a single ranged update that delegates to the source.
//! - **Tiered Queries**: Intersection sizes of concrete sets are enumerated directly;
//!   only unbounded sets fall back to a theory-level `intersection-size` term.
//!
//! ## Basic Usage
//!
//! ```rust
//! use symset_rs::collection::{Collection, Heap};
//! use symset_rs::types::{Address, Sort};
//! use symset_rs::update::Key;
//!
//! // 1. Initialize the manager
//! let heap = Heap::default();
//! let terms = heap.terms();
//!
//! // 2. Start from the empty set of object #1
//! let s = Collection::allocated(Address::new(1), Sort::Int);
//!
//! // 3. Add 5 unconditionally, and 6 only when `x` holds
//! let x = terms.mk_var("x", Sort::Bool);
//! let s = heap.write(s, Key::Element(terms.mk_int(5)), terms.mk_true(), terms.mk_true());
//! let s = heap.write(s, Key::Element(terms.mk_int(6)), terms.mk_true(), x);
//!
//! // 4. Read back
//! assert!(terms.is_true(heap.read(s, Key::Element(terms.mk_int(5)), None)));
//! assert_eq!(heap.read(s, Key::Element(terms.mk_int(6)), None), x);
//! assert!(terms.is_false(heap.read(s, Key::Element(terms.mk_int(7)), None)));
//! ```
//!
//! ## Core Components
//!
//! - **[`collection`]**: The [`Heap`][crate::collection::Heap] manager with write, union, region and read.
//! - **[`composer`]**: Read resolution under a model, union application and intersection size.
//! - **[`decoder`]**: Projection of solved models to finite tables.
//! - **[`memory`]**: Routing of owner references to collections.
//! - **[`dot`]** and **[`debug`]**: Visualization and inspection of update logs.

pub mod cache;
pub mod collection;
pub mod composer;
pub mod debug;
pub mod decoder;
pub mod dot;
pub mod expr;
pub mod memory;
pub mod model;
pub mod reference;
pub mod region;
pub mod table;
pub mod types;
pub mod update;
pub mod utils;
pub mod visitor;

//! Memo tables for the update-log folds and read resolution.
//!
//! Every fold over an update log (region building, elements collection) and
//! every read resolution is a pure function of immutable inputs, so results
//! are memoized by the handles they were computed from:
//!
//! | Cache | Key | Value |
//! |-------|-----|-------|
//! | region cache | [`NodeId`][crate::reference::NodeId] | [`KeyRegion`][crate::region::KeyRegion] |
//! | elements cache | [`NodeId`][crate::reference::NodeId] | [`Elements`][crate::visitor::Elements] |
//! | read cache | `(Collection, Key)` | [`Term`][crate::reference::Term] |
//!
//! Entries are written at most once per key; a recomputation after a miss
//! produces the same value, so overwriting is harmless.

mod hashmap;

pub use hashmap::HashMapCache;

/// Default cache implementation.
pub type Cache<K, V> = HashMapCache<K, V>;

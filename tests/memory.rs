//! Set regions driven the way an interpreter drives them, down to decoding.

use symset_rs::collection::Heap;
use symset_rs::composer::Substitution;
use symset_rs::memory::{MutableMemory, RegionId, SetMemory};
use symset_rs::model::{Interpretation, Model};
use symset_rs::types::{Address, Sort, Value};
use test_log::test;

const INTS: RegionId = RegionId::new(Sort::Int);
const REFS: RegionId = RegionId::new(Sort::Addr);

#[test]
fn forked_states_share_history() {
    let heap = Heap::default();
    let terms = heap.terms();
    let owner = terms.mk_addr(Address::new(1));
    let mut memory = SetMemory::new();

    let mut region = memory.get_region(INTS);
    region.write(&heap, owner, terms.mk_int(1), terms.mk_true(), terms.mk_true());
    memory.set_region(INTS, region);

    // Fork: both branches start from the same region.
    let mut left = memory.clone();
    let mut right = memory.clone();

    let mut region = left.get_region(INTS);
    region.write(&heap, owner, terms.mk_int(2), terms.mk_true(), terms.mk_true());
    left.set_region(INTS, region);

    let mut region = right.get_region(INTS);
    region.write(&heap, owner, terms.mk_int(1), terms.mk_false(), terms.mk_true());
    right.set_region(INTS, region);

    assert_eq!(heap.num_nodes(), 3);

    let read = |m: &SetMemory, x: i64| m.get_region(INTS).read(&heap, owner, terms.mk_int(x), None);
    assert!(terms.is_true(read(&memory, 1)));
    assert!(terms.is_false(read(&memory, 2)));
    assert!(terms.is_true(read(&left, 1)));
    assert!(terms.is_true(read(&left, 2)));
    assert!(terms.is_false(read(&right, 1)));
    assert!(terms.is_false(read(&right, 2)));
}

#[test]
fn regions_are_independent() {
    let heap = Heap::default();
    let terms = heap.terms();
    let owner = terms.mk_addr(Address::new(1));
    let mut memory = SetMemory::new();

    let mut ints = memory.get_region(INTS);
    ints.write(&heap, owner, terms.mk_int(1), terms.mk_true(), terms.mk_true());
    memory.set_region(INTS, ints);

    let mut refs = memory.get_region(REFS);
    let element = terms.mk_addr(Address::new(9));
    refs.write(&heap, owner, element, terms.mk_true(), terms.mk_true());
    memory.set_region(REFS, refs);

    assert_eq!(memory.len(), 2);
    assert!(terms.is_true(memory.get_region(REFS).read(&heap, owner, element, None)));
    assert!(terms.is_false(memory.get_region(REFS).read(&heap, owner, terms.mk_addr(Address::new(1)), None)));
    assert!(terms.is_true(memory.get_region(INTS).read(&heap, owner, terms.mk_int(1), None)));
}

#[test]
fn merge_from_symbolic_owner_then_solve() {
    let heap = Heap::default();
    let terms = heap.terms();
    let owner = terms.mk_addr(Address::new(1));
    let r = terms.mk_var("r", Sort::Addr);
    let g = terms.mk_var("g", Sort::Bool);
    let mut region = SetMemory::new().get_region(INTS);

    // s = {}; if g { s ∪= r }; s += 2
    region.union(&heap, r, owner, g);
    region.write(&heap, owner, terms.mk_int(2), terms.mk_true(), terms.mk_true());

    let three = terms.mk_int(3);
    let member = region.read(&heap, owner, three, None);
    assert_eq!(member, terms.mk_and(g, terms.mk_contains(r, three)));

    // The solver picks g = true, r = #7 with 3 ∈ #7, and renames #7 to #4.
    let model = Model::new()
        .assign("g", true)
        .assign("r", Address::new(7))
        .with_contains(Interpretation::new(false).with(Address::new(7), 3i64, true))
        .rename(Address::new(7), Address::new(4));

    assert!(terms.is_true(region.read(&heap, owner, three, Some(&model))));
    assert!(terms.is_true(region.read(&heap, owner, terms.mk_int(2), Some(&model))));
    assert!(terms.is_false(region.read(&heap, owner, terms.mk_int(5), Some(&model))));

    let entries = heap.decode(&model, &[member]);
    assert_eq!(entries.len(), 1);
    assert!(entries.get(Address::new(4), &Value::from(3i64)));
    assert!(!entries.get(Address::new(7), &Value::from(3i64)));
}

#[test]
fn substitution_resolves_symbolic_elements() {
    let heap = Heap::default();
    let terms = heap.terms();
    let owner = terms.mk_addr(Address::new(1));
    let x = terms.mk_var("x", Sort::Int);
    let y = terms.mk_var("y", Sort::Int);
    let mut region = SetMemory::new().get_region(INTS);

    region.write(&heap, owner, x, terms.mk_true(), terms.mk_true());
    region.write(&heap, owner, y, terms.mk_false(), terms.mk_true());

    let one = terms.mk_int(1);
    let distinct = Substitution::new().with(x, one).with(y, terms.mk_int(2));
    let aliased = Substitution::new().with(x, one).with(y, one);
    assert!(terms.is_true(region.read(&heap, owner, one, Some(&distinct))));
    assert!(terms.is_false(region.read(&heap, owner, one, Some(&aliased))));
}

#[test]
fn intersection_through_memory() {
    let heap = Heap::default();
    let terms = heap.terms();
    let a = terms.mk_addr(Address::new(1));
    let b = terms.mk_addr(Address::new(2));
    let g = terms.mk_var("g", Sort::Bool);
    let mut memory = SetMemory::new();

    let mut region = memory.get_region(INTS);
    for x in [1, 2, 3] {
        region.write(&heap, a, terms.mk_int(x), terms.mk_true(), terms.mk_true());
    }
    region.write(&heap, b, terms.mk_int(3), terms.mk_true(), g);
    memory.set_region(INTS, region);

    let size = heap.intersection_size(&memory, INTS, a, b, &Model::new());
    assert_eq!(size, terms.mk_ite(g, terms.mk_int(1), terms.mk_int(0)));

    let size = heap.intersection_size(&memory, INTS, a, b, &Model::new().assign("g", true));
    assert_eq!(size, terms.mk_int(1));
}

#[test]
fn heap_inspection() {
    let heap = Heap::default();
    let terms = heap.terms();
    let owner = terms.mk_addr(Address::new(1));
    let mut region = SetMemory::new().get_region(INTS);
    region.write(&heap, owner, terms.mk_int(1), terms.mk_true(), terms.mk_true());
    region.union(&heap, terms.mk_var("r", Sort::Addr), owner, terms.mk_true());

    let s = region.allocated(Address::new(1));
    let trace = heap.debug_log(s);
    assert_eq!(trace.updates.len(), 2);
    assert_eq!(trace.updates[0].kind, "ranged");
    assert_eq!(trace.updates[1].kind, "pinpoint");

    let dot = heap.to_dot(&[s]).unwrap();
    assert!(dot.contains("shape=diamond"));
    assert_eq!(heap.stats().nodes, 2);
}

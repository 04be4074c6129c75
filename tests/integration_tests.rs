//! Behavior-accounting tests for `PolyValue`.
//!
//! The container makes precise promises about how many object operations
//! (clones, in-place clone-assignments, drops) and how much allocator
//! traffic every operation performs. These tests pin those promises down
//! with a counting global allocator and probe types that tally their own
//! special member functions.
//!
//! All counters are thread-local so the suite stays deterministic under the
//! default multi-threaded test harness: each test only ever observes traffic
//! caused by its own thread.

use std::{
    alloc::{GlobalAlloc, Layout, System},
    any::Any,
    cell::Cell,
    mem,
};

use polyvalue::{
    PolyValue, StorageKind, capability,
    markers::InlineOnly,
    space::{S1, S2},
};
use static_assertions::{assert_impl_all, assert_not_impl_any};

// ---------------------------------------------------------------------------
// Allocator instrumentation
// ---------------------------------------------------------------------------

/// Forwards to the system allocator while tallying per-thread traffic.
struct CountingAllocator;

thread_local! {
    static ALLOCATIONS: Cell<u64> = const { Cell::new(0) };
    static DEALLOCATIONS: Cell<u64> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _ = ALLOCATIONS.try_with(|count| count.set(count.get() + 1));
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let _ = DEALLOCATIONS.try_with(|count| count.set(count.get() + 1));
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

/// Snapshot of this thread's (allocations, deallocations) so far.
fn allocator_counts() -> (u64, u64) {
    (ALLOCATIONS.with(Cell::get), DEALLOCATIONS.with(Cell::get))
}

// ---------------------------------------------------------------------------
// Probe types
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
struct Ops {
    clones: u32,
    clone_froms: u32,
    drops: u32,
}

thread_local! {
    static SMALL_OPS: Cell<Ops> = const { Cell::new(Ops { clones: 0, clone_froms: 0, drops: 0 }) };
    static BIG_OPS: Cell<Ops> = const { Cell::new(Ops { clones: 0, clone_froms: 0, drops: 0 }) };
}

fn reset_ops() {
    SMALL_OPS.with(|ops| ops.set(Ops::default()));
    BIG_OPS.with(|ops| ops.set(Ops::default()));
}

fn small_ops() -> Ops {
    SMALL_OPS.with(Cell::get)
}

fn big_ops() -> Ops {
    BIG_OPS.with(Cell::get)
}

fn bump(cell: &'static std::thread::LocalKey<Cell<Ops>>, f: impl FnOnce(&mut Ops)) {
    cell.with(|ops| {
        let mut current = ops.get();
        f(&mut current);
        ops.set(current);
    });
}

trait Payload {
    fn tag(&self) -> u64;
    fn set_tag(&mut self, tag: u64);
}

capability!(dyn Payload);
capability!(dyn Payload + Send);

/// Fits the default inline space comfortably.
struct SmallProbe {
    tag: u64,
}

impl SmallProbe {
    fn new(tag: u64) -> Self {
        Self { tag }
    }
}

impl Payload for SmallProbe {
    fn tag(&self) -> u64 {
        self.tag
    }

    fn set_tag(&mut self, tag: u64) {
        self.tag = tag;
    }
}

impl Clone for SmallProbe {
    fn clone(&self) -> Self {
        bump(&SMALL_OPS, |ops| ops.clones += 1);
        Self { tag: self.tag }
    }

    fn clone_from(&mut self, source: &Self) {
        bump(&SMALL_OPS, |ops| ops.clone_froms += 1);
        self.tag = source.tag;
    }
}

impl Drop for SmallProbe {
    fn drop(&mut self) {
        bump(&SMALL_OPS, |ops| ops.drops += 1);
    }
}

/// One pointer word past the default inline space, so it always spills.
struct BigProbe {
    tag: u64,
    _bulk: [usize; 3],
}

impl BigProbe {
    fn new(tag: u64) -> Self {
        Self {
            tag,
            _bulk: [0; 3],
        }
    }
}

impl Payload for BigProbe {
    fn tag(&self) -> u64 {
        self.tag
    }

    fn set_tag(&mut self, tag: u64) {
        self.tag = tag;
    }
}

impl Clone for BigProbe {
    fn clone(&self) -> Self {
        bump(&BIG_OPS, |ops| ops.clones += 1);
        Self {
            tag: self.tag,
            _bulk: self._bulk,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        bump(&BIG_OPS, |ops| ops.clone_froms += 1);
        self.tag = source.tag;
    }
}

impl Drop for BigProbe {
    fn drop(&mut self) {
        bump(&BIG_OPS, |ops| ops.drops += 1);
    }
}

// ---------------------------------------------------------------------------
// Auto-trait surface
// ---------------------------------------------------------------------------

assert_not_impl_any!(PolyValue<dyn Any>: Send, Sync);
assert_not_impl_any!(PolyValue<dyn Payload + Send>: Sync);
assert_impl_all!(PolyValue<dyn Payload + Send>: Send);
assert_impl_all!(PolyValue<dyn Any + Send + Sync>: Send, Sync);

// ---------------------------------------------------------------------------
// Lifecycle accounting
// ---------------------------------------------------------------------------

#[test]
fn small_object_lifecycle_never_allocates() {
    reset_ops();
    let (alloc0, dealloc0) = allocator_counts();
    {
        let value: PolyValue<dyn Payload> = PolyValue::new(SmallProbe::new(1));
        assert_eq!(value.tag(), 1);
        assert_eq!(value.storage_kind(), StorageKind::Inline);
        assert_eq!(allocator_counts(), (alloc0, dealloc0));
    }
    assert_eq!(allocator_counts(), (alloc0, dealloc0));
    assert_eq!(small_ops(), Ops { clones: 0, clone_froms: 0, drops: 1 });
}

#[test]
fn big_object_allocates_exactly_once() {
    reset_ops();
    let (alloc0, dealloc0) = allocator_counts();
    {
        let value: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(2));
        assert_eq!(value.tag(), 2);
        assert_eq!(value.storage_kind(), StorageKind::Heap);
        assert_eq!(allocator_counts(), (alloc0 + 1, dealloc0));
    }
    assert_eq!(allocator_counts(), (alloc0 + 1, dealloc0 + 1));
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 0, drops: 1 });
}

// ---------------------------------------------------------------------------
// Clone accounting
// ---------------------------------------------------------------------------

#[test]
fn small_clone_is_one_clone_and_no_allocation() {
    reset_ops();
    let value: PolyValue<dyn Payload> = PolyValue::new(SmallProbe::new(7));
    let (alloc0, dealloc0) = allocator_counts();
    let copy = value.clone();
    assert_eq!(allocator_counts(), (alloc0, dealloc0));
    assert_eq!(small_ops(), Ops { clones: 1, clone_froms: 0, drops: 0 });
    assert_eq!(copy.tag(), 7);
}

#[test]
fn big_clone_is_one_clone_and_one_allocation() {
    reset_ops();
    let value: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(7));
    let (alloc0, dealloc0) = allocator_counts();
    let copy = value.clone();
    assert_eq!(allocator_counts(), (alloc0 + 1, dealloc0));
    assert_eq!(big_ops(), Ops { clones: 1, clone_froms: 0, drops: 0 });
    assert_eq!(copy.tag(), 7);
}

#[test]
fn clones_are_independent_objects() {
    reset_ops();
    let mut original: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(1));
    let copy = original.clone();
    original.set_tag(99);
    assert_eq!(original.tag(), 99);
    assert_eq!(copy.tag(), 1);
}

// ---------------------------------------------------------------------------
// Move accounting
// ---------------------------------------------------------------------------

#[test]
fn moves_touch_nothing_inline_or_heap() {
    reset_ops();
    let small: PolyValue<dyn Payload> = PolyValue::new(SmallProbe::new(3));
    let big: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(4));
    let (alloc0, dealloc0) = allocator_counts();

    let small_moved = small;
    let big_moved = big;

    assert_eq!(allocator_counts(), (alloc0, dealloc0));
    assert_eq!(small_ops(), Ops { clones: 0, clone_froms: 0, drops: 0 });
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 0, drops: 0 });
    assert_eq!(small_moved.tag(), 3);
    assert_eq!(big_moved.tag(), 4);
}

#[test]
fn move_assignment_destroys_old_value_exactly_once() {
    reset_ops();
    let mut dest: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(1));
    let source: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(2));
    assert_eq!(dest.tag(), 1);
    let (alloc0, dealloc0) = allocator_counts();

    dest = source;

    assert_eq!(allocator_counts(), (alloc0, dealloc0 + 1));
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 0, drops: 1 });
    assert_eq!(dest.tag(), 2);
}

#[test]
fn swapping_containers_touches_nothing() {
    reset_ops();
    let mut small: PolyValue<dyn Payload> = PolyValue::new(SmallProbe::new(5));
    let mut big: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(6));
    let (alloc0, dealloc0) = allocator_counts();

    mem::swap(&mut small, &mut big);

    assert_eq!(allocator_counts(), (alloc0, dealloc0));
    assert_eq!(small_ops(), Ops { clones: 0, clone_froms: 0, drops: 0 });
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 0, drops: 0 });
    assert_eq!(small.tag(), 6);
    assert_eq!(big.tag(), 5);
    assert_eq!(small.storage_kind(), StorageKind::Heap);
    assert_eq!(big.storage_kind(), StorageKind::Inline);
}

// ---------------------------------------------------------------------------
// clone_from accounting: same type reuses the cell in place
// ---------------------------------------------------------------------------

#[test]
fn clone_from_same_small_type_assigns_in_place() {
    reset_ops();
    let mut dest: PolyValue<dyn Payload> = PolyValue::new(SmallProbe::new(7));
    let source: PolyValue<dyn Payload> = PolyValue::new(SmallProbe::new(8));
    let (alloc0, dealloc0) = allocator_counts();

    dest.clone_from(&source);

    assert_eq!(allocator_counts(), (alloc0, dealloc0));
    assert_eq!(small_ops(), Ops { clones: 0, clone_froms: 1, drops: 0 });
    assert_eq!(dest.tag(), 8);
    assert_eq!(source.tag(), 8);
}

#[test]
fn clone_from_same_big_type_assigns_through_pointers() {
    reset_ops();
    let mut dest: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(7));
    let source: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(8));
    let (alloc0, dealloc0) = allocator_counts();

    dest.clone_from(&source);

    assert_eq!(allocator_counts(), (alloc0, dealloc0));
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 1, drops: 0 });
    assert_eq!(dest.tag(), 8);
}

// ---------------------------------------------------------------------------
// clone_from accounting: changing type destroys once and rebuilds
// ---------------------------------------------------------------------------

#[test]
fn clone_from_big_onto_small_holder() {
    reset_ops();
    let mut dest: PolyValue<dyn Payload> = PolyValue::new(SmallProbe::new(1));
    let source: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(2));
    let (alloc0, dealloc0) = allocator_counts();

    dest.clone_from(&source);

    // One allocation for the incoming heap clone; the outgoing small value
    // was inline, so nothing is freed.
    assert_eq!(allocator_counts(), (alloc0 + 1, dealloc0));
    assert_eq!(small_ops(), Ops { clones: 0, clone_froms: 0, drops: 1 });
    assert_eq!(big_ops(), Ops { clones: 1, clone_froms: 0, drops: 0 });
    assert_eq!(dest.tag(), 2);
    assert_eq!(dest.storage_kind(), StorageKind::Heap);
}

#[test]
fn clone_from_small_onto_big_holder() {
    reset_ops();
    let mut dest: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(1));
    let source: PolyValue<dyn Payload> = PolyValue::new(SmallProbe::new(2));
    let (alloc0, dealloc0) = allocator_counts();

    dest.clone_from(&source);

    // The incoming small clone is inline (no allocation); the outgoing big
    // value's block is freed.
    assert_eq!(allocator_counts(), (alloc0, dealloc0 + 1));
    assert_eq!(small_ops(), Ops { clones: 1, clone_froms: 0, drops: 0 });
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 0, drops: 1 });
    assert_eq!(dest.tag(), 2);
    assert_eq!(dest.storage_kind(), StorageKind::Inline);
}

// ---------------------------------------------------------------------------
// Assignment from bare values
// ---------------------------------------------------------------------------

#[test]
fn set_same_type_moves_over_the_old_value() {
    reset_ops();
    let mut value: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(1));
    let (alloc0, dealloc0) = allocator_counts();

    value.set(BigProbe::new(2));

    // The replacement moves over the pointee: the old value is dropped, and
    // neither a new block is allocated nor the old one freed.
    assert_eq!(allocator_counts(), (alloc0, dealloc0));
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 0, drops: 1 });
    assert_eq!(value.tag(), 2);
}

#[test]
fn set_big_onto_small_holder() {
    reset_ops();
    let mut value: PolyValue<dyn Payload> = PolyValue::new(SmallProbe::new(1));
    let (alloc0, dealloc0) = allocator_counts();

    value.set(BigProbe::new(2));

    assert_eq!(allocator_counts(), (alloc0 + 1, dealloc0));
    assert_eq!(small_ops(), Ops { clones: 0, clone_froms: 0, drops: 1 });
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 0, drops: 0 });
    assert_eq!(value.storage_kind(), StorageKind::Heap);
    assert_eq!(value.tag(), 2);
}

#[test]
fn set_small_onto_big_holder() {
    reset_ops();
    let mut value: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(1));
    let (alloc0, dealloc0) = allocator_counts();

    value.set(SmallProbe::new(2));

    assert_eq!(allocator_counts(), (alloc0, dealloc0 + 1));
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 0, drops: 1 });
    assert_eq!(value.storage_kind(), StorageKind::Inline);
    assert_eq!(value.tag(), 2);
}

#[test]
fn set_from_same_type_clones_in_place() {
    reset_ops();
    let mut value: PolyValue<dyn Payload> = PolyValue::new(SmallProbe::new(1));
    let external = SmallProbe::new(2);
    let (alloc0, dealloc0) = allocator_counts();

    value.set_from(&external);

    assert_eq!(allocator_counts(), (alloc0, dealloc0));
    assert_eq!(small_ops(), Ops { clones: 0, clone_froms: 1, drops: 0 });
    assert_eq!(value.tag(), 2);
    assert_eq!(external.tag(), 2);
}

#[test]
fn set_from_different_type_clones_once_and_destroys_once() {
    reset_ops();
    let mut value: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(1));
    let external = SmallProbe::new(2);
    let (alloc0, dealloc0) = allocator_counts();

    value.set_from(&external);

    assert_eq!(allocator_counts(), (alloc0, dealloc0 + 1));
    assert_eq!(small_ops(), Ops { clones: 1, clone_froms: 0, drops: 0 });
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 0, drops: 1 });
    assert_eq!(value.tag(), 2);
}

#[test]
fn emplace_always_rebuilds_even_for_the_same_type() {
    reset_ops();
    let mut value: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(1));
    let (alloc0, dealloc0) = allocator_counts();

    value.emplace(BigProbe::new(2));

    // No fast path: a fresh block is built and the old one destroyed.
    assert_eq!(allocator_counts(), (alloc0 + 1, dealloc0 + 1));
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 0, drops: 1 });
    assert_eq!(value.tag(), 2);
}

// ---------------------------------------------------------------------------
// Downcasting
// ---------------------------------------------------------------------------

#[test]
fn downcast_mismatch_returns_container_intact() {
    reset_ops();
    let value: PolyValue<dyn Payload> = PolyValue::new(SmallProbe::new(9));
    let value = match value.downcast::<BigProbe>() {
        Ok(_) => panic!("downcast to the wrong concrete type must fail"),
        Err(value) => value,
    };
    assert_eq!(value.tag(), 9);
    assert_eq!(small_ops(), Ops { clones: 0, clone_froms: 0, drops: 0 });
}

#[test]
fn downcast_of_heap_value_releases_the_allocation() {
    reset_ops();
    let value: PolyValue<dyn Payload> = PolyValue::new(BigProbe::new(9));
    let (alloc0, dealloc0) = allocator_counts();

    let inner = value.downcast::<BigProbe>().ok().unwrap();
    assert_eq!(allocator_counts(), (alloc0, dealloc0 + 1));
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 0, drops: 0 });

    assert_eq!(inner.tag(), 9);
    drop(inner);
    assert_eq!(big_ops(), Ops { clones: 0, clone_froms: 0, drops: 1 });
}

#[test]
fn downcast_refs_observe_and_mutate() {
    let mut value: PolyValue<dyn Payload> = PolyValue::new(SmallProbe::new(1));
    assert!(value.downcast_ref::<BigProbe>().is_none());
    value.downcast_mut::<SmallProbe>().unwrap().tag = 5;
    assert_eq!(value.downcast_ref::<SmallProbe>().unwrap().tag, 5);
    assert_eq!(value.contained_type_id(), std::any::TypeId::of::<SmallProbe>());
    assert!(value.contained_type_name().contains("SmallProbe"));
}

// ---------------------------------------------------------------------------
// Placement boundaries and policy
// ---------------------------------------------------------------------------

#[test]
fn placement_follows_size_and_alignment_bounds() {
    // Exactly at capacity: inline. One word over: heap.
    let exact: PolyValue<dyn Any, S2> = PolyValue::new([0usize; 2]);
    let over: PolyValue<dyn Any, S2> = PolyValue::new([0usize; 3]);
    assert!(!exact.is_heap());
    assert!(over.is_heap());

    // Over-aligned types spill no matter how small they are.
    #[derive(Clone)]
    #[repr(align(64))]
    struct Overaligned(u8);
    let aligned: PolyValue<dyn Any> = PolyValue::new(Overaligned(0));
    assert!(aligned.is_heap());

    // Zero-sized types are always inline.
    #[derive(Clone)]
    struct Nothing;
    let nothing: PolyValue<dyn Any, S1> = PolyValue::new(Nothing);
    assert!(!nothing.is_heap());
}

#[test]
fn inline_only_policy_works_for_fitting_types() {
    reset_ops();
    let (alloc0, dealloc0) = allocator_counts();
    let mut value: PolyValue<dyn Payload, S2, InlineOnly> = PolyValue::new(SmallProbe::new(1));
    value.set(SmallProbe::new(2));
    value.set_from(&SmallProbe::new(3));
    value.emplace(SmallProbe::new(4));
    assert_eq!(value.tag(), 4);
    drop(value);
    assert_eq!(allocator_counts(), (alloc0, dealloc0));
}

#[test]
fn dyn_any_capability_is_built_in() {
    let mut value: PolyValue<dyn Any> = PolyValue::new(17u32);
    *value.downcast_mut::<u32>().unwrap() += 1;
    assert_eq!(value.downcast::<u32>().ok(), Some(18));
}

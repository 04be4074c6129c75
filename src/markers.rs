//! Marker types and traits for the allocation policy of a
//! [`PolyValue`](crate::PolyValue).
//!
//! The third type parameter of [`PolyValue<B, Space, A>`](crate::PolyValue)
//! selects what happens when a concrete type does not fit the inline space:
//!
//! - [`Spillable`] (the default): the value spills to a single heap
//!   allocation, and whole-container moves of such values are one pointer
//!   copy.
//! - [`InlineOnly`]: heap storage is forbidden. Any construction,
//!   assignment, or emplacement of a concrete type that the
//!   [decision rule](crate::stored_inline) routes to the heap **fails to
//!   compile** — the policy is enforced at monomorphization time, not by a
//!   runtime branch.
//!
//! The constraint is enforced on every path that builds a value, so it is
//! impossible to end up with a heap-stored value inside an
//! `InlineOnly` container.
//!
//! # Examples
//!
//! ```
//! use polyvalue::{PolyValue, markers::InlineOnly, space::S2};
//! use std::any::Any;
//!
//! // Compiles: a u32 fits two pointer words.
//! let value: PolyValue<dyn Any, S2, InlineOnly> = PolyValue::new(7u32);
//! assert!(!value.is_heap());
//! ```
//!
//! ```compile_fail
//! use polyvalue::{PolyValue, markers::InlineOnly, space::S2};
//! use std::any::Any;
//!
//! // Fails to compile: 32 bytes cannot fit two pointer words, and the
//! // policy forbids spilling to the heap.
//! let value: PolyValue<dyn Any, S2, InlineOnly> = PolyValue::new([0u64; 4]);
//! ```

/// Marker type for containers that may spill large values to the heap.
///
/// This is the default policy: a concrete type that fits the inline space is
/// stored inline, anything else is placed behind exactly one heap
/// allocation.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Spillable;

/// Marker type for containers that must never allocate.
///
/// Any attempt to store a concrete type that does not fit the inline space
/// is rejected at build time.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct InlineOnly;

mod sealed_allocation_marker {
    use super::*;

    pub trait Sealed: 'static {}

    impl Sealed for Spillable {}
    impl Sealed for InlineOnly {}
}

/// Trait implemented by the two allocation-policy markers, [`Spillable`] and
/// [`InlineOnly`].
///
/// This trait is sealed and cannot be implemented outside this crate.
pub trait AllocationMarker: sealed_allocation_marker::Sealed {
    /// Whether values may be placed behind a heap allocation under this
    /// policy.
    const ALLOW_ALLOCATIONS: bool;
}

impl AllocationMarker for Spillable {
    const ALLOW_ALLOCATIONS: bool = true;
}

impl AllocationMarker for InlineOnly {
    const ALLOW_ALLOCATIONS: bool = false;
}

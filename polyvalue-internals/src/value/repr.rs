//! The storage cell: a fixed-size block holding a value inline or through an
//! owned heap pointer.
//!
//! This module encapsulates the fields of [`CellRepr`]. Since this is the
//! only place they are visible, every construction of a cell goes through
//! [`CellRepr::build`] (or one of its two arms), which places the value
//! according to [`stored_inline`]. The cell deliberately stores no record of
//! which union variant is live: that information is implied entirely by the
//! [`ValueVtable`] paired with the cell by [`RawValue`], whose
//! [`StorageKind`] was derived from the same decision rule at the same
//! monomorphization site.
//!
//! # Safety Invariant
//!
//! A cell built by `build::<T>` holds exactly one live `T`, addressable
//! through exactly one of the two variants, and the variant agrees with
//! `stored_inline::<T, Space>()`. The cell has no other operations; reading
//! either variant is only sound for callers that know (via the paired
//! vtable) which one is live.
//!
//! [`ValueVtable`]: crate::value::vtable::ValueVtable
//! [`StorageKind`]: crate::value::vtable::StorageKind
//! [`RawValue`]: crate::value::raw::RawValue

use alloc::boxed::Box;
use core::{
    mem::{ManuallyDrop, MaybeUninit, align_of, size_of},
    ptr::NonNull,
};

/// The storage-kind decision rule: `true` exactly when a value of type `T`
/// is placed inside the cell itself rather than behind a heap allocation.
///
/// A type is stored inline when it fits the cell's size and alignment. The
/// cell is a union of the `Space` marker and one thin pointer, so both
/// bounds are automatically clamped upward to at least one pointer — the
/// heap variant always needs room for its pointer anyway.
///
/// The third condition the same decision classically carries — that
/// relocating the value cannot fail — is vacuously true here: every Rust
/// move is a non-unwinding bitwise relocation.
///
/// This is a pure function of `T` and `Space`, evaluated per concrete type
/// at monomorphization time, never per instance.
pub const fn stored_inline<T, Space>() -> bool {
    size_of::<T>() <= size_of::<CellRepr<Space>>()
        && align_of::<T>() <= align_of::<CellRepr<Space>>()
}

/// A fixed-size, fixed-alignment cell holding, in mutual exclusion, either
/// an inline value or one owned heap pointer to it.
///
/// `#[repr(C)]` guarantees both variants live at offset zero, which is what
/// allows [`inline_ptr`](CellRepr::inline_ptr) to address the inline value
/// by casting a pointer to the whole cell.
#[repr(C)]
pub(crate) union CellRepr<Space> {
    /// Inline storage: when live, holds a value of the concrete type the
    /// paired vtable was instantiated with, not a `Space`. `Space` only
    /// donates its size and alignment.
    inline: ManuallyDrop<MaybeUninit<Space>>,
    /// Heap storage: when live, a pointer obtained from [`Box::into_raw`]
    /// over the concrete type, exclusively owned by this cell.
    heap: *mut (),
}

impl<Space> CellRepr<Space> {
    /// Builds a cell holding `value`, placed per [`stored_inline`].
    pub(crate) fn build<T>(value: T) -> Self {
        if stored_inline::<T, Space>() {
            Self::build_inline(value)
        } else {
            Self::build_heap(value)
        }
    }

    /// Builds a cell holding `value` in the inline variant.
    ///
    /// Only called for types that pass the decision rule; the debug
    /// assertion guards against a divergence between this arm and the
    /// vtable that will describe the cell.
    pub(crate) fn build_inline<T>(value: T) -> Self {
        debug_assert!(stored_inline::<T, Space>());
        let mut repr = Self {
            inline: ManuallyDrop::new(MaybeUninit::uninit()),
        };
        let slot = NonNull::from(&mut repr).cast::<T>();
        // SAFETY: `stored_inline` guarantees the cell is large enough and
        // sufficiently aligned for a `T`, and `slot` points at the start of
        // the freshly created cell, which holds no live value yet.
        unsafe { slot.as_ptr().write(value) };
        repr
    }

    /// Builds a cell holding `value` behind exactly one heap allocation.
    pub(crate) fn build_heap<T>(value: T) -> Self {
        Self {
            heap: Box::into_raw(Box::new(value)).cast::<()>(),
        }
    }

    /// Returns a pointer to the inline value.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The cell's live variant is `inline`.
    /// 2. `T` is the concrete type the cell was built with.
    pub(crate) unsafe fn inline_ptr<T>(cell: NonNull<Self>) -> *mut T {
        cell.cast::<T>().as_ptr()
    }

    /// Returns the pointer to the heap-owned value.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The cell's live variant is `heap`.
    /// 2. `T` is the concrete type the cell was built with.
    pub(crate) unsafe fn heap_ptr<T>(cell: NonNull<Self>) -> *mut T {
        // SAFETY: the caller guarantees the heap variant is live, so the
        // union read observes the pointer written by `build_heap`.
        let thin = unsafe { (*cell.as_ptr()).heap };
        thin.cast::<T>()
    }
}

//! Vtable for type-erased value operations.
//!
//! This module contains the [`ValueVtable`], which enables destroying,
//! cloning, assigning, and dereferencing a stored value when its concrete
//! type `T` has been erased. The vtable stores function pointers that
//! dispatch to the correct typed implementations, instantiated for exactly
//! one (concrete type, storage kind) pair.
//!
//! There are two sets of entry points — [`inline`] and [`heap`] — one per
//! storage kind. [`ValueVtable::new`] selects between them with the same
//! [`stored_inline`] decision the cell constructor uses, so a vtable and the
//! cell it is paired with can never disagree about placement. The cell
//! itself stores no discriminant; [`ValueVtable::kind`] is the only record
//! of which representation is live.
//!
//! This module encapsulates the fields of [`ValueVtable`] so they cannot be
//! accessed directly. This visibility restriction guarantees the safety
//! invariant: **the vtable's function pointers always match the concrete
//! type and storage kind recorded in the same table**.
//!
//! # Safety Invariant
//!
//! This invariant is maintained because vtables are created as `&'static`
//! references via [`ValueVtable::new`], which pairs the function pointers,
//! the [`TypeId`] entry, and the [`StorageKind`] with a specific `T` at
//! compile time. Exactly one table exists per instantiation for the life of
//! the process, and it is never mutated.

use alloc::boxed::Box;
use core::{
    any::{TypeId, type_name},
    ptr::NonNull,
};

use crate::{
    capability::Capability,
    value::repr::{CellRepr, stored_inline},
};

/// Storage placement of an erased value.
///
/// The kind is a property of the vtable describing a cell, never of the
/// cell: assigning a value of a different concrete type to a container
/// switches its vtable, and with it the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// The value lives directly inside the container's cell; no allocation
    /// is ever performed for it.
    Inline,
    /// The cell holds one owning pointer to the value; construction
    /// allocates exactly once, destruction deallocates exactly once, and
    /// whole-container moves transfer the pointer without touching the
    /// value.
    Heap,
}

/// Vtable for type-erased value operations.
///
/// Contains function pointers for performing operations on a [`CellRepr`]
/// without knowing the concrete type of the value it holds.
///
/// # Safety
///
/// The following safety invariants are guaranteed to be upheld as long as
/// this struct exists:
///
/// * The fields `drop`, `clone_cell`, `clone_assign`, and `as_base` all
///   point to the functions of the [`inline`] or [`heap`] module below,
///   instantiated with the same concrete type `T` that was used to create
///   this [`ValueVtable`].
/// * `kind` equals `stored_inline::<T, Space>()`'s verdict for that `T`, and
///   selects which of the two modules the pointers come from.
pub(crate) struct ValueVtable<B: ?Sized + 'static, Space: 'static> {
    /// Gets the [`TypeId`] of the concrete type that was used to create this
    /// [`ValueVtable`].
    type_id: fn() -> TypeId,
    /// Gets the [`core::any::type_name`] of that concrete type.
    type_name: fn() -> &'static str,
    /// The storage placement this vtable's entries were generated for.
    kind: StorageKind,
    /// Destroys the value in the cell: drops it in place (inline) or drops
    /// it and frees the allocation (heap).
    drop: unsafe fn(NonNull<CellRepr<Space>>),
    /// Builds a new cell of the same kind holding a clone of the source
    /// cell's value.
    clone_cell: unsafe fn(NonNull<CellRepr<Space>>) -> CellRepr<Space>,
    /// Clones the source cell's value onto the destination cell's value in
    /// place; both cells must hold this vtable's concrete type.
    clone_assign: unsafe fn(NonNull<CellRepr<Space>>, NonNull<CellRepr<Space>>),
    /// Returns the stored value viewed through the capability set `B`.
    as_base: unsafe fn(NonNull<CellRepr<Space>>) -> NonNull<B>,
}

impl<B: ?Sized + 'static, Space: 'static> ValueVtable<B, Space> {
    /// Creates the [`ValueVtable`] for the concrete type `T`, selecting the
    /// entry set matching `stored_inline::<T, Space>()`.
    pub(crate) const fn new<T>() -> &'static Self
    where
        T: Clone + 'static,
        B: Capability<T>,
    {
        if stored_inline::<T, Space>() {
            const {
                &Self {
                    type_id: TypeId::of::<T>,
                    type_name: type_name::<T>,
                    kind: StorageKind::Inline,
                    drop: inline::drop::<T, Space>,
                    clone_cell: inline::clone_cell::<T, Space>,
                    clone_assign: inline::clone_assign::<T, Space>,
                    as_base: inline::as_base::<T, B, Space>,
                }
            }
        } else {
            const {
                &Self {
                    type_id: TypeId::of::<T>,
                    type_name: type_name::<T>,
                    kind: StorageKind::Heap,
                    drop: heap::drop::<T, Space>,
                    clone_cell: heap::clone_cell::<T, Space>,
                    clone_assign: heap::clone_assign::<T, Space>,
                    as_base: heap::as_base::<T, B, Space>,
                }
            }
        }
    }

    /// Gets the [`TypeId`] of the concrete type that was used to create this
    /// [`ValueVtable`].
    #[inline]
    pub(crate) fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Gets the [`core::any::type_name`] of the concrete type that was used
    /// to create this [`ValueVtable`].
    #[inline]
    pub(crate) fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Gets the storage placement this vtable's entries were generated for.
    #[inline]
    pub(crate) fn kind(&self) -> StorageKind {
        self.kind
    }

    /// Destroys the value in the cell.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`ValueVtable`] is the vtable paired with the cell.
    /// 2. The cell holds a live value, and the caller is entitled to end its
    ///    lifetime: the cell must not be read through again before being
    ///    rebuilt or discarded.
    #[inline]
    pub(crate) unsafe fn drop(&self, cell: NonNull<CellRepr<Space>>) {
        // SAFETY: `self.drop` points to `inline::drop::<T>` or
        // `heap::drop::<T>` for the cell's actual `T` and kind; its
        // requirements are guaranteed by the caller.
        unsafe { (self.drop)(cell) }
    }

    /// Builds a new cell holding a clone of the source cell's value. The new
    /// cell has the same concrete type and storage kind and must be paired
    /// with this same vtable.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`ValueVtable`] is the vtable paired with the source cell.
    /// 2. The source cell holds a live value.
    #[inline]
    pub(crate) unsafe fn clone_cell(&self, cell: NonNull<CellRepr<Space>>) -> CellRepr<Space> {
        // SAFETY: `self.clone_cell` matches the cell's `T` and kind; its
        // requirements are guaranteed by the caller.
        unsafe { (self.clone_cell)(cell) }
    }

    /// Clones the source cell's value onto the destination cell's value in
    /// place, via [`Clone::clone_from`]. No cell is destroyed or rebuilt,
    /// and the heap kind performs no allocation.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`ValueVtable`] is the vtable paired with **both** cells,
    ///    i.e. both hold live values of this vtable's concrete type in this
    ///    vtable's storage kind.
    /// 2. `src` and `dst` are distinct cells.
    #[inline]
    pub(crate) unsafe fn clone_assign(
        &self,
        src: NonNull<CellRepr<Space>>,
        dst: NonNull<CellRepr<Space>>,
    ) {
        // SAFETY: `self.clone_assign` matches both cells' `T` and kind; its
        // requirements are guaranteed by the caller.
        unsafe { (self.clone_assign)(src, dst) }
    }

    /// Returns the stored value viewed through the capability set `B`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`ValueVtable`] is the vtable paired with the cell.
    /// 2. The cell holds a live value.
    ///
    /// The returned pointer borrows from the cell; the caller must enforce
    /// Rust's aliasing rules when turning it into a reference.
    #[inline]
    pub(crate) unsafe fn as_base(&self, cell: NonNull<CellRepr<Space>>) -> NonNull<B> {
        // SAFETY: `self.as_base` matches the cell's `T` and kind; its
        // requirements are guaranteed by the caller.
        unsafe { (self.as_base)(cell) }
    }
}

/// Entry points for cells whose value is stored inline.
mod inline {
    use super::*;

    /// Drops the inline value in place.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The cell holds a live inline `T`.
    /// 2. The value is not used again before the cell is rebuilt or
    ///    discarded.
    pub(super) unsafe fn drop<T, Space>(cell: NonNull<CellRepr<Space>>) {
        // SAFETY: guaranteed by the caller.
        unsafe { CellRepr::inline_ptr::<T>(cell).drop_in_place() }
    }

    /// Builds a new cell holding a clone of the inline value.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The source cell holds a live inline `T`.
    pub(super) unsafe fn clone_cell<T: Clone, Space>(
        src: NonNull<CellRepr<Space>>,
    ) -> CellRepr<Space> {
        // SAFETY: guaranteed by the caller.
        let source = unsafe { &*CellRepr::inline_ptr::<T>(src).cast_const() };
        CellRepr::build_inline(source.clone())
    }

    /// Clones the source's inline value onto the destination's inline value
    /// in place.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Both cells hold live inline `T`s.
    /// 2. `src` and `dst` are distinct cells.
    pub(super) unsafe fn clone_assign<T: Clone, Space>(
        src: NonNull<CellRepr<Space>>,
        dst: NonNull<CellRepr<Space>>,
    ) {
        // SAFETY: guaranteed by the caller; the cells are distinct, so the
        // two references cannot alias.
        let source = unsafe { &*CellRepr::inline_ptr::<T>(src).cast_const() };
        // SAFETY: guaranteed by the caller.
        let dest = unsafe { &mut *CellRepr::inline_ptr::<T>(dst) };
        dest.clone_from(source);
    }

    /// Returns the inline value viewed through the capability set `B`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The cell holds a live inline `T`.
    pub(super) unsafe fn as_base<T, B, Space>(cell: NonNull<CellRepr<Space>>) -> NonNull<B>
    where
        B: ?Sized + Capability<T>,
    {
        // SAFETY: guaranteed by the caller.
        let concrete = unsafe { CellRepr::inline_ptr::<T>(cell) };
        let erased = B::erase(concrete.cast_const()).cast_mut();
        // SAFETY: `erase` preserves the address of a live value, which is
        // never null.
        unsafe { NonNull::new_unchecked(erased) }
    }
}

/// Entry points for cells whose value is heap-owned.
mod heap {
    use super::*;

    /// Drops the heap-owned value and frees its allocation.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The cell holds a live heap pointer to a `T`, obtained from
    ///    [`Box::into_raw`] by the cell's constructor.
    /// 2. Ownership of the pointer is transferred to this call: it must not
    ///    have been freed before, and must not be used afterwards.
    pub(super) unsafe fn drop<T, Space>(cell: NonNull<CellRepr<Space>>) {
        // SAFETY: guaranteed by the caller.
        let ptr = unsafe { CellRepr::heap_ptr::<T>(cell) };
        // SAFETY: the pointer comes from `Box::into_raw` and ownership is
        // transferred here, both guaranteed by the caller.
        let boxed = unsafe { Box::from_raw(ptr) };
        core::mem::drop(boxed);
    }

    /// Builds a new cell owning a fresh allocation holding a clone of the
    /// source's heap value.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The source cell holds a live heap pointer to a `T`.
    pub(super) unsafe fn clone_cell<T: Clone, Space>(
        src: NonNull<CellRepr<Space>>,
    ) -> CellRepr<Space> {
        // SAFETY: guaranteed by the caller.
        let source = unsafe { &*CellRepr::heap_ptr::<T>(src).cast_const() };
        CellRepr::build_heap(source.clone())
    }

    /// Clones the source's heap value onto the destination's heap value in
    /// place, through both pointers. No allocation takes place.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Both cells hold live heap pointers to `T`s.
    /// 2. `src` and `dst` are distinct cells.
    pub(super) unsafe fn clone_assign<T: Clone, Space>(
        src: NonNull<CellRepr<Space>>,
        dst: NonNull<CellRepr<Space>>,
    ) {
        // SAFETY: guaranteed by the caller; distinct cells own distinct
        // allocations, so the two references cannot alias.
        let source = unsafe { &*CellRepr::heap_ptr::<T>(src).cast_const() };
        // SAFETY: guaranteed by the caller.
        let dest = unsafe { &mut *CellRepr::heap_ptr::<T>(dst) };
        dest.clone_from(source);
    }

    /// Returns the heap-owned value viewed through the capability set `B`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The cell holds a live heap pointer to a `T`.
    pub(super) unsafe fn as_base<T, B, Space>(cell: NonNull<CellRepr<Space>>) -> NonNull<B>
    where
        B: ?Sized + Capability<T>,
    {
        // SAFETY: guaranteed by the caller.
        let concrete = unsafe { CellRepr::heap_ptr::<T>(cell) };
        let erased = B::erase(concrete.cast_const()).cast_mut();
        // SAFETY: `erase` preserves the address of a live heap value, which
        // is never null.
        unsafe { NonNull::new_unchecked(erased) }
    }
}

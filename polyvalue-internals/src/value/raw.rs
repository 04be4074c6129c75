//! The owned, type-erased value: a storage cell paired with the one vtable
//! that describes it.
//!
//! This module encapsulates the fields of [`RawValue`], ensuring they are
//! only visible within this file. This visibility restriction guarantees the
//! safety invariant: **the vtable always matches the concrete type and
//! storage kind of the value currently in the cell**. The pairing is
//! established by [`RawValue::new`], and every operation that replaces the
//! cell's content ([`replace`], the rebuild arm of [`Clone::clone_from`])
//! swaps in the matching vtable in the same breath.
//!
//! There is no empty state: a [`RawValue`] holds a live value from
//! construction until its [`Drop`] runs, and the rebuild paths construct the
//! replacement before destroying the old value, so the invariant holds even
//! while a panicking `clone` unwinds through an assignment.
//!
//! [`replace`]: RawValue::replace

use alloc::boxed::Box;
use core::{any::TypeId, mem::ManuallyDrop, ptr::NonNull};

use crate::{
    capability::Capability,
    value::{
        repr::CellRepr,
        vtable::{StorageKind, ValueVtable},
    },
};

/// An owned value of some erased concrete type, viewed through the
/// capability set `B`, stored inline when it fits a `Space` and heap-owned
/// otherwise.
///
/// This is the unsafe core of the `polyvalue` container; the public crate
/// wraps it without adding state.
pub struct RawValue<B, Space>
where
    B: ?Sized + 'static,
    Space: 'static,
{
    /// The vtable describing the cell.
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long
    /// as this struct exists:
    ///
    /// 1. The vtable was instantiated with the concrete type of the value
    ///    currently stored in `repr`.
    /// 2. The vtable's storage kind names the live variant of `repr`.
    vtable: &'static ValueVtable<B, Space>,
    /// The storage cell.
    ///
    /// # Safety
    ///
    /// Holds exactly one live value from construction until `Drop`, except
    /// momentarily inside the methods of this module that destroy and
    /// rebuild it.
    repr: CellRepr<Space>,
}

impl<B, Space> RawValue<B, Space>
where
    B: ?Sized + 'static,
    Space: 'static,
{
    /// Creates a new [`RawValue`] storing `value`, placed inline or on the
    /// heap per the decision rule.
    #[inline]
    pub fn new<T>(value: T) -> Self
    where
        T: Clone + 'static,
        B: Capability<T>,
    {
        Self {
            vtable: ValueVtable::new::<T>(),
            repr: CellRepr::build(value),
        }
    }

    /// Returns the [`TypeId`] of the stored concrete type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.vtable.type_id()
    }

    /// Returns the [`core::any::type_name`] of the stored concrete type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.vtable.type_name()
    }

    /// Returns where the stored value lives.
    #[inline]
    pub fn kind(&self) -> StorageKind {
        self.vtable.kind()
    }

    /// Returns `true` if the stored concrete type is `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id() == TypeId::of::<T>()
    }

    /// Returns the stored value viewed through the capability set.
    #[inline]
    pub fn as_base(&self) -> &B {
        // SAFETY: the vtable matches the cell per the field invariants, the
        // cell holds a live value, and the reference is bound to `&self`.
        unsafe { self.vtable.as_base(NonNull::from(&self.repr)).as_ref() }
    }

    /// Returns the stored value viewed mutably through the capability set.
    #[inline]
    pub fn as_base_mut(&mut self) -> &mut B {
        // SAFETY: the vtable matches the cell per the field invariants and
        // the cell holds a live value.
        let mut ptr = unsafe { self.vtable.as_base(NonNull::from(&mut self.repr)) };
        // SAFETY: derived from `&mut self`, so the mutable reference is
        // unique; its lifetime is bound to `&mut self`.
        unsafe { ptr.as_mut() }
    }

    /// Returns a reference to the stored value if its concrete type is `T`.
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if self.is::<T>() {
            // SAFETY: the type was checked on the line above.
            Some(unsafe { &*self.concrete_ptr::<T>() })
        } else {
            None
        }
    }

    /// Returns a mutable reference to the stored value if its concrete type
    /// is `T`.
    #[inline]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        if self.is::<T>() {
            // SAFETY: the type was checked on the line above; derived from
            // `&mut self`, so the reference is unique.
            Some(unsafe { &mut *self.concrete_ptr_mut::<T>() })
        } else {
            None
        }
    }

    /// Moves the stored value out if its concrete type is `T`; otherwise
    /// returns `self` unchanged. For a heap-kind value this releases the
    /// allocation.
    pub fn into_concrete<T: 'static>(self) -> Result<T, Self> {
        if !self.is::<T>() {
            return Err(self);
        }
        // The value is relocated out by hand, so the destructor must not
        // also run.
        let mut this = ManuallyDrop::new(self);
        let cell = NonNull::from(&mut this.repr);
        let value = match this.vtable.kind() {
            StorageKind::Inline => {
                // SAFETY: the type was checked above and the kind says the
                // inline variant is live; `this` is never dropped, so the
                // value's ownership moves uniquely into the read.
                unsafe { CellRepr::inline_ptr::<T>(cell).read() }
            }
            StorageKind::Heap => {
                // SAFETY: the type was checked above and the kind says the
                // heap variant is live.
                let ptr = unsafe { CellRepr::heap_ptr::<T>(cell) };
                // SAFETY: the pointer comes from `Box::into_raw` and `this`
                // is never dropped, so ownership transfers to the box
                // exactly once.
                let boxed = unsafe { Box::from_raw(ptr) };
                *boxed
            }
        };
        Ok(value)
    }

    /// Assigns `value` into the container by move.
    ///
    /// When the stored concrete type is already `T`, the old value is
    /// dropped and the new one moved over it in place — the cell is not
    /// rebuilt and the heap kind does not reallocate. Otherwise the
    /// container is [`replace`](RawValue::replace)d wholesale.
    pub fn assign<T>(&mut self, value: T)
    where
        T: Clone + 'static,
        B: Capability<T>,
    {
        if self.is::<T>() {
            // SAFETY: the stored concrete type is `T`; a deref-assignment
            // drops the old value in place and moves the new one in.
            unsafe { *self.concrete_ptr_mut::<T>() = value };
        } else {
            self.replace(value);
        }
    }

    /// Assigns a clone of `source` into the container.
    ///
    /// When the stored concrete type is already `T`, this clones onto the
    /// existing value via [`Clone::clone_from`] without destroying it.
    /// Otherwise the container is rebuilt around a fresh clone.
    pub fn assign_from<T>(&mut self, source: &T)
    where
        T: Clone + 'static,
        B: Capability<T>,
    {
        if self.is::<T>() {
            // SAFETY: the stored concrete type is `T`; derived from
            // `&mut self`, so the reference is unique.
            let dest = unsafe { &mut *self.concrete_ptr_mut::<T>() };
            dest.clone_from(source);
        } else {
            self.replace(source.clone());
        }
    }

    /// Unconditionally replaces the stored value with `value`, destroying
    /// the old one — even when the concrete type is unchanged.
    ///
    /// The replacement cell is built before the old value is destroyed, so
    /// the container never holds a destroyed value while foreign code runs.
    pub fn replace<T>(&mut self, value: T)
    where
        T: Clone + 'static,
        B: Capability<T>,
    {
        let vtable = ValueVtable::new::<T>();
        let repr = CellRepr::build(value);
        // SAFETY: the old vtable matches the old cell content per the field
        // invariants; the cell is overwritten immediately below and never
        // read through again.
        unsafe { self.vtable.drop(NonNull::from(&mut self.repr)) };
        self.repr = repr;
        self.vtable = vtable;
    }

    /// Returns a pointer to the stored concrete value.
    ///
    /// # Safety
    ///
    /// The caller must ensure the stored concrete type is `T`.
    #[inline]
    unsafe fn concrete_ptr<T: 'static>(&self) -> *const T {
        debug_assert!(self.is::<T>());
        let cell = NonNull::from(&self.repr);
        match self.vtable.kind() {
            // SAFETY: the kind names the live variant; `T` matches per the
            // caller's guarantee.
            StorageKind::Inline => unsafe { CellRepr::inline_ptr::<T>(cell) }.cast_const(),
            // SAFETY: as above.
            StorageKind::Heap => unsafe { CellRepr::heap_ptr::<T>(cell) }.cast_const(),
        }
    }

    /// Returns a mutable pointer to the stored concrete value.
    ///
    /// # Safety
    ///
    /// The caller must ensure the stored concrete type is `T`.
    #[inline]
    unsafe fn concrete_ptr_mut<T: 'static>(&mut self) -> *mut T {
        debug_assert!(self.is::<T>());
        let cell = NonNull::from(&mut self.repr);
        match self.vtable.kind() {
            // SAFETY: the kind names the live variant; `T` matches per the
            // caller's guarantee.
            StorageKind::Inline => unsafe { CellRepr::inline_ptr::<T>(cell) },
            // SAFETY: as above.
            StorageKind::Heap => unsafe { CellRepr::heap_ptr::<T>(cell) },
        }
    }
}

impl<B, Space> Clone for RawValue<B, Space>
where
    B: ?Sized + 'static,
    Space: 'static,
{
    fn clone(&self) -> Self {
        // SAFETY: the vtable matches the cell per the field invariants; the
        // new cell it returns is of the same type and kind, so pairing it
        // with the same vtable re-establishes the invariants.
        let repr = unsafe { self.vtable.clone_cell(NonNull::from(&self.repr)) };
        Self {
            vtable: self.vtable,
            repr,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if self.type_id() == source.type_id() {
            // SAFETY: both cells hold live values of the same concrete type
            // (and therefore the same kind — the decision rule is a pure
            // function of the type); `&mut self` and `&source` cannot be
            // the same object, so the cells are distinct.
            unsafe {
                source
                    .vtable
                    .clone_assign(NonNull::from(&source.repr), NonNull::from(&mut self.repr))
            };
        } else {
            // Build the replacement before destroying the old value, so a
            // panicking clone leaves `self` untouched.
            // SAFETY: the source vtable matches the source cell.
            let repr = unsafe { source.vtable.clone_cell(NonNull::from(&source.repr)) };
            // SAFETY: the old vtable matches the old cell content; the cell
            // is overwritten immediately below.
            unsafe { self.vtable.drop(NonNull::from(&mut self.repr)) };
            self.repr = repr;
            self.vtable = source.vtable;
        }
    }
}

impl<B, Space> Drop for RawValue<B, Space>
where
    B: ?Sized + 'static,
    Space: 'static,
{
    fn drop(&mut self) {
        // SAFETY: the vtable matches the cell per the field invariants; the
        // value has not been destroyed before (the only methods that destroy
        // it either rebuild the cell or suppress this destructor), and the
        // cell is never used again.
        unsafe { self.vtable.drop(NonNull::from(&mut self.repr)) }
    }
}

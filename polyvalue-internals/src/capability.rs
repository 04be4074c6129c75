//! The contract connecting concrete types to their erased view.
//!
//! A container like [`RawValue<B, Space>`](crate::RawValue) stores a concrete
//! `T` but hands out references typed as the capability set `B` (normally a
//! trait-object type such as `dyn Any`). Producing a `*const B` from a
//! `*const T` is an unsizing coercion, and the compiler only performs it
//! where the concrete type is statically visible. The [`Capability`] trait
//! captures that coercion as an associated function so that it can be baked
//! into a `&'static` vtable at construction time and replayed later, when
//! the concrete type has long been erased.
//!
//! # Safety Invariant
//!
//! Everything the vtable does with the stored value flows through
//! [`Capability::erase`]: dereferencing the container, downcast bookkeeping,
//! and the `Send`/`Sync` reasoning of the public wrapper all assume that
//! `erase` is a *pure unsizing coercion* — same address, correct metadata,
//! no side effects. That is why the trait is `unsafe` to implement.
//!
//! Implementations are normally generated by the `capability!` macro in the
//! `polyvalue` crate, which expands to exactly the coercion-in-return-position
//! impl shown below and is therefore always sound. Impls for [`dyn Any`]
//! (plus its `Send`/`Send + Sync` forms) ship with this crate.
//!
//! [`dyn Any`]: core::any::Any

use core::any::Any;

/// Implemented by trait-object types that can serve as the capability set of
/// an erased value, for each concrete type `T` that coerces to them.
///
/// `Self` is the erased view (e.g. `dyn Any`); `T` is the concrete type that
/// is actually stored. An implementation is the compile-time evidence that
/// `T` unsizes to `Self`, packaged so that vtable construction can capture
/// it as a plain function pointer.
///
/// # Safety
///
/// [`Capability::erase`] must behave exactly like the built-in unsizing
/// coercion `ptr as *const Self`:
///
/// 1. The returned pointer must have the same address as `ptr`.
/// 2. The returned pointer's metadata must be the correct vtable for viewing
///    a `T` as `Self`.
/// 3. The call must have no side effects.
///
/// An implementation whose body is literally `ptr` (relying on the compiler
/// to coerce in return position) upholds all three by construction.
///
/// These requirements also carry the auto-trait reasoning of the public
/// container: a genuine coercion `T -> Self` is only accepted by the
/// compiler when `T` satisfies every auto-trait bound of `Self`, so a
/// capability set that is `Send` (or `Sync`) can only ever have been erased
/// from a `Send` (or `Sync`) concrete type.
pub unsafe trait Capability<T>: 'static {
    /// Reinterprets a pointer to the concrete type as a pointer to the
    /// capability set.
    fn erase(ptr: *const T) -> *const Self;
}

// SAFETY: The body is the built-in unsizing coercion in return position.
unsafe impl<T: Any> Capability<T> for dyn Any {
    #[inline]
    fn erase(ptr: *const T) -> *const Self {
        ptr
    }
}

// SAFETY: The body is the built-in unsizing coercion in return position.
unsafe impl<T: Any + Send> Capability<T> for (dyn Any + Send) {
    #[inline]
    fn erase(ptr: *const T) -> *const Self {
        ptr
    }
}

// SAFETY: The body is the built-in unsizing coercion in return position.
unsafe impl<T: Any + Send + Sync> Capability<T> for (dyn Any + Send + Sync) {
    #[inline]
    fn erase(ptr: *const T) -> *const Self {
        ptr
    }
}

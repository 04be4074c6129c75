//! The [`PolyValue`] container.

use core::{
    any::TypeId,
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use polyvalue_internals::{RawValue, StorageKind, capability::Capability, stored_inline};

use crate::{
    markers::{AllocationMarker, Spillable},
    space::DefaultSpace,
};

/// A polymorphic object with value semantics: always holds exactly one
/// object of some concrete type implementing the capability set `B`, and
/// copies, moves, and assigns like a plain value.
///
/// `PolyValue<dyn Base>` relates to `Box<dyn Base>` the way a by-value `T`
/// relates to `Box<T>`: it is never null, it clones through the erased
/// interface, and it stores small concrete types inline with no allocation
/// at all. Concrete types that do not fit the inline space are placed behind
/// exactly one heap allocation, and moving such a container costs one
/// pointer copy — the contained object is never touched.
///
/// All special operations are dispatched through a per-(type, placement)
/// operation table shared by every container holding that type, so the
/// capability set itself does not need to know anything about cloning or
/// dropping.
///
/// # Type Parameters
///
/// - `B`: the capability set — a trait-object type such as `dyn Any` or a
///   user trait declared with [`capability!`](crate::capability).
/// - `Space`: the inline capacity donor; see [`space`](crate::space).
///   Defaults to three pointer words.
/// - `A`: the allocation policy; see [`markers`](crate::markers). Defaults
///   to [`Spillable`].
///
/// # Examples
///
/// ```
/// use polyvalue::{PolyValue, capability};
///
/// trait Shape {
///     fn area(&self) -> f64;
/// }
///
/// capability!(dyn Shape);
///
/// #[derive(Clone)]
/// struct Square {
///     side: f64,
/// }
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.side * self.side
///     }
/// }
///
/// let shape: PolyValue<dyn Shape> = PolyValue::new(Square { side: 3.0 });
/// let copy = shape.clone();
/// assert_eq!(copy.area(), 9.0);
/// ```
#[repr(transparent)]
pub struct PolyValue<B, Space = DefaultSpace, A = Spillable>
where
    B: ?Sized + 'static,
    Space: 'static,
    A: AllocationMarker,
{
    /// The erased value, paired with its operation table.
    raw: RawValue<B, Space>,
    /// Marker recording the allocation policy this container was checked
    /// against.
    _alloc: PhantomData<A>,
}

/// Enforces the allocation policy for one concrete type.
///
/// Evaluated at monomorphization time: instantiating any value-building path
/// with a heap-routed type under a no-allocation policy fails the build.
fn assert_allocation_policy<T, Space, A: AllocationMarker>() {
    const {
        assert!(
            A::ALLOW_ALLOCATIONS || stored_inline::<T, Space>(),
            "the allocation policy forbids heap storage, \
             but the concrete type does not fit the inline space"
        )
    }
}

impl<B, Space, A> PolyValue<B, Space, A>
where
    B: ?Sized + 'static,
    Space: 'static,
    A: AllocationMarker,
{
    /// Creates a container holding `value`.
    ///
    /// The value is stored inline when its type fits the inline space
    /// (see [`stored_inline`]), and behind exactly one heap allocation
    /// otherwise. Because the value is taken by value, it is necessarily
    /// the complete dynamic object — there is no way to lose derived state
    /// on the way in.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::any::Any;
    ///
    /// use polyvalue::PolyValue;
    ///
    /// let value: PolyValue<dyn Any> = PolyValue::new(7u32);
    /// assert!(!value.is_heap());
    /// ```
    #[inline]
    pub fn new<T>(value: T) -> Self
    where
        T: Clone + 'static,
        B: Capability<T>,
    {
        assert_allocation_policy::<T, Space, A>();
        Self {
            raw: RawValue::new(value),
            _alloc: PhantomData,
        }
    }

    /// Assigns `value` into the container by move.
    ///
    /// When the container already holds the same concrete type, the old
    /// value is dropped and the new one moved over it in place: no
    /// operation table switch, and for heap placement no reallocation.
    /// Otherwise the current object is destroyed and the container rebuilt
    /// around the new type, which may change the storage placement.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::any::Any;
    ///
    /// use polyvalue::PolyValue;
    ///
    /// let mut value: PolyValue<dyn Any> = PolyValue::new(7u32);
    /// value.set(8u32); // in place
    /// value.set([0u64; 6]); // rebuilds, spills to the heap
    /// assert!(value.is_heap());
    /// ```
    #[inline]
    pub fn set<T>(&mut self, value: T)
    where
        T: Clone + 'static,
        B: Capability<T>,
    {
        assert_allocation_policy::<T, Space, A>();
        self.raw.assign(value);
    }

    /// Assigns a clone of `source` into the container.
    ///
    /// When the container already holds the same concrete type, this clones
    /// onto the existing object via [`Clone::clone_from`] — nothing is
    /// destroyed or rebuilt. Otherwise the current object is destroyed and
    /// the container rebuilt around a fresh clone.
    #[inline]
    pub fn set_from<T>(&mut self, source: &T)
    where
        T: Clone + 'static,
        B: Capability<T>,
    {
        assert_allocation_policy::<T, Space, A>();
        self.raw.assign_from(source);
    }

    /// Replaces the contained object with `value`, unconditionally.
    ///
    /// Unlike [`set`](PolyValue::set) there is no same-type fast path: the
    /// old object is always destroyed and a new one built, even when the
    /// concrete type is unchanged.
    #[inline]
    pub fn emplace<T>(&mut self, value: T)
    where
        T: Clone + 'static,
        B: Capability<T>,
    {
        assert_allocation_policy::<T, Space, A>();
        self.raw.replace(value);
    }

    /// Returns `true` if the contained concrete type is `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.raw.is::<T>()
    }

    /// Returns a reference to the contained object if its concrete type is
    /// `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::any::Any;
    ///
    /// use polyvalue::PolyValue;
    ///
    /// let value: PolyValue<dyn Any> = PolyValue::new(7u32);
    /// assert_eq!(value.downcast_ref::<u32>(), Some(&7));
    /// assert_eq!(value.downcast_ref::<u64>(), None);
    /// ```
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.raw.downcast_ref::<T>()
    }

    /// Returns a mutable reference to the contained object if its concrete
    /// type is `T`.
    #[inline]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.raw.downcast_mut::<T>()
    }

    /// Moves the contained object out if its concrete type is `T`.
    ///
    /// On mismatch the container comes back unchanged in the `Err` variant.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::any::Any;
    ///
    /// use polyvalue::PolyValue;
    ///
    /// let value: PolyValue<dyn Any> = PolyValue::new(String::from("poly"));
    /// let value = value.downcast::<u32>().unwrap_err();
    /// let string = value.downcast::<String>().ok().unwrap();
    /// assert_eq!(string, "poly");
    /// ```
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        let Self { raw, _alloc } = self;
        match raw.into_concrete::<T>() {
            Ok(value) => Ok(value),
            Err(raw) => Err(Self {
                raw,
                _alloc: PhantomData,
            }),
        }
    }

    /// Returns the [`TypeId`] of the contained concrete type.
    #[inline]
    pub fn contained_type_id(&self) -> TypeId {
        self.raw.type_id()
    }

    /// Returns the [`core::any::type_name`] of the contained concrete type.
    #[inline]
    pub fn contained_type_name(&self) -> &'static str {
        self.raw.type_name()
    }

    /// Returns where the contained object lives.
    #[inline]
    pub fn storage_kind(&self) -> StorageKind {
        self.raw.kind()
    }

    /// Returns `true` if the contained object is heap-allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::any::Any;
    ///
    /// use polyvalue::PolyValue;
    ///
    /// let small: PolyValue<dyn Any> = PolyValue::new(1u8);
    /// let large: PolyValue<dyn Any> = PolyValue::new([0u64; 6]);
    /// assert!(!small.is_heap());
    /// assert!(large.is_heap());
    /// ```
    #[inline]
    pub fn is_heap(&self) -> bool {
        self.storage_kind() == StorageKind::Heap
    }
}

impl<B, Space, A> Deref for PolyValue<B, Space, A>
where
    B: ?Sized + 'static,
    Space: 'static,
    A: AllocationMarker,
{
    type Target = B;

    #[inline]
    fn deref(&self) -> &B {
        self.raw.as_base()
    }
}

impl<B, Space, A> DerefMut for PolyValue<B, Space, A>
where
    B: ?Sized + 'static,
    Space: 'static,
    A: AllocationMarker,
{
    #[inline]
    fn deref_mut(&mut self) -> &mut B {
        self.raw.as_base_mut()
    }
}

impl<B, Space, A> Clone for PolyValue<B, Space, A>
where
    B: ?Sized + 'static,
    Space: 'static,
    A: AllocationMarker,
{
    /// Clones the contained object through its operation table, preserving
    /// the storage placement: inline stays inline (no allocation), heap
    /// clones into one fresh allocation.
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            _alloc: PhantomData,
        }
    }

    /// Same-type assignments clone in place via [`Clone::clone_from`]
    /// without destroying the current object; assignments from a container
    /// holding a different concrete type destroy the old object exactly
    /// once and rebuild.
    fn clone_from(&mut self, source: &Self) {
        self.raw.clone_from(&source.raw);
    }
}

impl<B, Space, A> fmt::Debug for PolyValue<B, Space, A>
where
    B: ?Sized + fmt::Debug + 'static,
    Space: 'static,
    A: AllocationMarker,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<B, Space, A> fmt::Display for PolyValue<B, Space, A>
where
    B: ?Sized + fmt::Display + 'static,
    Space: 'static,
    A: AllocationMarker,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

// SAFETY: the contained object's concrete type reached the container through
// a `Capability` coercion to `B`. A genuine unsizing coercion to a `Send`
// capability set is only accepted by the compiler for `Send` concrete types,
// so `B: Send` bounds the contents; the cell and table reference themselves
// are plain data.
unsafe impl<B, Space, A> Send for PolyValue<B, Space, A>
where
    B: ?Sized + Send + 'static,
    Space: 'static,
    A: AllocationMarker,
{
}

// SAFETY: as for `Send`: `B: Sync` can only have been coerced to from `Sync`
// concrete types, and shared access to the container only hands out `&B`.
unsafe impl<B, Space, A> Sync for PolyValue<B, Space, A>
where
    B: ?Sized + Sync + 'static,
    Space: 'static,
    A: AllocationMarker,
{
}

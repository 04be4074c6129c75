//! The [`capability!`](crate::capability) macro.

/// Declares a trait-object type as a capability set, so that any concrete
/// type implementing the trait can be stored in a
/// [`PolyValue`](crate::PolyValue) erased behind it.
///
/// The macro expands to an implementation of
/// [`Capability`](crate::Capability) whose body is the built-in unsizing
/// coercion, which is the only sound way to implement that trait — prefer
/// the macro over hand-written impls.
///
/// Because of the orphan rule the macro must be invoked in the crate that
/// defines the trait. Impls for `dyn Any` (plus its `+ Send` and
/// `+ Send + Sync` forms) are already provided.
///
/// # Examples
///
/// ```
/// use polyvalue::{PolyValue, capability};
///
/// trait Greeter {
///     fn greet(&self) -> String;
/// }
///
/// capability!(dyn Greeter);
///
/// #[derive(Clone)]
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".to_string()
///     }
/// }
///
/// let value: PolyValue<dyn Greeter> = PolyValue::new(English);
/// assert_eq!(value.greet(), "hello");
/// ```
///
/// Marker bounds are spelled out as part of the trait-object type:
///
/// ```
/// use polyvalue::capability;
///
/// trait Task {
///     fn run(&self);
/// }
///
/// capability!(dyn Task);
/// capability!(dyn Task + Send);
/// capability!(dyn Task + Send + Sync);
/// ```
#[macro_export]
macro_rules! capability {
    (dyn $($base:tt)+) => {
        // SAFETY: the body is the built-in unsizing coercion in return
        // position, which upholds every requirement of the trait.
        unsafe impl<T> $crate::Capability<T> for (dyn $($base)+)
        where
            T: $($base)+ + 'static,
        {
            #[inline]
            fn erase(ptr: *const T) -> *const Self {
                ptr
            }
        }
    };
}

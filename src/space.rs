//! Inline capacity configuration for [`PolyValue`](crate::PolyValue).
//!
//! The second type parameter of [`PolyValue<B, Space, A>`](crate::PolyValue)
//! is never constructed; it only donates its size and alignment to the
//! container's storage cell. A concrete type is stored inline exactly when
//! it fits both (see [`stored_inline`](crate::stored_inline)). The cell also
//! has to be able to hold one heap pointer, so capacity and alignment are
//! clamped upward to one pointer word regardless of the space type chosen.
//!
//! The types in this module measure capacity in pointer words, with pointer
//! alignment. [`DefaultSpace`] is three words — large enough for a `String`
//! or a `Vec` on 64-bit targets, small enough to keep the container at four
//! words total.
//!
//! # Custom spaces
//!
//! Any type can serve as a space. Use a custom type to get a capacity or an
//! alignment the stock sizes don't offer:
//!
//! ```
//! use polyvalue::PolyValue;
//! use std::any::Any;
//!
//! #[repr(align(16))]
//! struct Aligned16([u8; 48]);
//!
//! let value: PolyValue<dyn Any, Aligned16> = PolyValue::new([0u128; 3]);
//! assert!(!value.is_heap());
//! ```

/// One pointer word of inline capacity.
#[derive(Copy, Clone)]
pub struct S1 {
    _words: [usize; 1],
}

/// Two pointer words of inline capacity.
#[derive(Copy, Clone)]
pub struct S2 {
    _words: [usize; 2],
}

/// Three pointer words of inline capacity.
#[derive(Copy, Clone)]
pub struct S3 {
    _words: [usize; 3],
}

/// Four pointer words of inline capacity.
#[derive(Copy, Clone)]
pub struct S4 {
    _words: [usize; 4],
}

/// Eight pointer words of inline capacity.
#[derive(Copy, Clone)]
pub struct S8 {
    _words: [usize; 8],
}

/// Sixteen pointer words of inline capacity.
#[derive(Copy, Clone)]
pub struct S16 {
    _words: [usize; 16],
}

/// The default inline capacity: three pointer words.
pub type DefaultSpace = S3;

#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! A value-semantic polymorphic container with small-buffer optimization.
//!
//! ## Overview
//!
//! [`PolyValue<dyn Base>`] holds exactly one object of some concrete type
//! implementing `Base`, and behaves like a plain value: it can be moved,
//! cloned, and assigned, it is never null, and it never shares its contents
//! with another owner. Small concrete types are stored inside the container
//! itself — constructing, cloning, moving, and destroying them performs no
//! allocation at all. Larger types transparently spill to a single heap
//! allocation, and moving such a container is one pointer copy regardless of
//! how big the object is.
//!
//! This makes it a drop-in way to pass and store polymorphic objects by
//! value: no explicit `Box`, no `Option` dance for "might not be set yet",
//! and no allocation tax on the common small case.
//!
//! ## Quick Example
//!
//! ```
//! use polyvalue::{PolyValue, capability};
//!
//! trait Instrument {
//!     fn frequency(&self) -> f64;
//!     fn tune(&mut self, delta: f64);
//! }
//!
//! // Declare `dyn Instrument` as a capability set once, next to the trait.
//! capability!(dyn Instrument);
//!
//! #[derive(Clone)]
//! struct Tuner {
//!     hertz: f64,
//! }
//!
//! impl Instrument for Tuner {
//!     fn frequency(&self) -> f64 {
//!         self.hertz
//!     }
//!
//!     fn tune(&mut self, delta: f64) {
//!         self.hertz += delta;
//!     }
//! }
//!
//! let mut pitch: PolyValue<dyn Instrument> = PolyValue::new(Tuner { hertz: 440.0 });
//! pitch.tune(-1.5);
//!
//! // Value semantics: the clone is an independent object.
//! let mut copy = pitch.clone();
//! copy.tune(3.0);
//! assert_eq!(pitch.frequency(), 438.5);
//! assert_eq!(copy.frequency(), 441.5);
//! ```
//!
//! ## Core Concepts
//!
//! Mechanically, a container is two words of bookkeeping around your data:
//! a fixed-size **storage cell** and a reference to an **operation table**.
//!
//! The cell either holds the object inline or holds one owning pointer to
//! it. Which of the two it is gets decided per concrete type, at compile
//! time, by a single rule: the type is inline exactly when its size and
//! alignment fit the cell (see [`stored_inline`]). The cell itself carries
//! no flag saying which case is live — that information lives in the
//! operation table, of which exactly one exists per (concrete type,
//! placement) pair for the whole program.
//!
//! The operation table is what lets `Base` stay an ordinary trait: cloning,
//! in-place assignment, destruction, and the view through `dyn Base` are
//! dispatched through the table rather than through methods the trait would
//! otherwise have to declare. Assignments between containers holding the
//! same concrete type reuse the existing cell in place; assignments that
//! change the concrete type destroy the old object exactly once and switch
//! tables.
//!
//! The [`Capability`] trait (normally implemented via the
//! [`capability!`](crate::capability) macro) is the compile-time evidence
//! connecting a concrete type to the trait-object type it is erased behind.
//! Capability sets for [`Any`](core::any::Any) (plus its `+ Send` and
//! `+ Send + Sync` forms) are built in.
//!
//! ## Configuration
//!
//! Both knobs are type parameters with sensible defaults:
//!
//! - **Inline capacity** — the `Space` parameter; see [`space`]. The default
//!   is three pointer words, and anything from [`space::S1`] to a custom
//!   over-aligned struct works.
//! - **Allocation policy** — the `A` parameter; see [`markers`]. The default
//!   [`markers::Spillable`] allows the heap fallback;
//!   [`markers::InlineOnly`] turns any heap-routed construction into a
//!   build-time error.
//!
//! ## Thread Safety
//!
//! The container is as thread-safe as its capability set: a
//! `PolyValue<dyn Any>` is neither `Send` nor `Sync` (it could be hiding an
//! `Rc`), while a `PolyValue<dyn Any + Send + Sync>` is both — the coercion
//! rules guarantee only suitably thread-safe concrete types can be erased
//! behind such a set. Operation tables are immutable statics and are shared
//! freely across threads.
//!
//! ## No-std Support
//!
//! The crate is `no_std` (the heap path uses `alloc` through its internals).

#[cfg(test)]
extern crate std;

mod macros;
pub mod markers;
mod poly_value;
pub mod space;

pub use poly_value::PolyValue;
pub use polyvalue_internals::{StorageKind, capability::Capability, stored_inline};

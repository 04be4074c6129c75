#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`polyvalue`].
//!
//! # Overview
//!
//! This crate contains the low-level, type-erased storage cell and the unsafe
//! operations that power the [`polyvalue`] container. It provides the
//! foundation for zero-cost type erasure through vtable-based dispatch,
//! without requiring the capability set itself to know anything about
//! cloning, dropping, or storage placement.
//!
//! **This crate is an implementation detail.** No semantic versioning
//! guarantees are provided. Users should depend on the [`polyvalue`] crate,
//! not this one.
//!
//! # Architecture
//!
//! The crate is organized around a single type hierarchy for erased values:
//!
//! - **[`value`]**: Type-erased value storage
//!   - [`RawValue`]: Owned cell paired with its matching vtable
//!   - [`CellRepr`]: `#[repr(C)]` union holding the value inline or as an
//!     owned heap pointer
//!   - [`ValueVtable`]: Function pointers for type-erased dispatch, one
//!     `&'static` instance per (concrete type, storage kind) pair
//!   - [`StorageKind`]: The explicit inline/heap discriminant carried by
//!     each vtable
//!
//! - **[`capability`]**: The contract connecting concrete types to the
//!   trait-object type they are erased behind
//!   - [`Capability`]: Certifies that a concrete `T` unsizes to the
//!     capability set `B`
//!
//! # Safety Strategy
//!
//! Type erasure requires careful handling to maintain Rust's type safety
//! guarantees. Once a value has been written into a [`CellRepr`], the cell
//! is just bytes (or a bare pointer); the vtable function pointers are the
//! only record of what lives there and how it is stored.
//!
//! This crate maintains safety through:
//!
//! - **Module-based encapsulation**: Safety-critical fields are
//!   module-private, making invariants locally verifiable within a single
//!   file. In particular, the pairing between a cell and its vtable can only
//!   be established by [`RawValue`] constructors, and can never drift
//!   afterwards.
//! - **Vtable-implied representation**: The cell itself stores no
//!   discriminant. Which union variant is live is implied entirely by the
//!   [`StorageKind`] of the vtable currently describing the cell.
//! - **Documented vtable contracts**: Each vtable method specifies exactly
//!   when it can be safely called.
//!
//! See the individual module documentation ([`value`], [`capability`]) for
//! detailed explanations of how these patterns are applied.
//!
//! [`polyvalue`]: https://docs.rs/polyvalue/latest/polyvalue/
//! [`CellRepr`]: value::repr::CellRepr
//! [`ValueVtable`]: value::vtable::ValueVtable
//! [`Capability`]: capability::Capability

extern crate alloc;

pub mod capability;
mod value;

pub use value::{RawValue, StorageKind, stored_inline};

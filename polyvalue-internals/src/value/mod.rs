//! Module containing the type-erased value storage.

pub(crate) mod repr;
mod raw;
pub(crate) mod vtable;

pub use self::{raw::RawValue, repr::stored_inline, vtable::StorageKind};

#![doc = include_str!("../README.md")]
#![expect(
    unsafe_code,
    reason = "Type-erased slot access is built on raw pointer casts."
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod extension;
mod field;
mod handle;
mod record;
mod sequence;
mod tag;
mod view;

pub mod hash;
pub mod lookup;
pub mod registry;

#[cfg(test)]
pub(crate) mod fixture;

// -----------------------------------------------------------------------------
// Top-level exports

/// Paths the [`field_decl!`] macro expands to; not public API.
#[doc(hidden)]
pub mod __macro_exports {
    pub use alloc::boxed::Box;
    pub use alloc::vec::Vec;
}

pub use extension::{Extension, ExtensionMap};
pub use field::{FieldAccessor, FieldDecl, FieldLocator, FieldShape};
pub use handle::Handle;
pub use record::{BoxedRecord, Enum32, EnumOps, Record, RecordDescriptor, RecordVtable};
pub use record::{UnionSlot, UnionValue};
pub use registry::{DescriptorTable, TableEntry, TableKind};
pub use sequence::grow;
pub use tag::Tag;

//! Type-erased pointer wrappers used by the field-access runtime.
//!
//! A serialization walker holds a record it knows nothing about at compile
//! time and must still reach into its fields. [`Ptr`] and [`PtrMut`] are the
//! currency for that: type-erased `&T` / `&mut T` equivalents that keep a
//! lifetime (so erased borrows stay bounded) and offer byte offsetting plus
//! checked-in-debug typed projections.
//!
//! Neither type owns its pointee; ownership of erased values is a concern of
//! the record layer built on top.
#![expect(unsafe_code, reason = "Raw pointers are inherently unsafe.")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// Modules

mod erased;

// -----------------------------------------------------------------------------
// Top-level exports

pub use erased::{Ptr, PtrMut};

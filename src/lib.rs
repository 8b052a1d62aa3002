#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use mwire_field as field;
pub use mwire_ptr as ptr;

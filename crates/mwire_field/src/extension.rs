use crate::hash::{FixedHashState, HashMap};

// -----------------------------------------------------------------------------
// Legacy extension map

/// One undecoded legacy extension entry: the raw wire payload of a field the
/// record's schema does not declare.
///
/// Decoding an extension is the walkers' concern; this layer only gives the
/// slot an addressable home.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extension {
    /// Wire type of the captured payload.
    pub wire_type: u8,
    /// The undecoded bytes.
    pub payload: Vec<u8>,
}

impl Extension {
    /// Creates an extension entry from a captured payload.
    pub fn new(wire_type: u8, payload: Vec<u8>) -> Extension {
        Extension { wire_type, payload }
    }
}

/// Storage of the legacy extension-map slot, keyed by field number.
pub type ExtensionMap = HashMap<u32, Extension, FixedHashState>;

// -----------------------------------------------------------------------------
// Tests

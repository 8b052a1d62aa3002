//! Shared test records, shaped like the output of code generation.

use crate::extension::ExtensionMap;
use crate::field::{FieldDecl, FieldLocator};
use crate::field_decl;
use crate::handle::Handle;
use crate::record::{Enum32, Record, RecordDescriptor, UnionSlot};
use crate::registry;
use crate::tag::Tag;

// -----------------------------------------------------------------------------
// Enumerated integer

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub(crate) struct Phase(pub i32);

impl Enum32 for Phase {
    fn from_bits(bits: i32) -> Self {
        Phase(bits)
    }

    fn bits(self) -> i32 {
        self.0
    }
}

// -----------------------------------------------------------------------------
// Nested records

#[derive(Default, Debug, PartialEq, Eq)]
pub(crate) struct Address {
    pub street: String,
    pub zip: u32,
}

impl Record for Address {
    fn descriptor() -> &'static RecordDescriptor {
        static FIELDS: [FieldDecl; 2] = [
            field_decl!(Address, 1, street: String),
            field_decl!(Address, 2, zip: u32),
        ];
        static DESCRIPTOR: RecordDescriptor = RecordDescriptor {
            name: "Address",
            record: Tag::of::<Address>(),
            fields: &FIELDS,
        };
        &DESCRIPTOR
    }
}

#[derive(Default, Debug, PartialEq, Eq)]
pub(crate) struct Order {
    pub sku: String,
    pub qty: u32,
}

impl Record for Order {
    fn descriptor() -> &'static RecordDescriptor {
        static FIELDS: [FieldDecl; 2] = [
            field_decl!(Order, 1, sku: String),
            field_decl!(Order, 2, qty: u32),
        ];
        static DESCRIPTOR: RecordDescriptor = RecordDescriptor {
            name: "Order",
            record: Tag::of::<Order>(),
            fields: &FIELDS,
        };
        &DESCRIPTOR
    }
}

// -----------------------------------------------------------------------------
// The kitchen-sink record

#[derive(Default)]
pub(crate) struct Customer {
    pub id: u64,
    pub name: String,
    pub nickname: Option<String>,
    pub scores: Vec<i32>,
    pub blob: Vec<u8>,
    pub attachments: Vec<Vec<u8>>,
    pub phase: Phase,
    pub history: Vec<Phase>,
    pub level: Option<Phase>,
    pub address: Option<Box<Address>>,
    pub orders: Vec<Box<Order>>,
    pub payload: UnionSlot,
    pub extensions: ExtensionMap,
    secret: i32,
}

impl Customer {
    pub fn secret(&self) -> i32 {
        self.secret
    }

    pub fn set_secret(&mut self, value: i32) {
        self.secret = value;
    }
}

impl Record for Customer {
    fn descriptor() -> &'static RecordDescriptor {
        static FIELDS: [FieldDecl; 14] = [
            field_decl!(Customer, 1, id: u64),
            field_decl!(Customer, 2, name: String),
            field_decl!(Customer, 3, optional nickname: String),
            field_decl!(Customer, 4, repeated scores: i32),
            field_decl!(Customer, 5, blob: Vec<u8>),
            field_decl!(Customer, 6, repeated attachments: Vec<u8>),
            field_decl!(Customer, 7, enum32 phase: Phase),
            field_decl!(Customer, 8, repeated enum32 history: Phase),
            field_decl!(Customer, 9, optional enum32 level: Phase),
            field_decl!(Customer, 10, record address: Address),
            field_decl!(Customer, 11, repeated record orders: Order),
            field_decl!(Customer, 12, union payload),
            field_decl!(Customer, 13, extensions extensions),
            field_decl!(Customer, 14, private secret: i32),
        ];
        static DESCRIPTOR: RecordDescriptor = RecordDescriptor {
            name: "Customer",
            record: Tag::of::<Customer>(),
            fields: &FIELDS,
        };
        &DESCRIPTOR
    }
}

fn customer_accessor<'a>(handle: Handle<'a>, index: usize) -> Option<Handle<'a>> {
    // SAFETY: registered for `Customer` records only.
    let customer = unsafe { handle.cast::<Customer>() };
    match index {
        13 => Some(Handle::from_slot(&mut customer.secret)),
        _ => None,
    }
}

/// Registers the `Customer` accessor; idempotent across tests.
pub(crate) fn register_customer_accessor() {
    registry::register_accessor::<Customer>(customer_accessor);
}

// -----------------------------------------------------------------------------
// Locator helpers

/// Resolves the locator of a public field, the way a table build would.
pub(crate) fn locator<R: Record>(name: &str) -> FieldLocator {
    let descriptor = R::descriptor();
    let (index, decl) = descriptor
        .field_named(name)
        .unwrap_or_else(|| panic!("fixture record has no field `{name}`"));
    FieldLocator::resolve(decl, index, None)
}

// -----------------------------------------------------------------------------
// Link-time registration

#[cfg(feature = "auto_register")]
#[derive(Default)]
pub(crate) struct Hidden {
    value: i32,
}

#[cfg(feature = "auto_register")]
impl Hidden {
    pub fn set_value(&mut self, value: i32) {
        self.value = value;
    }
}

#[cfg(feature = "auto_register")]
impl Record for Hidden {
    fn descriptor() -> &'static RecordDescriptor {
        static FIELDS: [FieldDecl; 1] = [field_decl!(Hidden, 1, private value: i32)];
        static DESCRIPTOR: RecordDescriptor = RecordDescriptor {
            name: "Hidden",
            record: Tag::of::<Hidden>(),
            fields: &FIELDS,
        };
        &DESCRIPTOR
    }
}

#[cfg(feature = "auto_register")]
fn hidden_accessor<'a>(handle: Handle<'a>, index: usize) -> Option<Handle<'a>> {
    // SAFETY: submitted for `Hidden` records only.
    let hidden = unsafe { handle.cast::<Hidden>() };
    match index {
        0 => Some(Handle::from_slot(&mut hidden.value)),
        _ => None,
    }
}

#[cfg(feature = "auto_register")]
inventory::submit! {
    registry::AccessorRegistration::new(Tag::of::<Hidden>, hidden_accessor)
}

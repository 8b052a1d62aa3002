//! The process-wide metadata cache.
//!
//! Walkers never build their own traversal state: they ask this module for
//! the descriptor table of a record type and get back a `&'static` table
//! that was built exactly once (modulo a benign race) and is immutable from
//! the moment it is published.
//!
//! One coarse lock guards every published-table slot across all table kinds
//! and all record types. The lock is held only for the pointer-sized load or
//! store; table *construction* always runs outside it, so two threads may
//! build the same table redundantly; the first store wins and the duplicate
//! is dropped. Tables are pure functions of the record's declarations, so
//! the redundancy is wasted work, never a correctness hazard.
//!
//! The same discipline covers the per-type name index behind
//! [`lookup`](crate::lookup) and the registry of accessor overrides for
//! private fields.

use core::any::TypeId;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::field::{FieldAccessor, FieldLocator, FieldShape};
use crate::hash::{FixedHashState, HashMap, TypeIdMap};
use crate::record::{Record, RecordDescriptor};
use crate::tag::Tag;

// -----------------------------------------------------------------------------
// TableKind

/// The four descriptor-table kinds a record type carries.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TableKind {
    /// Encoding order: entries sorted by ascending field number.
    Marshal,
    /// Decoding lookup: entries sorted by ascending field number.
    Unmarshal,
    /// Merge order: entries in declaration order.
    Merge,
    /// Discard pass: only fields that can reach nested allocations.
    Discard,
}

impl TableKind {
    pub(crate) const COUNT: usize = 4;

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

// -----------------------------------------------------------------------------
// DescriptorTable

/// One per-field entry of a descriptor table.
#[derive(Debug)]
pub struct TableEntry {
    /// The wire field number.
    pub number: u32,
    /// The declared field name.
    pub name: &'static str,
    /// The slot's storage family.
    pub shape: FieldShape,
    /// The resolved locator the walkers offset through.
    pub locator: FieldLocator,
}

/// A lazily built, immutable-once-published table of per-field operations
/// for one record type and one [`TableKind`].
#[derive(Debug)]
pub struct DescriptorTable {
    /// Which walker this table drives.
    pub kind: TableKind,
    /// Tag of the record type the table describes.
    pub record: Tag,
    /// The per-field entries, ordered per [`TableKind`].
    pub entries: Box<[TableEntry]>,
}

impl DescriptorTable {
    /// Builds the `kind` table for `descriptor`.
    ///
    /// This is where a record type's schema defects surface: locator
    /// resolution panics on embedded declarations and on private fields when
    /// `accessor` is `None`.
    pub fn build(
        kind: TableKind,
        descriptor: &RecordDescriptor,
        accessor: Option<FieldAccessor>,
    ) -> DescriptorTable {
        let mut entries: Vec<TableEntry> = descriptor
            .fields
            .iter()
            .enumerate()
            .filter(|(_, decl)| kind != TableKind::Discard || decl.shape().owns_indirection())
            .map(|(index, decl)| {
                let accessor = if decl.is_public() { None } else { accessor };
                TableEntry {
                    number: decl.number(),
                    name: decl.name(),
                    shape: decl.shape(),
                    locator: FieldLocator::resolve(decl, index, accessor),
                }
            })
            .collect();
        if matches!(kind, TableKind::Marshal | TableKind::Unmarshal) {
            entries.sort_by_key(|entry| entry.number);
        }
        log::debug!(
            "built {kind:?} table for `{}` with {} entries",
            descriptor.name,
            entries.len(),
        );
        DescriptorTable {
            kind,
            record: descriptor.record,
            entries: entries.into_boxed_slice(),
        }
    }

    /// Finds the entry for a wire field number.
    pub fn entry(&self, number: u32) -> Option<&TableEntry> {
        match self.kind {
            TableKind::Marshal | TableKind::Unmarshal => self
                .entries
                .binary_search_by_key(&number, |entry| entry.number)
                .ok()
                .map(|index| &self.entries[index]),
            _ => self.entries.iter().find(|entry| entry.number == number),
        }
    }
}

// -----------------------------------------------------------------------------
// Table cache

type TableSlots = [Option<&'static DescriptorTable>; TableKind::COUNT];

// One lock for every table slot, across all kinds and all types. Held only
// for the pointer-sized load or store, never across table construction.
static TABLES: Mutex<TypeIdMap<TableSlots>> = Mutex::new(TypeIdMap::new());

fn tables() -> MutexGuard<'static, TypeIdMap<TableSlots>> {
    TABLES.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Loads the published `kind` table of `record`, if any.
///
/// Readers observe either nothing or a fully built table, never a partial
/// one: publication is a single pointer store under the lock.
pub fn load(kind: TableKind, record: Tag) -> Option<&'static DescriptorTable> {
    tables().get(&record.id()).and_then(|slots| slots[kind.index()])
}

/// Publishes `table`, returning the retained table.
///
/// The first publication for a (type, kind) pair wins; a racing duplicate is
/// dropped and the caller gets the table that is already shared.
pub fn store(kind: TableKind, table: DescriptorTable) -> &'static DescriptorTable {
    let record = table.record;
    let mut guard = tables();
    let slots = guard.get_or_insert(record.id(), || [None; TableKind::COUNT]);
    match slots[kind.index()] {
        Some(existing) => existing,
        None => {
            let published: &'static DescriptorTable = Box::leak(Box::new(table));
            slots[kind.index()] = Some(published);
            published
        }
    }
}

/// The `kind` table of record type `R`, built on first use.
///
/// Never fails; schema defects in `R`'s declarations abort fatally during
/// the first build.
pub fn fetch_or_build<R: Record>(kind: TableKind) -> &'static DescriptorTable {
    let descriptor = R::descriptor();
    if let Some(table) = load(kind, descriptor.record) {
        return table;
    }
    // Built outside the lock; a concurrent builder may race, `store` keeps
    // one winner.
    let accessor = accessor_of(descriptor.record);
    store(kind, DescriptorTable::build(kind, descriptor, accessor))
}

// -----------------------------------------------------------------------------
// Accessor registry

static ACCESSORS: Mutex<TypeIdMap<FieldAccessor>> = Mutex::new(TypeIdMap::new());

fn accessors() -> MutexGuard<'static, TypeIdMap<FieldAccessor>> {
    ACCESSORS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registers the accessor override for record type `R`.
///
/// Re-registering replaces the previous accessor; generated code registers
/// each record's accessor once at startup.
pub fn register_accessor<R: Record>(accessor: FieldAccessor) {
    accessors().insert(TypeId::of::<R>(), accessor);
}

/// The registered accessor override of `record`, if any.
pub fn accessor_of(record: Tag) -> Option<FieldAccessor> {
    #[cfg(feature = "auto_register")]
    collect_submitted();
    accessors().get(&record.id()).copied()
}

/// A link-time accessor registration, collected on first registry use.
///
/// Generated code submits one per record type with private fields:
///
/// ```ignore
/// inventory::submit! {
///     AccessorRegistration::new(Tag::of::<MyRecord>, my_record_accessor)
/// }
/// ```
#[cfg(feature = "auto_register")]
#[cfg_attr(docsrs, doc(cfg(feature = "auto_register")))]
pub struct AccessorRegistration {
    record: fn() -> Tag,
    accessor: FieldAccessor,
}

#[cfg(feature = "auto_register")]
impl AccessorRegistration {
    /// Creates a registration for the record type returned by `record`.
    pub const fn new(record: fn() -> Tag, accessor: FieldAccessor) -> AccessorRegistration {
        AccessorRegistration { record, accessor }
    }
}

#[cfg(feature = "auto_register")]
inventory::collect!(AccessorRegistration);

#[cfg(feature = "auto_register")]
fn collect_submitted() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let mut guard = accessors();
        for registration in inventory::iter::<AccessorRegistration> {
            let record = (registration.record)();
            // Explicit registrations take precedence over link-time ones.
            if guard.try_insert(record.id(), || registration.accessor) {
                log::trace!("collected link-time accessor for `{}`", record.name());
            }
        }
    });
}

// -----------------------------------------------------------------------------
// Field name index

/// The per-type name index: field name to declaration position.
///
/// Built beside the descriptor tables so name resolution never falls back to
/// string-based introspection of the record itself.
pub struct FieldIndex {
    record: Tag,
    by_name: HashMap<&'static str, usize, FixedHashState>,
}

impl FieldIndex {
    fn build(descriptor: &RecordDescriptor) -> FieldIndex {
        let mut by_name =
            HashMap::with_capacity_and_hasher(descriptor.fields.len(), FixedHashState);
        for (index, decl) in descriptor.fields.iter().enumerate() {
            by_name.insert(decl.name(), index);
        }
        FieldIndex {
            record: descriptor.record,
            by_name,
        }
    }

    /// Tag of the indexed record type.
    #[inline]
    pub fn record(&self) -> Tag {
        self.record
    }

    /// The declaration position of the named field.
    #[inline]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }
}

static FIELD_INDEXES: Mutex<TypeIdMap<&'static FieldIndex>> = Mutex::new(TypeIdMap::new());

fn field_indexes() -> MutexGuard<'static, TypeIdMap<&'static FieldIndex>> {
    FIELD_INDEXES.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The name index of record type `R`, built on first use.
pub fn field_index<R: Record>() -> &'static FieldIndex {
    let descriptor = R::descriptor();
    let key = descriptor.record.id();
    if let Some(index) = field_indexes().get(&key).copied() {
        return index;
    }
    let built = FieldIndex::build(descriptor);
    let mut guard = field_indexes();
    match guard.get(&key).copied() {
        Some(existing) => existing,
        None => {
            let published: &'static FieldIndex = Box::leak(Box::new(built));
            guard.insert(key, published);
            published
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

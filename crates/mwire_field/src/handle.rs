use core::marker::PhantomData;
use core::ptr::NonNull;

use mwire_ptr::{Ptr, PtrMut};

use crate::field::{Aux, FieldLocator};
use crate::record::{BoxedRecord, Record, RecordVtable, UnionSlot};
use crate::tag::Tag;

// -----------------------------------------------------------------------------
// Handle

/// A type-erased reference to a record, a field slot, or a collection
/// element.
///
/// The walkers drive every encode/decode/merge/discard pass through handles:
/// a top-level handle wraps the record being processed, [`offset`] locates a
/// field, and the typed slot views (`as_i64`, `get_i32_list`, `get_record`,
/// ...) reinterpret the located slot. A handle is a cheap, copyable descriptor of
/// *where*: it never owns the record, and a null pointer encodes a
/// data-dependent absence (nil nested record, empty union slot).
///
/// Every reinterpretation is checked against the carried [`Tag`]; a kind
/// mismatch is a schema defect and panics immediately rather than corrupting
/// memory.
///
/// # Aliasing
///
/// Handles copy freely, like the raw pointers they wrap, so the borrow
/// checker cannot see through them. Every method that yields a reference or
/// writes through the handle is `unsafe fn`: the caller promises the
/// single-writer discipline the walkers already observe (one message is
/// encoded or decoded by one thread at a time).
///
/// # Examples
///
/// ```
/// use mwire_field::{FieldLocator, Handle};
/// # use mwire_field::{FieldDecl, Record, RecordDescriptor, Tag, field_decl};
/// # #[derive(Default)]
/// # struct Ping { seq: u64 }
/// # impl Record for Ping {
/// #     fn descriptor() -> &'static RecordDescriptor {
/// #         static FIELDS: [FieldDecl; 1] = [field_decl!(Ping, 1, seq: u64)];
/// #         static DESCRIPTOR: RecordDescriptor =
/// #             RecordDescriptor { name: "Ping", record: Tag::of::<Ping>(), fields: &FIELDS };
/// #         &DESCRIPTOR
/// #     }
/// # }
/// let descriptor = Ping::descriptor();
/// let locator = FieldLocator::resolve(&descriptor.fields[0], 0, None);
///
/// let mut ping = Ping { seq: 41 };
/// let seq = Handle::from_record(&mut ping).offset(&locator);
///
/// // SAFETY: `ping` is not touched through anything else while `seq` lives.
/// *unsafe { seq.as_u64() } += 1;
/// assert_eq!(ping.seq, 42);
/// ```
///
/// [`offset`]: Handle::offset
#[derive(Clone, Copy)]
pub struct Handle<'a> {
    ptr: *mut u8,
    tag: Tag,
    aux: Aux,
    _marker: PhantomData<&'a mut u8>,
}

impl<'a> Handle<'a> {
    /// Wraps the record being processed; the root of every walk.
    #[inline]
    pub fn from_record<R: Record>(record: &'a mut R) -> Handle<'a> {
        Handle::from_parts(PtrMut::from_mut(record).into(), Tag::of::<R>(), Aux::None)
    }

    /// Wraps one concrete slot.
    ///
    /// Accessor overrides use this to hand back fields that generic
    /// offsetting cannot reach.
    #[inline]
    pub fn from_slot<T: Send + Sync + 'static>(slot: &'a mut T) -> Handle<'a> {
        Handle::from_parts(PtrMut::from_mut(slot).into(), Tag::of::<T>(), Aux::None)
    }

    /// The absent handle for a slot of type `tag`.
    #[inline]
    pub const fn null(tag: Tag) -> Handle<'a> {
        Handle {
            ptr: core::ptr::null_mut(),
            tag,
            aux: Aux::None,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn from_parts(ptr: NonNull<u8>, tag: Tag, aux: Aux) -> Handle<'a> {
        Handle {
            ptr: ptr.as_ptr(),
            tag,
            aux,
            _marker: PhantomData,
        }
    }

    /// Tag of the record or slot this handle points at.
    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Whether this handle refers to a null/absent reference.
    #[inline]
    pub fn is_nil(&self) -> bool {
        self.ptr.is_null()
    }

    /// Offsets this handle to the field identified by `locator`.
    ///
    /// An accessor override on the locator is consulted first; if it yields a
    /// handle, that handle wins. Otherwise the field address is computed
    /// directly from the locator's byte offset, after asserting that the
    /// locator was built for this handle's record type.
    ///
    /// The source handle is never mutated; the result points strictly "more
    /// specific" than the input.
    ///
    /// # Panics
    ///
    /// - if `locator` is the invalid sentinel;
    /// - if this handle is nil;
    /// - if the locator was resolved for a different record type.
    #[track_caller]
    pub fn offset(self, locator: &FieldLocator) -> Handle<'a> {
        assert!(
            locator.is_valid(),
            "cannot offset through the invalid field locator"
        );
        if let Some(accessor) = locator.accessor() {
            if let Some(found) = accessor(self, locator.index()) {
                return found;
            }
        }
        if self.tag != locator.owner() {
            panic!(
                "field locator for `{}` applied to a `{}` handle",
                locator.owner().name(),
                self.tag.name(),
            );
        }
        let base = self.expect_ptr();
        // SAFETY: the locator's offset satisfies `FieldDecl::new`'s contract
        // for the record type the tag assertion above just matched.
        let field = unsafe { PtrMut::new(base).byte_add(locator.offset() as usize) };
        Handle::from_parts(field.into(), locator.value(), locator.aux())
    }

    /// Reinterprets this handle as a `T` slot.
    ///
    /// This is the checked projection every typed view goes through; the tag
    /// assertion turns a wrong reinterpretation into a panic.
    ///
    /// # Panics
    ///
    /// If the slot does not hold a `T`, or the handle is nil.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    #[track_caller]
    pub unsafe fn cast<T: 'static>(self) -> &'a mut T {
        if !self.tag.is::<T>() {
            panic!(
                "handle reinterpreted as `{}`, but the slot holds `{}`",
                core::any::type_name::<T>(),
                self.tag.name(),
            );
        }
        let slot = self.slot_mut();
        slot.debug_assert_aligned::<T>();
        // SAFETY: the tag matched `T`; exclusivity is the caller's contract.
        unsafe { slot.consume::<T>() }
    }

    /// Extends the repeated slot by one zero-valued element and returns it.
    ///
    /// Reallocation invalidates previously returned element references; the
    /// borrow checker enforces that here.
    ///
    /// # Panics
    ///
    /// If the slot does not hold a `Vec<T>`.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    pub unsafe fn grow_list<T: Default + 'static>(self) -> &'a mut T {
        // SAFETY: forwarded caller contract.
        let list = unsafe { self.cast::<Vec<T>>() };
        crate::sequence::grow(list)
    }

    // -------------------------------------------------------------------------
    // Nested records

    /// Dereferences a nested-record slot (`Option<Box<M>>`) one level.
    ///
    /// An empty slot yields a null handle tagged with the nested record
    /// type; absence is data, not an error.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    pub unsafe fn get_record(self) -> Handle<'a> {
        let vtable = self.record_vtable("get_record");
        self.check_tag(vtable.slot, "get_record");
        (vtable.deref)(self.slot_mut())
    }

    /// Moves `value` into a nested-record slot, dropping the previous value.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    pub unsafe fn set_record(self, value: BoxedRecord) {
        let vtable = self.record_vtable("set_record");
        self.check_tag(vtable.slot, "set_record");
        (vtable.store)(self.slot_mut(), value);
    }

    /// Appends `value` to a repeated nested-record slot (`Vec<Box<M>>`) and
    /// returns a handle to the stored record.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    pub unsafe fn push_record(self, value: BoxedRecord) -> Handle<'a> {
        let vtable = self.record_vtable("push_record");
        self.check_tag(vtable.list, "push_record");
        (vtable.append)(self.slot_mut(), value)
    }

    /// Appends a zero-valued record to a repeated nested-record slot and
    /// returns a handle to it; decoders fill it in afterwards.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    pub unsafe fn grow_records(self) -> Handle<'a> {
        let vtable = self.record_vtable("grow_records");
        self.check_tag(vtable.list, "grow_records");
        (vtable.grow)(self.slot_mut())
    }

    /// Copies out handles to every element of a repeated nested-record slot.
    ///
    /// This is a by-value copy of element references, not a structural view
    /// of the collection; a nil handle yields an empty sequence.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    pub unsafe fn record_elements(self) -> Vec<Handle<'a>> {
        if self.is_nil() {
            return Vec::new();
        }
        let vtable = self.record_vtable("record_elements");
        self.check_tag(vtable.list, "record_elements");
        (vtable.elements)(self.slot_mut())
    }

    /// Replaces a repeated nested-record slot with `values`.
    ///
    /// The empty vector round-trips through the empty representation.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    pub unsafe fn set_record_elements(self, values: Vec<BoxedRecord>) {
        let vtable = self.record_vtable("set_record_elements");
        self.check_tag(vtable.list, "set_record_elements");
        (vtable.replace)(self.slot_mut(), values);
    }

    // -------------------------------------------------------------------------
    // Polymorphic slots

    /// Descends into a polymorphic slot, yielding a handle to the concrete
    /// record's first declared field.
    ///
    /// An empty slot yields a null handle, never a failure.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    pub unsafe fn union_payload(self) -> Handle<'a> {
        let tag = self.tag;
        // SAFETY: forwarded caller contract.
        let slot = unsafe { self.cast::<UnionSlot>() };
        match slot {
            None => Handle::null(tag),
            Some(value) => {
                let descriptor = value.descriptor();
                let first = match descriptor.fields.first() {
                    Some(first) => first,
                    None => panic!("union value `{}` declares no fields", descriptor.name),
                };
                let base =
                    Handle::from_parts(value.payload().into(), descriptor.record, Aux::None);
                base.offset(&FieldLocator::resolve(first, 0, None))
            }
        }
    }

    /// Stores a concrete record into a polymorphic slot, dropping whatever
    /// shape was active before.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    pub unsafe fn set_union(self, value: BoxedRecord) {
        // SAFETY: forwarded caller contract.
        let slot = unsafe { self.cast::<UnionSlot>() };
        *slot = Some(value.into_union());
    }

    // -------------------------------------------------------------------------
    // Internals

    #[track_caller]
    fn expect_ptr(&self) -> NonNull<u8> {
        match NonNull::new(self.ptr) {
            Some(ptr) => ptr,
            None => panic!("nil `{}` handle dereferenced", self.tag.name()),
        }
    }

    /// The slot as a read-only erased pointer.
    #[track_caller]
    pub(crate) fn slot_ref(self) -> Ptr<'a> {
        let ptr = self.expect_ptr();
        // SAFETY: a non-nil handle wraps a live slot for 'a.
        unsafe { Ptr::new(ptr) }
    }

    /// The slot as a mutable erased pointer.
    #[track_caller]
    pub(crate) fn slot_mut(self) -> PtrMut<'a> {
        let ptr = self.expect_ptr();
        // SAFETY: a non-nil handle wraps a live, writable slot for 'a.
        unsafe { PtrMut::new(ptr) }
    }

    #[track_caller]
    pub(crate) fn check_tag(&self, expected: Tag, op: &str) {
        if self.tag != expected {
            panic!(
                "`{op}` used on a `{}` slot, expected `{}`",
                self.tag.name(),
                expected.name(),
            );
        }
    }

    #[track_caller]
    fn record_vtable(&self, op: &str) -> &'static RecordVtable {
        match self.aux {
            Aux::Record(vtable) => vtable,
            _ => panic!(
                "`{op}` used on a `{}` slot without nested-record ops",
                self.tag.name(),
            ),
        }
    }

    pub(crate) fn enum_ops(&self) -> Option<&'static crate::record::EnumOps> {
        match self.aux {
            Aux::Enum32(ops) => Some(ops),
            _ => None,
        }
    }
}

impl core::fmt::Debug for Handle<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Handle")
            .field("ptr", &self.ptr)
            .field("tag", &self.tag)
            .field("nil", &self.is_nil())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

use core::fmt;

use crate::handle::Handle;
use crate::record::{EnumOps, RecordVtable};
use crate::tag::Tag;

// -----------------------------------------------------------------------------
// Accessor override

/// Override used to reach a field that generic offsetting cannot.
///
/// Generated code registers one accessor per record type whose private
/// fields must stay reachable by the walkers. The accessor receives the
/// handle of the *record* and the declaration index of the field; returning
/// `None` makes [`Handle::offset`] fall back to direct offsetting.
pub type FieldAccessor = for<'a> fn(Handle<'a>, usize) -> Option<Handle<'a>>;

// -----------------------------------------------------------------------------
// FieldShape

/// The storage family of one field slot.
///
/// Primitive shapes are fully described by the declaration's value [`Tag`];
/// enum and nested-record shapes additionally name the per-type operation
/// table their slots are driven through. The getters are function pointers so
/// a declaration stays `const`-constructible (the tables materialize on first
/// use).
#[derive(Clone, Copy)]
pub enum FieldShape {
    /// A required primitive slot (`K`).
    Scalar,
    /// An optional primitive slot (`Option<K>`).
    Optional,
    /// A repeated primitive slot (`Vec<K>`).
    Repeated,
    /// A required enumerated-integer slot (`E`).
    Enum32 {
        ops: fn() -> &'static EnumOps,
    },
    /// An optional enumerated-integer slot (`Option<E>`).
    OptionalEnum32 {
        ops: fn() -> &'static EnumOps,
    },
    /// A repeated enumerated-integer slot (`Vec<E>`).
    RepeatedEnum32 {
        ops: fn() -> &'static EnumOps,
    },
    /// An optional nested record slot (`Option<Box<M>>`).
    Record {
        vtable: fn() -> &'static RecordVtable,
    },
    /// A repeated nested record slot (`Vec<Box<M>>`).
    RepeatedRecord {
        vtable: fn() -> &'static RecordVtable,
    },
    /// A polymorphic slot holding one of several record shapes
    /// (`Option<Box<dyn UnionValue>>`).
    Union,
    /// The legacy extension map.
    Extensions,
}

impl FieldShape {
    /// Whether slots of this shape can reach further heap allocations.
    ///
    /// Discard tables are restricted to these fields.
    pub fn owns_indirection(&self) -> bool {
        matches!(
            self,
            FieldShape::Record { .. }
                | FieldShape::RepeatedRecord { .. }
                | FieldShape::Union
                | FieldShape::Extensions
        )
    }

    fn name(&self) -> &'static str {
        match self {
            FieldShape::Scalar => "Scalar",
            FieldShape::Optional => "Optional",
            FieldShape::Repeated => "Repeated",
            FieldShape::Enum32 { .. } => "Enum32",
            FieldShape::OptionalEnum32 { .. } => "OptionalEnum32",
            FieldShape::RepeatedEnum32 { .. } => "RepeatedEnum32",
            FieldShape::Record { .. } => "Record",
            FieldShape::RepeatedRecord { .. } => "RepeatedRecord",
            FieldShape::Union => "Union",
            FieldShape::Extensions => "Extensions",
        }
    }
}

impl fmt::Debug for FieldShape {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// -----------------------------------------------------------------------------
// FieldDecl

/// The static declaration of one field, emitted by code generation.
///
/// Declarations are plain data: a name, a wire number, byte offsets (one per
/// embedding level), declared visibility and the slot shape. They become
/// usable only through [`FieldLocator::resolve`], which is where the schema
/// contract is enforced.
///
/// Prefer the [`field_decl!`](crate::field_decl) macro, which computes the
/// offset with [`core::mem::offset_of!`] and discharges the safety contract
/// of [`FieldDecl::new`].
pub struct FieldDecl {
    name: &'static str,
    number: u32,
    offsets: &'static [usize],
    public: bool,
    owner: Tag,
    value: Tag,
    shape: FieldShape,
}

impl FieldDecl {
    /// Creates a field declaration from raw parts.
    ///
    /// # Safety
    ///
    /// Every entry of `offsets` must be the in-memory byte offset of a real
    /// field of the type tagged `owner`, and `value` must tag that field's
    /// concrete slot type. Handles trust declarations when offsetting, so a
    /// lying declaration corrupts memory instead of panicking.
    pub const unsafe fn new(
        name: &'static str,
        number: u32,
        offsets: &'static [usize],
        public: bool,
        owner: Tag,
        value: Tag,
        shape: FieldShape,
    ) -> FieldDecl {
        FieldDecl {
            name,
            number,
            offsets,
            public,
            owner,
            value,
            shape,
        }
    }

    /// The declared field name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The wire field number.
    #[inline]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Byte offsets, one per embedding level.
    #[inline]
    pub const fn offsets(&self) -> &'static [usize] {
        self.offsets
    }

    /// Whether the field is accessible to generic code.
    #[inline]
    pub const fn is_public(&self) -> bool {
        self.public
    }

    /// Tag of the owning record type.
    #[inline]
    pub const fn owner(&self) -> Tag {
        self.owner
    }

    /// Tag of the concrete slot type.
    #[inline]
    pub const fn value(&self) -> Tag {
        self.value
    }

    /// The slot's storage family.
    #[inline]
    pub const fn shape(&self) -> FieldShape {
        self.shape
    }
}

impl fmt::Debug for FieldDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDecl")
            .field("name", &self.name)
            .field("number", &self.number)
            .field("offsets", &self.offsets)
            .field("public", &self.public)
            .field("owner", &self.owner)
            .field("value", &self.value)
            .field("shape", &self.shape)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Aux

/// Per-type operations a locator attaches to the handles it produces.
#[derive(Clone, Copy)]
pub(crate) enum Aux {
    None,
    Enum32(&'static EnumOps),
    Record(&'static RecordVtable),
}

// -----------------------------------------------------------------------------
// FieldLocator

/// Identifies one field of one record type, ready for [`Handle::offset`].
///
/// A locator is immutable once built and owned by the descriptor table that
/// contains it; it is never recomputed for the lifetime of the process.
///
/// Sentinels follow the descriptor-table convention: a negative offset marks
/// the [invalid](FieldLocator::invalid) locator, offset zero with matching
/// tags is the [identity](FieldLocator::identity) no-op.
#[derive(Clone, Copy)]
pub struct FieldLocator {
    offset: isize,
    index: usize,
    accessor: Option<FieldAccessor>,
    owner: Tag,
    value: Tag,
    aux: Aux,
}

impl FieldLocator {
    /// The invalid locator; [`is_valid`](Self::is_valid) is `false`.
    pub const fn invalid() -> FieldLocator {
        FieldLocator {
            offset: -1,
            index: 0,
            accessor: None,
            owner: Tag::of::<()>(),
            value: Tag::of::<()>(),
            aux: Aux::None,
        }
    }

    /// The identity locator for `tag`: offsetting through it is a no-op.
    pub const fn identity(tag: Tag) -> FieldLocator {
        FieldLocator {
            offset: 0,
            index: 0,
            accessor: None,
            owner: tag,
            value: tag,
            aux: Aux::None,
        }
    }

    /// Builds the locator for `decl`, the field at `index` of its record's
    /// declaration list.
    ///
    /// This is where schema defects surface, on first use of the record type:
    ///
    /// # Panics
    ///
    /// - if the declaration spans more than one embedding level
    ///   (embedding-flattening is not supported by this backend);
    /// - if the field is private and no `accessor` override is supplied.
    #[track_caller]
    pub fn resolve(
        decl: &FieldDecl,
        index: usize,
        accessor: Option<FieldAccessor>,
    ) -> FieldLocator {
        if decl.offsets.len() != 1 {
            panic!(
                "field `{}.{}` spans {} embedding levels; embedded record fields are not supported",
                decl.owner.name(),
                decl.name,
                decl.offsets.len(),
            );
        }
        if !decl.public && accessor.is_none() {
            panic!(
                "an accessor must be registered for private field `{}.{}`",
                decl.owner.name(),
                decl.name,
            );
        }
        let aux = match decl.shape {
            FieldShape::Enum32 { ops }
            | FieldShape::OptionalEnum32 { ops }
            | FieldShape::RepeatedEnum32 { ops } => Aux::Enum32(ops()),
            FieldShape::Record { vtable } | FieldShape::RepeatedRecord { vtable } => {
                Aux::Record(vtable())
            }
            _ => Aux::None,
        };
        FieldLocator {
            offset: decl.offsets[0] as isize,
            index,
            accessor,
            owner: decl.owner,
            value: decl.value,
            aux,
        }
    }

    /// Whether this locator addresses a real field.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.offset >= 0
    }

    /// The byte offset of the field inside its record.
    #[inline]
    pub const fn offset(&self) -> isize {
        self.offset
    }

    /// The declaration index handed to an accessor override.
    #[inline]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The accessor override, if one was supplied at resolution.
    #[inline]
    pub const fn accessor(&self) -> Option<FieldAccessor> {
        self.accessor
    }

    /// Tag of the record type this locator offsets through.
    #[inline]
    pub const fn owner(&self) -> Tag {
        self.owner
    }

    /// Tag of the slot this locator lands on.
    #[inline]
    pub const fn value(&self) -> Tag {
        self.value
    }

    #[inline]
    pub(crate) const fn aux(&self) -> Aux {
        self.aux
    }
}

impl fmt::Debug for FieldLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldLocator")
            .field("offset", &self.offset)
            .field("index", &self.index)
            .field("has_accessor", &self.accessor.is_some())
            .field("owner", &self.owner)
            .field("value", &self.value)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Declaration macro

/// Builds a [`FieldDecl`] for a named field, computing the byte offset with
/// [`core::mem::offset_of!`].
///
/// The shape keyword selects the slot family and the concrete slot type the
/// declaration is tagged with:
///
/// | keyword             | field type             |
/// |---------------------|------------------------|
/// | *(none)*            | `K`                    |
/// | `optional`          | `Option<K>`            |
/// | `repeated`          | `Vec<K>`               |
/// | `enum32`            | `E`                    |
/// | `optional enum32`   | `Option<E>`            |
/// | `repeated enum32`   | `Vec<E>`               |
/// | `record`            | `Option<Box<M>>`       |
/// | `repeated record`   | `Vec<Box<M>>`          |
/// | `union`             | [`UnionSlot`](crate::UnionSlot) |
/// | `extensions`        | [`ExtensionMap`](crate::ExtensionMap) |
/// | `private`           | `K`, not publicly accessible |
///
/// # Examples
///
/// ```
/// use mwire_field::{FieldDecl, field_decl};
///
/// struct Ping {
///     seq: u64,
///     tags: Vec<String>,
/// }
///
/// static FIELDS: &[FieldDecl] = &[
///     field_decl!(Ping, 1, seq: u64),
///     field_decl!(Ping, 2, repeated tags: String),
/// ];
///
/// assert_eq!(FIELDS[1].number(), 2);
/// ```
#[macro_export]
macro_rules! field_decl {
    ($owner:ty, $number:expr, $name:ident: $ty:ty) => {
        // SAFETY: the offset is computed by `offset_of!` for this exact field.
        unsafe {
            $crate::FieldDecl::new(
                stringify!($name),
                $number,
                const { &[::core::mem::offset_of!($owner, $name)] },
                true,
                $crate::Tag::of::<$owner>(),
                $crate::Tag::of::<$ty>(),
                $crate::FieldShape::Scalar,
            )
        }
    };
    ($owner:ty, $number:expr, optional $name:ident: $ty:ty) => {
        // SAFETY: the offset is computed by `offset_of!` for this exact field.
        unsafe {
            $crate::FieldDecl::new(
                stringify!($name),
                $number,
                const { &[::core::mem::offset_of!($owner, $name)] },
                true,
                $crate::Tag::of::<$owner>(),
                $crate::Tag::of::<::core::option::Option<$ty>>(),
                $crate::FieldShape::Optional,
            )
        }
    };
    ($owner:ty, $number:expr, repeated $name:ident: $ty:ty) => {
        // SAFETY: the offset is computed by `offset_of!` for this exact field.
        unsafe {
            $crate::FieldDecl::new(
                stringify!($name),
                $number,
                const { &[::core::mem::offset_of!($owner, $name)] },
                true,
                $crate::Tag::of::<$owner>(),
                $crate::Tag::of::<$crate::__macro_exports::Vec<$ty>>(),
                $crate::FieldShape::Repeated,
            )
        }
    };
    ($owner:ty, $number:expr, enum32 $name:ident: $ty:ty) => {
        // SAFETY: the offset is computed by `offset_of!` for this exact field.
        unsafe {
            $crate::FieldDecl::new(
                stringify!($name),
                $number,
                const { &[::core::mem::offset_of!($owner, $name)] },
                true,
                $crate::Tag::of::<$owner>(),
                $crate::Tag::of::<$ty>(),
                $crate::FieldShape::Enum32 {
                    ops: $crate::EnumOps::of::<$ty>,
                },
            )
        }
    };
    ($owner:ty, $number:expr, optional enum32 $name:ident: $ty:ty) => {
        // SAFETY: the offset is computed by `offset_of!` for this exact field.
        unsafe {
            $crate::FieldDecl::new(
                stringify!($name),
                $number,
                const { &[::core::mem::offset_of!($owner, $name)] },
                true,
                $crate::Tag::of::<$owner>(),
                $crate::Tag::of::<::core::option::Option<$ty>>(),
                $crate::FieldShape::OptionalEnum32 {
                    ops: $crate::EnumOps::of::<$ty>,
                },
            )
        }
    };
    ($owner:ty, $number:expr, repeated enum32 $name:ident: $ty:ty) => {
        // SAFETY: the offset is computed by `offset_of!` for this exact field.
        unsafe {
            $crate::FieldDecl::new(
                stringify!($name),
                $number,
                const { &[::core::mem::offset_of!($owner, $name)] },
                true,
                $crate::Tag::of::<$owner>(),
                $crate::Tag::of::<$crate::__macro_exports::Vec<$ty>>(),
                $crate::FieldShape::RepeatedEnum32 {
                    ops: $crate::EnumOps::of::<$ty>,
                },
            )
        }
    };
    ($owner:ty, $number:expr, record $name:ident: $ty:ty) => {
        // SAFETY: the offset is computed by `offset_of!` for this exact field.
        unsafe {
            $crate::FieldDecl::new(
                stringify!($name),
                $number,
                const { &[::core::mem::offset_of!($owner, $name)] },
                true,
                $crate::Tag::of::<$owner>(),
                $crate::Tag::of::<::core::option::Option<$crate::__macro_exports::Box<$ty>>>(),
                $crate::FieldShape::Record {
                    vtable: $crate::RecordVtable::of::<$ty>,
                },
            )
        }
    };
    ($owner:ty, $number:expr, repeated record $name:ident: $ty:ty) => {
        // SAFETY: the offset is computed by `offset_of!` for this exact field.
        unsafe {
            $crate::FieldDecl::new(
                stringify!($name),
                $number,
                const { &[::core::mem::offset_of!($owner, $name)] },
                true,
                $crate::Tag::of::<$owner>(),
                $crate::Tag::of::<$crate::__macro_exports::Vec<$crate::__macro_exports::Box<$ty>>>(),
                $crate::FieldShape::RepeatedRecord {
                    vtable: $crate::RecordVtable::of::<$ty>,
                },
            )
        }
    };
    ($owner:ty, $number:expr, union $name:ident) => {
        // SAFETY: the offset is computed by `offset_of!` for this exact field.
        unsafe {
            $crate::FieldDecl::new(
                stringify!($name),
                $number,
                const { &[::core::mem::offset_of!($owner, $name)] },
                true,
                $crate::Tag::of::<$owner>(),
                $crate::Tag::of::<$crate::UnionSlot>(),
                $crate::FieldShape::Union,
            )
        }
    };
    ($owner:ty, $number:expr, extensions $name:ident) => {
        // SAFETY: the offset is computed by `offset_of!` for this exact field.
        unsafe {
            $crate::FieldDecl::new(
                stringify!($name),
                $number,
                const { &[::core::mem::offset_of!($owner, $name)] },
                true,
                $crate::Tag::of::<$owner>(),
                $crate::Tag::of::<$crate::ExtensionMap>(),
                $crate::FieldShape::Extensions,
            )
        }
    };
    ($owner:ty, $number:expr, private $name:ident: $ty:ty) => {
        // SAFETY: the offset is computed by `offset_of!` for this exact field.
        unsafe {
            $crate::FieldDecl::new(
                stringify!($name),
                $number,
                const { &[::core::mem::offset_of!($owner, $name)] },
                false,
                $crate::Tag::of::<$owner>(),
                $crate::Tag::of::<$ty>(),
                $crate::FieldShape::Scalar,
            )
        }
    };
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::handle::Handle;
    use crate::tag::Tag;

    use super::{FieldDecl, FieldLocator, FieldShape};

    struct Sample {
        left: u32,
        right: u32,
    }

    #[test]
    fn locator_sentinels() {
        assert!(!FieldLocator::invalid().is_valid());

        let identity = FieldLocator::identity(Tag::of::<Sample>());
        assert!(identity.is_valid());
        assert_eq!(identity.offset(), 0);
        assert_eq!(identity.owner(), identity.value());
    }

    #[test]
    fn resolve_carries_offset_and_tags() {
        let decl = field_decl!(Sample, 2, right: u32);
        let locator = FieldLocator::resolve(&decl, 1, None);

        assert!(locator.is_valid());
        assert_eq!(locator.offset() as usize, core::mem::offset_of!(Sample, right));
        assert_eq!(locator.owner(), Tag::of::<Sample>());
        assert_eq!(locator.value(), Tag::of::<u32>());
        assert!(locator.accessor().is_none());
    }

    #[test]
    #[should_panic(expected = "embedded record fields are not supported")]
    fn embedded_declaration_is_fatal() {
        // A two-level offset path models a field reached through embedding.
        // SAFETY: never offset through; resolution panics first.
        let decl = unsafe {
            FieldDecl::new(
                "left",
                1,
                &[0, 4],
                true,
                Tag::of::<Sample>(),
                Tag::of::<u32>(),
                FieldShape::Scalar,
            )
        };
        let _ = FieldLocator::resolve(&decl, 0, None);
    }

    #[test]
    #[should_panic(expected = "an accessor must be registered for private field")]
    fn private_field_without_accessor_is_fatal() {
        let decl = field_decl!(Sample, 1, private left: u32);
        let _ = FieldLocator::resolve(&decl, 0, None);
    }

    #[test]
    fn private_field_with_accessor_resolves() {
        fn sample_accessor<'a>(handle: Handle<'a>, index: usize) -> Option<Handle<'a>> {
            // SAFETY: registered for `Sample` records only.
            let sample = unsafe { handle.cast::<Sample>() };
            match index {
                0 => Some(Handle::from_slot(&mut sample.left)),
                _ => None,
            }
        }

        let decl = field_decl!(Sample, 1, private left: u32);
        let locator = FieldLocator::resolve(&decl, 0, Some(sample_accessor));
        assert!(locator.accessor().is_some());
        assert_eq!(locator.index(), 0);
    }
}

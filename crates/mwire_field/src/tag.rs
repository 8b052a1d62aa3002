use core::any::{TypeId, type_name};
use core::fmt;

// -----------------------------------------------------------------------------
// Tag

/// Runtime identity of a slot type.
///
/// A [`Handle`](crate::Handle) is type-erased; the tag it carries is what
/// turns an out-of-contract reinterpretation into an immediate panic instead
/// of undefined behavior. Locators carry the tag of the record type they were
/// built for and the tag of the slot they address, so every offset and every
/// typed projection can be checked.
///
/// Two tags are equal exactly when their [`TypeId`]s are equal.
///
/// # Examples
///
/// ```
/// use mwire_field::Tag;
///
/// const SLOT: Tag = Tag::of::<Option<i64>>();
///
/// assert!(SLOT.is::<Option<i64>>());
/// assert_ne!(SLOT, Tag::of::<i64>());
/// ```
#[derive(Clone, Copy)]
pub struct Tag {
    id: TypeId,
    // Resolved on demand; keeps `of` const-constructible.
    name: fn() -> &'static str,
}

impl Tag {
    /// The tag of type `T`.
    #[inline]
    pub const fn of<T: ?Sized + 'static>() -> Tag {
        Tag {
            id: TypeId::of::<T>(),
            name: type_name::<T>,
        }
    }

    /// The underlying [`TypeId`].
    #[inline]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// The full path of the tagged type, for diagnostics.
    #[inline]
    pub fn name(&self) -> &'static str {
        (self.name)()
    }

    /// Whether this tag identifies type `T`.
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for Tag {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Tag {}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.name())
    }
}

impl fmt::Display for Tag {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// -----------------------------------------------------------------------------
// Tests

//! Name-based field resolution.
//!
//! Reflection-adjacent debugging and property-lookup paths resolve fields by
//! declared name instead of by descriptor table. Public fields resolve
//! directly; private fields descend through the record type's registered
//! accessor override. This is never on the hot encode/decode path.

use crate::field::FieldLocator;
use crate::handle::Handle;
use crate::record::Record;
use crate::registry::{accessor_of, field_index};

/// Resolves a field of `record` by its declared name.
///
/// Returns `None` when no field of that name is declared. For a private
/// field with no registered accessor this falls back to direct locator
/// construction, which fails fatally: a missing accessor is a
/// code-generation defect, not a runtime condition.
///
/// # Panics
///
/// If the named field is private and no accessor is registered for `R`.
pub fn field_by_name<'a, R: Record>(record: &'a mut R, name: &str) -> Option<Handle<'a>> {
    let descriptor = R::descriptor();
    let index = field_index::<R>().position(name)?;
    let decl = &descriptor.fields[index];

    let accessor = if decl.is_public() {
        None
    } else {
        let found = accessor_of(descriptor.record);
        if found.is_none() {
            log::trace!(
                "no accessor registered for `{}`; attempting direct access of `{name}`",
                descriptor.name,
            );
        }
        found
    };

    let locator = FieldLocator::resolve(decl, index, accessor);
    Some(Handle::from_record(record).offset(&locator))
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::field::FieldDecl;
    use crate::field_decl;
    use crate::fixture::{self, Customer};
    use crate::record::{Record, RecordDescriptor};
    use crate::tag::Tag;

    use super::field_by_name;

    #[test]
    fn resolves_public_field() {
        let mut customer = Customer::default();
        customer.id = 31;

        let handle = field_by_name(&mut customer, "id").unwrap();
        assert_eq!(unsafe { *handle.as_u64() }, 31);
    }

    #[test]
    fn resolves_private_field_through_accessor() {
        fixture::register_customer_accessor();

        let mut customer = Customer::default();
        customer.set_secret(-3);

        let handle = field_by_name(&mut customer, "secret").unwrap();
        assert_eq!(unsafe { *handle.as_i32() }, -3);

        *unsafe { handle.as_i32() } = 12;
        assert_eq!(customer.secret(), 12);
    }

    #[test]
    fn unknown_name_is_absent() {
        let mut customer = Customer::default();
        assert!(field_by_name(&mut customer, "no_such_field").is_none());
    }

    #[test]
    #[should_panic(expected = "an accessor must be registered for private field")]
    fn private_field_without_accessor_is_fatal() {
        #[derive(Default)]
        struct Locked {
            sealed: i32,
        }
        impl Record for Locked {
            fn descriptor() -> &'static RecordDescriptor {
                static FIELDS: [FieldDecl; 1] = [field_decl!(Locked, 1, private sealed: i32)];
                static DESCRIPTOR: RecordDescriptor = RecordDescriptor {
                    name: "Locked",
                    record: Tag::of::<Locked>(),
                    fields: &FIELDS,
                };
                &DESCRIPTOR
            }
        }

        let mut locked = Locked::default();
        let _ = field_by_name(&mut locked, "sealed");
    }

    #[cfg(feature = "auto_register")]
    #[test]
    fn link_time_accessor_backs_name_lookup() {
        use crate::fixture::Hidden;

        let mut hidden = Hidden::default();
        hidden.set_value(88);

        let handle = field_by_name(&mut hidden, "value").unwrap();
        assert_eq!(unsafe { *handle.as_i32() }, 88);
    }
}

//! Typed views over located field slots.
//!
//! One family member per primitive kind: `as_K` reinterprets a required
//! slot, `as_K_opt` an optional slot, `as_K_list` a repeated slot. All of
//! them go through the tag check of [`Handle::cast`], so a kind mismatch is
//! an immediate panic.
//!
//! The 32-bit integer kind is special: its storage may be a named
//! enumerated type rather than raw `i32`, so it gets explicit `get`/`set`
//! operations that branch on the storage kind instead of `as_i32_opt` /
//! `as_i32_list` reinterpretations.

use crate::extension::ExtensionMap;
use crate::handle::Handle;

// -----------------------------------------------------------------------------
// Primitive slot views

macro_rules! impl_slot_views {
    ($($kind:ty => $as:ident, $as_opt:ident, $as_list:ident;)*) => {
        impl<'a> Handle<'a> {
            $(
                #[doc = concat!("Reinterprets the slot as a required `", stringify!($kind), "` field.")]
                ///
                /// # Panics
                ///
                /// If the slot holds a different kind.
                ///
                /// # Safety
                ///
                /// The caller must have exclusive access to the pointee for `'a`.
                #[inline]
                #[track_caller]
                pub unsafe fn $as(self) -> &'a mut $kind {
                    // SAFETY: forwarded caller contract.
                    unsafe { self.cast::<$kind>() }
                }

                #[doc = concat!("Reinterprets the slot as an optional `", stringify!($kind), "` field.")]
                ///
                /// # Panics
                ///
                /// If the slot holds a different kind.
                ///
                /// # Safety
                ///
                /// The caller must have exclusive access to the pointee for `'a`.
                #[inline]
                #[track_caller]
                pub unsafe fn $as_opt(self) -> &'a mut Option<$kind> {
                    // SAFETY: forwarded caller contract.
                    unsafe { self.cast::<Option<$kind>>() }
                }

                #[doc = concat!("Reinterprets the slot as a repeated `", stringify!($kind), "` field.")]
                ///
                /// # Panics
                ///
                /// If the slot holds a different kind.
                ///
                /// # Safety
                ///
                /// The caller must have exclusive access to the pointee for `'a`.
                #[inline]
                #[track_caller]
                pub unsafe fn $as_list(self) -> &'a mut Vec<$kind> {
                    // SAFETY: forwarded caller contract.
                    unsafe { self.cast::<Vec<$kind>>() }
                }
            )*
        }
    };
}

impl_slot_views! {
    i64 => as_i64, as_i64_opt, as_i64_list;
    u64 => as_u64, as_u64_opt, as_u64_list;
    u32 => as_u32, as_u32_opt, as_u32_list;
    f64 => as_f64, as_f64_opt, as_f64_list;
    f32 => as_f32, as_f32_opt, as_f32_list;
    bool => as_bool, as_bool_opt, as_bool_list;
    String => as_string, as_string_opt, as_string_list;
}

impl<'a> Handle<'a> {
    /// Reinterprets the slot as a required raw `i32` field.
    ///
    /// Enum-typed storage is not raw `i32`; it goes through
    /// [`get_i32`](Self::get_i32) / [`set_i32`](Self::set_i32) instead.
    ///
    /// # Panics
    ///
    /// If the slot holds a different kind.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    #[inline]
    #[track_caller]
    pub unsafe fn as_i32(self) -> &'a mut i32 {
        // SAFETY: forwarded caller contract.
        unsafe { self.cast::<i32>() }
    }

    /// Reinterprets the slot as a required byte-sequence field.
    ///
    /// # Panics
    ///
    /// If the slot holds a different kind.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    #[inline]
    #[track_caller]
    pub unsafe fn as_bytes(self) -> &'a mut Vec<u8> {
        // SAFETY: forwarded caller contract.
        unsafe { self.cast::<Vec<u8>>() }
    }

    /// Reinterprets the slot as a repeated byte-sequence field.
    ///
    /// # Panics
    ///
    /// If the slot holds a different kind.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    #[inline]
    #[track_caller]
    pub unsafe fn as_bytes_list(self) -> &'a mut Vec<Vec<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { self.cast::<Vec<Vec<u8>>>() }
    }

    /// Reinterprets the slot as the legacy extension map.
    ///
    /// # Panics
    ///
    /// If the slot holds a different kind.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    #[inline]
    #[track_caller]
    pub unsafe fn as_extensions(self) -> &'a mut ExtensionMap {
        // SAFETY: forwarded caller contract.
        unsafe { self.cast::<ExtensionMap>() }
    }
}

// -----------------------------------------------------------------------------
// Enumerated 32-bit integers

impl<'a> Handle<'a> {
    /// Reads a required 32-bit integer slot, raw or enum-typed.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    #[track_caller]
    pub unsafe fn get_i32(self) -> i32 {
        match self.enum_ops() {
            Some(ops) => {
                self.check_tag(ops.elem, "get_i32");
                (ops.get)(self.slot_ref())
            }
            // SAFETY: forwarded caller contract.
            None => *unsafe { self.cast::<i32>() },
        }
    }

    /// Writes a required 32-bit integer slot, raw or enum-typed.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    #[track_caller]
    pub unsafe fn set_i32(self, value: i32) {
        match self.enum_ops() {
            Some(ops) => {
                self.check_tag(ops.elem, "set_i32");
                (ops.set)(self.slot_mut(), value);
            }
            // SAFETY: forwarded caller contract.
            None => *unsafe { self.cast::<i32>() } = value,
        }
    }

    /// Reads an optional 32-bit integer slot, raw or enum-typed.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    #[track_caller]
    pub unsafe fn get_i32_opt(self) -> Option<i32> {
        match self.enum_ops() {
            Some(ops) => {
                self.check_tag(ops.opt, "get_i32_opt");
                (ops.get_opt)(self.slot_ref())
            }
            // SAFETY: forwarded caller contract.
            None => *unsafe { self.cast::<Option<i32>>() },
        }
    }

    /// Sets an optional 32-bit integer slot to `Some(value)`, raw or
    /// enum-typed.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    #[track_caller]
    pub unsafe fn set_i32_opt(self, value: i32) {
        match self.enum_ops() {
            Some(ops) => {
                self.check_tag(ops.opt, "set_i32_opt");
                (ops.set_opt)(self.slot_mut(), value);
            }
            // SAFETY: forwarded caller contract.
            None => *unsafe { self.cast::<Option<i32>>() } = Some(value),
        }
    }

    /// Copies a repeated 32-bit integer slot out as raw values.
    ///
    /// For enum-typed storage this converts element by element into a fresh
    /// collection; either way the result never aliases the field's storage
    /// in this backend.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    #[track_caller]
    pub unsafe fn get_i32_list(self) -> Vec<i32> {
        match self.enum_ops() {
            Some(ops) => {
                self.check_tag(ops.list, "get_i32_list");
                (ops.get_list)(self.slot_ref())
            }
            // SAFETY: forwarded caller contract.
            None => unsafe { self.cast::<Vec<i32>>() }.clone(),
        }
    }

    /// Replaces a repeated 32-bit integer slot with `values`.
    ///
    /// For enum-typed storage this allocates a fresh enum-typed collection
    /// and converts each element's bit pattern across.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    #[track_caller]
    pub unsafe fn set_i32_list(self, values: Vec<i32>) {
        match self.enum_ops() {
            Some(ops) => {
                self.check_tag(ops.list, "set_i32_list");
                (ops.set_list)(self.slot_mut(), values);
            }
            // SAFETY: forwarded caller contract.
            None => *unsafe { self.cast::<Vec<i32>>() } = values,
        }
    }

    /// Appends one value to a repeated 32-bit integer slot, raw or
    /// enum-typed.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the pointee for `'a`.
    #[track_caller]
    pub unsafe fn push_i32(self, value: i32) {
        match self.enum_ops() {
            Some(ops) => {
                self.check_tag(ops.list, "push_i32");
                (ops.push)(self.slot_mut(), value);
            }
            // SAFETY: forwarded caller contract.
            None => unsafe { self.cast::<Vec<i32>>() }.push(value),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::extension::Extension;
    use crate::fixture::{Customer, Phase, locator};
    use crate::handle::Handle;

    fn field<'a>(customer: &'a mut Customer, name: &str) -> Handle<'a> {
        Handle::from_record(customer).offset(&locator::<Customer>(name))
    }

    #[test]
    fn scalar_views_read_and_write() {
        let mut customer = Customer::default();

        unsafe {
            *field(&mut customer, "id").as_u64() = 7;
            field(&mut customer, "name").as_string().push_str("ada");
            *field(&mut customer, "blob").as_bytes() = vec![1, 2, 3];
        }

        assert_eq!(customer.id, 7);
        assert_eq!(customer.name, "ada");
        assert_eq!(customer.blob, [1, 2, 3]);
    }

    #[test]
    fn optional_view_round_trip() {
        let mut customer = Customer::default();

        let nickname = field(&mut customer, "nickname");
        assert!(unsafe { nickname.as_string_opt() }.is_none());
        *unsafe { nickname.as_string_opt() } = Some("lovelace".into());

        assert_eq!(customer.nickname.as_deref(), Some("lovelace"));
    }

    #[test]
    fn repeated_bytes_view() {
        let mut customer = Customer::default();

        unsafe {
            field(&mut customer, "attachments")
                .as_bytes_list()
                .push(vec![0xff]);
        }
        assert_eq!(customer.attachments, [[0xff]]);
    }

    #[test]
    fn raw_i32_list_round_trip() {
        let mut customer = Customer::default();
        let scores = field(&mut customer, "scores");

        unsafe {
            scores.set_i32_list(vec![3, 1, 4]);
            scores.push_i32(1);
            assert_eq!(scores.get_i32_list(), [3, 1, 4, 1]);
        }
        assert_eq!(customer.scores, [3, 1, 4, 1]);
    }

    #[test]
    fn enum_list_round_trip_converts_per_element() {
        let mut customer = Customer::default();
        let history = field(&mut customer, "history");

        unsafe {
            history.set_i32_list(vec![2, 5, 8]);
            history.push_i32(13);
            assert_eq!(history.get_i32_list(), [2, 5, 8, 13]);
        }
        assert_eq!(
            customer.history,
            [Phase(2), Phase(5), Phase(8), Phase(13)]
        );
    }

    #[test]
    fn enum_list_get_never_aliases_storage() {
        let mut customer = Customer::default();
        customer.history = vec![Phase(1), Phase(2)];

        let mut copy = unsafe { field(&mut customer, "history").get_i32_list() };
        copy[0] = 99;

        assert_eq!(customer.history, [Phase(1), Phase(2)]);
    }

    #[test]
    fn enum_scalar_and_optional() {
        let mut customer = Customer::default();

        let phase = field(&mut customer, "phase");
        unsafe {
            phase.set_i32(4);
            assert_eq!(phase.get_i32(), 4);
        }

        let level = field(&mut customer, "level");
        unsafe {
            assert_eq!(level.get_i32_opt(), None);
            level.set_i32_opt(9);
            assert_eq!(level.get_i32_opt(), Some(9));
        }

        assert_eq!(customer.phase, Phase(4));
        assert_eq!(customer.level, Some(Phase(9)));
    }

    #[test]
    fn grow_list_returns_zero_valued_slot() {
        let mut customer = Customer::default();
        let scores = field(&mut customer, "scores");

        let slot = unsafe { scores.grow_list::<i32>() };
        assert_eq!(*slot, 0);
        *slot = 42;

        assert_eq!(customer.scores, [42]);
    }

    #[test]
    fn extension_map_view() {
        let mut customer = Customer::default();

        unsafe {
            field(&mut customer, "extensions")
                .as_extensions()
                .insert(1000, Extension::new(0, vec![0x08]));
        }
        assert_eq!(customer.extensions.get(&1000).unwrap().wire_type, 0);
    }

    #[test]
    #[should_panic(expected = "`set_i32` used on a")]
    fn enum_scalar_op_on_wrong_slot_is_fatal() {
        let mut customer = Customer::default();
        // `history` is the repeated enum slot; the scalar op must refuse it.
        let history = field(&mut customer, "history");
        unsafe { history.set_i32(1) };
    }
}

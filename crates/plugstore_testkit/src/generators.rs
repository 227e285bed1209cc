//! Property-based test generators using proptest.

use plugstore_db::{Pk, PK_LEN};
use proptest::prelude::*;

/// Strategy for arbitrary non-nil keys.
pub fn pk_strategy() -> impl Strategy<Value = Pk> {
    prop::array::uniform16(any::<u8>())
        .prop_map(Pk::from_bytes)
        .prop_filter("NIL is reserved", |pk| !pk.is_nil())
}

/// Strategy for tags accepted by [`Pk::from_tag`]: 1 to 16 ASCII bytes
/// without NUL.
pub fn tag_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[A-Za-z0-9_]{{1,{PK_LEN}}}")).expect("Invalid regex")
}

/// Strategy for partition names that are safe as directory names.
pub fn partition_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for entry payloads (arbitrary bytes, possibly empty).
pub fn entry_data_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..1024)
}

/// Strategy for optional `Name` values used by ordering tests.
pub fn sort_value_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        1 => Just(None),
        3 => "[a-z]{1,8}".prop_map(Some),
        3 => (-1000i64..1000).prop_map(|n| Some(n.to_string())),
    ]
}

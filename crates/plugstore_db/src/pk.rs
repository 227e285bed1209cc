//! Primary keys.

use crate::error::{DbError, DbResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of a primary key in bytes.
pub const PK_LEN: usize = 16;

/// A 16 byte opaque entity identifier.
///
/// The all-zero key is [`Pk::NIL`] and is never a valid entity key.
/// The textual form is standard, padded base64 of the raw bytes; on disk
/// keys are addressed by their lowercase hex form (see [`crate::fanout`]).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pk([u8; PK_LEN]);

impl Pk {
    /// The reserved all-zero key.
    pub const NIL: Pk = Pk([0; PK_LEN]);

    /// Derives a well-known key from a short ASCII tag.
    ///
    /// The tag is left-justified into the 16 bytes and zero padded, so the
    /// result is identical across calls and processes.
    ///
    /// # Panics
    ///
    /// Panics if the tag is longer than 16 bytes, or empty: an empty tag
    /// would produce [`Pk::NIL`].
    #[must_use]
    pub const fn from_tag(tag: &str) -> Self {
        let bytes = tag.as_bytes();
        assert!(
            !bytes.is_empty() && bytes.len() <= PK_LEN,
            "pk tag must be between 1 and 16 bytes"
        );
        let mut out = [0u8; PK_LEN];
        let mut i = 0;
        while i < bytes.len() {
            out[i] = bytes[i];
            i += 1;
        }
        Self(out)
    }

    /// Fallible variant of [`Pk::from_tag`] for tags taken from outside input.
    ///
    /// Empty and over-long tags are [`DbError::MalformedKey`].
    pub fn try_from_tag(tag: &str) -> DbResult<Self> {
        let len = tag.len();
        if len == 0 || len > PK_LEN {
            return Err(DbError::malformed_key(format!(
                "tag must be between 1 and {PK_LEN} bytes, got {len}"
            )));
        }
        Ok(Self::from_tag(tag))
    }

    /// Generates a key from the operating system's secure random source.
    ///
    /// The caller is responsible for checking it against existing keys.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; PK_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Creates a key from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; PK_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates a key from a slice, `None` unless it is exactly 16 bytes.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; PK_LEN]>::try_from(slice).ok().map(Self)
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PK_LEN] {
        &self.0
    }

    /// Returns true for the reserved all-zero key.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }

    /// Panics if this is the NIL key.
    pub fn assert_not_nil(&self) {
        assert!(!self.is_nil(), "NIL is not a valid entity key");
    }

    /// Parses the base64 text form.
    pub fn parse(text: &str) -> DbResult<Self> {
        let bytes = STANDARD
            .decode(text)
            .map_err(|e| DbError::malformed_key(format!("invalid base64 '{text}': {e}")))?;
        Self::from_slice(&bytes).ok_or_else(|| {
            DbError::malformed_key(format!(
                "expected {PK_LEN} bytes, decoded {}",
                bytes.len()
            ))
        })
    }

    /// Lowercase hex encoding used for the on-disk layout.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses the lowercase hex encoding.
    pub fn from_hex(text: &str) -> DbResult<Self> {
        let bytes = hex::decode(text)
            .map_err(|e| DbError::malformed_key(format!("invalid hex '{text}': {e}")))?;
        Self::from_slice(&bytes).ok_or_else(|| {
            DbError::malformed_key(format!(
                "expected {PK_LEN} bytes, decoded {}",
                bytes.len()
            ))
        })
    }
}

impl fmt::Display for Pk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&STANDARD.encode(self.0))
    }
}

impl fmt::Debug for Pk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pk({})", self.to_hex())
    }
}

impl FromStr for Pk {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; PK_LEN]> for Pk {
    fn from(bytes: [u8; PK_LEN]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Pk> for [u8; PK_LEN] {
    fn from(pk: Pk) -> Self {
        pk.0
    }
}

impl Serialize for Pk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pk {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PkVisitor;

        impl Visitor<'_> for PkVisitor {
            type Value = Pk;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a base64 encoded 16 byte key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Pk, E> {
                Pk::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(PkVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tag_is_left_justified() {
        let pk = Pk::from_tag("admin");
        assert_eq!(&pk.as_bytes()[..5], b"admin");
        assert!(pk.as_bytes()[5..].iter().all(|b| *b == 0));
        assert_eq!(pk, Pk::from_tag("admin"));
    }

    #[test]
    fn tag_of_exactly_sixteen_bytes() {
        let pk = Pk::from_tag("0123456789abcdef");
        assert_eq!(pk.as_bytes(), b"0123456789abcdef");
    }

    #[test]
    #[should_panic(expected = "between 1 and 16 bytes")]
    fn long_tag_panics() {
        let _ = Pk::from_tag("0123456789abcdefg");
    }

    #[test]
    #[should_panic(expected = "between 1 and 16 bytes")]
    fn empty_tag_panics() {
        let _ = Pk::from_tag("");
    }

    #[test]
    fn try_from_tag_rejects_long_and_empty() {
        assert!(matches!(
            Pk::try_from_tag("0123456789abcdefg"),
            Err(DbError::MalformedKey { .. })
        ));
        assert!(Pk::try_from_tag("").is_err());
        assert_eq!(Pk::try_from_tag("LIST_USERS").unwrap(), Pk::from_tag("LIST_USERS"));
    }

    #[test]
    fn nil() {
        assert!(Pk::NIL.is_nil());
        assert!(Pk::default().is_nil());
        assert!(!Pk::from_tag("x").is_nil());
    }

    #[test]
    #[should_panic(expected = "NIL")]
    fn assert_not_nil_panics() {
        Pk::NIL.assert_not_nil();
    }

    #[test]
    fn random_keys_differ() {
        assert_ne!(Pk::random(), Pk::random());
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(Pk::parse("not base64!").is_err());
        // valid base64, but only 3 bytes
        assert!(Pk::parse("YWJj").is_err());
    }

    #[test]
    fn display_is_standard_base64() {
        let pk = Pk::from_tag("admin");
        assert_eq!(pk.to_string(), "YWRtaW4AAAAAAAAAAAAAAA==");
    }

    #[test]
    fn serde_uses_text_form() {
        let pk = Pk::from_tag("admin");
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json, "\"YWRtaW4AAAAAAAAAAAAAAA==\"");
        let back: Pk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pk);
        assert!(serde_json::from_str::<Pk>("\"YWJj\"").is_err());
    }

    proptest! {
        #[test]
        fn text_form_is_lossless(bytes in prop::array::uniform16(any::<u8>())) {
            let pk = Pk::from_bytes(bytes);
            prop_assert_eq!(Pk::parse(&pk.to_string()).unwrap(), pk);
            prop_assert_eq!(Pk::from_hex(&pk.to_hex()).unwrap(), pk);
        }

        #[test]
        fn hex_is_lowercase(bytes in prop::array::uniform16(any::<u8>())) {
            let hex = Pk::from_bytes(bytes).to_hex();
            prop_assert_eq!(hex.len(), 32);
            prop_assert!(!hex.chars().any(|c| c.is_ascii_uppercase()));
        }
    }
}

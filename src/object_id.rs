use crate::hex::Hex;
use blake3::Hash;
use serde::{Deserialize, Serialize};

use std::{fmt::Display, str::FromStr};

/// An identifier for a particular piece of binary content.
/// Under the hood, this is a [`blake3`] hash.
///
/// It is displayed, serialized, and parsed in hexadecimal format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectId(blake3::Hash);

impl ObjectId {
    /// The length of the hexadecimal rendering.
    pub const HEX_LEN: usize = 64;

    /// The id of `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        ObjectId(blake3::hash(bytes))
    }

    pub fn to_hex(&self) -> String {
        format!("{}", self)
    }

    /// The first `n` hexadecimal characters, as shown in merge summaries.
    pub fn abbreviate(&self, n: usize) -> String {
        let mut s = self.to_hex();
        s.truncate(n);
        s
    }
}

impl Ord for ObjectId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl PartialOrd for ObjectId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b: &[u8] = self.0.as_bytes();
        write!(f, "{}", Hex::from(b))
    }
}

impl From<&[u8]> for ObjectId {
    fn from(bytes: &[u8]) -> Self {
        ObjectId::of(bytes)
    }
}

/// Returned when a string is not a full hexadecimal [`ObjectId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseObjectIdError(pub String);

impl Display for ParseObjectIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "not an object id: {:?}", self.0)
    }
}

impl std::error::Error for ParseObjectIdError {}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseObjectIdError(s.to_string());
        if s.len() != Self::HEX_LEN {
            return Err(bad());
        }
        let bytes: Vec<u8> = Hex::parse(s).ok_or_else(bad)?.into();
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| bad())?;
        Ok(ObjectId(Hash::from(bytes)))
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_hex().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[test]
fn test_display_parse_round_trip() {
    let id = ObjectId::of(b"hello, world");
    let s = id.to_hex();
    assert_eq!(s.len(), ObjectId::HEX_LEN);
    assert_eq!(s.parse::<ObjectId>(), Ok(id));
    assert_eq!(id.abbreviate(7), &s[..7]);
}

#[test]
fn test_parse_rejects_prefixes() {
    let id = ObjectId::of(b"hello, world");
    assert!(id.to_hex()[..10].parse::<ObjectId>().is_err());
}

#[test]
fn test_serde_as_hex_string() {
    let id = ObjectId::of(b"x");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id));
    let back: ObjectId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

//! 128-bit entity identifiers.

use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::ValueError;

/// Length of the canonical textual form (32 lowercase hex digits, no dashes).
pub const GUID_ENCODING_LENGTH: usize = 32;
/// Length of the hyphenated 8-4-4-4-12 form.
pub const GUID_HYPHENATED_LENGTH: usize = 36;

const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Opaque 16-byte identifier. Equality and ordering are byte-wise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid([u8; 16]);

impl Guid {
    pub const fn null() -> Self {
        Self([0; 16])
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn new_random() -> Self {
        Self(*Uuid::new_v4().as_bytes())
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0; 16]
    }

    /// Parses either the canonical 32-digit form or the 36-character
    /// hyphenated form. Hex digits may be upper or lower case.
    pub fn parse(text: &str) -> Result<Self, ValueError> {
        let bytes = text.as_bytes();
        let digits: Vec<u8> = match bytes.len() {
            GUID_ENCODING_LENGTH => bytes.to_vec(),
            GUID_HYPHENATED_LENGTH => {
                for pos in HYPHEN_POSITIONS {
                    if bytes[pos] != b'-' {
                        return Err(ValueError::MalformedIdentifier(format!(
                            "expected '-' at position {pos} in `{text}`"
                        )));
                    }
                }
                bytes
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| !HYPHEN_POSITIONS.contains(idx))
                    .map(|(_, b)| *b)
                    .collect()
            }
            other => {
                return Err(ValueError::MalformedIdentifier(format!(
                    "expected {GUID_ENCODING_LENGTH} or {GUID_HYPHENATED_LENGTH} characters, found {other}"
                )))
            }
        };

        let mut out = [0u8; 16];
        for (idx, pair) in digits.chunks_exact(2).enumerate() {
            let hi = hex_value(pair[0]);
            let lo = hex_value(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => out[idx] = (hi << 4) | lo,
                _ => {
                    let bad = if hi.is_none() { pair[0] } else { pair[1] };
                    return Err(ValueError::MalformedIdentifier(format!(
                        "invalid character {:?} in `{text}`",
                        bad as char
                    )));
                }
            }
        }
        Ok(Self(out))
    }

    /// 8-4-4-4-12 rendering, for interop with tools that expect UUID text.
    pub fn to_hyphenated(&self) -> String {
        Uuid::from_bytes(self.0).hyphenated().to_string()
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0).simple())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

impl FromStr for Guid {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; 16]> for Guid {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Guid::parse(&raw).map_err(de::Error::custom)
    }
}

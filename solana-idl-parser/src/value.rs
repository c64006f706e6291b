//! Dynamically typed values produced by layout decoding.

use base64::Engine;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::Write;

/// A decoded field value.
///
/// 256-bit integers have no native Rust type and are carried as decimal
/// strings. Public keys keep their raw 32 bytes and render as base58.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Unsigned(u128),
    Signed(i128),
    Float(f64),
    BigInt(String),
    PublicKey([u8; 32]),
    Bytes(Vec<u8>),
    String(String),
    List(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Enum {
        variant: String,
        fields: BTreeMap<String, Value>,
    },
}

impl Value {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Self::Unsigned(v) => Some(*v),
            Self::Signed(v) => u128::try_from(*v).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        self.as_u128().and_then(|v| u64::try_from(v).ok())
    }

    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Signed(v) => Some(*v),
            Self::Unsigned(v) => i128::try_from(*v).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::BigInt(s) => Some(s),
            Self::Enum { variant, .. } => Some(variant),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_public_key(&self) -> Option<&[u8; 32]> {
        match self {
            Self::PublicKey(k) => Some(k),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Field lookup on struct values and on enum variants with named fields.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Self::Struct(map) | Self::Enum { fields: map, .. } => map.get(field),
            _ => None,
        }
    }

    /// Converts to JSON, e.g. for storing alongside raw transactions.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Unsigned(v) => match u64::try_from(*v) {
                Ok(small) => serializer.serialize_u64(small),
                Err(_) => serializer.serialize_str(&v.to_string()),
            },
            Self::Signed(v) => match i64::try_from(*v) {
                Ok(small) => serializer.serialize_i64(small),
                Err(_) => serializer.serialize_str(&v.to_string()),
            },
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::BigInt(s) | Self::String(s) => serializer.serialize_str(s),
            Self::PublicKey(k) => serializer.serialize_str(&bs58::encode(k).into_string()),
            Self::Bytes(b) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(b))
            }
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Struct(fields) => fields.serialize(serializer),
            Self::Enum { variant, fields } if fields.is_empty() => {
                serializer.serialize_str(variant)
            }
            Self::Enum { variant, fields } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(variant, fields)?;
                map.end()
            }
        }
    }
}

/// Renders a little-endian unsigned 256-bit integer in decimal.
pub(crate) fn u256_to_decimal(bytes: &[u8; 32]) -> String {
    const CHUNK: u128 = 10_000_000_000_000_000_000; // 10^19

    let mut limbs = [0u64; 4];
    for (limb, chunk) in limbs.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        *limb = u64::from_le_bytes(buf);
    }

    let mut parts: Vec<u64> = Vec::new();
    while limbs.iter().any(|&l| l != 0) {
        let mut rem: u128 = 0;
        for limb in limbs.iter_mut().rev() {
            let cur = (rem << 64) | u128::from(*limb);
            *limb = (cur / CHUNK) as u64;
            rem = cur % CHUNK;
        }
        parts.push(rem as u64);
    }

    let Some(head) = parts.pop() else {
        return "0".to_string();
    };
    let mut out = head.to_string();
    for part in parts.iter().rev() {
        let _ = write!(out, "{part:019}");
    }
    out
}

/// Renders a little-endian two's-complement signed 256-bit integer in decimal.
pub(crate) fn i256_to_decimal(bytes: &[u8; 32]) -> String {
    if bytes[31] & 0x80 == 0 {
        return u256_to_decimal(bytes);
    }
    let mut magnitude = [0u8; 32];
    let mut carry = 1u16;
    for (dst, src) in magnitude.iter_mut().zip(bytes.iter()) {
        let sum = u16::from(!*src) + carry;
        *dst = sum as u8;
        carry = sum >> 8;
    }
    format!("-{}", u256_to_decimal(&magnitude))
}

//! Compiled decode layouts.
//!
//! A layout is a tree of [`FieldKind`] values. Decoding walks the tree and
//! consumes bytes strictly from the front of the buffer: every step returns
//! the decoded value together with the unconsumed remainder, which becomes
//! the input of the next field. Encoding conventions follow Borsh: `u32`
//! little-endian length prefixes for vectors, strings and bytes, a one-byte
//! tag for options and a one-byte variant index for enums.

use crate::error::DecodeError;
use crate::value::{i256_to_decimal, u256_to_decimal, Value};
use std::collections::BTreeMap;

/// Primitive IDL types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    U64,
    I64,
    F64,
    U128,
    I128,
    U256,
    I256,
    PublicKey,
    Bytes,
    String,
}

impl Scalar {
    /// Maps an IDL primitive name to its scalar, accepting both key spellings.
    #[must_use]
    pub fn from_idl_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Self::Bool,
            "u8" => Self::U8,
            "i8" => Self::I8,
            "u16" => Self::U16,
            "i16" => Self::I16,
            "u32" => Self::U32,
            "i32" => Self::I32,
            "f32" => Self::F32,
            "u64" => Self::U64,
            "i64" => Self::I64,
            "f64" => Self::F64,
            "u128" => Self::U128,
            "i128" => Self::I128,
            "u256" => Self::U256,
            "i256" => Self::I256,
            "publicKey" | "pubkey" => Self::PublicKey,
            "bytes" => Self::Bytes,
            "string" => Self::String,
            _ => return None,
        })
    }

    /// Encoded size in bytes, `None` for length-prefixed types.
    #[must_use]
    pub fn width(self) -> Option<usize> {
        match self {
            Self::Bool | Self::U8 | Self::I8 => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::U32 | Self::I32 | Self::F32 => Some(4),
            Self::U64 | Self::I64 | Self::F64 => Some(8),
            Self::U128 | Self::I128 => Some(16),
            Self::U256 | Self::I256 | Self::PublicKey => Some(32),
            Self::Bytes | Self::String => None,
        }
    }

    fn decode<'a>(self, buf: &'a [u8]) -> Result<(Value, &'a [u8]), DecodeError> {
        match self {
            Self::Bool => {
                let ([b], rest) = take::<1>(buf)?;
                match b {
                    0 => Ok((Value::Bool(false), rest)),
                    1 => Ok((Value::Bool(true), rest)),
                    other => Err(DecodeError::InvalidBool(other)),
                }
            }
            Self::U8 => take::<1>(buf).map(|(b, r)| (Value::Unsigned(u128::from(b[0])), r)),
            Self::I8 => take::<1>(buf).map(|(b, r)| (Value::Signed(i128::from(b[0] as i8)), r)),
            Self::U16 => take(buf).map(|(b, r)| (Value::Unsigned(u16::from_le_bytes(b).into()), r)),
            Self::I16 => take(buf).map(|(b, r)| (Value::Signed(i16::from_le_bytes(b).into()), r)),
            Self::U32 => take(buf).map(|(b, r)| (Value::Unsigned(u32::from_le_bytes(b).into()), r)),
            Self::I32 => take(buf).map(|(b, r)| (Value::Signed(i32::from_le_bytes(b).into()), r)),
            Self::F32 => take(buf).map(|(b, r)| (Value::Float(f32::from_le_bytes(b).into()), r)),
            Self::U64 => take(buf).map(|(b, r)| (Value::Unsigned(u64::from_le_bytes(b).into()), r)),
            Self::I64 => take(buf).map(|(b, r)| (Value::Signed(i64::from_le_bytes(b).into()), r)),
            Self::F64 => take(buf).map(|(b, r)| (Value::Float(f64::from_le_bytes(b)), r)),
            Self::U128 => take(buf).map(|(b, r)| (Value::Unsigned(u128::from_le_bytes(b)), r)),
            Self::I128 => take(buf).map(|(b, r)| (Value::Signed(i128::from_le_bytes(b)), r)),
            Self::U256 => take(buf).map(|(b, r)| (Value::BigInt(u256_to_decimal(&b)), r)),
            Self::I256 => take(buf).map(|(b, r)| (Value::BigInt(i256_to_decimal(&b)), r)),
            Self::PublicKey => take(buf).map(|(b, r)| (Value::PublicKey(b), r)),
            Self::Bytes => {
                let (len, rest) = read_len(buf)?;
                let (bytes, rest) = split(rest, len)?;
                Ok((Value::Bytes(bytes.to_vec()), rest))
            }
            Self::String => {
                let (len, rest) = read_len(buf)?;
                let (bytes, rest) = split(rest, len)?;
                let s = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
                Ok((Value::String(s.to_string()), rest))
            }
        }
    }
}

/// Executable description of how to decode one IDL type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(Scalar),
    Vector(Box<FieldKind>),
    Option(Box<FieldKind>),
    Array(Box<FieldKind>, usize),
    Struct(Vec<FieldLayout>),
    Enum(Vec<VariantLayout>),
}

/// A named field inside a struct or enum variant.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantLayout {
    pub name: String,
    pub fields: Vec<FieldLayout>,
}

impl FieldKind {
    /// Encoded size in bytes, `None` when it depends on the data or does not fit in `usize`.
    #[must_use]
    pub fn width(&self) -> Option<usize> {
        match self {
            Self::Scalar(s) => s.width(),
            Self::Vector(_) | Self::Option(_) => None,
            Self::Array(inner, len) => inner.width()?.checked_mul(*len),
            Self::Struct(fields) => fields_width(fields),
            Self::Enum(variants) => {
                let mut widths = variants.iter().map(|v| fields_width(&v.fields));
                let first = widths.next().flatten()?;
                widths
                    .all(|w| w == Some(first))
                    .then_some(first)?
                    .checked_add(1)
            }
        }
    }

    /// Decodes one value from the front of `buf`, returning it with the remainder.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the buffer is too short or holds a byte
    /// pattern the layout forbids (bad bool, option tag or variant index).
    pub fn decode<'a>(&self, buf: &'a [u8]) -> Result<(Value, &'a [u8]), DecodeError> {
        match self {
            Self::Scalar(s) => s.decode(buf),
            Self::Vector(inner) => {
                let (len, rest) = read_len(buf)?;
                // Zero-width items consume nothing, so the prefix alone would drive the loop.
                if inner.width() == Some(0) && len > rest.len() {
                    return Err(DecodeError::LengthOutOfBounds {
                        len,
                        remaining: rest.len(),
                    });
                }
                decode_repeated(inner, len, rest)
            }
            Self::Option(inner) => {
                let ([tag], rest) = take::<1>(buf)?;
                match tag {
                    0 => Ok((Value::Null, rest)),
                    1 => inner.decode(rest),
                    other => Err(DecodeError::InvalidOptionTag(other)),
                }
            }
            Self::Array(inner, len) => decode_repeated(inner, *len, buf),
            Self::Struct(fields) => {
                let (map, rest) = decode_fields(fields, buf)?;
                Ok((Value::Struct(map), rest))
            }
            Self::Enum(variants) => {
                let ([index], rest) = take::<1>(buf)?;
                let variant =
                    variants
                        .get(usize::from(index))
                        .ok_or(DecodeError::InvalidEnumVariant {
                            index,
                            variants: variants.len(),
                        })?;
                let (fields, rest) = decode_fields(&variant.fields, rest)?;
                Ok((
                    Value::Enum {
                        variant: variant.name.clone(),
                        fields,
                    },
                    rest,
                ))
            }
        }
    }
}

/// Layout of a top-level record (event or account body) keyed by discriminator.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledLayout {
    pub name: String,
    pub fields: Vec<FieldLayout>,
}

impl CompiledLayout {
    #[must_use]
    pub fn width(&self) -> Option<usize> {
        fields_width(&self.fields)
    }

    /// Decodes fields in declaration order and returns the unconsumed tail.
    ///
    /// # Errors
    ///
    /// Propagates the first field's [`DecodeError`].
    pub fn decode<'a>(
        &self,
        buf: &'a [u8],
    ) -> Result<(BTreeMap<String, Value>, &'a [u8]), DecodeError> {
        decode_fields(&self.fields, buf)
    }

    /// Decodes the whole buffer, rejecting leftovers.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::TrailingBytes`] if any bytes remain after the
    /// last field, or the underlying field error.
    pub fn decode_exact(&self, buf: &[u8]) -> Result<BTreeMap<String, Value>, DecodeError> {
        let (data, rest) = self.decode(buf)?;
        if !rest.is_empty() {
            return Err(DecodeError::TrailingBytes {
                layout: self.name.clone(),
                remaining: rest.len(),
            });
        }
        Ok(data)
    }
}

fn fields_width(fields: &[FieldLayout]) -> Option<usize> {
    fields
        .iter()
        .try_fold(0usize, |total, f| total.checked_add(f.kind.width()?))
}

fn decode_fields<'a>(
    fields: &[FieldLayout],
    mut buf: &'a [u8],
) -> Result<(BTreeMap<String, Value>, &'a [u8]), DecodeError> {
    let mut map = BTreeMap::new();
    for field in fields {
        let (value, rest) = field.kind.decode(buf)?;
        map.insert(field.name.clone(), value);
        buf = rest;
    }
    Ok((map, buf))
}

fn decode_repeated<'a>(
    inner: &FieldKind,
    len: usize,
    mut buf: &'a [u8],
) -> Result<(Value, &'a [u8]), DecodeError> {
    // Length prefixes come from untrusted data, so never reserve more than the buffer could hold.
    let mut items = Vec::with_capacity(len.min(buf.len()));
    for _ in 0..len {
        let (value, rest) = inner.decode(buf)?;
        items.push(value);
        buf = rest;
    }
    Ok((Value::List(items), buf))
}

fn split(buf: &[u8], n: usize) -> Result<(&[u8], &[u8]), DecodeError> {
    if buf.len() < n {
        return Err(DecodeError::UnexpectedEof {
            needed: n,
            remaining: buf.len(),
        });
    }
    Ok(buf.split_at(n))
}

fn take<const N: usize>(buf: &[u8]) -> Result<([u8; N], &[u8]), DecodeError> {
    let (head, rest) = split(buf, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(head);
    Ok((out, rest))
}

fn read_len(buf: &[u8]) -> Result<(usize, &[u8]), DecodeError> {
    let (bytes, rest) = take::<4>(buf)?;
    Ok((u32::from_le_bytes(bytes) as usize, rest))
}

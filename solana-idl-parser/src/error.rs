//! Error types for layout compilation and binary decoding.

use thiserror::Error;

/// Failures while turning an IDL document into compiled layouts.
///
/// These surface once, at startup, when decoders are built.
#[derive(Debug, Error)]
pub enum IdlError {
    /// A `defined` reference names a type missing from the IDL's type table.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A primitive or container the layout compiler does not understand.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// `array` whose length is not a plain non-negative integer.
    #[error("Malformed array length in {0}")]
    MalformedArray(String),

    /// A type that (transitively) contains itself.
    #[error("Recursive type definition: {0}")]
    RecursiveType(String),

    /// Neither inline fields nor a struct in `types` describe this item.
    #[error("No struct definition found for {0}")]
    MissingDefinition(String),

    /// An explicit discriminator that is not exactly 8 bytes long.
    #[error("Invalid discriminator for {0}: expected 8 bytes")]
    InvalidDiscriminator(String),

    /// Two items hash to the same discriminator.
    #[error("Discriminator collision between {first} and {second}")]
    DuplicateDiscriminator { first: String, second: String },
}

/// Failures while decoding a byte buffer with a compiled layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// The layout finished but bytes were left over, meaning the IDL and
    /// the on-chain program disagree about the record shape.
    #[error("{remaining} trailing bytes after decoding {layout}")]
    TrailingBytes { layout: String, remaining: usize },

    #[error("Invalid bool byte: {0}")]
    InvalidBool(u8),

    #[error("Invalid option tag: {0}")]
    InvalidOptionTag(u8),

    #[error("Enum variant index {index} out of range ({variants} variants)")]
    InvalidEnumVariant { index: u8, variants: usize },

    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8,

    /// A length prefix that cannot be backed by the remaining bytes.
    #[error("Length prefix {len} exceeds the {remaining} bytes remaining")]
    LengthOutOfBounds { len: usize, remaining: usize },
}

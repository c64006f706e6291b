//! Anchor IDL parsing and IDL-driven binary decoding.
//!
//! An IDL is compiled once into immutable [`CompiledLayout`]s keyed by
//! 8-byte discriminators. [`EventDecoder`] turns base64 `Program data:` log
//! records into [`DecodedEvent`]s and [`AccountDecoder`] does the same for
//! raw account data.

pub mod compiler;
pub mod decoder;
pub mod error;
pub mod layout;
pub mod model;
pub mod value;

pub use compiler::IdlLayoutCompiler;
pub use decoder::{
    account_discriminator, calculate_discriminator, event_discriminator, AccountDecoder,
    DecodedEvent, Discriminator, EventDecoder, DISCRIMINATOR_LEN,
};
pub use error::{DecodeError, IdlError};
pub use layout::{CompiledLayout, FieldKind, FieldLayout, Scalar, VariantLayout};
pub use model::Idl;
pub use value::Value;

use anyhow::{Context, Result};
use std::path::Path;

/// Parses an IDL document from a JSON string.
///
/// # Errors
///
/// Returns the `serde_json` error if the document is not a valid IDL.
pub fn parse_idl(json: &str) -> std::result::Result<Idl, serde_json::Error> {
    serde_json::from_str(json)
}

/// Reads and parses an IDL file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse as an IDL.
pub fn load_idl(idl_path: &Path) -> Result<Idl> {
    let content = std::fs::read_to_string(idl_path)
        .with_context(|| format!("Failed to read IDL file {}", idl_path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse IDL JSON {}", idl_path.display()))
}

//! Discriminator-keyed decoders for program events and accounts.
//!
//! Both decoders build their `{discriminator -> layout}` table once from an
//! IDL and never mutate it afterwards, so a decoder can be shared freely
//! across tasks behind an `Arc`.

use crate::compiler::IdlLayoutCompiler;
use crate::error::{DecodeError, IdlError};
use crate::layout::CompiledLayout;
use crate::model::Idl;
use crate::value::Value;
use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

/// Length of an Anchor discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

pub type Discriminator = [u8; DISCRIMINATOR_LEN];

/// First 8 bytes of `sha256("<namespace>:<name>")`.
#[must_use]
pub fn calculate_discriminator(namespace: &str, name: &str) -> Discriminator {
    let mut hasher = Sha256::new();
    hasher.update(format!("{namespace}:{name}").as_bytes());
    let hash = hasher.finalize();
    let mut disc = [0u8; DISCRIMINATOR_LEN];
    disc.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    disc
}

#[must_use]
pub fn event_discriminator(name: &str) -> Discriminator {
    calculate_discriminator("event", name)
}

#[must_use]
pub fn account_discriminator(name: &str) -> Discriminator {
    calculate_discriminator("account", name)
}

/// A decoded event or account: the IDL item name plus its field map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedEvent {
    pub name: String,
    pub data: BTreeMap<String, Value>,
}

impl DecodedEvent {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

#[derive(Debug, Default)]
struct DiscriminatorTable {
    layouts: HashMap<Discriminator, CompiledLayout>,
}

impl DiscriminatorTable {
    fn insert(&mut self, disc: Discriminator, layout: CompiledLayout) -> Result<(), IdlError> {
        if let Some(existing) = self.layouts.get(&disc) {
            return Err(IdlError::DuplicateDiscriminator {
                first: existing.name.clone(),
                second: layout.name,
            });
        }
        self.layouts.insert(disc, layout);
        Ok(())
    }

    /// `Ok(None)` for buffers shorter than a discriminator or with an unknown prefix.
    fn decode(&self, bytes: &[u8]) -> Result<Option<DecodedEvent>, DecodeError> {
        if bytes.len() < DISCRIMINATOR_LEN {
            return Ok(None);
        }
        let (head, body) = bytes.split_at(DISCRIMINATOR_LEN);
        let mut disc = [0u8; DISCRIMINATOR_LEN];
        disc.copy_from_slice(head);

        let Some(layout) = self.layouts.get(&disc) else {
            tracing::trace!(discriminator = ?disc, "Skipping unknown discriminator");
            return Ok(None);
        };

        let data = layout.decode_exact(body)?;
        Ok(Some(DecodedEvent {
            name: layout.name.clone(),
            data,
        }))
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.layouts.values().map(|l| l.name.as_str())
    }
}

fn explicit_or(
    name: &str,
    explicit: Option<&Vec<u8>>,
    fallback: impl FnOnce(&str) -> Discriminator,
) -> Result<Discriminator, IdlError> {
    match explicit {
        Some(bytes) => {
            Discriminator::try_from(bytes.as_slice())
                .map_err(|_| IdlError::InvalidDiscriminator(name.to_string()))
        }
        None => Ok(fallback(name)),
    }
}

/// Decodes base64 `Program data:` records emitted by one program.
///
/// # Example
///
/// ```
/// use solana_idl_parser::{parse_idl, EventDecoder};
///
/// let idl = parse_idl(r#"{"events":[{"name":"Ping","fields":[{"name":"n","type":"u8"}]}]}"#).unwrap();
/// let decoder = EventDecoder::from_idl(&idl).unwrap();
/// assert!(decoder.decode("not base64!").unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct EventDecoder {
    table: DiscriminatorTable,
}

impl EventDecoder {
    /// Compiles every event in the IDL.
    ///
    /// # Errors
    ///
    /// Returns the first [`IdlError`] raised while compiling an event layout.
    pub fn from_idl(idl: &Idl) -> Result<Self, IdlError> {
        let mut compiler = IdlLayoutCompiler::new(idl);
        let mut table = DiscriminatorTable::default();
        for event in &idl.events {
            let disc = explicit_or(&event.name, event.discriminator.as_ref(), event_discriminator)?;
            table.insert(disc, compiler.compile_event(event)?)?;
        }
        Ok(Self { table })
    }

    /// Decodes one base64 log record.
    ///
    /// Returns `Ok(None)` for invalid base64, records shorter than a
    /// discriminator, and discriminators this IDL does not define.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when a known layout does not match the
    /// bytes, including [`DecodeError::TrailingBytes`] for leftovers.
    pub fn decode(&self, message: &str) -> Result<Option<DecodedEvent>, DecodeError> {
        let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(message.trim()) else {
            return Ok(None);
        };
        self.decode_bytes(&bytes)
    }

    /// Same as [`Self::decode`] for an already base64-decoded record.
    ///
    /// # Errors
    ///
    /// See [`Self::decode`].
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<Option<DecodedEvent>, DecodeError> {
        self.table.decode(bytes)
    }

    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.table.names()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.layouts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.layouts.is_empty()
    }
}

/// Decodes raw account data prefixed with an 8-byte account discriminator.
#[derive(Debug)]
pub struct AccountDecoder {
    table: DiscriminatorTable,
}

impl AccountDecoder {
    /// Compiles every account in the IDL.
    ///
    /// # Errors
    ///
    /// Returns the first [`IdlError`] raised while compiling an account layout.
    pub fn from_idl(idl: &Idl) -> Result<Self, IdlError> {
        let mut compiler = IdlLayoutCompiler::new(idl);
        let mut table = DiscriminatorTable::default();
        for account in &idl.accounts {
            let disc = explicit_or(
                &account.name,
                account.discriminator.as_ref(),
                account_discriminator,
            )?;
            table.insert(disc, compiler.compile_account(account)?)?;
        }
        Ok(Self { table })
    }

    /// Decodes account data. Unknown discriminators yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the matched layout does not consume
    /// the data exactly.
    pub fn decode(&self, data: &[u8]) -> Result<Option<DecodedEvent>, DecodeError> {
        self.table.decode(data)
    }

    pub fn account_names(&self) -> impl Iterator<Item = &str> {
        self.table.names()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.layouts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.layouts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminator_is_deterministic_and_namespaced() {
        assert_eq!(event_discriminator("Deposit"), event_discriminator("Deposit"));
        assert_ne!(event_discriminator("Deposit"), account_discriminator("Deposit"));
        assert_ne!(event_discriminator("Deposit"), event_discriminator("Withdraw"));
    }

    #[test]
    fn test_short_buffer_is_not_an_error() {
        let table = DiscriminatorTable::default();
        assert_eq!(table.decode(&[1, 2, 3]), Ok(None));
    }

    #[test]
    fn test_explicit_discriminator_must_be_eight_bytes() {
        let bad = vec![1u8, 2, 3];
        assert!(matches!(
            explicit_or("X", Some(&bad), event_discriminator),
            Err(IdlError::InvalidDiscriminator(_))
        ));

        let good = vec![9u8; 8];
        assert_eq!(
            explicit_or("X", Some(&good), event_discriminator).unwrap(),
            [9u8; 8]
        );
    }
}

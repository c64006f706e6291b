//! Serde model for Anchor IDL documents.
//!
//! Both the legacy layout (`publicKey`, `{"defined": "Name"}`, events carrying
//! their fields inline) and the 0.30+ layout (`pubkey`, `{"defined": {"name": ..}}`,
//! explicit discriminators, event and account bodies living in `types`) are
//! accepted. Sections the decoders never look at (instructions, errors, constants)
//! are ignored during deserialization.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idl {
    #[serde(default)]
    pub address: Option<String>,
    /// Legacy IDLs carry the program name at the top level.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub metadata: Option<IdlMetadata>,
    #[serde(default)]
    pub accounts: Vec<IdlAccount>,
    #[serde(default)]
    pub events: Vec<IdlEvent>,
    #[serde(default)]
    pub types: Vec<IdlTypeDef>,
}

impl Idl {
    /// Program name from whichever section the dialect puts it in.
    #[must_use]
    pub fn program_name(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .map(|m| m.name.as_str())
            .or(self.name.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdlMetadata {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub spec: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdlField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlTypeDefinition,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdlEvent {
    pub name: String,
    #[serde(default)]
    pub discriminator: Option<Vec<u8>>,
    /// Present in legacy IDLs only. Newer IDLs describe the body in `types`.
    #[serde(default)]
    pub fields: Option<Vec<IdlField>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdlAccount {
    pub name: String,
    #[serde(default)]
    pub discriminator: Option<Vec<u8>>,
    /// Legacy IDLs inline the account body here.
    #[serde(default, rename = "type")]
    pub ty: Option<IdlTypeDefTy>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdlTypeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlTypeDefTy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdlTypeDefTy {
    Struct {
        #[serde(default)]
        fields: IdlDefinedFields,
    },
    Enum {
        variants: Vec<IdlEnumVariant>,
    },
    Alias {
        value: IdlTypeDefinition,
    },
}

/// Struct and enum-variant bodies are either named fields or a tuple of bare types.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdlDefinedFields {
    Named(Vec<IdlField>),
    Tuple(Vec<IdlTypeDefinition>),
}

impl Default for IdlDefinedFields {
    fn default() -> Self {
        Self::Named(Vec::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdlEnumVariant {
    pub name: String,
    #[serde(default)]
    pub fields: Option<IdlDefinedFields>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(untagged)]
pub enum IdlTypeDefinition {
    Simple(String),
    Complex(IdlTypeDefinitionComplex),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdlTypeDefinitionComplex {
    Defined(IdlDefinedRef),
    Option(Box<IdlTypeDefinition>),
    Vec(Box<IdlTypeDefinition>),
    /// `[element, length]`. The length stays raw JSON so generic lengths
    /// surface as a compile error rather than a parse failure of the whole IDL.
    Array(Box<IdlTypeDefinition>, Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdlDefinedRef {
    Name(String),
    Named { name: String },
}

impl IdlDefinedRef {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Named { name } => name,
        }
    }
}

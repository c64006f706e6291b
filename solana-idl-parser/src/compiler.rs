//! Translates IDL type descriptions into [`FieldKind`] trees.

use crate::error::IdlError;
use crate::layout::{CompiledLayout, FieldKind, FieldLayout, Scalar, VariantLayout};
use crate::model::{
    Idl, IdlAccount, IdlDefinedFields, IdlEvent, IdlField, IdlTypeDef, IdlTypeDefTy,
    IdlTypeDefinition, IdlTypeDefinitionComplex,
};
use std::collections::HashMap;

/// Resolves `defined` references against an IDL's type table while building layouts.
///
/// Each compile call expands referenced types inline, so the resulting
/// layouts are self-contained and do not borrow from the IDL.
pub struct IdlLayoutCompiler<'a> {
    types: HashMap<&'a str, &'a IdlTypeDef>,
    resolving: Vec<String>,
}

impl<'a> IdlLayoutCompiler<'a> {
    #[must_use]
    pub fn new(idl: &'a Idl) -> Self {
        Self {
            types: idl.types.iter().map(|t| (t.name.as_str(), t)).collect(),
            resolving: Vec::new(),
        }
    }

    /// Compiles a single IDL type expression.
    ///
    /// # Errors
    ///
    /// Fails on unknown primitives, unresolved or recursive `defined` types
    /// and arrays without a literal length.
    pub fn compile_type(&mut self, ty: &IdlTypeDefinition) -> Result<FieldKind, IdlError> {
        match ty {
            IdlTypeDefinition::Simple(name) => Scalar::from_idl_name(name)
                .map(FieldKind::Scalar)
                .ok_or_else(|| IdlError::UnsupportedType(name.clone())),
            IdlTypeDefinition::Complex(complex) => match complex {
                IdlTypeDefinitionComplex::Vec(inner) => {
                    Ok(FieldKind::Vector(Box::new(self.compile_type(inner)?)))
                }
                IdlTypeDefinitionComplex::Option(inner) => {
                    Ok(FieldKind::Option(Box::new(self.compile_type(inner)?)))
                }
                IdlTypeDefinitionComplex::Array(inner, len) => {
                    let len = len
                        .as_u64()
                        .and_then(|n| usize::try_from(n).ok())
                        .ok_or_else(|| IdlError::MalformedArray(len.to_string()))?;
                    let item = self.compile_type(inner)?;
                    if item.width().is_some_and(|w| w.checked_mul(len).is_none()) {
                        return Err(IdlError::MalformedArray(len.to_string()));
                    }
                    Ok(FieldKind::Array(Box::new(item), len))
                }
                IdlTypeDefinitionComplex::Defined(reference) => {
                    self.compile_defined(reference.name())
                }
            },
        }
    }

    /// Compiles a named entry of the type table.
    ///
    /// # Errors
    ///
    /// Returns [`IdlError::UnknownType`] if no such type exists and
    /// [`IdlError::RecursiveType`] if it refers back to itself.
    pub fn compile_defined(&mut self, name: &str) -> Result<FieldKind, IdlError> {
        let def = *self
            .types
            .get(name)
            .ok_or_else(|| IdlError::UnknownType(name.to_string()))?;

        if self.resolving.iter().any(|n| n == name) {
            return Err(IdlError::RecursiveType(name.to_string()));
        }
        self.resolving.push(name.to_string());
        let kind = self.compile_type_def(&def.ty);
        self.resolving.pop();
        kind
    }

    fn compile_type_def(&mut self, ty: &IdlTypeDefTy) -> Result<FieldKind, IdlError> {
        match ty {
            IdlTypeDefTy::Struct { fields } => Ok(FieldKind::Struct(self.compile_body(fields)?)),
            IdlTypeDefTy::Enum { variants } => {
                let variants = variants
                    .iter()
                    .map(|variant| {
                        let fields = match &variant.fields {
                            Some(body) => self.compile_body(body)?,
                            None => Vec::new(),
                        };
                        Ok(VariantLayout {
                            name: variant.name.clone(),
                            fields,
                        })
                    })
                    .collect::<Result<Vec<_>, IdlError>>()?;
                Ok(FieldKind::Enum(variants))
            }
            IdlTypeDefTy::Alias { value } => self.compile_type(value),
        }
    }

    /// Named fields keep their names, tuple members are named by position.
    fn compile_body(&mut self, body: &IdlDefinedFields) -> Result<Vec<FieldLayout>, IdlError> {
        match body {
            IdlDefinedFields::Named(fields) => self.compile_fields(fields),
            IdlDefinedFields::Tuple(types) => types
                .iter()
                .enumerate()
                .map(|(i, ty)| {
                    Ok(FieldLayout {
                        name: i.to_string(),
                        kind: self.compile_type(ty)?,
                    })
                })
                .collect(),
        }
    }

    /// Compiles an ordered field list.
    ///
    /// # Errors
    ///
    /// Propagates the first failing field.
    pub fn compile_fields(&mut self, fields: &[IdlField]) -> Result<Vec<FieldLayout>, IdlError> {
        fields
            .iter()
            .map(|f| {
                Ok(FieldLayout {
                    name: f.name.clone(),
                    kind: self.compile_type(&f.ty)?,
                })
            })
            .collect()
    }

    /// Builds the layout of an event body.
    ///
    /// # Errors
    ///
    /// Fails if the event has no inline fields and no struct of the same
    /// name in `types`, or if any field fails to compile.
    pub fn compile_event(&mut self, event: &IdlEvent) -> Result<CompiledLayout, IdlError> {
        let fields = match &event.fields {
            Some(fields) => self.compile_fields(fields)?,
            None => self.compile_named_struct(&event.name)?,
        };
        Ok(CompiledLayout {
            name: event.name.clone(),
            fields,
        })
    }

    /// Builds the layout of an account body (everything after the discriminator).
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::compile_event`].
    pub fn compile_account(&mut self, account: &IdlAccount) -> Result<CompiledLayout, IdlError> {
        let fields = match &account.ty {
            Some(IdlTypeDefTy::Struct { fields }) => self.compile_body(fields)?,
            Some(_) => return Err(IdlError::MissingDefinition(account.name.clone())),
            None => self.compile_named_struct(&account.name)?,
        };
        Ok(CompiledLayout {
            name: account.name.clone(),
            fields,
        })
    }

    fn compile_named_struct(&mut self, name: &str) -> Result<Vec<FieldLayout>, IdlError> {
        match self.compile_defined(name) {
            Ok(FieldKind::Struct(fields)) => Ok(fields),
            Ok(_) | Err(IdlError::UnknownType(_)) => {
                Err(IdlError::MissingDefinition(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

//! Resolved name-sites.
//!
//! An [`Identifier`] starts `Unresolved` out of the parser. Resolution
//! rewrites its kind to point at the declaration it names: a local, a
//! parameter, an object variable, a property, a struct member, a function,
//! or one of the builtin array methods.

use std::rc::Rc;

use papyrus_core::error::Fatal;
use papyrus_core::location::FileLocation;

use crate::ast::stmt::DeclareStatement;
use crate::ast::{Function, Parameter, Property, StructMember, Variable};
use crate::pex::{FunctionBuilder, Instruction, PexValue};
use crate::ty::Ty;

/// The builtin methods callable on array expressions.
///
/// `find` and `rfind` specialize to the struct variants when the element
/// type is a struct, because the engine searches those by member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayFunctionKind {
    Find,
    FindStruct,
    RFind,
    RFindStruct,
    Add,
    Clear,
    Insert,
    Remove,
    RemoveLast,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub location: FileLocation,
    pub name: String,
    pub kind: IdentKind,
}

#[derive(Debug, Clone)]
pub enum IdentKind {
    Unresolved,
    Local(Rc<DeclareStatement>),
    Parameter(Rc<Parameter>),
    Variable(Rc<Variable>),
    Property(Rc<Property>),
    StructMember(Rc<StructMember>),
    Function(Rc<Function>),
    ArrayFunction { kind: ArrayFunctionKind, element: Box<Ty> },
}

impl Identifier {
    pub fn unresolved(location: FileLocation, name: impl Into<String>) -> Self {
        Self {
            location,
            name: name.into(),
            kind: IdentKind::Unresolved,
        }
    }

    /// `other`'s spelling and location with a resolved kind.
    pub fn with_kind(other: &Identifier, kind: IdentKind) -> Self {
        Self {
            location: other.location.clone(),
            name: other.name.clone(),
            kind,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self.kind, IdentKind::Unresolved)
    }

    /// The type of the value this identifier evaluates to.
    ///
    /// Function and array-function identifiers are not value-sites; their
    /// result typing lives on the call expression.
    pub fn result_type(&self) -> Ty {
        match &self.kind {
            IdentKind::Local(decl) => decl.ty.borrow().clone(),
            IdentKind::Parameter(p) => p.ty.borrow().clone(),
            IdentKind::Variable(v) => v.ty.borrow().clone(),
            IdentKind::Property(p) => p.ty.borrow().clone(),
            IdentKind::StructMember(m) => m.ty.borrow().clone(),
            IdentKind::Function(f) => f.return_type.borrow().clone(),
            IdentKind::ArrayFunction { .. } | IdentKind::Unresolved => {
                Ty::none(self.location.clone())
            }
        }
    }

    /// Emit a load of this identifier's value. `this` is the object the
    /// access goes through (`self` for unqualified property reads).
    pub fn generate_load(
        &self,
        bldr: &mut FunctionBuilder<'_>,
        this: PexValue,
    ) -> Result<PexValue, Fatal> {
        match &self.kind {
            IdentKind::Local(decl) => Ok(PexValue::Identifier(bldr.intern(&decl.name))),
            IdentKind::Parameter(p) => Ok(PexValue::Identifier(bldr.intern(&p.name))),
            IdentKind::Variable(v) => Ok(PexValue::Identifier(bldr.intern(&v.name))),
            IdentKind::Property(p) => {
                let name = PexValue::String(bldr.intern(&p.name));
                let dest = bldr.alloc_temp(&p.ty.borrow());
                bldr.emit(Instruction::propget(name, this, PexValue::Temp(dest)))?;
                Ok(PexValue::Temp(dest))
            }
            IdentKind::StructMember(m) => {
                let name = PexValue::String(bldr.intern(&m.name));
                let dest = bldr.alloc_temp(&m.ty.borrow());
                bldr.emit(Instruction::structget(PexValue::Temp(dest), this, name))?;
                Ok(PexValue::Temp(dest))
            }
            // Not value-sites. Invalid trips the builder's operand check if
            // anything tries to consume it.
            IdentKind::Function(_) | IdentKind::ArrayFunction { .. } | IdentKind::Unresolved => {
                Ok(PexValue::Invalid)
            }
        }
    }

    /// Emit a store of `value` into this identifier.
    pub fn generate_store(
        &self,
        bldr: &mut FunctionBuilder<'_>,
        this: PexValue,
        value: PexValue,
    ) -> Result<(), Fatal> {
        match &self.kind {
            IdentKind::Local(decl) => {
                let dest = PexValue::Identifier(bldr.intern(&decl.name));
                bldr.emit(Instruction::assign(dest, value))
            }
            IdentKind::Parameter(p) => {
                let dest = PexValue::Identifier(bldr.intern(&p.name));
                bldr.emit(Instruction::assign(dest, value))
            }
            IdentKind::Variable(v) => {
                let dest = PexValue::Identifier(bldr.intern(&v.name));
                bldr.emit(Instruction::assign(dest, value))
            }
            IdentKind::Property(p) => {
                let name = PexValue::String(bldr.intern(&p.name));
                bldr.emit(Instruction::propset(name, this, value))
            }
            IdentKind::StructMember(m) => {
                let name = PexValue::String(bldr.intern(&m.name));
                bldr.emit(Instruction::structset(this, name, value))
            }
            IdentKind::Function(_) | IdentKind::ArrayFunction { .. } | IdentKind::Unresolved => {
                Err(bldr
                    .diags()
                    .logical_fatal("Attempted to store through a non-value identifier!"))
            }
        }
    }
}

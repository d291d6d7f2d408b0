//! The Papyrus type algebra.
//!
//! Types start life as `Unresolved(name)` out of the parser and are rewritten
//! to their resolved forms during semantic analysis. Resolved struct and
//! object types hold `Rc` references into the loader's interned scripts, so
//! equality over them is referent identity, exactly like the engine's
//! pointer comparison.

use std::fmt;
use std::rc::Rc;

use papyrus_core::caseless::caseless_eq;
use papyrus_core::location::FileLocation;

use crate::ast::{ObjectDef, StructDef};

#[derive(Debug, Clone)]
pub struct Ty {
    pub location: FileLocation,
    pub kind: TyKind,
}

#[derive(Debug, Clone)]
pub enum TyKind {
    None,
    Bool,
    Float,
    Int,
    String,
    Var,
    Array(Box<Ty>),
    Unresolved(String),
    Struct(Rc<StructDef>),
    Object(Rc<ObjectDef>),
}

impl Ty {
    pub fn none(location: FileLocation) -> Self {
        Self { location, kind: TyKind::None }
    }

    pub fn bool(location: FileLocation) -> Self {
        Self { location, kind: TyKind::Bool }
    }

    pub fn float(location: FileLocation) -> Self {
        Self { location, kind: TyKind::Float }
    }

    pub fn int(location: FileLocation) -> Self {
        Self { location, kind: TyKind::Int }
    }

    pub fn string(location: FileLocation) -> Self {
        Self { location, kind: TyKind::String }
    }

    pub fn var(location: FileLocation) -> Self {
        Self { location, kind: TyKind::Var }
    }

    pub fn array(location: FileLocation, element: Ty) -> Self {
        Self { location, kind: TyKind::Array(Box::new(element)) }
    }

    pub fn unresolved(location: FileLocation, name: impl Into<String>) -> Self {
        Self { location, kind: TyKind::Unresolved(name.into()) }
    }

    pub fn resolved_struct(location: FileLocation, def: Rc<StructDef>) -> Self {
        Self { location, kind: TyKind::Struct(def) }
    }

    pub fn resolved_object(location: FileLocation, def: Rc<ObjectDef>) -> Self {
        Self { location, kind: TyKind::Object(def) }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.kind, TyKind::None)
    }

    /// The element type of an array.
    ///
    /// # Panics
    ///
    /// Panics on non-array types; callers dispatch on the kind first.
    pub fn element_type(&self) -> &Ty {
        match &self.kind {
            TyKind::Array(elem) => elem,
            _ => panic!("element_type() called on a non-array type"),
        }
    }
}

/// Equality ignores locations: tags must match, arrays compare elementwise,
/// unresolved names compare caselessly, resolved forms compare by referent.
impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (TyKind::None, TyKind::None)
            | (TyKind::Bool, TyKind::Bool)
            | (TyKind::Float, TyKind::Float)
            | (TyKind::Int, TyKind::Int)
            | (TyKind::String, TyKind::String)
            | (TyKind::Var, TyKind::Var) => true,
            (TyKind::Array(a), TyKind::Array(b)) => a == b,
            (TyKind::Unresolved(a), TyKind::Unresolved(b)) => caseless_eq(a, b),
            (TyKind::Struct(a), TyKind::Struct(b)) => Rc::ptr_eq(a, b),
            (TyKind::Object(a), TyKind::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Ty {}

/// The engine's canonical spelling, used for pex serialization.
impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TyKind::None => f.write_str("None"),
            TyKind::Bool => f.write_str("Bool"),
            TyKind::Float => f.write_str("Float"),
            TyKind::Int => f.write_str("Int"),
            TyKind::String => f.write_str("String"),
            TyKind::Var => f.write_str("Var"),
            TyKind::Array(elem) => write!(f, "{}[]", elem),
            TyKind::Unresolved(name) => f.write_str(name),
            TyKind::Struct(s) => f.write_str(&s.name),
            TyKind::Object(o) => f.write_str(&o.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ObjectDef;

    fn loc() -> FileLocation {
        FileLocation::new("test.psc", 1, 0)
    }

    #[test]
    fn scalar_equality_ignores_location() {
        assert_eq!(Ty::int(loc()), Ty::int(FileLocation::new("other.psc", 9, 9)));
        assert_ne!(Ty::int(loc()), Ty::float(loc()));
    }

    #[test]
    fn unresolved_names_compare_caselessly() {
        assert_eq!(Ty::unresolved(loc(), "Actor"), Ty::unresolved(loc(), "ACTOR"));
        assert_ne!(Ty::unresolved(loc(), "Actor"), Ty::unresolved(loc(), "Form"));
    }

    #[test]
    fn arrays_compare_elementwise() {
        let a = Ty::array(loc(), Ty::int(loc()));
        let b = Ty::array(loc(), Ty::int(loc()));
        let c = Ty::array(loc(), Ty::float(loc()));
        assert_eq!(a, b);
        assert_ne!(a, c);

        // Nested arrays recurse.
        let aa = Ty::array(loc(), Ty::array(loc(), Ty::int(loc())));
        let bb = Ty::array(loc(), Ty::array(loc(), Ty::int(loc())));
        assert_eq!(aa, bb);
    }

    #[test]
    fn resolved_objects_compare_by_identity() {
        let a = Rc::new(ObjectDef::new(loc(), "Actor"));
        let b = Rc::new(ObjectDef::new(loc(), "Actor"));

        assert_eq!(
            Ty::resolved_object(loc(), a.clone()),
            Ty::resolved_object(loc(), a.clone())
        );
        // Same name, different referent: not equal.
        assert_ne!(Ty::resolved_object(loc(), a), Ty::resolved_object(loc(), b));
    }

    #[test]
    fn display_uses_engine_spellings() {
        assert_eq!(Ty::int(loc()).to_string(), "Int");
        assert_eq!(Ty::none(loc()).to_string(), "None");
        assert_eq!(Ty::array(loc(), Ty::string(loc())).to_string(), "String[]");
        assert_eq!(
            Ty::array(loc(), Ty::array(loc(), Ty::int(loc()))).to_string(),
            "Int[][]"
        );

        let obj = Rc::new(ObjectDef::new(loc(), "Actor"));
        assert_eq!(Ty::resolved_object(loc(), obj).to_string(), "Actor");
    }

    #[test]
    fn element_type_of_array() {
        let arr = Ty::array(loc(), Ty::bool(loc()));
        assert_eq!(*arr.element_type(), Ty::bool(loc()));
    }
}

//! The script entity model.
//!
//! A [`Script`] owns its objects; everything below it is shared through
//! `Rc` so resolved types and identifiers can point straight at the entity
//! they name. Fields rewritten during semantic analysis (types, default
//! values, function bodies) sit in `RefCell` slots, and every pass follows
//! a clone-resolve-store discipline so no borrow is held across a recursive
//! script load.

pub mod expr;
pub mod stmt;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use papyrus_core::diagnostics::Diagnostics;
use papyrus_core::error::Fatal;
use papyrus_core::location::FileLocation;

use crate::context::ResolutionContext;
use crate::loader::ScriptLoader;
use crate::pex::{
    FunctionBuilder, Instruction, PexDebugFunctionInfo, PexFile, PexFunction, PexFunctionParameter,
};
use crate::ty::Ty;
use crate::value::Value;

pub use expr::{BinaryOp, Expression};
pub use stmt::{DeclareStatement, IfArm, Statement};

/// One source file's worth of objects.
#[derive(Debug)]
pub struct Script {
    pub source_path: PathBuf,
    pub objects: Vec<Rc<ObjectDef>>,
}

impl Script {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            objects: Vec::new(),
        }
    }

    /// Run the semantic pass for the script being compiled.
    pub fn semantic(
        self: &Rc<Self>,
        loader: &mut ScriptLoader,
        diags: &mut Diagnostics,
    ) -> Result<(), Fatal> {
        self.semantic_with(loader, diags, false, false)
    }

    /// Run the semantic pass for a script loaded as a dependency of another.
    pub fn semantic_reference(
        self: &Rc<Self>,
        loader: &mut ScriptLoader,
        diags: &mut Diagnostics,
        is_pex: bool,
    ) -> Result<(), Fatal> {
        self.semantic_with(loader, diags, true, is_pex)
    }

    fn semantic_with(
        self: &Rc<Self>,
        loader: &mut ScriptLoader,
        diags: &mut Diagnostics,
        reference: bool,
        is_pex: bool,
    ) -> Result<(), Fatal> {
        let mut ctx = ResolutionContext::new(self.clone(), loader, diags);
        ctx.resolving_reference_script = reference;
        ctx.is_pex_resolution = is_pex;
        for object in &self.objects {
            object.semantic(&mut ctx)?;
        }
        Ok(())
    }
}

/// A Papyrus class definition.
#[derive(Debug)]
pub struct ObjectDef {
    pub location: FileLocation,
    pub name: String,
    /// `Unresolved` until the semantic pass rewrites it.
    pub parent_class: RefCell<Option<Ty>>,
    pub imports: Vec<(FileLocation, String)>,
    pub structs: Vec<Rc<StructDef>>,
    pub variables: Vec<Rc<Variable>>,
    pub property_groups: Vec<Rc<PropertyGroup>>,
    pub states: Vec<Rc<State>>,
}

impl ObjectDef {
    pub fn new(location: FileLocation, name: impl Into<String>) -> Self {
        Self {
            location,
            name: name.into(),
            parent_class: RefCell::new(None),
            imports: Vec::new(),
            structs: Vec::new(),
            variables: Vec::new(),
            property_groups: Vec::new(),
            states: Vec::new(),
        }
    }

    /// The parent class, if the parent slot has been resolved to one.
    pub fn try_parent_class(&self) -> Option<Rc<ObjectDef>> {
        match &*self.parent_class.borrow() {
            Some(Ty { kind: crate::ty::TyKind::Object(obj), .. }) => Some(obj.clone()),
            _ => None,
        }
    }

    /// The unnamed state holding the class's default methods.
    pub fn root_state(&self) -> Option<Rc<State>> {
        self.states.iter().find(|s| s.name.is_empty()).cloned()
    }

    pub fn semantic(self: &Rc<Self>, ctx: &mut ResolutionContext<'_>) -> Result<(), Fatal> {
        ctx.object = Some(self.clone());

        for (location, name) in &self.imports {
            ctx.add_import(location, name)?;
        }

        let parent = self.parent_class.borrow().clone();
        if let Some(parent) = parent {
            let resolved = ctx.resolve_type(parent)?;
            *self.parent_class.borrow_mut() = Some(resolved);
        }

        for s in &self.structs {
            s.semantic(ctx)?;
        }
        for v in &self.variables {
            v.semantic(ctx)?;
        }
        for group in &self.property_groups {
            for p in &group.properties {
                p.semantic(ctx)?;
            }
        }

        for state in &self.states {
            ctx.state = Some(state.clone());
            for func in &state.functions {
                *func.owner.borrow_mut() = Rc::downgrade(self);
                func.semantic(ctx)?;
            }
            ctx.state = None;
        }

        Ok(())
    }
}

/// A value-typed record nested inside an object.
#[derive(Debug)]
pub struct StructDef {
    pub location: FileLocation,
    pub name: String,
    pub members: Vec<Rc<StructMember>>,
}

impl StructDef {
    pub fn new(location: FileLocation, name: impl Into<String>) -> Self {
        Self {
            location,
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn member(&self, name: &str) -> Option<Rc<StructMember>> {
        self.members
            .iter()
            .find(|m| papyrus_core::caseless::caseless_eq(&m.name, name))
            .cloned()
    }

    fn semantic(&self, ctx: &mut ResolutionContext<'_>) -> Result<(), Fatal> {
        for m in &self.members {
            m.semantic(ctx)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct StructMember {
    pub location: FileLocation,
    pub name: String,
    pub ty: RefCell<Ty>,
    pub default_value: RefCell<Value>,
}

impl StructMember {
    pub fn new(location: FileLocation, name: impl Into<String>, ty: Ty) -> Self {
        Self {
            location: location.clone(),
            name: name.into(),
            ty: RefCell::new(ty),
            default_value: RefCell::new(Value::invalid(location)),
        }
    }

    fn semantic(&self, ctx: &mut ResolutionContext<'_>) -> Result<(), Fatal> {
        let ty = ctx.resolve_type(self.ty.borrow().clone())?;
        *self.ty.borrow_mut() = ty.clone();
        let default = ctx.coerce_default_value(self.default_value.borrow().clone(), &ty);
        *self.default_value.borrow_mut() = default;
        Ok(())
    }
}

/// An object-level variable.
#[derive(Debug)]
pub struct Variable {
    pub location: FileLocation,
    pub name: String,
    pub ty: RefCell<Ty>,
    pub default_value: RefCell<Value>,
}

impl Variable {
    pub fn new(location: FileLocation, name: impl Into<String>, ty: Ty) -> Self {
        Self {
            location: location.clone(),
            name: name.into(),
            ty: RefCell::new(ty),
            default_value: RefCell::new(Value::invalid(location)),
        }
    }

    fn semantic(&self, ctx: &mut ResolutionContext<'_>) -> Result<(), Fatal> {
        let ty = ctx.resolve_type(self.ty.borrow().clone())?;
        *self.ty.borrow_mut() = ty.clone();
        let default = ctx.coerce_default_value(self.default_value.borrow().clone(), &ty);
        *self.default_value.borrow_mut() = default;
        Ok(())
    }
}

/// A named group of properties.
#[derive(Debug)]
pub struct PropertyGroup {
    pub location: FileLocation,
    pub name: String,
    pub properties: Vec<Rc<Property>>,
}

impl PropertyGroup {
    pub fn new(location: FileLocation, name: impl Into<String>) -> Self {
        Self {
            location,
            name: name.into(),
            properties: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct Property {
    pub location: FileLocation,
    pub name: String,
    pub ty: RefCell<Ty>,
    pub is_auto: bool,
    pub default_value: RefCell<Value>,
}

impl Property {
    pub fn new(location: FileLocation, name: impl Into<String>, ty: Ty) -> Self {
        Self {
            location: location.clone(),
            name: name.into(),
            ty: RefCell::new(ty),
            is_auto: true,
            default_value: RefCell::new(Value::invalid(location)),
        }
    }

    fn semantic(&self, ctx: &mut ResolutionContext<'_>) -> Result<(), Fatal> {
        let ty = ctx.resolve_type(self.ty.borrow().clone())?;
        *self.ty.borrow_mut() = ty.clone();
        let default = ctx.coerce_default_value(self.default_value.borrow().clone(), &ty);
        *self.default_value.borrow_mut() = default;
        Ok(())
    }
}

/// A named collection of functions. The root state has the empty name.
#[derive(Debug)]
pub struct State {
    pub location: FileLocation,
    pub name: String,
    pub functions: Vec<Rc<Function>>,
}

impl State {
    pub fn new(location: FileLocation, name: impl Into<String>) -> Self {
        Self {
            location,
            name: name.into(),
            functions: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct Function {
    pub location: FileLocation,
    pub name: String,
    pub is_global: bool,
    pub parameters: Vec<Rc<Parameter>>,
    pub return_type: RefCell<Ty>,
    pub body: RefCell<Vec<Statement>>,
    /// The object this function was declared on. Weak because the object
    /// owns the function through its states.
    pub owner: RefCell<Weak<ObjectDef>>,
}

impl Function {
    pub fn new(location: FileLocation, name: impl Into<String>, return_type: Ty) -> Self {
        Self {
            location,
            name: name.into(),
            is_global: false,
            parameters: Vec::new(),
            return_type: RefCell::new(return_type),
            body: RefCell::new(Vec::new()),
            owner: RefCell::new(Weak::new()),
        }
    }

    pub fn semantic(self: &Rc<Self>, ctx: &mut ResolutionContext<'_>) -> Result<(), Fatal> {
        ctx.function = Some(self.clone());

        let ret = ctx.resolve_type(self.return_type.borrow().clone())?;
        *self.return_type.borrow_mut() = ret;

        ctx.push_scope();
        let result = self.semantic_body(ctx);
        ctx.pop_scope();
        ctx.function = None;
        result
    }

    fn semantic_body(&self, ctx: &mut ResolutionContext<'_>) -> Result<(), Fatal> {
        for p in &self.parameters {
            let ty = ctx.resolve_type(p.ty.borrow().clone())?;
            *p.ty.borrow_mut() = ty.clone();
            let default = ctx.coerce_default_value(p.default_value.borrow().clone(), &ty);
            *p.default_value.borrow_mut() = default;
        }

        let mut body = self.body.borrow_mut();
        for stmt in body.iter_mut() {
            stmt.semantic(ctx)?;
        }

        let ret = self.return_type.borrow().clone();
        if !ret.is_none() && !stmt::block_always_returns(&body) {
            ctx.diags.error(
                &self.location,
                format!("Not all code paths of '{}' return a value!", self.name),
            );
        }
        Ok(())
    }

    /// Lower this function's body into a compiled function and its debug
    /// line map.
    pub fn generate_pex(
        &self,
        file: &mut PexFile,
        diags: &mut Diagnostics,
    ) -> Result<(PexFunction, PexDebugFunctionInfo), Fatal> {
        let mut func = PexFunction::new();
        for p in &self.parameters {
            func.parameters.push(PexFunctionParameter {
                name: file.get_string(&p.name),
                ty: file.get_string(&p.ty.borrow().to_string()),
            });
        }

        let mut debug_info = PexDebugFunctionInfo::new();
        let mut bldr = FunctionBuilder::new(file, diags, self.location.clone());

        let body = self.body.borrow();
        for stmt in body.iter() {
            stmt.generate(&mut bldr)?;
        }

        // A None function falling off the end returns None implicitly.
        // Non-None functions were verified to return on every path.
        if self.return_type.borrow().is_none()
            && !matches!(body.last(), Some(Statement::Return { .. }))
        {
            let none = bldr.none_local(&self.location);
            bldr.emit(Instruction::ret(none))?;
        }
        drop(body);

        bldr.finish(&mut func, &mut debug_info)?;
        Ok((func, debug_info))
    }
}

/// A function parameter with an optional default value.
#[derive(Debug)]
pub struct Parameter {
    pub location: FileLocation,
    pub name: String,
    pub ty: RefCell<Ty>,
    pub default_value: RefCell<Value>,
}

impl Parameter {
    pub fn new(location: FileLocation, name: impl Into<String>, ty: Ty) -> Self {
        Self {
            location: location.clone(),
            name: name.into(),
            ty: RefCell::new(ty),
            default_value: RefCell::new(Value::invalid(location)),
        }
    }
}

//! Per-script resolution state.
//!
//! A `ResolutionContext` is attached to one script for the duration of its
//! semantic pass. It tracks the current object, function and state, the
//! imported scripts, and the local-variable scope stack, and drives type,
//! identifier and function resolution against all of them.
//!
//! Resolution functions come in pairs: the `try_` variant returns the
//! identifier unchanged (still unresolved) on a miss, while the plain
//! variant reports a fatal diagnostic.

use std::rc::Rc;

use papyrus_core::caseless::{caseless_eq, CaselessStr, CaselessString};
use papyrus_core::diagnostics::{Diagnostics, Warning};
use papyrus_core::error::Fatal;
use papyrus_core::location::FileLocation;
use rustc_hash::FxHashMap;

use crate::ast::stmt::DeclareStatement;
use crate::ast::{Function, ObjectDef, Script, State};
use crate::ident::{ArrayFunctionKind, IdentKind, Identifier};
use crate::loader::ScriptLoader;
use crate::ty::{Ty, TyKind};

pub struct ResolutionContext<'a> {
    pub loader: &'a mut ScriptLoader,
    pub diags: &'a mut Diagnostics,
    pub script: Rc<Script>,
    pub object: Option<Rc<ObjectDef>>,
    pub function: Option<Rc<Function>>,
    pub state: Option<Rc<State>>,
    pub imported_scripts: Vec<Rc<Script>>,
    local_scopes: Vec<FxHashMap<CaselessString, Rc<DeclareStatement>>>,
    /// Set while analyzing a script loaded as a dependency of another.
    pub resolving_reference_script: bool,
    /// Set while analyzing a script reflected from compiled bytecode, which
    /// relaxes struct-name resolution to accept `Script#Struct` spellings.
    pub is_pex_resolution: bool,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(script: Rc<Script>, loader: &'a mut ScriptLoader, diags: &'a mut Diagnostics) -> Self {
        Self {
            loader,
            diags,
            script,
            object: None,
            function: None,
            state: None,
            imported_scripts: Vec::new(),
            local_scopes: Vec::new(),
            resolving_reference_script: false,
            is_pex_resolution: false,
        }
    }

    /// Load a script by name relative to the compiling script's directory.
    pub fn load_script(&mut self, name: &str) -> Result<Option<Rc<Script>>, Fatal> {
        let base_dir = self
            .script
            .source_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        self.loader.load_script(name, &base_dir, self.diags)
    }

    /// Record an `Import` declaration. A second import of the same script
    /// warns (W4002) and is dropped so the import list stays duplicate free.
    pub fn add_import(&mut self, location: &FileLocation, name: &str) -> Result<(), Fatal> {
        let script = self.load_script(name)?;
        let script = match script {
            Some(script) => script,
            None => {
                self.diags
                    .error(location, format!("Failed to find the imported script '{}'!", name));
                return Ok(());
            }
        };
        if self.imported_scripts.iter().any(|s| Rc::ptr_eq(s, &script)) {
            self.diags
                .warning(location, Warning::DuplicateImport { name: name.to_owned() });
            return Ok(());
        }
        self.imported_scripts.push(script);
        Ok(())
    }

    /// Rewrite an `Unresolved` type to its resolved form.
    ///
    /// Search order: decompiled `Script#Struct` references (pex resolution
    /// only, unless configured on), the enclosing object's structs, the
    /// enclosing object itself, the imported scripts' structs in import
    /// order, and finally any loadable script with an object of that name.
    pub fn resolve_type(&mut self, tp: Ty) -> Result<Ty, Fatal> {
        let name = match tp.kind {
            TyKind::Array(element) => {
                let element = self.resolve_type(*element)?;
                return Ok(Ty::array(tp.location, element));
            }
            TyKind::Unresolved(ref name) => name.clone(),
            _ => return Ok(tp),
        };
        let location = tp.location;

        if self.is_pex_resolution || self.loader.config().allow_decompiled_struct_name_refs {
            if let Some(pos) = name.find('#') {
                let script_name = &name[..pos];
                let struct_name = &name[pos + 1..];
                let script = match self.load_script(script_name)? {
                    Some(script) => script,
                    None => {
                        return Err(self.diags.fatal(
                            &location,
                            format!(
                                "Unable to find the script '{}' referenced by '{}'!",
                                script_name, name
                            ),
                        ))
                    }
                };
                for object in &script.objects {
                    for s in &object.structs {
                        if caseless_eq(&s.name, struct_name) {
                            return Ok(Ty::resolved_struct(location, s.clone()));
                        }
                    }
                }
                return Err(self.diags.fatal(
                    &location,
                    format!(
                        "Unable to resolve a struct named '{}' in the script '{}'!",
                        struct_name, script_name
                    ),
                ));
            }
        }

        if let Some(object) = &self.object {
            for s in &object.structs {
                if caseless_eq(&s.name, &name) {
                    return Ok(Ty::resolved_struct(location, s.clone()));
                }
            }
            if caseless_eq(&object.name, &name) {
                return Ok(Ty::resolved_object(location, object.clone()));
            }
        }

        for script in &self.imported_scripts {
            for object in &script.objects {
                for s in &object.structs {
                    if caseless_eq(&s.name, &name) {
                        return Ok(Ty::resolved_struct(location, s.clone()));
                    }
                }
            }
        }

        if let Some(script) = self.load_script(&name)? {
            for object in &script.objects {
                if caseless_eq(&object.name, &name) {
                    return Ok(Ty::resolved_object(location, object.clone()));
                }
            }
        }

        Err(self
            .diags
            .fatal(&location, format!("Unable to resolve type '{}'!", name)))
    }

    pub fn push_scope(&mut self) {
        self.local_scopes.push(FxHashMap::default());
    }

    pub fn pop_scope(&mut self) {
        self.local_scopes.pop();
    }

    /// Declare a local in the innermost scope. Shadowing a name from any
    /// enclosing scope is an error.
    pub fn add_local_variable(&mut self, decl: &Rc<DeclareStatement>) -> Result<(), Fatal> {
        let shadowed = self
            .local_scopes
            .iter()
            .any(|scope| scope.contains_key(CaselessStr::new(&decl.name)));
        if shadowed {
            self.diags.error(
                &decl.location,
                format!(
                    "Attempted to redefine '{}' which was already defined in a parent scope!",
                    decl.name
                ),
            );
            return Ok(());
        }
        match self.local_scopes.last_mut() {
            Some(scope) => {
                scope.insert(CaselessString::new(decl.name.clone()), decl.clone());
                Ok(())
            }
            None => Err(self
                .diags
                .logical_fatal("A local scope must be open to declare a local!")),
        }
    }

    pub fn resolve_identifier(&mut self, ident: &Identifier) -> Result<Identifier, Fatal> {
        let resolved = self.try_resolve_identifier(ident);
        if resolved.is_unresolved() {
            return Err(self
                .diags
                .fatal(&ident.location, format!("Unresolved identifier '{}'!", ident.name)));
        }
        Ok(resolved)
    }

    pub fn try_resolve_identifier(&self, ident: &Identifier) -> Identifier {
        if !ident.is_unresolved() {
            return ident.clone();
        }

        for scope in self.local_scopes.iter().rev() {
            if let Some(decl) = scope.get(CaselessStr::new(&ident.name)) {
                return Identifier::with_kind(ident, IdentKind::Local(decl.clone()));
            }
        }

        if let Some(function) = &self.function {
            for p in &function.parameters {
                if caseless_eq(&p.name, &ident.name) {
                    return Identifier::with_kind(ident, IdentKind::Parameter(p.clone()));
                }
            }
        }

        let in_global = self.function.as_ref().map(|f| f.is_global).unwrap_or(false);
        if !in_global {
            if let Some(object) = &self.object {
                for v in &object.variables {
                    if caseless_eq(&v.name, &ident.name) {
                        return Identifier::with_kind(ident, IdentKind::Variable(v.clone()));
                    }
                }
                for group in &object.property_groups {
                    for p in &group.properties {
                        if caseless_eq(&p.name, &ident.name) {
                            return Identifier::with_kind(ident, IdentKind::Property(p.clone()));
                        }
                    }
                }
            }
        }

        if let Some(object) = &self.object {
            let parent_ty = object.parent_class.borrow().clone();
            if let Some(parent_ty) = parent_ty.filter(|t| matches!(t.kind, TyKind::Object(_))) {
                return self.try_resolve_member_identifier(&parent_ty, ident);
            }
        }

        ident.clone()
    }

    pub fn resolve_member_identifier(
        &mut self,
        base: &Ty,
        ident: &Identifier,
    ) -> Result<Identifier, Fatal> {
        let resolved = self.try_resolve_member_identifier(base, ident);
        if resolved.is_unresolved() {
            return Err(self
                .diags
                .fatal(&ident.location, format!("Unresolved identifier '{}'!", ident.name)));
        }
        Ok(resolved)
    }

    pub fn try_resolve_member_identifier(&self, base: &Ty, ident: &Identifier) -> Identifier {
        if !ident.is_unresolved() {
            return ident.clone();
        }

        match &base.kind {
            TyKind::Struct(s) => {
                for m in &s.members {
                    if caseless_eq(&m.name, &ident.name) {
                        return Identifier::with_kind(ident, IdentKind::StructMember(m.clone()));
                    }
                }
            }
            TyKind::Object(object) => {
                for group in &object.property_groups {
                    for p in &group.properties {
                        if caseless_eq(&p.name, &ident.name) {
                            return Identifier::with_kind(ident, IdentKind::Property(p.clone()));
                        }
                    }
                }
                let parent_ty = object.parent_class.borrow().clone();
                if let Some(parent_ty) = parent_ty.filter(|t| matches!(t.kind, TyKind::Object(_))) {
                    return self.try_resolve_member_identifier(&parent_ty, ident);
                }
            }
            _ => {}
        }

        ident.clone()
    }

    pub fn resolve_function_identifier(
        &mut self,
        base: &Ty,
        ident: &Identifier,
    ) -> Result<Identifier, Fatal> {
        let resolved = self.try_resolve_function_identifier(base, ident)?;
        if resolved.is_unresolved() {
            return Err(self
                .diags
                .fatal(&ident.location, format!("Unresolved function name '{}'!", ident.name)));
        }
        Ok(resolved)
    }

    pub fn try_resolve_function_identifier(
        &mut self,
        base: &Ty,
        ident: &Identifier,
    ) -> Result<Identifier, Fatal> {
        if !ident.is_unresolved() {
            return Ok(ident.clone());
        }

        match &base.kind {
            // An unqualified call: the current object's root state, then
            // imported global functions, then the object as a receiver.
            TyKind::None => {
                if let Some(object) = self.object.clone() {
                    if let Some(state) = object.root_state() {
                        for func in &state.functions {
                            if caseless_eq(&func.name, &ident.name) {
                                let caller_is_global =
                                    self.function.as_ref().map(|f| f.is_global).unwrap_or(false);
                                if caller_is_global && !func.is_global {
                                    self.diags.error(
                                        &ident.location,
                                        format!(
                                            "You cannot call non-global functions from within a global function. '{}' is not a global function.",
                                            func.name
                                        ),
                                    );
                                }
                                return Ok(Identifier::with_kind(ident, IdentKind::Function(func.clone())));
                            }
                        }
                    }
                }

                for script in &self.imported_scripts {
                    for object in &script.objects {
                        if let Some(state) = object.root_state() {
                            for func in &state.functions {
                                if func.is_global && caseless_eq(&func.name, &ident.name) {
                                    return Ok(Identifier::with_kind(
                                        ident,
                                        IdentKind::Function(func.clone()),
                                    ));
                                }
                            }
                        }
                    }
                }

                match self.object.clone() {
                    Some(object) => {
                        let receiver = Ty::resolved_object(ident.location.clone(), object);
                        self.resolve_function_identifier(&receiver, ident)
                    }
                    None => Ok(ident.clone()),
                }
            }

            TyKind::Array(element) => {
                let kind = if caseless_eq(&ident.name, "find") {
                    if matches!(element.kind, TyKind::Struct(_)) {
                        ArrayFunctionKind::FindStruct
                    } else {
                        ArrayFunctionKind::Find
                    }
                } else if caseless_eq(&ident.name, "rfind") {
                    if matches!(element.kind, TyKind::Struct(_)) {
                        ArrayFunctionKind::RFindStruct
                    } else {
                        ArrayFunctionKind::RFind
                    }
                } else if caseless_eq(&ident.name, "add") {
                    ArrayFunctionKind::Add
                } else if caseless_eq(&ident.name, "clear") {
                    ArrayFunctionKind::Clear
                } else if caseless_eq(&ident.name, "insert") {
                    ArrayFunctionKind::Insert
                } else if caseless_eq(&ident.name, "remove") {
                    ArrayFunctionKind::Remove
                } else if caseless_eq(&ident.name, "removelast") {
                    ArrayFunctionKind::RemoveLast
                } else {
                    return Err(self.diags.fatal(
                        &ident.location,
                        format!("Unknown function '{}' called on an array expression!", ident.name),
                    ));
                };
                Ok(Identifier::with_kind(
                    ident,
                    IdentKind::ArrayFunction {
                        kind,
                        element: Box::new((**element).clone()),
                    },
                ))
            }

            TyKind::Object(object) => {
                if let Some(state) = object.root_state() {
                    for func in &state.functions {
                        if caseless_eq(&func.name, &ident.name) {
                            if func.is_global {
                                self.diags.error(
                                    &ident.location,
                                    format!(
                                        "You cannot call the global function '{}' on an object.",
                                        func.name
                                    ),
                                );
                            }
                            return Ok(Identifier::with_kind(ident, IdentKind::Function(func.clone())));
                        }
                    }
                }
                let parent_ty = object.parent_class.borrow().clone();
                if let Some(parent_ty) = parent_ty.filter(|t| matches!(t.kind, TyKind::Object(_))) {
                    return self.resolve_function_identifier(&parent_ty, ident);
                }
                Ok(ident.clone())
            }

            _ => Ok(ident.clone()),
        }
    }

    /// Find a state by name on `object` (or the current object), walking up
    /// the parent-class chain.
    pub fn try_resolve_state(&self, name: &str, object: Option<&Rc<ObjectDef>>) -> Option<Rc<State>> {
        let object = object.or(self.object.as_ref())?.clone();
        Self::resolve_state_on(&object, name)
    }

    fn resolve_state_on(object: &Rc<ObjectDef>, name: &str) -> Option<Rc<State>> {
        for state in &object.states {
            if caseless_eq(&state.name, name) {
                return Some(state.clone());
            }
        }
        object
            .try_parent_class()
            .and_then(|parent| Self::resolve_state_on(&parent, name))
    }

    /// Whether `parent` is `child` or one of its ancestors.
    ///
    /// Name equality short-circuits before walking the chain: two scripts
    /// reflected from bytecode can produce distinct object instances for
    /// the same logical class, and those must still unify.
    pub fn is_object_some_parent_of(child: &Rc<ObjectDef>, parent: &Rc<ObjectDef>) -> bool {
        if Rc::ptr_eq(child, parent) {
            return true;
        }
        if caseless_eq(&child.name, &parent.name) {
            return true;
        }
        match child.try_parent_class() {
            Some(next) => Self::is_object_some_parent_of(&next, parent),
            None => false,
        }
    }
}

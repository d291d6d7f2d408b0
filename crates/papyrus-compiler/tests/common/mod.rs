#![allow(dead_code)]

//! Shared fixtures for the integration tests: an in-memory frontend and
//! entity-building helpers. The loader probes the real filesystem, so tests
//! create marker files in a temp directory and let the frontend fabricate
//! the matching ASTs.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use papyrus_core::diagnostics::Diagnostics;
use papyrus_core::error::Fatal;
use papyrus_core::location::FileLocation;
use papyrus_compiler::ast::{ObjectDef, Script, State, Variable};
use papyrus_compiler::loader::Frontend;
use papyrus_compiler::ty::Ty;

type Builder = Box<dyn Fn(&Path) -> Script>;

/// Decodes scripts from a map of file stem → AST builder, recording every
/// call so tests can assert which decode path ran.
#[derive(Default)]
pub struct TestFrontend {
    builders: HashMap<String, Builder>,
    calls: Rc<std::cell::RefCell<Vec<(&'static str, String)>>>,
}

#[derive(Clone, Default)]
pub struct CallLog(Rc<std::cell::RefCell<Vec<(&'static str, String)>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<(&'static str, String)> {
        self.0.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.0.borrow().iter().map(|(k, _)| *k).collect()
    }
}

impl TestFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(
        mut self,
        stem: &str,
        build: impl Fn(&Path) -> Script + 'static,
    ) -> Self {
        self.builders.insert(stem.to_ascii_lowercase(), Box::new(build));
        self
    }

    pub fn log(&self) -> CallLog {
        CallLog(self.calls.clone())
    }

    fn decode(
        &mut self,
        kind: &'static str,
        path: &Path,
        diags: &mut Diagnostics,
    ) -> Result<Rc<Script>, Fatal> {
        self.calls.borrow_mut().push((kind, path.display().to_string()));
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match self.builders.get(&stem) {
            Some(build) => Ok(Rc::new(build(path))),
            None => Err(diags.logical_fatal(format!("no test script registered for '{}'", stem))),
        }
    }
}

impl Frontend for TestFrontend {
    fn parse_source(&mut self, path: &Path, diags: &mut Diagnostics) -> Result<Rc<Script>, Fatal> {
        self.decode("psc", path, diags)
    }

    fn parse_assembly(&mut self, path: &Path, diags: &mut Diagnostics) -> Result<Rc<Script>, Fatal> {
        self.decode("pas", path, diags)
    }

    fn read_binary(&mut self, path: &Path, diags: &mut Diagnostics) -> Result<Rc<Script>, Fatal> {
        self.decode("pex", path, diags)
    }
}

pub fn loc(file: &str) -> FileLocation {
    FileLocation::new(file.to_string(), 1, 0)
}

/// An empty marker file; only its existence matters to the loader.
pub fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"").unwrap();
}

/// A script with one object of the same name, importing `imports` and
/// holding one variable per entry in `var_types` (named `v0`, `v1`, ...).
pub fn script_with(path: &Path, name: &str, imports: &[&str], var_types: &[Ty]) -> Script {
    let file = path.display().to_string();
    let mut object = ObjectDef::new(loc(&file), name);
    for import in imports {
        object.imports.push((loc(&file), import.to_string()));
    }
    for (i, ty) in var_types.iter().enumerate() {
        object
            .variables
            .push(Rc::new(Variable::new(loc(&file), format!("v{}", i), ty.clone())));
    }
    object.states.push(Rc::new(State::new(loc(&file), "")));
    let mut script = Script::new(path);
    script.objects.push(Rc::new(object));
    script
}

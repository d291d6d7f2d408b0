//! On-demand script loading.
//!
//! The loader is the arena of the compilation job: every script it decodes
//! stays alive (and cached) until the job ends, so resolved types and
//! identifiers can hold plain `Rc` references into it.
//!
//! Two caches cooperate. `loaded` is keyed by canonical path and holds
//! ownership; `per_dir` maps a search directory and short name to the same
//! scripts so repeated lookups skip the filesystem. A freshly decoded script
//! is inserted into **both** caches *before* its reference semantic pass
//! runs. That ordering is what makes cyclic imports work: while A's pass is
//! loading B, B's pass can observe A through the cache even though A is not
//! fully analyzed yet.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use papyrus_core::caseless::{CaselessStr, CaselessString};
use papyrus_core::config::CompilerConfig;
use papyrus_core::diagnostics::Diagnostics;
use papyrus_core::error::Fatal;
use rustc_hash::FxHashMap;

use crate::ast::Script;

/// The seam to the external parsers: source text, disassembly text (parsed
/// then reflected), and compiled bytecode (read then reflected) all decode
/// to the same AST.
pub trait Frontend {
    fn parse_source(&mut self, path: &Path, diags: &mut Diagnostics) -> Result<Rc<Script>, Fatal>;
    fn parse_assembly(&mut self, path: &Path, diags: &mut Diagnostics) -> Result<Rc<Script>, Fatal>;
    fn read_binary(&mut self, path: &Path, diags: &mut Diagnostics) -> Result<Rc<Script>, Fatal>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Source,
    Assembly,
    Binary,
}

impl SourceKind {
    const PROBE_ORDER: [(SourceKind, &'static str); 3] = [
        (SourceKind::Source, "psc"),
        (SourceKind::Assembly, "pas"),
        (SourceKind::Binary, "pex"),
    ];
}

pub struct ScriptLoader {
    config: Rc<CompilerConfig>,
    frontend: Box<dyn Frontend>,
    /// Canonical path → script. The owning cache.
    loaded: FxHashMap<CaselessString, Rc<Script>>,
    /// Search directory → short name → script.
    per_dir: FxHashMap<CaselessString, FxHashMap<CaselessString, Rc<Script>>>,
}

impl ScriptLoader {
    pub fn new(config: Rc<CompilerConfig>, frontend: Box<dyn Frontend>) -> Self {
        Self {
            config,
            frontend,
            loaded: FxHashMap::default(),
            per_dir: FxHashMap::default(),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Find and load a script by name.
    ///
    /// `:` in the name maps to the path separator, so `MyMod:Helpers`
    /// refers to `Helpers` inside the `MyMod` subdirectory. The script's
    /// own directory is searched first, then the configured import
    /// directories in order; within each directory the extensions are
    /// probed in the order `.psc`, `.pas`, `.pex`.
    ///
    /// Returns `Ok(None)` when no matching file exists.
    pub fn load_script(
        &mut self,
        name: &str,
        base_dir: &Path,
        diags: &mut Diagnostics,
    ) -> Result<Option<Rc<Script>>, Fatal> {
        let rel = name.replace(':', std::path::MAIN_SEPARATOR_STR);

        let base_key = dir_key(base_dir);
        if let Some(by_name) = self.per_dir.get(&base_key) {
            if let Some(script) = by_name.get(CaselessStr::new(&rel)) {
                return Ok(Some(script.clone()));
            }
        }

        if let Some(script) = self.search_dir(base_dir, base_dir, &rel, diags)? {
            return Ok(Some(script));
        }

        let import_dirs: Vec<PathBuf> = self.config.import_directories.clone();
        for dir in &import_dirs {
            if let Some(script) = self.search_dir(dir, base_dir, &rel, diags)? {
                return Ok(Some(script));
            }
        }

        Ok(None)
    }

    fn search_dir(
        &mut self,
        dir: &Path,
        base_dir: &Path,
        rel: &str,
        diags: &mut Diagnostics,
    ) -> Result<Option<Rc<Script>>, Fatal> {
        for (kind, ext) in SourceKind::PROBE_ORDER {
            let candidate = dir.join(format!("{}.{}", rel, ext));
            if candidate.exists() {
                return self.load_file(base_dir, rel, &candidate, kind, diags).map(Some);
            }
        }
        Ok(None)
    }

    fn load_file(
        &mut self,
        base_dir: &Path,
        rel: &str,
        path: &Path,
        kind: SourceKind,
        diags: &mut Diagnostics,
    ) -> Result<Rc<Script>, Fatal> {
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let canonical_key = CaselessString::new(canonical.to_string_lossy().into_owned());
        if let Some(script) = self.loaded.get(&canonical_key) {
            return Ok(script.clone());
        }

        let script = match kind {
            SourceKind::Source => self.frontend.parse_source(path, diags)?,
            SourceKind::Assembly => self.frontend.parse_assembly(path, diags)?,
            SourceKind::Binary => self.frontend.read_binary(path, diags)?,
        };
        diags.check_errors()?;

        // Register in both caches before analyzing, so a cyclic import can
        // observe this script mid-pass.
        let base_key = dir_key(base_dir);
        self.per_dir
            .entry(base_key.clone())
            .or_default()
            .insert(CaselessString::new(rel), script.clone());
        self.loaded.insert(canonical_key.clone(), script.clone());

        let is_pex = kind != SourceKind::Source;
        let result = script
            .semantic_reference(self, diags, is_pex)
            .and_then(|()| diags.check_errors());

        if let Err(err) = result {
            // A half-analyzed script must not be observable by a retry.
            self.loaded.remove(&canonical_key);
            if let Some(by_name) = self.per_dir.get_mut(&base_key) {
                by_name.remove(CaselessStr::new(rel));
            }
            return Err(err);
        }

        Ok(script)
    }
}

fn dir_key(dir: &Path) -> CaselessString {
    CaselessString::new(dir.to_string_lossy().into_owned())
}

//! Compiler configuration.

use std::path::PathBuf;

/// Settings for one compilation job.
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    /// Directories searched for reference scripts, in order, after the
    /// compiling script's own directory.
    pub import_directories: Vec<PathBuf>,

    /// Allow `Script#Struct` type spellings when resolving source scripts.
    /// Normally these only appear in decompiled output, so the syntax is
    /// accepted unconditionally during pex resolution and gated here for
    /// everything else.
    pub allow_decompiled_struct_name_refs: bool,

    /// Enable compile-time folding of int literals coerced to float.
    pub enable_optimizations: bool,
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

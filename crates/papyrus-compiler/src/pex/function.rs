//! Emission targets: compiled functions and their debug info.

use super::file::PexString;
use super::instruction::Instruction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PexFunctionParameter {
    pub name: PexString,
    pub ty: PexString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PexLocalVariable {
    pub name: PexString,
    pub ty: PexString,
}

/// A compiled function body. Filled in by
/// [`FunctionBuilder::finish`](super::FunctionBuilder::finish).
#[derive(Debug, Default)]
pub struct PexFunction {
    pub parameters: Vec<PexFunctionParameter>,
    pub locals: Vec<PexLocalVariable>,
    pub instructions: Vec<Instruction>,
}

impl PexFunction {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Per-function debug information.
///
/// The on-disk format stores one 16-bit line number per instruction; lines
/// past 65535 cannot be represented and are a compile error at finalize.
#[derive(Debug, Default)]
pub struct PexDebugFunctionInfo {
    pub instruction_line_map: Vec<u16>,
}

impl PexDebugFunctionInfo {
    pub fn new() -> Self {
        Self::default()
    }
}

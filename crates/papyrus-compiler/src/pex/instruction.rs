//! Pex instruction records.

use super::opcode::Opcode;
use super::value::PexValue;

/// A single bytecode instruction: an opcode, its fixed operands, and (for
/// the three call opcodes) a variadic argument tail.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub args: Vec<PexValue>,
    pub variadic_args: Vec<PexValue>,
}

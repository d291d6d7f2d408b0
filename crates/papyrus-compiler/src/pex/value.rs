//! Instruction operand values.

use super::file::PexString;

/// A forward-declarable jump target. The index refers into the owning
/// [`FunctionBuilder`](super::FunctionBuilder)'s label table; it is rewritten
/// to a signed instruction offset at finalize time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(pub(crate) u32);

/// A handle to a not-yet-materialized temporary variable. The builder binds
/// it to a concrete `::tempN` local the first time it appears in an
/// instruction's destination slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempVar(pub(crate) u32);

/// An operand of a pex instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PexValue {
    None,
    Identifier(PexString),
    String(PexString),
    Integer(i32),
    Float(f32),
    Bool(bool),
    Label(Label),
    Temp(TempVar),
    /// The "value" of an expression that produced nothing. Using one as an
    /// operand is a compile error caught by the builder.
    Invalid,
}

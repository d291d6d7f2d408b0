//! The Papyrus instruction set.
//!
//! One table drives everything the builder needs to know about an opcode:
//! its mnemonic, its fixed-operand count, and which operand (if any) is the
//! destination the instruction writes to. The three call opcodes carry a
//! variadic argument list after their fixed operands; all others have only
//! fixed operands.

use super::instruction::Instruction;
use super::value::PexValue;

macro_rules! define_opcodes {
    (
        fixed {
            $( $variant:ident => ($ctor:ident, $mnemonic:literal, $dest:expr, [$($arg:ident),*]) ),* $(,)?
        }
        variadic {
            $( $v_variant:ident => ($v_mnemonic:literal, $v_dest:expr, [$($v_arg:ident),*]) ),* $(,)?
        }
    ) => {
        /// A Papyrus bytecode operation.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($variant,)*
            $($v_variant,)*
        }

        impl Opcode {
            /// The disassembly spelling.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                    $(Opcode::$v_variant => $v_mnemonic,)*
                }
            }

            /// Number of fixed operands.
            pub fn arity(self) -> usize {
                match self {
                    $(Opcode::$variant => {
                        let names: &[&str] = &[$(stringify!($arg)),*];
                        names.len()
                    })*
                    $(Opcode::$v_variant => {
                        let names: &[&str] = &[$(stringify!($v_arg)),*];
                        names.len()
                    })*
                }
            }

            /// Index of the operand this instruction writes, if it writes one.
            pub fn dest_arg_index(self) -> Option<usize> {
                match self {
                    $(Opcode::$variant => $dest,)*
                    $(Opcode::$v_variant => $v_dest,)*
                }
            }

            /// Whether the opcode carries a variadic argument list.
            pub fn has_variadic_args(self) -> bool {
                match self {
                    $(Opcode::$v_variant => true,)*
                    _ => false,
                }
            }
        }

        impl Instruction {
            $(
                pub fn $ctor($($arg: PexValue),*) -> Instruction {
                    Instruction {
                        opcode: Opcode::$variant,
                        args: vec![$($arg),*],
                        variadic_args: Vec::new(),
                    }
                }
            )*
        }
    };
}

define_opcodes! {
    fixed {
        Nop => (nop, "nop", None, []),

        IAdd => (iadd, "iadd", Some(0), [dest, a, b]),
        FAdd => (fadd, "fadd", Some(0), [dest, a, b]),
        ISub => (isub, "isub", Some(0), [dest, a, b]),
        FSub => (fsub, "fsub", Some(0), [dest, a, b]),
        IMul => (imul, "imul", Some(0), [dest, a, b]),
        FMul => (fmul, "fmul", Some(0), [dest, a, b]),
        IDiv => (idiv, "idiv", Some(0), [dest, a, b]),
        FDiv => (fdiv, "fdiv", Some(0), [dest, a, b]),
        IMod => (imod, "imod", Some(0), [dest, a, b]),

        Not => (not, "not", Some(0), [dest, src]),
        INeg => (ineg, "ineg", Some(0), [dest, src]),
        FNeg => (fneg, "fneg", Some(0), [dest, src]),

        Assign => (assign, "assign", Some(0), [dest, src]),
        Cast => (cast, "cast", Some(0), [dest, src]),

        CompareEq => (compare_eq, "cmp_eq", Some(0), [dest, a, b]),
        CompareLt => (compare_lt, "cmp_lt", Some(0), [dest, a, b]),
        CompareLe => (compare_le, "cmp_le", Some(0), [dest, a, b]),
        CompareGt => (compare_gt, "cmp_gt", Some(0), [dest, a, b]),
        CompareGe => (compare_ge, "cmp_ge", Some(0), [dest, a, b]),

        Jmp => (jmp, "jmp", None, [target]),
        JmpT => (jmpt, "jmpt", None, [cond, target]),
        JmpF => (jmpf, "jmpf", None, [cond, target]),

        Return => (ret, "return", None, [value]),
        StrCat => (strcat, "strcat", Some(0), [dest, a, b]),

        PropGet => (propget, "propget", Some(2), [name, obj, dest]),
        PropSet => (propset, "propset", None, [name, obj, value]),

        StructGet => (structget, "struct_get", Some(0), [dest, base, member]),
        StructSet => (structset, "struct_set", None, [base, member, value]),

        ArrayCreate => (arraycreate, "array_create", Some(0), [dest, size]),
        ArrayLength => (arraylength, "array_length", Some(0), [dest, array]),
        ArrayGetElement => (arraygetelement, "array_getelement", Some(0), [dest, array, index]),
        ArraySetElement => (arraysetelement, "array_setelement", None, [array, index, value]),
        ArrayFindElement => (arrayfindelement, "array_findelement", Some(1), [array, dest, value, start]),
        ArrayRFindElement => (arrayrfindelement, "array_rfindelement", Some(1), [array, dest, value, start]),
        ArrayFindStruct => (arrayfindstruct, "array_findstruct", Some(1), [array, dest, member, value, start]),
        ArrayRFindStruct => (arrayrfindstruct, "array_rfindstruct", Some(1), [array, dest, member, value, start]),
        ArrayAdd => (arrayadd, "array_add", None, [array, value, count]),
        ArrayInsert => (arrayinsert, "array_insert", None, [array, value, index]),
        ArrayRemoveLast => (arrayremovelast, "array_removelast", None, [array]),
        ArrayRemove => (arrayremove, "array_remove", None, [array, index, count]),
        ArrayClear => (arrayclear, "array_clear", None, [array]),
    }
    variadic {
        CallMethod => ("callmethod", Some(2), [name, this, dest]),
        CallParent => ("callparent", Some(1), [name, dest]),
        CallStatic => ("callstatic", Some(2), [script, name, dest]),
    }
}

impl Instruction {
    pub fn callmethod(name: PexValue, this: PexValue, dest: PexValue, args: Vec<PexValue>) -> Instruction {
        Instruction {
            opcode: Opcode::CallMethod,
            args: vec![name, this, dest],
            variadic_args: args,
        }
    }

    pub fn callparent(name: PexValue, dest: PexValue, args: Vec<PexValue>) -> Instruction {
        Instruction {
            opcode: Opcode::CallParent,
            args: vec![name, dest],
            variadic_args: args,
        }
    }

    pub fn callstatic(script: PexValue, name: PexValue, dest: PexValue, args: Vec<PexValue>) -> Instruction {
        Instruction {
            opcode: Opcode::CallStatic,
            args: vec![script, name, dest],
            variadic_args: args,
        }
    }
}

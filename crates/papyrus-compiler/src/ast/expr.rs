//! Expressions: semantic analysis and lowering.
//!
//! The expression tree is a tagged sum; the coercion engine pattern-matches
//! on it where the original compiler used runtime downcasts. Every variant
//! knows how to type itself (`result_type`), resolve itself (`semantic`),
//! and lower itself into the function builder (`generate_load`).

use papyrus_core::error::Fatal;
use papyrus_core::location::FileLocation;

use crate::context::ResolutionContext;
use crate::ident::{ArrayFunctionKind, IdentKind, Identifier};
use crate::pex::{FunctionBuilder, Instruction, PexValue};
use crate::ty::{Ty, TyKind};
use crate::value::{Value, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone)]
pub enum Expression {
    Literal {
        location: FileLocation,
        value: Value,
    },
    Ident {
        location: FileLocation,
        ident: Identifier,
    },
    Cast {
        location: FileLocation,
        inner: Box<Expression>,
        target: Ty,
    },
    Binary {
        location: FileLocation,
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Call {
        location: FileLocation,
        base: Option<Box<Expression>>,
        ident: Identifier,
        arguments: Vec<Expression>,
    },
}

impl Expression {
    pub fn literal(location: FileLocation, value: Value) -> Self {
        Expression::Literal { location, value }
    }

    pub fn ident(location: FileLocation, name: impl Into<String>) -> Self {
        let ident = Identifier::unresolved(location.clone(), name);
        Expression::Ident { location, ident }
    }

    pub fn cast(location: FileLocation, inner: Expression, target: Ty) -> Self {
        Expression::Cast {
            location,
            inner: Box::new(inner),
            target,
        }
    }

    pub fn binary(location: FileLocation, op: BinaryOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::Binary {
            location,
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn call(
        location: FileLocation,
        base: Option<Expression>,
        name: impl Into<String>,
        arguments: Vec<Expression>,
    ) -> Self {
        let ident = Identifier::unresolved(location.clone(), name);
        Expression::Call {
            location,
            base: base.map(Box::new),
            ident,
            arguments,
        }
    }

    pub fn location(&self) -> &FileLocation {
        match self {
            Expression::Literal { location, .. }
            | Expression::Ident { location, .. }
            | Expression::Cast { location, .. }
            | Expression::Binary { location, .. }
            | Expression::Call { location, .. } => location,
        }
    }

    /// Move the expression out of a slot, leaving an invalid literal behind.
    /// The slot is always written back before anyone can observe it.
    pub(crate) fn take(slot: &mut Expression) -> Expression {
        let location = slot.location().clone();
        std::mem::replace(
            slot,
            Expression::Literal {
                location: location.clone(),
                value: Value::invalid(location),
            },
        )
    }

    pub fn result_type(&self) -> Ty {
        match self {
            Expression::Literal { value, .. } => value.ty(),
            Expression::Ident { ident, .. } => ident.result_type(),
            Expression::Cast { target, .. } => target.clone(),
            Expression::Binary { location, op, lhs, .. } => {
                if op.is_comparison() {
                    Ty::bool(location.clone())
                } else {
                    lhs.result_type()
                }
            }
            Expression::Call { location, ident, .. } => match &ident.kind {
                IdentKind::Function(f) => f.return_type.borrow().clone(),
                IdentKind::ArrayFunction { kind, .. } => match kind {
                    ArrayFunctionKind::Find
                    | ArrayFunctionKind::FindStruct
                    | ArrayFunctionKind::RFind
                    | ArrayFunctionKind::RFindStruct => Ty::int(location.clone()),
                    _ => Ty::none(location.clone()),
                },
                _ => Ty::none(location.clone()),
            },
        }
    }

    pub fn semantic(&mut self, ctx: &mut ResolutionContext<'_>) -> Result<(), Fatal> {
        match self {
            Expression::Literal { .. } => Ok(()),

            Expression::Ident { ident, .. } => {
                *ident = ctx.resolve_identifier(ident)?;
                Ok(())
            }

            Expression::Cast { inner, target, .. } => {
                *target = ctx.resolve_type(target.clone())?;
                inner.semantic(ctx)?;
                let src = inner.result_type();
                if !ctx.can_explicitly_cast(&src, target) {
                    ctx.diags.error(
                        inner.location(),
                        format!("Cannot convert from '{}' to '{}'!", src, target),
                    );
                }
                Ok(())
            }

            Expression::Binary { location, op, lhs, rhs } => {
                lhs.semantic(ctx)?;
                rhs.semantic(ctx)?;

                let lt = lhs.result_type();
                let rt = rhs.result_type();
                if lt != rt {
                    if *op == BinaryOp::Add
                        && (matches!(lt.kind, TyKind::String) || matches!(rt.kind, TyKind::String))
                    {
                        let target = Ty::string(location.clone());
                        coerce_slot(ctx, lhs, &target);
                        coerce_slot(ctx, rhs, &target);
                    } else if matches!(lt.kind, TyKind::Float) || matches!(rt.kind, TyKind::Float) {
                        let target = Ty::float(location.clone());
                        coerce_slot(ctx, lhs, &target);
                        coerce_slot(ctx, rhs, &target);
                    } else {
                        coerce_slot(ctx, rhs, &lt);
                    }
                }

                if *op == BinaryOp::Modulus && !matches!(lhs.result_type().kind, TyKind::Int) {
                    ctx.diags.error(
                        location,
                        "The modulus operator can only be applied to Int operands!",
                    );
                }
                Ok(())
            }

            Expression::Call { location, base, ident, arguments } => {
                let resolved = match base {
                    Some(base_expr) => {
                        base_expr.semantic(ctx)?;
                        let base_ty = base_expr.result_type();
                        ctx.resolve_function_identifier(&base_ty, ident)?
                    }
                    None => {
                        let none = Ty::none(location.clone());
                        ctx.resolve_function_identifier(&none, ident)?
                    }
                };
                *ident = resolved;

                for arg in arguments.iter_mut() {
                    arg.semantic(ctx)?;
                }

                match ident.kind.clone() {
                    IdentKind::Function(f) => {
                        semantic_function_args(ctx, location, &f, arguments);
                        Ok(())
                    }
                    IdentKind::ArrayFunction { kind, element } => {
                        semantic_array_args(ctx, location, kind, &element, arguments);
                        Ok(())
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    /// Lower the expression and return the operand holding its value.
    pub fn generate_load(&self, bldr: &mut FunctionBuilder<'_>) -> Result<PexValue, Fatal> {
        bldr.set_location(self.location().clone());
        match self {
            Expression::Literal { value, .. } => Ok(literal_to_pex(value, bldr)),

            Expression::Ident { ident, .. } => {
                let this = PexValue::Identifier(bldr.intern("self"));
                ident.generate_load(bldr, this)
            }

            Expression::Cast { location, inner, target } => {
                let val = inner.generate_load(bldr)?;
                bldr.set_location(location.clone());
                let dest = bldr.alloc_temp(target);
                bldr.emit(Instruction::cast(PexValue::Temp(dest), val))?;
                Ok(PexValue::Temp(dest))
            }

            Expression::Binary { location, op, lhs, rhs } => {
                let operand_ty = lhs.result_type();
                let a = lhs.generate_load(bldr)?;
                let b = rhs.generate_load(bldr)?;
                bldr.set_location(location.clone());
                generate_binary(bldr, *op, &operand_ty, a, b)
            }

            Expression::Call { location, base, ident, arguments } => {
                let this = match base {
                    Some(b) => Some(b.generate_load(bldr)?),
                    None => None,
                };
                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(arg.generate_load(bldr)?);
                }
                bldr.set_location(location.clone());

                match &ident.kind {
                    IdentKind::Function(f) => {
                        let ret = f.return_type.borrow().clone();
                        let dest = if ret.is_none() {
                            bldr.none_local(location)
                        } else {
                            PexValue::Temp(bldr.alloc_temp(&ret))
                        };
                        let name = PexValue::Identifier(bldr.intern(&f.name));

                        if f.is_global {
                            let owner = match f.owner.borrow().upgrade() {
                                Some(owner) => owner,
                                None => {
                                    return Err(bldr
                                        .diags()
                                        .logical_fatal("Global function has no owning object!"))
                                }
                            };
                            let script = PexValue::Identifier(bldr.intern(&owner.name));
                            bldr.emit(Instruction::callstatic(script, name, dest, args))?;
                        } else {
                            let this = match this {
                                Some(v) => v,
                                None => PexValue::Identifier(bldr.intern("self")),
                            };
                            bldr.emit(Instruction::callmethod(name, this, dest, args))?;
                        }
                        Ok(dest)
                    }

                    IdentKind::ArrayFunction { kind, .. } => {
                        let arr = match this {
                            Some(v) => v,
                            None => {
                                return Err(bldr
                                    .diags()
                                    .logical_fatal("Array function call without an array base!"))
                            }
                        };
                        generate_array_call(bldr, location, *kind, arr, &args)
                    }

                    _ => Err(bldr
                        .diags()
                        .logical_fatal("Call through an unresolved function identifier!")),
                }
            }
        }
    }
}

fn coerce_slot(ctx: &mut ResolutionContext<'_>, slot: &mut Expression, target: &Ty) {
    let expr = Expression::take(slot);
    *slot = ctx.coerce_expression(expr, target);
}

fn literal_to_pex(value: &Value, bldr: &mut FunctionBuilder<'_>) -> PexValue {
    match &value.kind {
        ValueKind::None => PexValue::None,
        ValueKind::Bool(b) => PexValue::Bool(*b),
        ValueKind::Int(i) => PexValue::Integer(*i),
        ValueKind::Float(f) => PexValue::Float(*f),
        ValueKind::String(s) => PexValue::String(bldr.intern(s)),
        ValueKind::Invalid => PexValue::Invalid,
    }
}

fn semantic_function_args(
    ctx: &mut ResolutionContext<'_>,
    location: &FileLocation,
    f: &crate::ast::Function,
    arguments: &mut Vec<Expression>,
) {
    let params = &f.parameters;
    if arguments.len() > params.len() {
        ctx.diags.error(
            location,
            format!(
                "Too many arguments in the call to '{}': expected at most {}, got {}.",
                f.name,
                params.len(),
                arguments.len()
            ),
        );
    } else {
        for param in params.iter().skip(arguments.len()) {
            let default = param.default_value.borrow().clone();
            if default.is_invalid() {
                ctx.diags.error(
                    location,
                    format!(
                        "Missing argument for parameter '{}' in the call to '{}'.",
                        param.name, f.name
                    ),
                );
                break;
            }
            arguments.push(Expression::Literal {
                location: default.location.clone(),
                value: default,
            });
        }
    }

    for (arg, param) in arguments.iter_mut().zip(params.iter()) {
        let target = param.ty.borrow().clone();
        coerce_slot(ctx, arg, &target);
    }
}

fn semantic_array_args(
    ctx: &mut ResolutionContext<'_>,
    location: &FileLocation,
    kind: ArrayFunctionKind,
    element: &Ty,
    arguments: &mut Vec<Expression>,
) {
    let arity_error = |ctx: &mut ResolutionContext<'_>, expected: &str| {
        ctx.diags.error(
            location,
            format!("Expected {} argument(s) in the call to an array function!", expected),
        );
    };

    match kind {
        ArrayFunctionKind::Find | ArrayFunctionKind::RFind => {
            if arguments.is_empty() || arguments.len() > 2 {
                arity_error(ctx, "1 or 2");
                return;
            }
            coerce_slot(ctx, &mut arguments[0], element);
            let default_start = if kind == ArrayFunctionKind::Find { 0 } else { -1 };
            if arguments.len() == 1 {
                arguments.push(Expression::Literal {
                    location: location.clone(),
                    value: Value::int(location.clone(), default_start),
                });
            } else {
                coerce_slot(ctx, &mut arguments[1], &Ty::int(location.clone()));
            }
        }

        ArrayFunctionKind::FindStruct | ArrayFunctionKind::RFindStruct => {
            if arguments.len() < 2 || arguments.len() > 3 {
                arity_error(ctx, "2 or 3");
                return;
            }
            let member = match &arguments[0] {
                Expression::Literal {
                    value: Value { kind: ValueKind::String(name), .. },
                    ..
                } => match &element.kind {
                    TyKind::Struct(s) => {
                        let found = s.member(name);
                        if found.is_none() {
                            ctx.diags.error(
                                arguments[0].location(),
                                format!("Struct '{}' has no member named '{}'!", s.name, name),
                            );
                        }
                        found
                    }
                    _ => None,
                },
                _ => {
                    ctx.diags.error(
                        arguments[0].location(),
                        "The member name in a struct find must be a string literal!",
                    );
                    None
                }
            };
            if let Some(member) = member {
                let target = member.ty.borrow().clone();
                coerce_slot(ctx, &mut arguments[1], &target);
            }
            let default_start = if kind == ArrayFunctionKind::FindStruct { 0 } else { -1 };
            if arguments.len() == 2 {
                arguments.push(Expression::Literal {
                    location: location.clone(),
                    value: Value::int(location.clone(), default_start),
                });
            } else {
                coerce_slot(ctx, &mut arguments[2], &Ty::int(location.clone()));
            }
        }

        ArrayFunctionKind::Add => {
            if arguments.is_empty() || arguments.len() > 2 {
                arity_error(ctx, "1 or 2");
                return;
            }
            coerce_slot(ctx, &mut arguments[0], element);
            if arguments.len() == 1 {
                arguments.push(Expression::Literal {
                    location: location.clone(),
                    value: Value::int(location.clone(), 1),
                });
            } else {
                coerce_slot(ctx, &mut arguments[1], &Ty::int(location.clone()));
            }
        }

        ArrayFunctionKind::Insert => {
            if arguments.len() != 2 {
                arity_error(ctx, "2");
                return;
            }
            coerce_slot(ctx, &mut arguments[0], element);
            coerce_slot(ctx, &mut arguments[1], &Ty::int(location.clone()));
        }

        ArrayFunctionKind::Remove => {
            if arguments.is_empty() || arguments.len() > 2 {
                arity_error(ctx, "1 or 2");
                return;
            }
            coerce_slot(ctx, &mut arguments[0], &Ty::int(location.clone()));
            if arguments.len() == 1 {
                arguments.push(Expression::Literal {
                    location: location.clone(),
                    value: Value::int(location.clone(), 1),
                });
            } else {
                coerce_slot(ctx, &mut arguments[1], &Ty::int(location.clone()));
            }
        }

        ArrayFunctionKind::RemoveLast | ArrayFunctionKind::Clear => {
            if !arguments.is_empty() {
                arity_error(ctx, "0");
            }
        }

        ArrayFunctionKind::Unknown => {
            ctx.diags.error(location, "Unknown array function!");
        }
    }
}

fn generate_array_call(
    bldr: &mut FunctionBuilder<'_>,
    location: &FileLocation,
    kind: ArrayFunctionKind,
    arr: PexValue,
    args: &[PexValue],
) -> Result<PexValue, Fatal> {
    match kind {
        ArrayFunctionKind::Find | ArrayFunctionKind::RFind => {
            let dest = bldr.alloc_temp(&Ty::int(location.clone()));
            let d = PexValue::Temp(dest);
            let instr = if kind == ArrayFunctionKind::Find {
                Instruction::arrayfindelement(arr, d, args[0], args[1])
            } else {
                Instruction::arrayrfindelement(arr, d, args[0], args[1])
            };
            bldr.emit(instr)?;
            Ok(d)
        }
        ArrayFunctionKind::FindStruct | ArrayFunctionKind::RFindStruct => {
            let dest = bldr.alloc_temp(&Ty::int(location.clone()));
            let d = PexValue::Temp(dest);
            let instr = if kind == ArrayFunctionKind::FindStruct {
                Instruction::arrayfindstruct(arr, d, args[0], args[1], args[2])
            } else {
                Instruction::arrayrfindstruct(arr, d, args[0], args[1], args[2])
            };
            bldr.emit(instr)?;
            Ok(d)
        }
        ArrayFunctionKind::Add => {
            bldr.emit(Instruction::arrayadd(arr, args[0], args[1]))?;
            Ok(PexValue::None)
        }
        ArrayFunctionKind::Clear => {
            bldr.emit(Instruction::arrayclear(arr))?;
            Ok(PexValue::None)
        }
        ArrayFunctionKind::Insert => {
            bldr.emit(Instruction::arrayinsert(arr, args[0], args[1]))?;
            Ok(PexValue::None)
        }
        ArrayFunctionKind::Remove => {
            bldr.emit(Instruction::arrayremove(arr, args[0], args[1]))?;
            Ok(PexValue::None)
        }
        ArrayFunctionKind::RemoveLast => {
            bldr.emit(Instruction::arrayremovelast(arr))?;
            Ok(PexValue::None)
        }
        ArrayFunctionKind::Unknown => Err(bldr
            .diags()
            .logical_fatal("An unknown array function survived resolution!")),
    }
}

fn generate_binary(
    bldr: &mut FunctionBuilder<'_>,
    op: BinaryOp,
    operand_ty: &Ty,
    a: PexValue,
    b: PexValue,
) -> Result<PexValue, Fatal> {
    let location = bldr.location().clone();

    if op.is_comparison() {
        let dest = bldr.alloc_temp(&Ty::bool(location.clone()));
        let d = PexValue::Temp(dest);
        match op {
            BinaryOp::Eq => bldr.emit(Instruction::compare_eq(d, a, b))?,
            BinaryOp::Lt => bldr.emit(Instruction::compare_lt(d, a, b))?,
            BinaryOp::Le => bldr.emit(Instruction::compare_le(d, a, b))?,
            BinaryOp::Gt => bldr.emit(Instruction::compare_gt(d, a, b))?,
            BinaryOp::Ge => bldr.emit(Instruction::compare_ge(d, a, b))?,
            BinaryOp::Ne => {
                bldr.emit(Instruction::compare_eq(d, a, b))?;
                let inverted = bldr.alloc_temp(&Ty::bool(location));
                bldr.emit(Instruction::not(PexValue::Temp(inverted), d))?;
                return Ok(PexValue::Temp(inverted));
            }
            _ => unreachable!(),
        }
        return Ok(d);
    }

    let dest = bldr.alloc_temp(operand_ty);
    let d = PexValue::Temp(dest);
    let instr = match (&operand_ty.kind, op) {
        (TyKind::Int, BinaryOp::Add) => Instruction::iadd(d, a, b),
        (TyKind::Int, BinaryOp::Subtract) => Instruction::isub(d, a, b),
        (TyKind::Int, BinaryOp::Multiply) => Instruction::imul(d, a, b),
        (TyKind::Int, BinaryOp::Divide) => Instruction::idiv(d, a, b),
        (TyKind::Int, BinaryOp::Modulus) => Instruction::imod(d, a, b),
        (TyKind::Float, BinaryOp::Add) => Instruction::fadd(d, a, b),
        (TyKind::Float, BinaryOp::Subtract) => Instruction::fsub(d, a, b),
        (TyKind::Float, BinaryOp::Multiply) => Instruction::fmul(d, a, b),
        (TyKind::Float, BinaryOp::Divide) => Instruction::fdiv(d, a, b),
        (TyKind::String, BinaryOp::Add) => Instruction::strcat(d, a, b),
        _ => {
            return Err(bldr
                .diags()
                .logical_fatal(format!("Operator applied to an unsupported operand type '{}'!", operand_ty)))
        }
    };
    bldr.emit(instr)?;
    Ok(d)
}

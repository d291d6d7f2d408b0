//! Statements: semantic analysis and lowering.

use std::cell::RefCell;
use std::rc::Rc;

use papyrus_core::error::Fatal;
use papyrus_core::location::FileLocation;

use crate::context::ResolutionContext;
use crate::pex::{FunctionBuilder, Instruction, PexValue};
use crate::ty::Ty;

use super::expr::Expression;

/// A local variable declaration. Shared behind `Rc` because resolved
/// identifiers point back at the declaration they name.
#[derive(Debug)]
pub struct DeclareStatement {
    pub location: FileLocation,
    pub name: String,
    pub ty: RefCell<Ty>,
    pub initial_value: RefCell<Option<Expression>>,
}

impl DeclareStatement {
    pub fn new(location: FileLocation, name: impl Into<String>, ty: Ty) -> Self {
        Self {
            location,
            name: name.into(),
            ty: RefCell::new(ty),
            initial_value: RefCell::new(None),
        }
    }
}

#[derive(Debug)]
pub struct IfArm {
    pub condition: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug)]
pub enum Statement {
    Declare(Rc<DeclareStatement>),
    Expression(Expression),
    Assign {
        location: FileLocation,
        lhs: Expression,
        rhs: Expression,
    },
    Return {
        location: FileLocation,
        value: Option<Expression>,
    },
    If {
        location: FileLocation,
        arms: Vec<IfArm>,
        else_body: Vec<Statement>,
    },
    While {
        location: FileLocation,
        condition: Expression,
        body: Vec<Statement>,
    },
}

impl Statement {
    pub fn semantic(&mut self, ctx: &mut ResolutionContext<'_>) -> Result<(), Fatal> {
        match self {
            Statement::Declare(decl) => {
                let ty = ctx.resolve_type(decl.ty.borrow().clone())?;
                *decl.ty.borrow_mut() = ty.clone();
                ctx.add_local_variable(decl)?;

                let mut init = decl.initial_value.borrow_mut();
                if let Some(slot) = init.as_mut() {
                    slot.semantic(ctx)?;
                    let expr = Expression::take(slot);
                    *slot = ctx.coerce_expression(expr, &ty);
                }
                Ok(())
            }

            Statement::Expression(expr) => expr.semantic(ctx),

            Statement::Assign { lhs, rhs, location } => {
                lhs.semantic(ctx)?;
                rhs.semantic(ctx)?;
                match lhs {
                    Expression::Ident { .. } => {
                        let target = lhs.result_type();
                        let expr = Expression::take(rhs);
                        *rhs = ctx.coerce_expression(expr, &target);
                    }
                    _ => {
                        ctx.diags.error(location, "Cannot assign to this expression!");
                    }
                }
                Ok(())
            }

            Statement::Return { location, value } => {
                let ret = match &ctx.function {
                    Some(f) => f.return_type.borrow().clone(),
                    None => {
                        return Err(ctx
                            .diags
                            .logical_fatal("Return statement outside of a function!"))
                    }
                };
                match value {
                    Some(expr) => {
                        expr.semantic(ctx)?;
                        if ret.is_none() {
                            ctx.diags.error(
                                location,
                                "Cannot return a value from a function that returns None!",
                            );
                        } else {
                            let taken = Expression::take(expr);
                            *expr = ctx.coerce_expression(taken, &ret);
                        }
                    }
                    None => {
                        if !ret.is_none() {
                            ctx.diags.error(
                                location,
                                format!("A function with a return type of '{}' must return a value!", ret),
                            );
                        }
                    }
                }
                Ok(())
            }

            Statement::If { arms, else_body, .. } => {
                for arm in arms.iter_mut() {
                    arm.condition.semantic(ctx)?;
                    let cond = Expression::take(&mut arm.condition);
                    let target = Ty::bool(cond.location().clone());
                    arm.condition = ctx.coerce_expression(cond, &target);

                    ctx.push_scope();
                    let result = semantic_block(&mut arm.body, ctx);
                    ctx.pop_scope();
                    result?;
                }
                ctx.push_scope();
                let result = semantic_block(else_body, ctx);
                ctx.pop_scope();
                result
            }

            Statement::While { condition, body, .. } => {
                condition.semantic(ctx)?;
                let cond = Expression::take(condition);
                let target = Ty::bool(cond.location().clone());
                *condition = ctx.coerce_expression(cond, &target);

                ctx.push_scope();
                let result = semantic_block(body, ctx);
                ctx.pop_scope();
                result
            }
        }
    }

    pub fn generate(&self, bldr: &mut FunctionBuilder<'_>) -> Result<(), Fatal> {
        match self {
            Statement::Declare(decl) => {
                bldr.set_location(decl.location.clone());
                let local = bldr.allocate_local(&decl.name, &decl.ty.borrow());
                let init = decl.initial_value.borrow();
                if let Some(expr) = init.as_ref() {
                    let value = expr.generate_load(bldr)?;
                    bldr.set_location(decl.location.clone());
                    bldr.emit(Instruction::assign(local, value))?;
                }
                Ok(())
            }

            Statement::Expression(expr) => {
                expr.generate_load(bldr)?;
                Ok(())
            }

            Statement::Assign { location, lhs, rhs } => match lhs {
                Expression::Ident { ident, .. } => {
                    let value = rhs.generate_load(bldr)?;
                    bldr.set_location(location.clone());
                    let this = PexValue::Identifier(bldr.intern("self"));
                    ident.generate_store(bldr, this, value)
                }
                _ => Err(bldr
                    .diags()
                    .logical_fatal("Assignment to a non-identifier expression survived semantic analysis!")),
            },

            Statement::Return { location, value } => {
                let val = match value {
                    Some(expr) => expr.generate_load(bldr)?,
                    None => bldr.none_local(location),
                };
                bldr.set_location(location.clone());
                bldr.emit(Instruction::ret(val))
            }

            Statement::If { location, arms, else_body } => {
                bldr.set_location(location.clone());
                let end = bldr.new_label();
                for arm in arms {
                    let next = bldr.new_label();
                    let cond = arm.condition.generate_load(bldr)?;
                    bldr.emit(Instruction::jmpf(cond, PexValue::Label(next)))?;
                    for stmt in &arm.body {
                        stmt.generate(bldr)?;
                    }
                    bldr.emit(Instruction::jmp(PexValue::Label(end)))?;
                    bldr.bind(next);
                }
                for stmt in else_body {
                    stmt.generate(bldr)?;
                }
                bldr.bind(end);
                Ok(())
            }

            Statement::While { location, condition, body } => {
                bldr.set_location(location.clone());
                let top = bldr.new_label();
                let end = bldr.new_label();
                bldr.bind(top);
                let cond = condition.generate_load(bldr)?;
                bldr.emit(Instruction::jmpf(cond, PexValue::Label(end)))?;
                for stmt in body {
                    stmt.generate(bldr)?;
                }
                bldr.emit(Instruction::jmp(PexValue::Label(top)))?;
                bldr.bind(end);
                Ok(())
            }
        }
    }
}

fn semantic_block(block: &mut [Statement], ctx: &mut ResolutionContext<'_>) -> Result<(), Fatal> {
    for stmt in block.iter_mut() {
        stmt.semantic(ctx)?;
    }
    Ok(())
}

/// Whether execution of `block` always reaches a `Return` statement.
///
/// Loops never count: a `While` body may not run at all. An `If` guarantees
/// a return only when every arm and the else branch do.
pub(crate) fn block_always_returns(block: &[Statement]) -> bool {
    block.iter().any(statement_always_returns)
}

fn statement_always_returns(stmt: &Statement) -> bool {
    match stmt {
        Statement::Return { .. } => true,
        Statement::If { arms, else_body, .. } => {
            arms.iter().all(|arm| block_always_returns(&arm.body))
                && block_always_returns(else_body)
        }
        Statement::Declare(_)
        | Statement::Expression(_)
        | Statement::Assign { .. }
        | Statement::While { .. } => false,
    }
}

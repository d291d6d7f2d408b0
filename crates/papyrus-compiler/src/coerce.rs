//! The coercion engine.
//!
//! Implicit coercion is deliberately narrow: identity, almost-anything to
//! `Bool`/`String`/`Var`, `Int` to `Float`, and object upcasts. Explicit
//! casts add `Var` unboxing, the scalar conversions, object downcasts and
//! array-of-object covariance. Arrays are invariant under implicit
//! coercion.
//!
//! A literal `None` is special: the backend treats `None` as the zero of
//! `Var`, arrays, objects and structs, so a *literal* `None` coerces to all
//! of them while a non-literal `None`-typed expression does not.

use papyrus_core::config::CompilerConfig;

use crate::ast::Expression;
use crate::context::ResolutionContext;
use crate::ty::{Ty, TyKind};
use crate::value::{Value, ValueKind};

impl ResolutionContext<'_> {
    pub fn can_implicitly_coerce(&self, src: &Ty, dest: &Ty) -> bool {
        if src == dest {
            return true;
        }
        match &dest.kind {
            TyKind::Bool | TyKind::String | TyKind::Var => !src.is_none(),
            TyKind::Float => matches!(src.kind, TyKind::Int),
            TyKind::Object(dest_obj) => match &src.kind {
                TyKind::Object(src_obj) => Self::is_object_some_parent_of(src_obj, dest_obj),
                _ => false,
            },
            TyKind::None
            | TyKind::Int
            | TyKind::Array(_)
            | TyKind::Unresolved(_)
            | TyKind::Struct(_) => false,
        }
    }

    /// [`can_implicitly_coerce`](Self::can_implicitly_coerce), plus the
    /// literal-`None` overlay.
    pub fn can_implicitly_coerce_expression(&self, expr: &Expression, target: &Ty) -> bool {
        let mut can = self.can_implicitly_coerce(&expr.result_type(), target);
        match target.kind {
            TyKind::Var | TyKind::Array(_) | TyKind::Object(_) | TyKind::Struct(_) => {
                if expr.result_type().is_none() && matches!(expr, Expression::Literal { .. }) {
                    can = true;
                }
            }
            _ => {}
        }
        can
    }

    /// Coerce `expr` to `target`, wrapping it in a cast when a conversion
    /// is required. An `Int` literal bound for `Float` is folded in place
    /// instead of casting. An illegal coercion reports an error and returns
    /// the expression unchanged.
    pub fn coerce_expression(&mut self, mut expr: Expression, target: &Ty) -> Expression {
        if expr.result_type() == *target {
            return expr;
        }
        let can = self.can_implicitly_coerce_expression(&expr, target);

        if can
            && matches!(expr.result_type().kind, TyKind::Int)
            && matches!(target.kind, TyKind::Float)
        {
            if let Expression::Literal { value, .. } = &mut expr {
                if let ValueKind::Int(i) = value.kind {
                    value.kind = ValueKind::Float(i as f32);
                    return expr;
                }
            }
        }

        if !can {
            self.diags.error(
                expr.location(),
                format!(
                    "No implicit conversion from '{}' to '{}' exists!",
                    expr.result_type(),
                    target
                ),
            );
            return expr;
        }

        // A literal None needs no conversion: the backend already treats
        // None as the zero of Var, arrays, objects and structs.
        if expr.result_type().is_none() && matches!(expr, Expression::Literal { .. }) {
            return expr;
        }

        let location = expr.location().clone();
        Expression::Cast {
            location,
            inner: Box::new(expr),
            target: target.clone(),
        }
    }

    pub fn can_explicitly_cast(&self, src: &Ty, dest: &Ty) -> bool {
        if self.can_implicitly_coerce(src, dest) {
            return true;
        }

        if matches!(src.kind, TyKind::Var) {
            return !dest.is_none();
        }

        match &dest.kind {
            TyKind::Int | TyKind::Float => matches!(
                src.kind,
                TyKind::String | TyKind::Int | TyKind::Float | TyKind::Bool | TyKind::Var
            ),
            TyKind::Object(dest_obj) => match &src.kind {
                TyKind::Object(src_obj) => Self::is_object_some_parent_of(dest_obj, src_obj),
                _ => false,
            },
            TyKind::Array(dest_elem) => match &src.kind {
                TyKind::Array(src_elem) => match (&src_elem.kind, &dest_elem.kind) {
                    (TyKind::Object(src_obj), TyKind::Object(dest_obj)) => {
                        Self::is_object_some_parent_of(dest_obj, src_obj)
                            || Self::is_object_some_parent_of(src_obj, dest_obj)
                    }
                    _ => false,
                },
                _ => false,
            },
            TyKind::None
            | TyKind::Bool
            | TyKind::String
            | TyKind::Var
            | TyKind::Unresolved(_)
            | TyKind::Struct(_) => false,
        }
    }

    /// Coerce a default value to the declared type. `Invalid` (no default
    /// given) passes through; `None` is the zero of arrays, objects and
    /// structs.
    pub fn coerce_default_value(&mut self, value: Value, target: &Ty) -> Value {
        if value.is_invalid() || value.ty() == *target {
            return value;
        }

        match (&target.kind, &value.kind) {
            (TyKind::Float, ValueKind::Int(i)) => return Value::float(value.location, *i as f32),
            (TyKind::Array(_), ValueKind::None)
            | (TyKind::Object(_), ValueKind::None)
            | (TyKind::Struct(_), ValueKind::None) => return value,
            _ => {}
        }

        self.diags.error(
            &value.location,
            format!("Cannot initialize a '{}' value with a '{}'!", target, value.ty()),
        );
        value
    }
}

/// The standalone expression coercer, used where no resolution context is
/// in play. The int-literal fold only runs with optimizations enabled;
/// legality was established by the caller.
pub fn coerce_expression_free(
    mut expr: Expression,
    target: Ty,
    config: &CompilerConfig,
) -> Expression {
    if expr.result_type() == target {
        return expr;
    }

    if config.enable_optimizations
        && matches!(expr.result_type().kind, TyKind::Int)
        && matches!(target.kind, TyKind::Float)
    {
        if let Expression::Literal { value, .. } = &mut expr {
            if let ValueKind::Int(i) = value.kind {
                value.kind = ValueKind::Float(i as f32);
                return expr;
            }
        }
    }

    let location = expr.location().clone();
    Expression::Cast {
        location,
        inner: Box::new(expr),
        target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::rc::Rc;

    use papyrus_core::diagnostics::Diagnostics;
    use papyrus_core::error::Fatal;
    use papyrus_core::location::FileLocation;

    use crate::ast::stmt::DeclareStatement;
    use crate::ast::{ObjectDef, Script, StructDef};
    use crate::ident::{IdentKind, Identifier};
    use crate::loader::{Frontend, ScriptLoader};

    struct NullFrontend;

    impl Frontend for NullFrontend {
        fn parse_source(&mut self, _path: &Path, diags: &mut Diagnostics) -> Result<Rc<Script>, Fatal> {
            Err(diags.logical_fatal("unexpected script load in this test"))
        }
        fn parse_assembly(&mut self, _path: &Path, diags: &mut Diagnostics) -> Result<Rc<Script>, Fatal> {
            Err(diags.logical_fatal("unexpected script load in this test"))
        }
        fn read_binary(&mut self, _path: &Path, diags: &mut Diagnostics) -> Result<Rc<Script>, Fatal> {
            Err(diags.logical_fatal("unexpected script load in this test"))
        }
    }

    fn loc() -> FileLocation {
        FileLocation::new("Test.psc", 1, 0)
    }

    fn loader() -> ScriptLoader {
        ScriptLoader::new(
            Rc::new(CompilerConfig::default()),
            Box::new(NullFrontend),
        )
    }

    /// Child extends Parent.
    fn hierarchy() -> (Rc<ObjectDef>, Rc<ObjectDef>) {
        let parent = Rc::new(ObjectDef::new(loc(), "Form"));
        let mut child = ObjectDef::new(loc(), "Actor");
        *child.parent_class.borrow_mut() = Some(Ty::resolved_object(loc(), parent.clone()));
        (Rc::new(child), parent)
    }

    fn int_local_expr() -> Expression {
        // A non-literal Int-typed expression: an identifier bound to a local.
        let decl = Rc::new(DeclareStatement::new(loc(), "x", Ty::int(loc())));
        Expression::Ident {
            location: loc(),
            ident: Identifier {
                location: loc(),
                name: "x".into(),
                kind: IdentKind::Local(decl),
            },
        }
    }

    fn none_local_expr() -> Expression {
        let decl = Rc::new(DeclareStatement::new(loc(), "n", Ty::none(loc())));
        Expression::Ident {
            location: loc(),
            ident: Identifier {
                location: loc(),
                name: "n".into(),
                kind: IdentKind::Local(decl),
            },
        }
    }

    #[test]
    fn identity_always_coerces() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        for ty in [
            Ty::none(loc()),
            Ty::bool(loc()),
            Ty::float(loc()),
            Ty::int(loc()),
            Ty::string(loc()),
            Ty::var(loc()),
            Ty::array(loc(), Ty::int(loc())),
        ] {
            assert!(ctx.can_implicitly_coerce(&ty, &ty), "{} -> {}", ty, ty);
        }
    }

    #[test]
    fn int_widens_to_float_but_not_back() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        assert!(ctx.can_implicitly_coerce(&Ty::int(loc()), &Ty::float(loc())));
        assert!(!ctx.can_implicitly_coerce(&Ty::float(loc()), &Ty::int(loc())));
    }

    #[test]
    fn everything_but_none_coerces_to_bool_string_var() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        let sources = [
            Ty::bool(loc()),
            Ty::float(loc()),
            Ty::int(loc()),
            Ty::string(loc()),
            Ty::array(loc(), Ty::int(loc())),
        ];
        for dest in [Ty::bool(loc()), Ty::string(loc()), Ty::var(loc())] {
            for src in &sources {
                assert!(ctx.can_implicitly_coerce(src, &dest), "{} -> {}", src, dest);
            }
            assert!(!ctx.can_implicitly_coerce(&Ty::none(loc()), &dest));
        }
    }

    #[test]
    fn object_upcasts_are_implicit_downcasts_are_not() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        let (child, parent) = hierarchy();
        let child_ty = Ty::resolved_object(loc(), child);
        let parent_ty = Ty::resolved_object(loc(), parent);

        assert!(ctx.can_implicitly_coerce(&child_ty, &parent_ty));
        assert!(!ctx.can_implicitly_coerce(&parent_ty, &child_ty));
        // The downcast is legal explicitly.
        assert!(ctx.can_explicitly_cast(&parent_ty, &child_ty));
    }

    #[test]
    fn arrays_are_invariant_under_implicit_coercion() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        let ints = Ty::array(loc(), Ty::int(loc()));
        let floats = Ty::array(loc(), Ty::float(loc()));
        assert!(ctx.can_implicitly_coerce(&ints, &ints));
        assert!(!ctx.can_implicitly_coerce(&ints, &floats));

        let (child, parent) = hierarchy();
        let child_arr = Ty::array(loc(), Ty::resolved_object(loc(), child));
        let parent_arr = Ty::array(loc(), Ty::resolved_object(loc(), parent));
        assert!(!ctx.can_implicitly_coerce(&child_arr, &parent_arr));
    }

    #[test]
    fn object_array_casts_follow_the_subclass_relation() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        let (child, parent) = hierarchy();
        let unrelated = Rc::new(ObjectDef::new(loc(), "Quest"));

        let child_arr = Ty::array(loc(), Ty::resolved_object(loc(), child));
        let parent_arr = Ty::array(loc(), Ty::resolved_object(loc(), parent));
        let unrelated_arr = Ty::array(loc(), Ty::resolved_object(loc(), unrelated));

        assert!(ctx.can_explicitly_cast(&child_arr, &parent_arr));
        assert!(ctx.can_explicitly_cast(&parent_arr, &child_arr));
        assert!(!ctx.can_explicitly_cast(&child_arr, &unrelated_arr));

        // No covariance for scalar element types.
        let ints = Ty::array(loc(), Ty::int(loc()));
        let floats = Ty::array(loc(), Ty::float(loc()));
        assert!(!ctx.can_explicitly_cast(&ints, &floats));
    }

    #[test]
    fn var_casts_to_anything_but_none() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        let var = Ty::var(loc());
        for dest in [
            Ty::bool(loc()),
            Ty::float(loc()),
            Ty::int(loc()),
            Ty::string(loc()),
            Ty::array(loc(), Ty::int(loc())),
        ] {
            assert!(ctx.can_explicitly_cast(&var, &dest), "Var -> {}", dest);
        }
        assert!(!ctx.can_explicitly_cast(&var, &Ty::none(loc())));
    }

    #[test]
    fn scalars_cast_to_int_and_float() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        for dest in [Ty::int(loc()), Ty::float(loc())] {
            for src in [Ty::string(loc()), Ty::bool(loc()), Ty::float(loc()), Ty::int(loc())] {
                assert!(ctx.can_explicitly_cast(&src, &dest), "{} -> {}", src, dest);
            }
            assert!(!ctx.can_explicitly_cast(&Ty::none(loc()), &dest));
        }
    }

    #[test]
    fn implicit_coercion_implies_explicit_cast() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        let (child, parent) = hierarchy();
        let kinds = [
            Ty::none(loc()),
            Ty::bool(loc()),
            Ty::float(loc()),
            Ty::int(loc()),
            Ty::string(loc()),
            Ty::var(loc()),
            Ty::array(loc(), Ty::int(loc())),
            Ty::resolved_object(loc(), child),
            Ty::resolved_object(loc(), parent),
        ];
        for src in &kinds {
            for dest in &kinds {
                if ctx.can_implicitly_coerce(src, dest) {
                    assert!(
                        ctx.can_explicitly_cast(src, dest),
                        "implicit {} -> {} but not explicit",
                        src,
                        dest
                    );
                }
            }
        }
    }

    #[test]
    fn int_literal_to_float_folds_in_place() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let mut ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        let lit = Expression::literal(loc(), Value::int(loc(), 3));
        let out = ctx.coerce_expression(lit, &Ty::float(loc()));

        match out {
            Expression::Literal { value, .. } => {
                assert_eq!(value.kind, ValueKind::Float(3.0));
            }
            other => panic!("expected a folded literal, got {:?}", other),
        }
        assert_eq!(ctx.diags.error_count(), 0);
    }

    #[test]
    fn non_literal_int_to_float_wraps_a_cast() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let mut ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        let out = ctx.coerce_expression(int_local_expr(), &Ty::float(loc()));
        match out {
            Expression::Cast { target, .. } => assert_eq!(target, Ty::float(loc())),
            other => panic!("expected a cast wrapper, got {:?}", other),
        }
    }

    #[test]
    fn equal_types_pass_through_untouched() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let mut ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        let out = ctx.coerce_expression(int_local_expr(), &Ty::int(loc()));
        assert!(matches!(out, Expression::Ident { .. }));
    }

    #[test]
    fn literal_none_reaches_an_object_without_a_cast() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let mut ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        let (child, _) = hierarchy();
        let obj_ty = Ty::resolved_object(loc(), child);

        let lit = Expression::literal(loc(), Value::none(loc()));
        let out = ctx.coerce_expression(lit, &obj_ty);
        assert!(matches!(out, Expression::Literal { .. }));
        assert_eq!(ctx.diags.error_count(), 0);

        // A non-literal None-typed expression is rejected.
        let out = ctx.coerce_expression(none_local_expr(), &obj_ty);
        assert!(matches!(out, Expression::Ident { .. }));
        assert_eq!(ctx.diags.error_count(), 1);
    }

    #[test]
    fn illegal_coercion_reports_and_returns_unchanged() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let mut ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        let lit = Expression::literal(loc(), Value::string(loc(), "hi"));
        let out = ctx.coerce_expression(lit, &Ty::int(loc()));
        assert!(matches!(
            out,
            Expression::Literal { value: Value { kind: ValueKind::String(_), .. }, .. }
        ));
        assert_eq!(ctx.diags.error_count(), 1);
    }

    #[test]
    fn default_values_promote_and_pass_none() {
        let mut ld = loader();
        let mut diags = Diagnostics::new();
        let mut ctx = ResolutionContext::new(Rc::new(Script::new("Test.psc")), &mut ld, &mut diags);

        // Int promotes into a Float slot.
        let promoted = ctx.coerce_default_value(Value::int(loc(), 4), &Ty::float(loc()));
        assert_eq!(promoted.kind, ValueKind::Float(4.0));

        // None is the zero of arrays, objects and structs.
        let arr = Ty::array(loc(), Ty::int(loc()));
        let none = ctx.coerce_default_value(Value::none(loc()), &arr);
        assert_eq!(none.kind, ValueKind::None);

        let s = Rc::new(StructDef::new(loc(), "Pos"));
        let none = ctx.coerce_default_value(Value::none(loc()), &Ty::resolved_struct(loc(), s));
        assert_eq!(none.kind, ValueKind::None);

        // No default supplied passes through untouched.
        let invalid = ctx.coerce_default_value(Value::invalid(loc()), &Ty::int(loc()));
        assert!(invalid.is_invalid());
        assert_eq!(ctx.diags.error_count(), 0);

        // Anything else is an error, returned unchanged.
        let bad = ctx.coerce_default_value(Value::string(loc(), "no"), &Ty::int(loc()));
        assert_eq!(bad.kind, ValueKind::String("no".into()));
        assert_eq!(ctx.diags.error_count(), 1);
    }

    #[test]
    fn free_coercer_folds_only_with_optimizations() {
        let mut config = CompilerConfig::default();
        config.enable_optimizations = true;

        let lit = Expression::literal(loc(), Value::int(loc(), 3));
        let out = coerce_expression_free(lit, Ty::float(loc()), &config);
        assert!(matches!(
            out,
            Expression::Literal { value: Value { kind: ValueKind::Float(_), .. }, .. }
        ));

        config.enable_optimizations = false;
        let lit = Expression::literal(loc(), Value::int(loc(), 3));
        let out = coerce_expression_free(lit, Ty::float(loc()), &config);
        assert!(matches!(out, Expression::Cast { .. }));
    }
}

//! Implicit borrow and dereference at use sites

use super::{SubtypeConstraint, TypeCompare, TypeMatcher};
use crate::ir::{Expr, ExprId, ExprKind, NameUse, PermFlags, Program, TypeId};

/// Adjustment that makes an expression fit its expected type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Adjust {
    /// Read through a reference to its pointee
    Deref { pointee: TypeId, fit: TypeCompare },
    /// Borrow a named variable under the expected permission
    Borrow { perm: TypeId },
}

fn adjustment(program: &Program, expr: ExprId, to: TypeId) -> Option<Adjust> {
    let from = program.expr(expr).vtype?;
    let matcher = TypeMatcher::new(program);

    // Deref goes from a reference to a value, borrow from a value to a reference
    if let Some(reference) = program.ref_type(from) {
        if program.ref_type(to).is_some() {
            return None;
        }
        let fit = matcher.matches(to, reference.pointee, SubtypeConstraint::Coercion);
        let readable = program.perm_flags(reference.perm).contains(PermFlags::MAY_READ);
        return (fit.is_implicit() && readable).then_some(Adjust::Deref { pointee: reference.pointee, fit });
    }

    // Only an lvalue has an address: temporaries are never borrowed
    let target = program.ref_type(to)?;
    if target.slice || !program.is_void(target.region) {
        return None;
    }
    let ExprKind::Name(NameUse { decl: Some(decl), .. }) = program.expr(expr).kind else {
        return None;
    };
    let var = program.decl(decl);
    let var_perm = var.perm.filter(|_| var.is_var())?;

    let fits = matcher.matches(target.pointee, from, SubtypeConstraint::Coercion).is_implicit();
    let permitted = matcher.perm_matches(target.perm, var_perm) != TypeCompare::NoMatch;
    (fits && permitted).then_some(Adjust::Borrow { perm: target.perm })
}

/// Would [`auto_ref`] make `expr` acceptable where `to` is expected?
pub fn auto_ref_check(program: &Program, expr: ExprId, to: TypeId) -> bool {
    adjustment(program, expr, to).is_some()
}

/// Wrap `expr` in place with the implicit `*` or `&` that makes it fit `to`.
/// The wrapped node moves to a fresh slot beneath the wrapper.
pub fn auto_ref(program: &mut Program, expr: ExprId, to: TypeId) {
    let Some(adjust) = adjustment(program, expr, to) else { return };
    let Some(from) = program.expr(expr).vtype else { return };
    let span = program.expr(expr).span;
    let inner = program.relocate_expr(expr);

    let mut wrapper = match adjust {
        Adjust::Deref { pointee, fit } => {
            let mut node = Expr::new(ExprKind::Deref(inner), span);
            node.vtype = Some(pointee);
            node.coercion = Some(fit);
            node
        }
        Adjust::Borrow { perm } => {
            let region = program.builtins().void;
            let reference = program.new_ref(region, perm, from, span);
            let mut node = Expr::new(ExprKind::Addr { perm, exp: inner }, span);
            node.vtype = Some(reference);
            node
        }
    };
    if wrapper.coercion.is_none() {
        if let Some(ty) = wrapper.vtype {
            let fit = TypeMatcher::new(program).matches(to, ty, SubtypeConstraint::Coercion);
            wrapper.coercion = Some(fit);
        }
    }

    tracing::trace!(expr = expr.index(), ?adjust, "auto-ref");
    *program.expr_mut(expr) = wrapper;
}

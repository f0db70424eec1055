//! Type check pass
//!
//! Gives every expression its type, checks each use site against the type it
//! is expected to have, and records how the value was coerced. Where a value
//! does not fit, an implicit borrow or dereference is tried before an error
//! is raised.

use super::autoref::{auto_ref, auto_ref_check};
use super::{Pass, PassState, SubtypeConstraint, TypeCompare, TypeMatcher};
use crate::common::{ErrorKind, ErrorSink, Span};
use crate::ir::{
    DeclId, DeclKind, ExprId, ExprKind, Intrinsic, PermFlags, PermKind, PrimType, Program, TypeId,
    TypeKind,
};

/// Does every path through `expr` end in a `return`?
fn always_returns(program: &Program, expr: ExprId) -> bool {
    match &program.expr(expr).kind {
        ExprKind::Return(_) => true,
        ExprKind::ExprStmt(inner) => always_returns(program, *inner),
        ExprKind::Block(stmts) => stmts.last().is_some_and(|&last| always_returns(program, last)),
        ExprKind::If { then, otherwise: Some(otherwise), .. } => {
            always_returns(program, *then) && always_returns(program, *otherwise)
        }
        _ => false,
    }
}

/// Rewrite a function body so that it ends in an explicit return.
///
/// A function without a return type gets a bare `return` appended unless it
/// already ends in one. Otherwise a trailing expression statement becomes the
/// returned value, unless every branch of it returns already.
pub fn implicit_return(program: &mut Program, body: ExprId, ret: TypeId) {
    let ExprKind::Block(stmts) = &program.expr(body).kind else { return };
    let last = stmts.last().copied();

    if program.is_void(ret) {
        if last.is_some_and(|last| always_returns(program, last)) {
            return;
        }
        let end = program.expr(body).span.end;
        let ret = program.add_expr(ExprKind::Return(None), Span::new(end, end));
        if let ExprKind::Block(stmts) = &mut program.expr_mut(body).kind {
            stmts.push(ret);
        }
    } else if let Some(last) = last {
        if always_returns(program, last) {
            return;
        }
        if let ExprKind::ExprStmt(value) = program.expr(last).kind {
            program.expr_mut(last).kind = ExprKind::Return(Some(value));
        }
    }
}

pub struct TypeChecker<'a> {
    program: &'a mut Program,
    sink: &'a mut dyn ErrorSink,
    state: PassState,
}

impl<'a> TypeChecker<'a> {
    pub fn new(program: &'a mut Program, sink: &'a mut dyn ErrorSink) -> Self {
        Self {
            program,
            sink,
            state: PassState::new(Pass::TypeCheck),
        }
    }

    pub fn run(&mut self) {
        for item in self.program.items.clone() {
            self.check_item(item);
        }
    }

    fn check_item(&mut self, item: DeclId) {
        let decl = self.program.decl(item);
        let (kind, vtype, value, span) = (decl.kind, decl.vtype, decl.value, decl.span);

        match kind {
            DeclKind::Type => self.check_struct(vtype),
            DeclKind::Var => {
                self.check_slices(vtype);
                if let Some(value) = value {
                    self.check_expr(value, Some(vtype));
                    self.coerce(value, vtype);
                }
            }
            DeclKind::Fn => {
                let TypeKind::FnSig(sig) = self.program.ty(vtype).kind.clone() else {
                    self.sink.error(span, ErrorKind::BadTerm, "function without a signature".to_string());
                    return;
                };
                for param in &sig.params {
                    self.check_slices(self.program.decl(*param).vtype);
                }
                self.check_slices(sig.ret);

                let Some(body) = value else { return };
                implicit_return(self.program, body, sig.ret);
                self.state.enter_fn(sig.ret);
                self.check_expr(body, None);
            }
            DeclKind::Region | DeclKind::Perm | DeclKind::Intrinsic(_) => {}
        }
    }

    fn check_struct(&mut self, ty: TypeId) {
        let TypeKind::Struct(st) = self.program.ty(ty).kind.clone() else { return };
        if let Some(base) = st.base {
            if !self.program.is_unknown(base) && !matches!(self.program.kind_of(base), TypeKind::Struct(_)) {
                let message = format!("base of `{}` is not a struct", self.program.name(st.name));
                self.error(self.program.ty(base).span, ErrorKind::BadType, message);
            }
        }
        for (_, field) in st.fields {
            self.check_slices(field);
        }
    }

    /// Slices may only be declared with permissions that rule out a racing writer
    fn check_slices(&mut self, ty: TypeId) {
        let mut unsafe_slice = false;
        let children = match &self.program.ty(ty).kind {
            TypeKind::Ref(r) => {
                if r.slice {
                    let flags = self.program.perm_flags(r.perm);
                    unsafe_slice = ![PermKind::Imm, PermKind::Uni, PermKind::Const]
                        .iter()
                        .any(|p| p.flags() == flags);
                }
                vec![r.pointee]
            }
            TypeKind::Array { elem, .. } => vec![*elem],
            TypeKind::Ptr { pointee } => vec![*pointee],
            TypeKind::Tuple(types) => types.clone(),
            _ => Vec::new(),
        };
        if unsafe_slice {
            let span = self.program.ty(ty).span;
            self.error(span, ErrorKind::BadSlice, "Unsafe permission for slice".to_string());
        }
        for child in children {
            self.check_slices(child);
        }
    }

    fn error(&mut self, span: Span, kind: ErrorKind, message: String) {
        self.sink.error(span, kind, message);
    }

    fn prim(&self, prim: PrimType) -> TypeId {
        self.program.builtins().prim(prim)
    }

    fn display(&self, ty: TypeId) -> String {
        self.program.display_type(ty)
    }

    /// Type an expression. `expected` only guides literals; fitting the
    /// result to a use site is left to [`Self::coerce`]. `None` means the
    /// type is unknown and dependent checks are skipped.
    fn check_expr(&mut self, id: ExprId, expected: Option<TypeId>) -> Option<TypeId> {
        let ty = self.infer_expr(id, expected).map(|t| self.program.type_decl(t));
        self.program.expr_mut(id).vtype = ty;
        ty
    }

    fn infer_expr(&mut self, id: ExprId, expected: Option<TypeId>) -> Option<TypeId> {
        let span = self.program.expr(id).span;
        let void = self.program.builtins().void;

        match self.program.expr(id).kind.clone() {
            ExprKind::ULit(_) => Some(
                expected
                    .filter(|&t| self.program.prim_type(t).is_some_and(PrimType::is_numeric))
                    .unwrap_or_else(|| self.prim(PrimType::I32)),
            ),
            ExprKind::FLit(_) => Some(
                expected
                    .filter(|&t| self.program.prim_type(t).is_some_and(PrimType::is_float))
                    .unwrap_or_else(|| self.prim(PrimType::F64)),
            ),
            ExprKind::BoolLit(_) => Some(self.prim(PrimType::Bool)),
            ExprKind::Name(name) => {
                let decl = self.program.decl(name.decl?);
                match decl.kind {
                    DeclKind::Var => Some(decl.vtype).filter(|&t| !self.program.is_unknown(t)),
                    DeclKind::Fn => Some(decl.vtype),
                    _ => {
                        let message = format!("`{}` is not a value", self.program.name(name.name));
                        self.error(span, ErrorKind::BadType, message);
                        None
                    }
                }
            }
            ExprKind::Call { callee, args } => self.check_call(id, callee, &args, expected),
            ExprKind::Assign { target, value } => {
                self.check_assign(target, value);
                Some(void)
            }
            ExprKind::Addr { perm, exp } => self.check_borrow(id, perm, exp),
            ExprKind::Deref(exp) => {
                let ty = self.check_expr(exp, None)?;
                match self.program.ref_type(ty) {
                    Some(r) if self.program.perm_flags(r.perm).contains(PermFlags::MAY_READ) => Some(r.pointee),
                    _ => {
                        let message = format!("cannot read through `{}`", self.display(ty));
                        self.error(span, ErrorKind::BadDeref, message);
                        None
                    }
                }
            }
            ExprKind::Cast { exp, to } => {
                self.check_slices(to);
                let from = self.check_expr(exp, None)?;
                let numeric = |t| self.program.prim_type(t).is_some_and(PrimType::is_numeric);
                let fit = if numeric(from) && numeric(to) && self.program.prim_type(from) != self.program.prim_type(to) {
                    TypeCompare::ConvSubtype
                } else {
                    TypeMatcher::new(self.program).matches(to, from, SubtypeConstraint::Coercion)
                };
                if fit == TypeCompare::NoMatch {
                    let message = format!("cannot convert `{}` to `{}`", self.display(from), self.display(to));
                    self.error(span, ErrorKind::NoMatch, message);
                    return None;
                }
                self.program.expr_mut(id).coercion = Some(fit);
                Some(to)
            }
            ExprKind::Not(exp) => {
                self.check_cond(exp);
                Some(self.prim(PrimType::Bool))
            }
            ExprKind::And(a, b) | ExprKind::Or(a, b) => {
                self.check_cond(a);
                self.check_cond(b);
                Some(self.prim(PrimType::Bool))
            }
            ExprKind::Array(items) => {
                let elem_hint = expected.and_then(|t| match self.program.kind_of(t) {
                    TypeKind::Array { elem, .. } => Some(*elem),
                    _ => None,
                });
                let (&first, rest) = items.split_first()?;
                let elem = self.check_expr(first, elem_hint);
                for &item in rest {
                    self.check_expr(item, elem.or(elem_hint));
                    if let Some(elem) = elem {
                        self.coerce(item, elem);
                    }
                }
                let elem = elem?;
                Some(self.program.add_type(TypeKind::Array { elem, len: items.len() as u64 }, span))
            }
            ExprKind::Block(stmts) => {
                let mut value = Some(void);
                for stmt in stmts {
                    let ty = self.check_expr(stmt, None);
                    value = match self.program.expr(stmt).kind {
                        ExprKind::ExprStmt(_) => ty,
                        _ => Some(void),
                    };
                }
                value
            }
            ExprKind::If { cond, then, otherwise } => {
                self.check_cond(cond);
                let then_ty = self.check_expr(then, expected);
                let Some(otherwise) = otherwise else { return Some(void) };
                let else_ty = self.check_expr(otherwise, expected);
                match (then_ty, else_ty) {
                    (Some(a), Some(b)) if TypeMatcher::new(self.program).is_same(a, b) => Some(a),
                    (None, _) | (_, None) => None,
                    _ => Some(void),
                }
            }
            ExprKind::Loop { cond, body } => {
                if let Some(cond) = cond {
                    self.check_cond(cond);
                }
                self.state.loop_depth += 1;
                self.check_expr(body, None);
                self.state.loop_depth -= 1;
                Some(void)
            }
            ExprKind::Break | ExprKind::Continue => Some(void),
            ExprKind::Return(value) => {
                self.check_return(span, value);
                Some(void)
            }
            ExprKind::ExprStmt(exp) => self.check_expr(exp, None),
            ExprKind::VarDcl(decl) => {
                self.check_local(decl);
                Some(void)
            }
        }
    }

    fn check_call(&mut self, id: ExprId, callee: ExprId, args: &[ExprId], expected: Option<TypeId>) -> Option<TypeId> {
        if let ExprKind::Name(name) = self.program.expr(callee).kind {
            if let Some(DeclKind::Intrinsic(op)) = name.decl.map(|d| self.program.decl(d).kind) {
                return self.check_intrinsic(id, op, args, expected);
            }
        }

        let span = self.program.expr(id).span;
        let callee_ty = self.check_expr(callee, None)?;
        let TypeKind::FnSig(sig) = self.program.kind_of(callee_ty).clone() else {
            let message = format!("`{}` is not a function", self.display(callee_ty));
            self.error(span, ErrorKind::NotCallable, message);
            return None;
        };

        if args.len() != sig.params.len() {
            let message = format!("expected {} arguments, found {}", sig.params.len(), args.len());
            self.error(span, ErrorKind::ArgCount, message);
        }
        for (i, &arg) in args.iter().enumerate() {
            let Some(&param) = sig.params.get(i) else {
                self.check_expr(arg, None);
                continue;
            };
            let param_ty = self.program.decl(param).vtype;
            self.check_expr(arg, Some(param_ty));
            self.coerce(arg, param_ty);
        }
        Some(sig.ret)
    }

    /// Builtin operators work on numbers; a literal operand takes its type
    /// from the other operand, whichever side it is on.
    fn check_intrinsic(&mut self, id: ExprId, op: Intrinsic, args: &[ExprId], expected: Option<TypeId>) -> Option<TypeId> {
        let span = self.program.expr(id).span;
        if args.len() != op.arity() {
            let message = format!("operator `{}` takes {} operands, found {}", op.symbol(), op.arity(), args.len());
            self.error(span, ErrorKind::ArgCount, message);
            for &arg in args {
                self.check_expr(arg, None);
            }
            return None;
        }

        let is_literal = |e: ExprId| {
            matches!(self.program.expr(e).kind, ExprKind::ULit(_) | ExprKind::FLit(_) | ExprKind::BoolLit(_))
        };
        let mut order = args.to_vec();
        if order.len() == 2 && is_literal(order[0]) && !is_literal(order[1]) {
            order.swap(0, 1);
        }

        let hint = if op.is_comparison() { None } else { expected };
        let lead = self.check_expr(order[0], hint);
        for &rest in &order[1..] {
            self.check_expr(rest, lead.or(hint));
        }
        let operand = lead?;

        let prim = self.program.prim_type(operand);
        let accepted = match prim {
            Some(PrimType::Bool) => matches!(op, Intrinsic::Eq | Intrinsic::Ne),
            Some(p) if op.is_bitwise() => p.is_int(),
            Some(_) => true,
            None => false,
        };
        if !accepted {
            let what = if op.is_bitwise() { "integer" } else { "numeric" };
            let message = format!(
                "operator `{}` expects {} operands, found `{}`",
                op.symbol(),
                what,
                self.display(operand)
            );
            self.error(span, ErrorKind::NoMatch, message);
            return None;
        }

        for &rest in &order[1..] {
            self.coerce(rest, operand);
        }
        if op.is_comparison() {
            Some(self.prim(PrimType::Bool))
        } else {
            Some(operand)
        }
    }

    fn check_assign(&mut self, target: ExprId, value: ExprId) {
        let span = self.program.expr(target).span;
        let target_ty = self.check_expr(target, None);
        if !self.is_writable(target) {
            self.error(span, ErrorKind::NotWritable, "cannot assign through this place".to_string());
        }

        let value_ty = self.check_expr(value, target_ty);
        match target_ty {
            Some(target_ty) => self.coerce(value, target_ty),
            None => {
                // first assignment of a `let` without type or initializer
                let infer = self.program.builtins().infer;
                if let ExprKind::Name(name) = self.program.expr(target).kind {
                    if let (Some(decl), Some(value_ty)) = (name.decl, value_ty) {
                        let var = self.program.decl_mut(decl);
                        if var.is_var() && var.vtype == infer {
                            var.vtype = value_ty;
                            self.program.expr_mut(target).vtype = Some(value_ty);
                        }
                    }
                }
            }
        }
    }

    fn is_writable(&self, target: ExprId) -> bool {
        match self.program.expr(target).kind {
            ExprKind::Name(name) => name.decl.is_some_and(|d| {
                let var = self.program.decl(d);
                var.is_var() && var.perm.is_some_and(|p| self.program.perm_flags(p).contains(PermFlags::MAY_WRITE))
            }),
            ExprKind::Deref(exp) => self
                .program
                .expr(exp)
                .vtype
                .and_then(|t| self.program.ref_type(t))
                .is_some_and(|r| self.program.perm_flags(r.perm).contains(PermFlags::MAY_WRITE)),
            _ => false,
        }
    }

    fn check_borrow(&mut self, id: ExprId, perm: TypeId, exp: ExprId) -> Option<TypeId> {
        let span = self.program.expr(id).span;
        let var = match self.program.expr(exp).kind {
            ExprKind::Name(name) => name.decl.filter(|&d| self.program.decl(d).is_var()),
            _ => None,
        };
        let Some(var) = var else {
            self.check_expr(exp, None);
            self.error(span, ErrorKind::NotAddressable, "only a named variable can be borrowed".to_string());
            return None;
        };

        let pointee = self.check_expr(exp, None)?;
        let var_perm = self.program.decl(var).perm?;
        if TypeMatcher::new(self.program).perm_matches(perm, var_perm) == TypeCompare::NoMatch {
            let message = format!(
                "cannot borrow a `{}` variable as `{}`",
                self.display(var_perm),
                self.display(perm)
            );
            self.error(span, ErrorKind::NoMatch, message);
            return None;
        }

        let region = self.program.builtins().void;
        Some(self.program.new_ref(region, perm, pointee, span))
    }

    fn check_cond(&mut self, cond: ExprId) {
        let bool_ty = self.prim(PrimType::Bool);
        let Some(ty) = self.check_expr(cond, Some(bool_ty)) else { return };
        if self.program.is_unknown(ty) {
            return;
        }
        let fit = TypeMatcher::new(self.program).matches(bool_ty, ty, SubtypeConstraint::Coercion);
        if !fit.is_implicit() {
            let span = self.program.expr(cond).span;
            let message = format!("expected `bool`, found `{}`", self.display(ty));
            self.error(span, ErrorKind::NotBool, message);
        }
    }

    fn check_return(&mut self, span: Span, value: Option<ExprId>) {
        let Some(ret) = self.state.fn_ret else { return };
        match (self.program.is_void(ret), value) {
            (true, None) => {}
            (true, Some(value)) => {
                self.check_expr(value, None);
                self.error(span, ErrorKind::BadReturn, "function does not return a value".to_string());
            }
            (false, None) => {
                let message = format!("missing return value of type `{}`", self.display(ret));
                self.error(span, ErrorKind::BadReturn, message);
            }
            (false, Some(value)) => {
                self.check_expr(value, Some(ret));
                self.coerce(value, ret);
            }
        }
    }

    fn check_local(&mut self, decl: DeclId) {
        let local = self.program.decl(decl);
        let (vtype, value) = (local.vtype, local.value);
        self.check_slices(vtype);
        let Some(value) = value else { return };

        if vtype == self.program.builtins().infer {
            if let Some(ty) = self.check_expr(value, None) {
                self.program.decl_mut(decl).vtype = ty;
            }
        } else {
            self.check_expr(value, Some(vtype));
            self.coerce(value, vtype);
        }
    }

    /// Fit an already typed expression to the type its use site expects and
    /// record the classification on it. A failed fit stays unannotated.
    fn coerce(&mut self, expr: ExprId, to: TypeId) {
        let Some(from) = self.program.expr(expr).vtype else { return };
        if self.program.is_unknown(from) || self.program.is_unknown(to) {
            return;
        }

        let fit = TypeMatcher::new(self.program).matches(to, from, SubtypeConstraint::Coercion);
        let span = self.program.expr(expr).span;
        match fit {
            TypeCompare::EqMatch | TypeCompare::CastSubtype => self.program.expr_mut(expr).coercion = Some(fit),
            TypeCompare::ConvSubtype => {
                self.program.expr_mut(expr).coercion = Some(fit);
                let message = format!(
                    "converting `{}` to `{}` requires an explicit `as`",
                    self.display(from),
                    self.display(to)
                );
                self.error(span, ErrorKind::UnsafeConversion, message);
            }
            TypeCompare::NoMatch => {
                if auto_ref_check(self.program, expr, to) {
                    auto_ref(self.program, expr, to);
                } else {
                    let message = format!("expected `{}`, found `{}`", self.display(to), self.display(from));
                    self.error(span, ErrorKind::NoMatch, message);
                }
            }
        }
    }
}

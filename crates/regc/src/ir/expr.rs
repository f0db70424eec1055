//! Expression and statement nodes

use super::{DeclId, ExprId, NameUse, TypeId};
use crate::common::Span;
use crate::sema::TypeCompare;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    ULit(u64),
    FLit(f64),
    BoolLit(bool),
    Name(NameUse),
    /// Function call; operators arrive here as calls on operator symbols
    Call { callee: ExprId, args: Vec<ExprId> },
    Assign { target: ExprId, value: ExprId },
    /// Borrow `&perm exp`
    Addr { perm: TypeId, exp: ExprId },
    Deref(ExprId),
    /// Explicit `exp as T`
    Cast { exp: ExprId, to: TypeId },
    Not(ExprId),
    And(ExprId, ExprId),
    Or(ExprId, ExprId),
    Array(Vec<ExprId>),
    Block(Vec<ExprId>),
    If { cond: ExprId, then: ExprId, otherwise: Option<ExprId> },
    /// `while cond body`, or `loop body` without a condition
    Loop { cond: Option<ExprId>, body: ExprId },
    Break,
    Continue,
    Return(Option<ExprId>),
    /// Expression evaluated for its effect
    ExprStmt(ExprId),
    /// Local `let` binding
    VarDcl(DeclId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    /// Checked type, set by the type check pass
    pub vtype: Option<TypeId>,
    /// Classification of the implicit or explicit conversion applied at this use site
    pub coercion: Option<TypeCompare>,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            vtype: None,
            coercion: None,
            span,
        }
    }

    /// Direct children in evaluation order
    pub fn children(&self) -> Vec<ExprId> {
        match &self.kind {
            ExprKind::ULit(_)
            | ExprKind::FLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::Name(_)
            | ExprKind::Break
            | ExprKind::Continue
            | ExprKind::VarDcl(_)
            | ExprKind::Return(None) => Vec::new(),
            ExprKind::Call { callee, args } => {
                let mut out = vec![*callee];
                out.extend(args.iter().copied());
                out
            }
            ExprKind::Assign { target, value } => vec![*value, *target],
            ExprKind::Addr { exp, .. }
            | ExprKind::Deref(exp)
            | ExprKind::Cast { exp, .. }
            | ExprKind::Not(exp)
            | ExprKind::ExprStmt(exp)
            | ExprKind::Return(Some(exp)) => vec![*exp],
            ExprKind::And(a, b) | ExprKind::Or(a, b) => vec![*a, *b],
            ExprKind::Array(items) | ExprKind::Block(items) => items.clone(),
            ExprKind::If { cond, then, otherwise } => {
                let mut out = vec![*cond, *then];
                out.extend(*otherwise);
                out
            }
            ExprKind::Loop { cond, body } => {
                let mut out: Vec<ExprId> = cond.iter().copied().collect();
                out.push(*body);
                out
            }
        }
    }
}

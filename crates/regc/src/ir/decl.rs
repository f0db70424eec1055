//! Declarations and name uses

use super::{DeclId, ExprId, Intrinsic, Symbol, TypeId};
use crate::common::Span;

/// Use of an identifier; `decl` is filled in by name resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameUse {
    pub name: Symbol,
    pub decl: Option<DeclId>,
}

impl NameUse {
    pub fn new(name: Symbol) -> Self {
        Self { name, decl: None }
    }

    pub fn resolved(name: Symbol, decl: DeclId) -> Self {
        Self { name, decl: Some(decl) }
    }

    pub fn is_resolved(&self) -> bool {
        self.decl.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// Global, local, or parameter
    Var,
    Fn,
    /// Named type (struct or primitive)
    Type,
    Perm,
    Region,
    /// Builtin operator bound to an operator symbol
    Intrinsic(Intrinsic),
}

impl DeclKind {
    /// Declarations whose `vtype` is the type they name rather than the type of a value
    pub fn declares_type(self) -> bool {
        matches!(self, DeclKind::Type | DeclKind::Perm | DeclKind::Region)
    }
}

/// A named declaration
#[derive(Debug, Clone, PartialEq)]
pub struct NameDcl {
    pub name: Symbol,
    pub kind: DeclKind,
    /// Value type, or for type-like declarations the declared type itself
    pub vtype: TypeId,
    /// Permission of a variable
    pub perm: Option<TypeId>,
    /// Initializer of a variable or body of a function
    pub value: Option<ExprId>,
    /// Scope depth, 0 at global scope
    pub scope: u16,
    /// Slot within the enclosing function's locals
    pub index: u16,
    /// Declaration this one shadows
    pub prev: Option<DeclId>,
    pub span: Span,
}

impl NameDcl {
    pub fn new(name: Symbol, kind: DeclKind, vtype: TypeId, span: Span) -> Self {
        Self {
            name,
            kind,
            vtype,
            perm: None,
            value: None,
            scope: 0,
            index: 0,
            prev: None,
            span,
        }
    }

    pub fn var(name: Symbol, vtype: TypeId, perm: TypeId, value: Option<ExprId>, span: Span) -> Self {
        Self {
            perm: Some(perm),
            value,
            ..Self::new(name, DeclKind::Var, vtype, span)
        }
    }

    pub fn function(name: Symbol, sig: TypeId, body: Option<ExprId>, span: Span) -> Self {
        Self {
            value: body,
            ..Self::new(name, DeclKind::Fn, sig, span)
        }
    }

    pub fn is_var(&self) -> bool {
        self.kind == DeclKind::Var
    }

    pub fn is_fn(&self) -> bool {
        self.kind == DeclKind::Fn
    }

    /// Supplies an initializer or a body
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

//! Builtin declarations present in every program

use super::{DeclId, DeclKind, NameDcl, PermFlags, PrimType, Program, TypeId, TypeKind};
use crate::common::Span;

/// Builtin permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermKind {
    Uni,
    Mut,
    Imm,
    Const,
    Out,
    Opaq,
}

impl PermKind {
    pub const ALL: [PermKind; 6] = [
        PermKind::Uni,
        PermKind::Mut,
        PermKind::Imm,
        PermKind::Const,
        PermKind::Out,
        PermKind::Opaq,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PermKind::Uni => "uni",
            PermKind::Mut => "mut",
            PermKind::Imm => "imm",
            PermKind::Const => "const",
            PermKind::Out => "out",
            PermKind::Opaq => "opaq",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn flags(self) -> PermFlags {
        match self {
            PermKind::Uni => PermFlags::MAY_READ | PermFlags::MAY_WRITE | PermFlags::RACE_SAFE,
            PermKind::Mut => PermFlags::MAY_READ | PermFlags::MAY_WRITE | PermFlags::MAY_ALIAS,
            PermKind::Imm => PermFlags::MAY_READ | PermFlags::MAY_ALIAS | PermFlags::RACE_SAFE,
            PermKind::Const => PermFlags::MAY_READ | PermFlags::MAY_ALIAS,
            PermKind::Out => PermFlags::MAY_WRITE,
            PermKind::Opaq => PermFlags::MAY_ALIAS,
        }
    }
}

/// Builtin operators, bound to the symbols the parser lowers operators to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Neg,
    BitNot,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Intrinsic {
    pub const ALL: [Intrinsic; 16] = [
        Intrinsic::Add,
        Intrinsic::Sub,
        Intrinsic::Mul,
        Intrinsic::Div,
        Intrinsic::Rem,
        Intrinsic::BitAnd,
        Intrinsic::BitOr,
        Intrinsic::BitXor,
        Intrinsic::Neg,
        Intrinsic::BitNot,
        Intrinsic::Eq,
        Intrinsic::Ne,
        Intrinsic::Lt,
        Intrinsic::Le,
        Intrinsic::Gt,
        Intrinsic::Ge,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Intrinsic::Add => "+",
            Intrinsic::Sub => "-",
            Intrinsic::Mul => "*",
            Intrinsic::Div => "/",
            Intrinsic::Rem => "%",
            Intrinsic::BitAnd => "&",
            Intrinsic::BitOr => "|",
            Intrinsic::BitXor => "^",
            Intrinsic::Neg => "neg",
            Intrinsic::BitNot => "~",
            Intrinsic::Eq => "==",
            Intrinsic::Ne => "!=",
            Intrinsic::Lt => "<",
            Intrinsic::Le => "<=",
            Intrinsic::Gt => ">",
            Intrinsic::Ge => ">=",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Intrinsic::Neg | Intrinsic::BitNot => 1,
            _ => 2,
        }
    }

    /// Yields `bool` rather than the operand type
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Intrinsic::Eq | Intrinsic::Ne | Intrinsic::Lt | Intrinsic::Le | Intrinsic::Gt | Intrinsic::Ge
        )
    }

    /// Only defined on integers
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            Intrinsic::BitAnd | Intrinsic::BitOr | Intrinsic::BitXor | Intrinsic::BitNot | Intrinsic::Rem
        )
    }
}

/// Ids of the builtin nodes of one program
#[derive(Debug, Clone, Default)]
pub struct Builtins {
    /// No-value type, also the wildcard region
    pub void: TypeId,
    pub infer: TypeId,
    prims: Vec<(PrimType, TypeId, DeclId)>,
    perms: Vec<(PermKind, TypeId)>,
    decls: Vec<DeclId>,
}

impl Builtins {
    pub(super) fn install(program: &mut Program) -> Self {
        let span = Span::default();
        let mut builtins = Builtins {
            void: program.add_type(TypeKind::Void, span),
            infer: program.add_type(TypeKind::Infer, span),
            ..Builtins::default()
        };

        for prim in PrimType::ALL {
            let ty = program.add_type(TypeKind::Prim(prim), span);
            let name = program.intern(prim.name());
            let decl = program.add_decl(NameDcl::new(name, DeclKind::Type, ty, span));
            builtins.prims.push((prim, ty, decl));
            builtins.decls.push(decl);
        }

        for perm in PermKind::ALL {
            let ty = program.add_type(TypeKind::Perm(perm.flags()), span);
            let name = program.intern(perm.name());
            let decl = program.add_decl(NameDcl::new(name, DeclKind::Perm, ty, span));
            builtins.perms.push((perm, ty));
            builtins.decls.push(decl);
        }

        for op in Intrinsic::ALL {
            let name = program.intern(op.symbol());
            let decl =
                program.add_decl(NameDcl::new(name, DeclKind::Intrinsic(op), builtins.void, span));
            builtins.decls.push(decl);
        }

        builtins
    }

    pub fn prim(&self, prim: PrimType) -> TypeId {
        self.prims
            .iter()
            .find(|(p, _, _)| *p == prim)
            .map_or(self.void, |(_, ty, _)| *ty)
    }

    pub fn perm(&self, perm: PermKind) -> TypeId {
        self.perms
            .iter()
            .find(|(p, _)| *p == perm)
            .map_or(self.void, |(_, ty)| *ty)
    }

    /// Which builtin permission a permission type is, if any
    pub fn perm_kind(&self, ty: TypeId) -> Option<PermKind> {
        self.perms.iter().find(|(_, t)| *t == ty).map(|(p, _)| *p)
    }

    /// Declaration of `usize`, the length half of a slice
    pub fn usize_decl(&self) -> DeclId {
        self.prims
            .iter()
            .find(|(p, _, _)| *p == PrimType::Usize)
            .map(|(_, _, decl)| *decl)
            .unwrap_or_default()
    }

    /// Every builtin declaration, bound at global scope before user items
    pub fn decls(&self) -> &[DeclId] {
        &self.decls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_named() {
        let program = Program::new();
        for prim in PrimType::ALL {
            let ty = program.builtins().prim(prim);
            assert_eq!(program.prim_type(ty), Some(prim));
        }
        assert!(program.symbol("+").is_some());
        assert!(program.symbol("neg").is_some());
        assert_eq!(program.builtins().decls().len(), 12 + 6 + 16);
    }

    #[test]
    fn test_usize_decl_names_usize() {
        let program = Program::new();
        let decl = program.decl(program.builtins().usize_decl());
        assert_eq!(program.name(decl.name), "usize");
        assert_eq!(decl.kind, DeclKind::Type);
    }

    #[test]
    fn test_perm_flags() {
        let program = Program::new();
        let out = program.builtins().perm(PermKind::Out);
        assert_eq!(program.perm_flags(out), PermFlags::MAY_WRITE);
        assert_eq!(program.builtins().perm_kind(out), Some(PermKind::Out));
        assert_eq!(PermKind::from_name("mut"), Some(PermKind::Mut));
    }
}

//! Arena-based intermediate representation
//!
//! The parser builds a [`Program`] and every analyzer pass walks and rewrites
//! it in place. Nodes live in one of three arenas (types, declarations,
//! expressions) and are addressed by copyable ids, so replacing a child node
//! is an update of the child's slot: parents keep valid ids across rewrites.

mod builtins;
mod decl;
mod expr;
mod types;

pub use builtins::{Builtins, Intrinsic, PermKind};
pub use decl::{DeclKind, NameDcl, NameUse};
pub use expr::{Expr, ExprKind};
pub use types::{FnSig, PermFlags, PrimType, RefType, StructType, TypeKind, TypeNode};

use string_interner::{DefaultStringInterner, DefaultSymbol};

use crate::common::Span;

/// Interned identifier
pub type Symbol = DefaultSymbol;

/// Index of a type node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TypeId(u32);

/// Index of a declaration node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DeclId(u32);

/// Index of an expression or statement node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ExprId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One compilation unit: arenas, interned names and top-level items
#[derive(Debug)]
pub struct Program {
    names: DefaultStringInterner,
    types: Vec<TypeNode>,
    decls: Vec<NameDcl>,
    exprs: Vec<Expr>,
    /// Top-level declarations in source order
    pub items: Vec<DeclId>,
    builtins: Builtins,
}

impl Program {
    /// Create an empty program with the builtin declarations installed
    pub fn new() -> Self {
        let mut program = Self {
            names: DefaultStringInterner::default(),
            types: Vec::new(),
            decls: Vec::new(),
            exprs: Vec::new(),
            items: Vec::new(),
            builtins: Builtins::default(),
        };
        program.builtins = Builtins::install(&mut program);
        program
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.names.get_or_intern(name)
    }

    /// Symbol of an already interned name
    pub fn symbol(&self, name: &str) -> Option<Symbol> {
        self.names.get(name)
    }

    pub fn name(&self, symbol: Symbol) -> &str {
        self.names.resolve(symbol).unwrap_or("<unknown>")
    }

    pub fn add_type(&mut self, kind: TypeKind, span: Span) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeNode { kind, span });
        id
    }

    pub fn ty(&self, id: TypeId) -> &TypeNode {
        &self.types[id.index()]
    }

    pub fn ty_mut(&mut self, id: TypeId) -> &mut TypeNode {
        &mut self.types[id.index()]
    }

    pub fn add_decl(&mut self, decl: NameDcl) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    pub fn decl(&self, id: DeclId) -> &NameDcl {
        &self.decls[id.index()]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut NameDcl {
        &mut self.decls[id.index()]
    }

    pub fn add_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr::new(kind, span));
        id
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }

    /// Move the node in `id` to a fresh slot and return the fresh id.
    /// The old slot is left for the caller to overwrite with a wrapper.
    pub fn relocate_expr(&mut self, id: ExprId) -> ExprId {
        let node = self.expr(id).clone();
        let fresh = ExprId(self.exprs.len() as u32);
        self.exprs.push(node);
        fresh
    }

    /// First top-level declaration with this name
    pub fn item_named(&self, name: &str) -> Option<DeclId> {
        let symbol = self.symbol(name)?;
        self.items.iter().copied().find(|&id| self.decl(id).name == symbol)
    }

    /// Every top-level declaration with this name, in source order
    pub fn items_named(&self, name: &str) -> Vec<DeclId> {
        match self.symbol(name) {
            Some(symbol) => self
                .items
                .iter()
                .copied()
                .filter(|&id| self.decl(id).name == symbol)
                .collect(),
            None => Vec::new(),
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

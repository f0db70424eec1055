//! Name resolution pass
//!
//! Binds every name use inside function bodies and initializers to its
//! declaration, hooking locals into nested scopes as it goes. Item signatures
//! are resolved earlier, by the global pass, through [`resolve_type`].

use super::SymbolTable;
use crate::common::{ErrorKind, ErrorSink};
use crate::ir::{DeclId, DeclKind, ExprId, ExprKind, Program, TypeId, TypeKind};

/// What a name in a type position has to declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Expect {
    Type,
    Perm,
    Region,
}

impl Expect {
    fn accepts(self, kind: DeclKind) -> bool {
        matches!(
            (self, kind),
            (Expect::Type, DeclKind::Type) | (Expect::Perm, DeclKind::Perm) | (Expect::Region, DeclKind::Region)
        )
    }

    fn noun(self) -> &'static str {
        match self {
            Expect::Type => "type",
            Expect::Perm => "permission",
            Expect::Region => "region",
        }
    }
}

/// Resolve every name in a type tree
pub(super) fn resolve_type(
    program: &mut Program,
    table: &SymbolTable,
    sink: &mut dyn ErrorSink,
    ty: TypeId,
    expect: Expect,
) {
    let children: Vec<(TypeId, Expect)> = match &program.ty(ty).kind {
        TypeKind::Void
        | TypeKind::Infer
        | TypeKind::Prim(_)
        | TypeKind::Perm(_)
        | TypeKind::Region(_) => Vec::new(),
        TypeKind::Name(_) => {
            resolve_type_name(program, table, sink, ty, expect);
            Vec::new()
        }
        TypeKind::Struct(st) => st
            .base
            .iter()
            .chain(st.fields.iter().map(|(_, field)| field))
            .map(|&t| (t, Expect::Type))
            .collect(),
        TypeKind::Array { elem, .. } => vec![(*elem, Expect::Type)],
        TypeKind::Ptr { pointee } => vec![(*pointee, Expect::Type)],
        TypeKind::Tuple(types) => types.iter().map(|&t| (t, Expect::Type)).collect(),
        TypeKind::FnSig(sig) => sig
            .params
            .iter()
            .map(|&p| program.decl(p).vtype)
            .chain(std::iter::once(sig.ret))
            .map(|t| (t, Expect::Type))
            .collect(),
        TypeKind::Ref(r) => {
            let mut out = vec![(r.region, Expect::Region), (r.perm, Expect::Perm), (r.pointee, Expect::Type)];
            out.extend(r.fat_ptr.map(|t| (t, Expect::Type)));
            out
        }
    };

    for (child, expect) in children {
        resolve_type(program, table, sink, child, expect);
    }
}

fn resolve_type_name(
    program: &mut Program,
    table: &SymbolTable,
    sink: &mut dyn ErrorSink,
    ty: TypeId,
    expect: Expect,
) {
    let already = matches!(&program.ty(ty).kind, TypeKind::Name(name) if name.is_resolved());
    if !table.resolve_type(program, ty) {
        let span = program.ty(ty).span;
        let message = format!("unknown {} `{}`", expect.noun(), program.display_type(ty));
        sink.error(span, ErrorKind::UnknownName, message);
        return;
    }
    if already {
        return;
    }

    let TypeKind::Name(name) = &program.ty(ty).kind else { return };
    let Some(decl) = name.decl else { return };
    if !expect.accepts(program.decl(decl).kind) {
        let span = program.ty(ty).span;
        let message = format!("`{}` is not a {}", program.name(name.name), expect.noun());
        sink.error(span, ErrorKind::BadType, message);
    }
}

/// Walks function bodies and initializers with a scoped symbol table
pub struct Resolver<'a> {
    program: &'a mut Program,
    table: &'a mut SymbolTable,
    sink: &'a mut dyn ErrorSink,
}

impl<'a> Resolver<'a> {
    pub fn new(program: &'a mut Program, table: &'a mut SymbolTable, sink: &'a mut dyn ErrorSink) -> Self {
        Self { program, table, sink }
    }

    pub fn run(&mut self) {
        for item in self.program.items.clone() {
            let decl = self.program.decl(item);
            match decl.kind {
                DeclKind::Fn => self.resolve_fn(item),
                DeclKind::Var => {
                    if let Some(value) = decl.value {
                        self.resolve_expr(value);
                    }
                }
                _ => {}
            }
        }
    }

    fn resolve_fn(&mut self, item: DeclId) {
        let decl = self.program.decl(item);
        let Some(body) = decl.value else { return };
        let params = match &self.program.ty(decl.vtype).kind {
            TypeKind::FnSig(sig) => sig.params.clone(),
            _ => Vec::new(),
        };

        self.table.enter_fn();
        self.table.push_scope();
        for param in params {
            self.table.hook_local(self.program, param);
        }
        self.resolve_expr(body);
        self.table.pop_scope();
    }

    fn resolve_expr(&mut self, id: ExprId) {
        match self.program.expr(id).kind.clone() {
            ExprKind::Name(mut name) => {
                self.table.resolve(&mut name);
                if !name.is_resolved() {
                    let span = self.program.expr(id).span;
                    let message = format!("unknown name `{}`", self.program.name(name.name));
                    self.sink.error(span, ErrorKind::UnknownName, message);
                }
                self.program.expr_mut(id).kind = ExprKind::Name(name);
            }
            ExprKind::Block(stmts) => {
                self.table.push_scope();
                for stmt in stmts {
                    self.resolve_expr(stmt);
                }
                self.table.pop_scope();
            }
            ExprKind::VarDcl(decl) => {
                let local = self.program.decl(decl);
                let (vtype, value) = (local.vtype, local.value);
                resolve_type(self.program, self.table, self.sink, vtype, Expect::Type);
                // the initializer cannot see the name it initializes
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
                self.table.hook_local(self.program, decl);
            }
            ExprKind::Addr { perm, exp } => {
                resolve_type(self.program, self.table, self.sink, perm, Expect::Perm);
                self.resolve_expr(exp);
            }
            ExprKind::Cast { exp, to } => {
                self.resolve_expr(exp);
                resolve_type(self.program, self.table, self.sink, to, Expect::Type);
            }
            _ => {
                for child in self.program.expr(id).children() {
                    self.resolve_expr(child);
                }
            }
        }
    }
}

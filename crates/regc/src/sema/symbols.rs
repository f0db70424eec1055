//! Symbol table with scoped shadowing

use std::collections::HashMap;

use super::TypeMatcher;
use crate::common::{ErrorKind, ErrorSink};
use crate::ir::{DeclId, DeclKind, NameUse, Program, Symbol, TypeId, TypeKind};

/// Maps each name to the one declaration currently visible under it
#[derive(Debug)]
pub struct SymbolTable {
    bindings: HashMap<Symbol, DeclId>,
    /// One frame per open local scope: names hooked there and what they shadowed
    frames: Vec<Vec<(Symbol, Option<DeclId>)>>,
    /// Next local slot of the current function
    next_slot: u16,
}

impl SymbolTable {
    /// Table with the program's builtins bound at global scope
    pub fn new(program: &Program) -> Self {
        let bindings = program
            .builtins()
            .decls()
            .iter()
            .map(|&decl| (program.decl(decl).name, decl))
            .collect();

        Self {
            bindings,
            frames: Vec::new(),
            next_slot: 0,
        }
    }

    pub fn lookup(&self, name: Symbol) -> Option<DeclId> {
        self.bindings.get(&name).copied()
    }

    /// Bind a name use to the visible declaration. Already bound uses keep
    /// their binding; unknown names stay unbound for the caller to report.
    pub fn resolve(&self, name: &mut NameUse) {
        if name.decl.is_none() {
            name.decl = self.lookup(name.name);
        }
    }

    /// Resolve a type name in place. The void type is not a name and is left alone.
    /// Returns false when the name is unknown.
    pub fn resolve_type(&self, program: &mut Program, ty: TypeId) -> bool {
        if ty == program.builtins().void {
            return true;
        }
        match &mut program.ty_mut(ty).kind {
            TypeKind::Name(name) => {
                self.resolve(name);
                name.is_resolved()
            }
            _ => true,
        }
    }

    /// Current scope depth, 0 at global scope
    pub fn depth(&self) -> u16 {
        u16::try_from(self.frames.len()).unwrap_or(u16::MAX)
    }

    /// Start a function: local slots are numbered from zero again
    pub fn enter_fn(&mut self) {
        self.next_slot = 0;
    }

    pub fn push_scope(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Close the innermost scope, restoring every binding it shadowed
    pub fn pop_scope(&mut self) {
        let Some(frame) = self.frames.pop() else { return };
        for (name, prev) in frame.into_iter().rev() {
            match prev {
                Some(decl) => self.bindings.insert(name, decl),
                None => self.bindings.remove(&name),
            };
        }
    }

    /// Make a local declaration visible in the innermost scope
    pub fn hook_local(&mut self, program: &mut Program, decl: DeclId) {
        let name = program.decl(decl).name;
        let prev = self.bindings.insert(name, decl);
        let depth = self.depth();
        if let Some(frame) = self.frames.last_mut() {
            frame.push((name, prev));
        }

        let local = program.decl_mut(decl);
        local.prev = prev;
        local.scope = depth;
        local.index = self.next_slot;
        self.next_slot = self.next_slot.saturating_add(1);
    }

    /// Bind a global declaration: declare many times, define once.
    ///
    /// A redeclaration with a different type, or a second definition, is
    /// reported at the new declaration and then at the bound one, and the
    /// bound declaration is kept. A definition of a so far only declared name
    /// replaces the binding.
    pub fn register_global(&mut self, program: &Program, decl: DeclId, sink: &mut dyn ErrorSink) {
        let new = program.decl(decl);
        let Some(bound) = self.lookup(new.name) else {
            self.bindings.insert(new.name, decl);
            return;
        };
        if bound == decl {
            return;
        }
        let prior = program.decl(bound);

        if !Self::same_signature(program, decl, bound) {
            sink.error(
                new.span,
                ErrorKind::TypeMismatch,
                "Name is already defined with a different type/signature.".to_string(),
            );
            sink.error(
                prior.span,
                ErrorKind::TypeMismatch,
                "This is the conflicting definition for that name.".to_string(),
            );
        } else if new.has_value() {
            if prior.has_value() {
                sink.error(
                    new.span,
                    ErrorKind::DupImpl,
                    "Name has a duplicate implementation/value. Only one allowed.".to_string(),
                );
                sink.error(
                    prior.span,
                    ErrorKind::DupImpl,
                    "This is the other implementation/value.".to_string(),
                );
            } else {
                self.bindings.insert(new.name, decl);
            }
        }
    }

    fn same_signature(program: &Program, a: DeclId, b: DeclId) -> bool {
        let (a, b) = (program.decl(a), program.decl(b));
        let same_kind = match (a.kind, b.kind) {
            (DeclKind::Var, DeclKind::Var) | (DeclKind::Fn, DeclKind::Fn) => true,
            // Type-like declarations are nominal: two of them never agree
            _ => false,
        };
        same_kind && TypeMatcher::new(program).is_same(a.vtype, b.vtype)
    }
}

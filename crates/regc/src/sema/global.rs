//! Global name registration
//!
//! Types and regions are bound first so that signatures may mention types
//! declared further down. Variable and function signatures are then resolved
//! and their names registered, which is where redeclarations get compared.

use super::resolve::{resolve_type, Expect};
use super::SymbolTable;
use crate::common::{ErrorKind, ErrorSink};
use crate::ir::{DeclKind, Program};

pub fn run(program: &mut Program, table: &mut SymbolTable, sink: &mut dyn ErrorSink) {
    let items = program.items.clone();

    for &item in &items {
        if matches!(program.decl(item).kind, DeclKind::Type | DeclKind::Region) {
            table.register_global(program, item, sink);
        }
    }

    for &item in &items {
        let decl = program.decl(item);
        let (kind, vtype) = (decl.kind, decl.vtype);
        match kind {
            DeclKind::Type => resolve_type(program, table, sink, vtype, Expect::Type),
            DeclKind::Region => {}
            DeclKind::Var | DeclKind::Fn => {
                resolve_type(program, table, sink, vtype, Expect::Type);
                table.register_global(program, item, sink);
            }
            DeclKind::Perm | DeclKind::Intrinsic(_) => {
                let decl = program.decl(item);
                let message = format!("`{}` cannot be declared here", program.name(decl.name));
                sink.error(decl.span, ErrorKind::BadTerm, message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Diagnostics, Span};
    use crate::ir::{NameDcl, PermKind, TypeKind};
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn register(source: &str) -> (Program, SymbolTable, Diagnostics) {
        let mut program = Parser::new(source).parse_program().unwrap();
        let mut table = SymbolTable::new(&program);
        let mut sink = Diagnostics::new();
        run(&mut program, &mut table, &mut sink);
        (program, table, sink)
    }

    #[test]
    fn test_types_visible_before_declaration() {
        let (program, _, sink) = register("fn origin(): Point; struct Point { x: i32, y: i32 }");
        assert!(sink.is_empty(), "{:?}", sink.kinds());

        let origin = program.decl(program.item_named("origin").unwrap());
        let TypeKind::FnSig(sig) = &program.ty(origin.vtype).kind else {
            panic!("expected signature");
        };
        assert!(matches!(program.kind_of(sig.ret), TypeKind::Struct(_)));
    }

    #[test]
    fn test_conflicting_global_keeps_first() {
        let (program, table, sink) = register("counter: i32; counter: f64;");
        assert_eq!(sink.kinds(), vec![ErrorKind::TypeMismatch, ErrorKind::TypeMismatch]);

        let decls = program.items_named("counter");
        let symbol = program.symbol("counter").unwrap();
        assert_eq!(table.lookup(symbol), Some(decls[0]));
    }

    #[test]
    fn test_forward_declaration_then_body() {
        let (program, table, sink) = register("fn f(x: i32): i32; fn f(y: i32): i32 { y }");
        assert!(sink.is_empty(), "{:?}", sink.kinds());
        let decls = program.items_named("f");
        let symbol = program.symbol("f").unwrap();
        assert_eq!(table.lookup(symbol), Some(decls[1]));
    }

    #[test]
    fn test_duplicate_bodies() {
        let (_, _, sink) = register("fn f() {} fn f() {}");
        assert_eq!(sink.kinds(), vec![ErrorKind::DupImpl, ErrorKind::DupImpl]);
    }

    #[test]
    fn test_signature_arity_differs() {
        let (_, _, sink) = register("fn f(a: i32); fn f(a: i32, b: i32);");
        assert_eq!(sink.count(ErrorKind::TypeMismatch), 2);
    }

    #[test]
    fn test_permission_item_is_bad_term() {
        let mut program = Program::new();
        let name = program.intern("shared");
        let ty = program.builtins().perm(PermKind::Mut);
        let item = program.add_decl(NameDcl::new(name, DeclKind::Perm, ty, Span::new(3, 9)));
        program.items.push(item);

        let mut table = SymbolTable::new(&program);
        let mut sink = Diagnostics::new();
        run(&mut program, &mut table, &mut sink);
        assert_eq!(sink.kinds(), vec![ErrorKind::BadTerm]);
        assert_eq!(table.lookup(name), None);
    }
}

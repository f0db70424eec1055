//! End-to-end checks through the public pipeline

use pretty_assertions::assert_eq;
use regc::ir::{DeclKind, ExprId, ExprKind, Intrinsic, Program};
use regc::{check_source, Analysis, Config, ErrorKind, Pass};

fn analyze(source: &str) -> Analysis {
    check_source(source, &Config::default()).expect("source parses")
}

fn body(program: &Program, func: &str) -> Vec<ExprId> {
    let body = program.decl(program.item_named(func).unwrap()).value.unwrap();
    match &program.expr(body).kind {
        ExprKind::Block(stmts) => stmts.clone(),
        other => panic!("expected block, found {:?}", other),
    }
}

#[test]
fn test_add_function() {
    let analysis = analyze("fn add(a: i32, b: i32): i32 { a + b }");
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics.kinds());
    let program = &analysis.program;

    let stmts = body(program, "add");
    assert_eq!(stmts.len(), 1);
    let ExprKind::Return(Some(value)) = program.expr(stmts[0]).kind else {
        panic!("expected return, found {:?}", program.expr(stmts[0]).kind);
    };
    let ExprKind::Call { callee, args } = &program.expr(value).kind else {
        panic!("expected call");
    };

    let ExprKind::Name(op) = program.expr(*callee).kind else {
        panic!("expected operator name");
    };
    assert_eq!(program.decl(op.decl.unwrap()).kind, DeclKind::Intrinsic(Intrinsic::Add));

    for (arg, name) in args.iter().zip(["a", "b"]) {
        let ExprKind::Name(n) = program.expr(*arg).kind else {
            panic!("expected name");
        };
        let decl = program.decl(n.decl.unwrap());
        assert_eq!(program.name(decl.name), name);
        assert_eq!(decl.kind, DeclKind::Var);
        assert_eq!(decl.scope, 1);
    }
}

#[test]
fn test_conflicting_globals() {
    let analysis = analyze("counter: i32; counter: f64; fn get(): i32 { counter }");
    assert_eq!(
        analysis.diagnostics.kinds(),
        vec![ErrorKind::TypeMismatch, ErrorKind::TypeMismatch]
    );

    let program = &analysis.program;
    let first = program.items_named("counter")[0];
    let symbol = program.symbol("counter").unwrap();
    assert_eq!(analysis.symbols.lookup(symbol), Some(first));

    // later passes see the first declaration
    let stmts = body(program, "get");
    let ExprKind::Return(Some(value)) = program.expr(stmts[0]).kind else {
        panic!("expected return");
    };
    let ExprKind::Name(n) = program.expr(value).kind else {
        panic!("expected name");
    };
    assert_eq!(n.decl, Some(first));
}

#[test]
fn test_diagnostics_keep_raise_order() {
    let analysis = analyze(
        "fn f(x: i32) { if x { } missing; break; }\n\
         fn g(p: &uni i32) { h(p); h(p); }\n\
         fn h(p: &uni i32) {}",
    );
    assert_eq!(
        analysis.diagnostics.kinds(),
        vec![
            ErrorKind::UnknownName,
            ErrorKind::NotBool,
            ErrorKind::OutsideLoop,
            ErrorKind::UseAfterMove,
        ]
    );
}

#[test]
fn test_region_references() {
    let analysis = analyze(
        "region heap;\n\
         fn keep(r: &heap imm i32) {}\n\
         fn any(r: &imm i32) {}\n\
         fn f(r: &heap imm i32, s: &imm i32) { any(r); keep(s); }",
    );
    // into the wildcard region is fine, out of it is not
    assert_eq!(analysis.diagnostics.kinds(), vec![ErrorKind::NoMatch]);
}

#[test]
fn test_struct_subtyping_through_references() {
    let analysis = analyze(
        "struct Shape { id: u32 }\n\
         struct Circle: Shape { radius: f64 }\n\
         fn area(s: &imm Shape): f64;\n\
         fn scale(s: &mut Shape);\n\
         fn f(c: &imm Circle, m: &mut Circle) { area(c); scale(m); }",
    );
    // mut references are invariant in their pointee
    assert_eq!(analysis.diagnostics.kinds(), vec![ErrorKind::NoMatch]);
}

#[test]
fn test_stop_after_resolution() {
    let config = Config {
        stop_after: Some(Pass::NameResolution),
        ..Config::default()
    };
    let analysis = check_source("fn f(x: i32) { if x { } }", &config).unwrap();
    assert!(analysis.diagnostics.is_empty());
}

#[test]
fn test_syntax_error() {
    let err = check_source("fn f() { let = 1; }", &Config::default()).unwrap_err();
    assert!(err.span().is_some());
}

#[test]
fn test_references_are_not_adjusted_into_references() {
    let analysis = analyze("fn g(r: &const i32) {} fn f(p: &imm &imm i32) { g(p); }");
    assert_eq!(analysis.diagnostics.kinds(), vec![ErrorKind::NoMatch]);
    let stmts = body(&analysis.program, "f");
    let ExprKind::ExprStmt(call) = analysis.program.expr(stmts[0]).kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Call { args, .. } = &analysis.program.expr(call).kind else {
        panic!("expected call");
    };
    assert!(matches!(analysis.program.expr(args[0]).kind, ExprKind::Name(_)));

    let analysis = analyze("fn g(r: &imm &imm i32) {} fn f(p: &imm i32) { g(p); }");
    assert_eq!(analysis.diagnostics.kinds(), vec![ErrorKind::NoMatch]);
}

#[test]
fn test_trailing_if_with_returning_branches() {
    let analysis = analyze("fn f(c: bool): i32 { if c { return 1; } else { return 2; } }");
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics.kinds());
}

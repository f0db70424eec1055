//! Semantic analysis
//!
//! The analyzer runs a fixed sequence of passes over a parsed [`Program`],
//! rewriting it in place:
//!
//! 1. [`Pass::Global`] binds top-level names and compares redeclarations
//! 2. [`Pass::NameResolution`] binds every name use inside bodies
//! 3. [`Pass::TypeCheck`] types expressions, classifies coercions, inserts
//!    implicit borrows and makes function returns explicit
//! 4. [`Pass::Flow`] checks moves of unique references and loop exits
//!
//! Errors go to an [`ErrorSink`] and never stop the run.

mod autoref;
mod compat;
mod flow;
mod global;
mod pass;
mod resolve;
mod symbols;
mod typecheck;

pub use autoref::{auto_ref, auto_ref_check};
pub use compat::{SubtypeConstraint, TypeCompare, TypeMatcher, Variance};
pub use flow::{FlowChecker, FlowState};
pub use pass::{Pass, PassState};
pub use resolve::Resolver;
pub use symbols::SymbolTable;
pub use typecheck::{implicit_return, TypeChecker};

use crate::common::{ErrorKind, ErrorSink, Span};
use crate::ir::Program;

/// Forwards to another sink, counting what passes through
struct CountingSink<'a> {
    inner: &'a mut dyn ErrorSink,
    count: usize,
}

impl ErrorSink for CountingSink<'_> {
    fn error(&mut self, span: Span, kind: ErrorKind, message: String) {
        self.count += 1;
        self.inner.error(span, kind, message);
    }
}

/// Pass driver
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    stop_after: Option<Pass>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip every pass that follows `pass`
    pub fn stop_after(mut self, pass: Option<Pass>) -> Self {
        self.stop_after = pass;
        self
    }

    /// Run the passes in order and return the global symbol table
    pub fn analyze(&self, program: &mut Program, sink: &mut dyn ErrorSink) -> SymbolTable {
        let mut table = SymbolTable::new(program);
        let mut sink = CountingSink { inner: sink, count: 0 };

        for pass in Pass::ALL {
            let _span = tracing::debug_span!("pass", name = pass.name()).entered();
            let before = sink.count;
            tracing::debug!("running");

            match pass {
                Pass::Global => global::run(program, &mut table, &mut sink),
                Pass::NameResolution => Resolver::new(program, &mut table, &mut sink).run(),
                Pass::TypeCheck => TypeChecker::new(program, &mut sink).run(),
                Pass::Flow => FlowChecker::new(program, &mut sink).run(),
            }

            tracing::debug!(
                errors = sink.count - before,
                postcondition = pass.postcondition(),
                "pass finished"
            );
            if self.stop_after == Some(pass) {
                break;
            }
        }

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Diagnostics;
    use crate::ir::ExprKind;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stop_after_skips_later_passes() {
        let source = "fn f(): i32 { 1 }";
        let mut program = Parser::new(source).parse_program().unwrap();
        let mut sink = Diagnostics::new();
        Analyzer::new()
            .stop_after(Some(Pass::NameResolution))
            .analyze(&mut program, &mut sink);

        // implicit return is part of type checking
        let body = program.decl(program.item_named("f").unwrap()).value.unwrap();
        let ExprKind::Block(stmts) = &program.expr(body).kind else {
            panic!("expected block");
        };
        assert!(matches!(program.expr(stmts[0]).kind, ExprKind::ExprStmt(_)));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_counting_sink_forwards() {
        let mut inner = Diagnostics::new();
        let mut sink = CountingSink { inner: &mut inner, count: 0 };
        sink.error(Span::new(0, 1), ErrorKind::NotBool, "x".to_string());
        assert_eq!(sink.count, 1);
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn test_returned_table_sees_globals() {
        let mut program = Parser::new("limit: u32 = 10; fn f(): u32 { limit }").parse_program().unwrap();
        let mut sink = Diagnostics::new();
        let table = Analyzer::new().analyze(&mut program, &mut sink);
        assert!(sink.is_empty(), "{:?}", sink.kinds());
        let limit = program.symbol("limit").unwrap();
        assert_eq!(table.lookup(limit), program.item_named("limit"));
    }
}

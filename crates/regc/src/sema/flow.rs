//! Flow analysis
//!
//! A variable holding a `uni` reference is the only path to its object, so
//! handing it over (as an argument, an initializer, an assigned value or a
//! return value) moves it out of the variable. Any later read is an error
//! until the variable is assigned again. Also reports `break` and `continue`
//! outside of a loop.

use std::collections::HashSet;

use super::{Pass, PassState};
use crate::common::{ErrorKind, ErrorSink};
use crate::ir::{DeclId, DeclKind, ExprId, ExprKind, NameUse, Program};

/// Move state at one point of a function body
#[derive(Debug, Clone, Default)]
pub struct FlowState {
    moved: HashSet<DeclId>,
    /// Uses already reported, so a loop walked twice reports once
    reported: HashSet<ExprId>,
}

impl FlowState {
    pub fn is_moved(&self, decl: DeclId) -> bool {
        self.moved.contains(&decl)
    }
}

pub struct FlowChecker<'a> {
    program: &'a Program,
    sink: &'a mut dyn ErrorSink,
    state: PassState,
    flow: FlowState,
}

impl<'a> FlowChecker<'a> {
    pub fn new(program: &'a Program, sink: &'a mut dyn ErrorSink) -> Self {
        Self {
            program,
            sink,
            state: PassState::new(Pass::Flow),
            flow: FlowState::default(),
        }
    }

    pub fn run(&mut self) {
        let program = self.program;
        for &item in &program.items {
            let decl = program.decl(item);
            if decl.kind != DeclKind::Fn {
                continue;
            }
            let Some(body) = decl.value else { continue };

            self.state.enter_fn(program.builtins().void);
            self.flow = FlowState::default();
            self.walk(body);
        }
    }

    fn walk(&mut self, id: ExprId) {
        let program = self.program;
        let expr = program.expr(id);
        match &expr.kind {
            ExprKind::Name(NameUse { name, decl: Some(decl) }) => {
                if self.flow.is_moved(*decl) && self.flow.reported.insert(id) {
                    let message = format!("`{}` was moved out and not assigned again", program.name(*name));
                    self.sink.error(expr.span, ErrorKind::UseAfterMove, message);
                }
            }
            ExprKind::Call { callee, args } => {
                self.walk(*callee);
                for &arg in args {
                    self.walk_value(arg);
                }
            }
            ExprKind::Assign { target, value } => {
                self.walk_value(*value);
                match self.local_of(*target) {
                    Some(decl) => {
                        self.flow.moved.remove(&decl);
                    }
                    None => self.walk(*target),
                }
            }
            ExprKind::VarDcl(decl) => {
                if let Some(value) = program.decl(*decl).value {
                    self.walk_value(value);
                }
                self.flow.moved.remove(decl);
            }
            ExprKind::Return(Some(value)) => self.walk_value(*value),
            ExprKind::If { cond, then, otherwise } => {
                self.walk(*cond);
                let before = self.flow.moved.clone();
                self.walk(*then);
                let after_then = std::mem::replace(&mut self.flow.moved, before);
                if let Some(otherwise) = otherwise {
                    self.walk(*otherwise);
                }
                // moved on either path counts as moved
                self.flow.moved.extend(after_then);
            }
            ExprKind::Loop { cond, body } => {
                self.state.loop_depth += 1;
                // a second round sees what the first iteration moved
                for _ in 0..2 {
                    if let Some(cond) = cond {
                        self.walk(*cond);
                    }
                    self.walk(*body);
                }
                self.state.loop_depth -= 1;
            }
            ExprKind::Break | ExprKind::Continue => {
                if !self.state.in_loop() {
                    let keyword = if matches!(expr.kind, ExprKind::Break) { "break" } else { "continue" };
                    self.sink.error(expr.span, ErrorKind::OutsideLoop, format!("`{}` outside of a loop", keyword));
                }
            }
            _ => {
                for child in expr.children() {
                    self.walk(child);
                }
            }
        }
    }

    /// Walk an expression whose value is handed over
    fn walk_value(&mut self, id: ExprId) {
        self.walk(id);
        if let Some(decl) = self.local_of(id) {
            if self.holds_unique(decl) {
                self.flow.moved.insert(decl);
            }
        }
    }

    fn local_of(&self, id: ExprId) -> Option<DeclId> {
        match self.program.expr(id).kind {
            ExprKind::Name(NameUse { decl: Some(decl), .. }) if self.program.decl(decl).is_var() => Some(decl),
            _ => None,
        }
    }

    fn holds_unique(&self, decl: DeclId) -> bool {
        self.program
            .ref_type(self.program.decl(decl).vtype)
            .is_some_and(|r| self.program.perm_flags(r.perm).is_unique())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Diagnostics;
    use crate::parser::Parser;
    use crate::sema::Analyzer;
    use pretty_assertions::assert_eq;

    fn flow_errors(source: &str) -> Vec<ErrorKind> {
        let mut program = Parser::new(source).parse_program().unwrap();
        let mut sink = Diagnostics::new();
        Analyzer::new().analyze(&mut program, &mut sink);
        sink.kinds()
    }

    #[test]
    fn test_unique_reference_moves_once() {
        let errors = flow_errors("fn take(p: &uni i32) {} fn f(p: &uni i32) { take(p); take(p); }");
        assert_eq!(errors, vec![ErrorKind::UseAfterMove]);
    }

    #[test]
    fn test_shared_reference_is_copied() {
        let errors = flow_errors("fn take(p: &imm i32) {} fn f(p: &imm i32) { take(p); take(p); }");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_assignment_restores() {
        let errors = flow_errors(
            "fn take(p: &uni i32) {} fn f(uni p: &uni i32, q: &uni i32) { take(p); p = q; take(p); }",
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_move_in_one_branch() {
        let errors = flow_errors(
            "fn take(p: &uni i32) {} fn f(c: bool, p: &uni i32) { if c { take(p); } else { } take(p); }",
        );
        assert_eq!(errors, vec![ErrorKind::UseAfterMove]);
    }

    #[test]
    fn test_move_inside_loop() {
        let errors = flow_errors("fn take(p: &uni i32) {} fn f(p: &uni i32) { loop { take(p); } }");
        assert_eq!(errors, vec![ErrorKind::UseAfterMove]);
    }

    #[test]
    fn test_break_outside_loop() {
        let errors = flow_errors("fn f() { break; while true { break; continue; } continue; }");
        assert_eq!(errors, vec![ErrorKind::OutsideLoop, ErrorKind::OutsideLoop]);
    }
}

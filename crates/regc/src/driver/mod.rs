//! Analysis pipeline: source text in, analyzed program and diagnostics out

use crate::common::{CompileResult, Diagnostics};
use crate::ir::{DeclKind, Program};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::sema::{Analyzer, Pass, SymbolTable};

/// Pipeline configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub dump_tokens: bool,
    pub dump_ir: bool,
    pub verbose: bool,
    /// Last analyzer pass to run; all of them when unset
    pub stop_after: Option<Pass>,
}

/// Result of analyzing one source file
#[derive(Debug)]
pub struct Analysis {
    pub program: Program,
    pub diagnostics: Diagnostics,
    pub symbols: SymbolTable,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Parse and analyze a source file.
///
/// Lexer and parser errors are fatal and returned as `Err`. Semantic errors
/// are collected in [`Analysis::diagnostics`].
pub fn check_source(source: &str, config: &Config) -> CompileResult<Analysis> {
    if config.dump_tokens {
        let tokens = Lexer::new(source).tokenize_all()?;
        eprintln!("=== Tokens ===");
        for token in &tokens {
            eprintln!("{:?}", token);
        }
        eprintln!("=== End Tokens ===\n");
    }

    if config.verbose {
        eprintln!("Parsing...");
    }
    let mut program = Parser::new(source).parse_program()?;

    if config.verbose {
        eprintln!("Analyzing {} items...", program.items.len());
    }
    let mut diagnostics = Diagnostics::new();
    let symbols = Analyzer::new()
        .stop_after(config.stop_after)
        .analyze(&mut program, &mut diagnostics);

    if config.dump_ir {
        eprintln!("=== IR ===");
        eprint!("{}", dump_items(&program));
        eprintln!("=== End IR ===\n");
    }

    Ok(Analysis {
        program,
        diagnostics,
        symbols,
    })
}

/// One line per top-level declaration with its (checked) type
pub fn dump_items(program: &Program) -> String {
    let mut out = String::new();
    for &item in &program.items {
        let decl = program.decl(item);
        let keyword = match decl.kind {
            DeclKind::Fn => "fn",
            DeclKind::Var => "var",
            DeclKind::Type => "type",
            DeclKind::Region => "region",
            DeclKind::Perm => "perm",
            DeclKind::Intrinsic(_) => "intrinsic",
        };
        let body = if decl.has_value() { " = ..." } else { "" };
        out.push_str(&format!(
            "{} {}: {}{}\n",
            keyword,
            program.name(decl.name),
            program.display_type(decl.vtype),
            body
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_check_source_collects_diagnostics() {
        let analysis = check_source("fn f(x: i32) { x = 1; }", &Config::default()).unwrap();
        assert!(analysis.has_errors());
        assert_eq!(analysis.diagnostics.kinds(), vec![ErrorKind::NotWritable]);
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        assert!(check_source("fn f( {", &Config::default()).is_err());
    }

    #[test]
    fn test_dump_items() {
        let analysis = check_source("region heap; fn add(a: i32, b: i32): i32 { a + b }", &Config::default()).unwrap();
        assert_eq!(
            dump_items(&analysis.program),
            "region heap: heap\nfn add: fn(i32, i32): i32 = ...\n"
        );
    }
}

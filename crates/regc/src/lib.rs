//! regc - semantic analyzer for a language with memory regions and reference permissions
//!
//! Every reference type carries a permission (`uni`, `mut`, `imm`, `const`,
//! `out`, `opaq`) and optionally the region its object lives in. This crate
//! parses such programs and checks them.
//!
//! ## Architecture
//!
//! - **Lexer** (`lexer/`): logos-based tokens with lookahead
//! - **Parser** (`parser/`): recursive descent, builds the IR directly
//! - **IR** (`ir/`): arena of types, declarations and expressions
//! - **Sema** (`sema/`): symbol table, analyzer passes, type compatibility
//! - **Driver** (`driver/`): source text to analyzed program
//! - **Common** (`common/`): spans, errors, diagnostics

pub mod common;
pub mod driver;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod sema;

// Re-exports for convenience
pub use common::{CompileError, CompileResult, Diagnostic, DiagnosticReporter, Diagnostics, ErrorKind, ErrorSink, Span};
pub use driver::{check_source, Analysis, Config};
pub use ir::Program;
pub use sema::{Analyzer, Pass, SymbolTable, TypeCompare};

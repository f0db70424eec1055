//! Common infrastructure shared by the front end and the analyzer

mod diagnostics;
mod error;
mod span;

pub use diagnostics::{Diagnostic, Diagnostics, ErrorKind, ErrorSink};
pub use error::{CompileError, CompileResult, DiagnosticReporter};
pub use span::Span;

//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::{Diagnostic as CodespanDiagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{Buffer, ColorChoice, StandardStream, WriteColor};
use thiserror::Error;
use super::{Diagnostic, Span};

/// Fatal error that stops compilation of a unit before semantic analysis
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexer error at {span:?}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span:?}: {message}")]
    Parser { message: String, span: Span },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Lexer { span, .. } | CompileError::Parser { span, .. } => Some(*span),
            CompileError::Io(_) => None,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    pub fn report_error(&self, file_id: usize, error: &CompileError) {
        let diagnostic = match error {
            CompileError::Lexer { message, span } => CodespanDiagnostic::error()
                .with_message("Lexer error")
                .with_labels(vec![
                    Label::primary(file_id, span.range()).with_message(message)
                ]),

            CompileError::Parser { message, span } => CodespanDiagnostic::error()
                .with_message("Syntax error")
                .with_labels(vec![
                    Label::primary(file_id, span.range()).with_message(message)
                ]),

            CompileError::Io(err) => {
                CodespanDiagnostic::error().with_message(format!("IO error: {}", err))
            }
        };

        self.emit(&mut self.writer.lock(), &diagnostic);
    }

    /// Print semantic diagnostics in the order they were raised
    pub fn report_diagnostics(&self, file_id: usize, diagnostics: &[Diagnostic]) {
        let mut out = self.writer.lock();
        for diagnostic in diagnostics {
            self.emit(&mut out, &Self::to_codespan(file_id, diagnostic));
        }
    }

    /// Render semantic diagnostics without colors
    pub fn render(&self, file_id: usize, diagnostics: &[Diagnostic]) -> String {
        let mut buffer = Buffer::no_color();
        for diagnostic in diagnostics {
            self.emit(&mut buffer, &Self::to_codespan(file_id, diagnostic));
        }
        String::from_utf8_lossy(buffer.as_slice()).into_owned()
    }

    fn to_codespan(file_id: usize, diagnostic: &Diagnostic) -> CodespanDiagnostic<usize> {
        CodespanDiagnostic::error()
            .with_code(diagnostic.kind.code())
            .with_message(diagnostic.kind.title())
            .with_labels(vec![
                Label::primary(file_id, diagnostic.span.range()).with_message(&diagnostic.message)
            ])
    }

    fn emit(&self, writer: &mut dyn WriteColor, diagnostic: &CodespanDiagnostic<usize>) {
        let _ = term::emit(writer, &self.config, &self.files, diagnostic);
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}

//! Semantic diagnostics
//!
//! Analysis never stops on a semantic error: passes raise records through an
//! [`ErrorSink`] and carry on with a best-effort result.

use std::fmt;

use super::Span;

/// Classification of a semantic error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A global name redeclared with a different type or signature
    TypeMismatch,
    /// Two declarations of one name both supply a value or body
    DupImpl,
    /// Malformed node handed over by the parser
    BadTerm,
    /// Slice reference declared with a permission other than imm, uni or const
    BadSlice,
    /// A value cannot be used where the expected type is required
    NoMatch,
    /// The coercion exists but must be spelled with an explicit `as`
    UnsafeConversion,
    UnknownName,
    /// A name resolved to a declaration of the wrong sort
    BadType,
    NotBool,
    NotCallable,
    ArgCount,
    NotAddressable,
    NotWritable,
    BadDeref,
    BadReturn,
    UseAfterMove,
    OutsideLoop,
}

impl ErrorKind {
    /// Stable diagnostic code
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "E0100",
            ErrorKind::DupImpl => "E0101",
            ErrorKind::BadTerm => "E0102",
            ErrorKind::UnknownName => "E0110",
            ErrorKind::BadType => "E0111",
            ErrorKind::NoMatch => "E0200",
            ErrorKind::UnsafeConversion => "E0201",
            ErrorKind::BadSlice => "E0202",
            ErrorKind::NotBool => "E0203",
            ErrorKind::NotCallable => "E0204",
            ErrorKind::ArgCount => "E0205",
            ErrorKind::NotAddressable => "E0206",
            ErrorKind::NotWritable => "E0207",
            ErrorKind::BadDeref => "E0208",
            ErrorKind::BadReturn => "E0209",
            ErrorKind::UseAfterMove => "E0300",
            ErrorKind::OutsideLoop => "E0301",
        }
    }

    /// Headline shown above the source excerpt
    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "conflicting declaration",
            ErrorKind::DupImpl => "duplicate implementation",
            ErrorKind::BadTerm => "malformed term",
            ErrorKind::BadSlice => "unsafe slice permission",
            ErrorKind::NoMatch => "mismatched types",
            ErrorKind::UnsafeConversion => "conversion requires `as`",
            ErrorKind::UnknownName => "unknown name",
            ErrorKind::BadType => "wrong kind of name",
            ErrorKind::NotBool => "condition is not a bool",
            ErrorKind::NotCallable => "not callable",
            ErrorKind::ArgCount => "wrong number of arguments",
            ErrorKind::NotAddressable => "cannot borrow",
            ErrorKind::NotWritable => "not writable",
            ErrorKind::BadDeref => "cannot dereference",
            ErrorKind::BadReturn => "invalid return",
            ErrorKind::UseAfterMove => "use of moved value",
            ErrorKind::OutsideLoop => "outside of loop",
        }
    }
}

/// One semantic error record
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self { kind, span, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.kind.code(), self.message)
    }
}

/// Receiver of semantic errors. Reporting never alters control flow.
pub trait ErrorSink {
    fn error(&mut self, span: Span, kind: ErrorKind, message: String);
}

/// Sink that keeps every record in emission order
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.records.iter()
    }

    /// Number of records of one kind
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.records.iter().filter(|d| d.kind == kind).count()
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.records.iter().map(|d| d.kind).collect()
    }
}

impl ErrorSink for Diagnostics {
    fn error(&mut self, span: Span, kind: ErrorKind, message: String) {
        tracing::trace!(code = kind.code(), ?span, %message, "diagnostic");
        self.records.push(Diagnostic { kind, span, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_code() {
        let d = Diagnostic::new(ErrorKind::DupImpl, Span::new(0, 1), "duplicate body");
        assert_eq!(d.to_string(), "error[E0101]: duplicate body");
    }

    #[test]
    fn test_sink_keeps_order() {
        let mut sink = Diagnostics::new();
        sink.error(Span::new(4, 5), ErrorKind::NotBool, "first".to_string());
        sink.error(Span::new(0, 1), ErrorKind::NoMatch, "second".to_string());

        assert_eq!(sink.kinds(), vec![ErrorKind::NotBool, ErrorKind::NoMatch]);
        assert_eq!(sink.count(ErrorKind::NoMatch), 1);
        assert_eq!(sink.as_slice()[0].message, "first");
    }
}

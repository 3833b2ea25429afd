//! Error types, the diagnostics sink and diagnostic reporting

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, NoColor, StandardStream};
use std::fmt;
use std::panic::Location;
use thiserror::Error;
use super::Span;

/// Category of a compile error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lexer,
    Parser,
    UnknownType,
    ArgCountMismatch,
    ArgMismatch,
    NoImplicitCast,
    CannotFind,
    NonInstance,
    NonFunction,
    ConstViolation,
    NotBoolean,
    NoReturn,
    AlreadyFound,
    NotImplemented,
    ConformanceFailed,
    ConstraintFailed,
    InvalidOperation,
    Codegen,
}

impl ErrorKind {
    /// Stable error code shown next to the diagnostic
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Lexer => "E0001",
            ErrorKind::Parser => "E0002",
            ErrorKind::UnknownType => "E0100",
            ErrorKind::ArgCountMismatch => "E0101",
            ErrorKind::ArgMismatch => "E0102",
            ErrorKind::NoImplicitCast => "E0103",
            ErrorKind::CannotFind => "E0104",
            ErrorKind::NonInstance => "E0105",
            ErrorKind::NonFunction => "E0106",
            ErrorKind::ConstViolation => "E0107",
            ErrorKind::NotBoolean => "E0108",
            ErrorKind::NoReturn => "E0109",
            ErrorKind::AlreadyFound => "E0110",
            ErrorKind::NotImplemented => "E0200",
            ErrorKind::ConformanceFailed => "E0201",
            ErrorKind::ConstraintFailed => "E0202",
            ErrorKind::InvalidOperation => "E0300",
            ErrorKind::Codegen => "E0400",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::Lexer => "lexer error",
            ErrorKind::Parser => "syntax error",
            ErrorKind::UnknownType => "unknown type",
            ErrorKind::ArgCountMismatch => "argument count mismatch",
            ErrorKind::ArgMismatch => "argument mismatch",
            ErrorKind::NoImplicitCast => "no implicit conversion",
            ErrorKind::CannotFind => "cannot find name",
            ErrorKind::NonInstance => "instance required",
            ErrorKind::NonFunction => "not a function",
            ErrorKind::ConstViolation => "assignment to constant",
            ErrorKind::NotBoolean => "condition is not a boolean",
            ErrorKind::NoReturn => "missing return",
            ErrorKind::AlreadyFound => "duplicate declaration",
            ErrorKind::NotImplemented => "member not implemented",
            ErrorKind::ConformanceFailed => "spec not satisfied",
            ErrorKind::ConstraintFailed => "generic constraint not satisfied",
            ErrorKind::InvalidOperation => "invalid operation",
            ErrorKind::Codegen => "code generation error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Location in the compiler's own source where an error was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub file: &'static str,
    pub line: u32,
}

impl From<&'static Location<'static>> for Origin {
    fn from(location: &'static Location<'static>) -> Self {
        Self { file: location.file(), line: location.line() }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Compile error with source location
#[derive(Error, Debug, Clone)]
#[error("{kind} at {span:?}: {message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    pub origin: Origin,
    /// Fatal errors abort the declaration being compiled
    pub fatal: bool,
    /// Secondary locations, e.g. the declaration a constraint came from
    pub notes: Vec<(String, Span)>,
}

impl CompileError {
    #[track_caller]
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            origin: Location::caller().into(),
            fatal: true,
            notes: Vec::new(),
        }
    }

    /// Mark the error as reported-and-continue
    pub fn recoverable(mut self) -> Self {
        self.fatal = false;
        self
    }

    pub fn with_note(mut self, message: impl Into<String>, span: Span) -> Self {
        self.notes.push((message.into(), span));
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[track_caller]
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Lexer, message, span)
    }

    #[track_caller]
    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Parser, message, span)
    }

    #[track_caller]
    pub fn unknown_type(name: &str, span: Span) -> Self {
        Self::new(ErrorKind::UnknownType, format!("unknown type `{}`", name), span)
    }

    #[track_caller]
    pub fn arg_count(what: &str, expected: usize, found: usize, span: Span) -> Self {
        Self::new(
            ErrorKind::ArgCountMismatch,
            format!("`{}` expects {} argument(s), found {}", what, expected, found),
            span,
        )
    }

    #[track_caller]
    pub fn arg_mismatch(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::ArgMismatch, message, span)
    }

    #[track_caller]
    pub fn no_implicit_cast(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::NoImplicitCast, message, span)
    }

    #[track_caller]
    pub fn cannot_find(name: &str, span: Span) -> Self {
        Self::new(ErrorKind::CannotFind, format!("cannot find `{}` in this scope", name), span)
    }

    #[track_caller]
    pub fn non_instance(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::NonInstance, message, span)
    }

    #[track_caller]
    pub fn non_function(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::NonFunction, message, span)
    }

    #[track_caller]
    pub fn const_violation(name: &str, span: Span) -> Self {
        Self::new(ErrorKind::ConstViolation, format!("cannot assign to constant `{}`", name), span)
    }

    #[track_caller]
    pub fn not_boolean(found: impl fmt::Display, span: Span) -> Self {
        Self::new(ErrorKind::NotBoolean, format!("expected `bool`, found `{}`", found), span)
    }

    #[track_caller]
    pub fn no_return(name: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::NoReturn,
            format!("function `{}` declares a return type but never returns a value", name),
            span,
        )
    }

    #[track_caller]
    pub fn missing_return(name: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::NoReturn,
            format!("function `{}` can reach its end without returning a value", name),
            span,
        )
    }

    #[track_caller]
    pub fn already_found(name: &str, span: Span) -> Self {
        Self::new(ErrorKind::AlreadyFound, format!("`{}` is already declared in this scope", name), span)
    }

    #[track_caller]
    pub fn not_implemented(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::NotImplemented, message, span)
    }

    #[track_caller]
    pub fn invalid(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::InvalidOperation, message, span)
    }

    #[track_caller]
    pub fn codegen(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Codegen, message, Span::default())
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Ordered list of every error reported during one compilation
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    errors: Vec<CompileError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: CompileError) {
        tracing::debug!(code = error.code(), fatal = error.fatal, "{}", error.message);
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = CompileError>) {
        for error in errors {
            self.push(error);
        }
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompileError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_fatal(&self) -> bool {
        self.errors.iter().any(|e| e.fatal)
    }

    /// Number of reported errors of the given kind
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<CompileError> {
        self.errors
    }
}

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
    show_origin: bool,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
            show_origin: false,
        }
    }

    /// Also print where in the compiler each error was raised
    pub fn with_origin(mut self, show_origin: bool) -> Self {
        self.show_origin = show_origin;
        self
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    pub fn report_error(&self, file_id: usize, error: &CompileError) {
        let diagnostic = self.diagnostic(file_id, error);
        let _ = term::emit(&mut self.writer.lock(), &self.config, &self.files, &diagnostic);
    }

    pub fn report_all(&self, file_id: usize, diagnostics: &Diagnostics) {
        for error in diagnostics.iter() {
            self.report_error(file_id, error);
        }
    }

    /// Render errors without color, for tests and log files
    pub fn render(&self, file_id: usize, errors: &[CompileError]) -> String {
        let mut buffer = NoColor::new(Vec::new());
        for error in errors {
            let diagnostic = self.diagnostic(file_id, error);
            let _ = term::emit(&mut buffer, &self.config, &self.files, &diagnostic);
        }
        String::from_utf8_lossy(&buffer.into_inner()).into_owned()
    }

    fn diagnostic(&self, file_id: usize, error: &CompileError) -> Diagnostic<usize> {
        let mut labels = vec![
            Label::primary(file_id, error.span.start..error.span.end).with_message(&error.message),
        ];
        for (note, span) in &error.notes {
            labels.push(Label::secondary(file_id, span.start..span.end).with_message(note));
        }

        let mut notes = Vec::new();
        if self.show_origin {
            notes.push(format!("raised at {}", error.origin));
        }

        Diagnostic::error()
            .with_message(error.kind.title())
            .with_code(error.kind.code())
            .with_labels(labels)
            .with_notes(notes)
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_records_origin() {
        let error = CompileError::cannot_find("x", Span::new(0, 1));
        assert!(error.origin.file.ends_with("error.rs"));
        assert!(error.fatal);
        assert_eq!(error.code(), "E0104");
    }

    #[test]
    fn test_diagnostics_count_by_kind() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(CompileError::not_implemented("a", Span::default()).recoverable());
        diagnostics.push(CompileError::not_implemented("b", Span::default()).recoverable());
        diagnostics.push(CompileError::cannot_find("c", Span::default()));
        assert_eq!(diagnostics.count(ErrorKind::NotImplemented), 2);
        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics.has_fatal());
    }

    #[test]
    fn test_render_shows_code_and_label() {
        let mut reporter = DiagnosticReporter::new();
        let file = reporter.add_file("main.ql", "let x = y\n");
        let error = CompileError::cannot_find("y", Span::new(8, 9));
        let text = reporter.render(file, &[error]);
        assert!(text.contains("E0104"));
        assert!(text.contains("cannot find `y` in this scope"));
    }
}

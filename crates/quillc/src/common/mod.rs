//! Common infrastructure shared by the frontend, analyzer and IR

mod error;
mod span;

pub use error::{CompileError, CompileResult, DiagnosticReporter, Diagnostics, ErrorKind, Origin};
pub use span::{LineCol, LineIndex, SourceRange, Span};

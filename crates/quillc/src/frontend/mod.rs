//! Quill frontend: lexing and parsing
//!
//! The frontend turns source text into a `Module` syntax tree. Semantic
//! analysis and lowering to IR live in `sema`.

pub mod ast;
pub mod lexer;
pub mod parser;

use crate::common::{CompileResult, DiagnosticReporter};
use std::fmt::Write;
use std::path::Path;

/// Debug output requested from the compilation pipeline
#[derive(Debug, Clone, Default)]
pub struct FrontendConfig {
    pub dump_tokens: bool,
    pub dump_ast: bool,
    pub dump_scopes: bool,
    pub dump_ir: bool,
    pub verbose: bool,
}

/// Compilation context providing access to diagnostics and file info
pub struct CompileContext<'a> {
    pub filename: String,
    pub file_id: usize,
    pub reporter: &'a DiagnosticReporter,
}

impl<'a> CompileContext<'a> {
    pub fn new(filename: String, file_id: usize, reporter: &'a DiagnosticReporter) -> Self {
        Self { filename, file_id, reporter }
    }

    pub fn module_name(&self) -> &str {
        module_name(&self.filename)
    }
}

/// Name of the IR module built from `filename`: its stem
pub fn module_name(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename)
}

/// Parse a whole source file
pub fn parse(source: &str) -> CompileResult<ast::Module> {
    parser::Parser::new(source).parse_module()
}

/// One line per token: offset range, kind, and a `^` when a newline precedes it
pub fn dump_tokens(source: &str) -> CompileResult<String> {
    let tokens = lexer::Lexer::new(source).tokenize_all()?;
    let mut out = String::new();
    for token in tokens {
        let marker = if token.newline_before { "^" } else { " " };
        let _ = writeln!(out, "{}{:>5}..{:<5} {}", marker, token.span.start, token.span.end, token.kind);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_tokens_marks_line_starts() {
        let dump = dump_tokens("let x\nx").unwrap();
        let lines: Vec<&str> = dump.lines().collect();
        assert!(lines[0].ends_with(" let"));
        assert!(lines[2].starts_with('^'));
        assert!(lines[2].ends_with(" x"));
    }

    #[test]
    fn test_module_name_from_path() {
        let reporter = DiagnosticReporter::new();
        let ctx = CompileContext::new("src/shapes.ql".to_string(), 0, &reporter);
        assert_eq!(ctx.module_name(), "shapes");
    }
}

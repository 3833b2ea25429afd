//! Quill compiler - semantic analyzer and IR generator for Quill
//!
//! ## Architecture
//!
//! The compiler is organized into:
//! - **Frontend** (`frontend/`): lexing and parsing into an AST
//! - **Sema** (`sema/`): scope tree, declaration passes, generics,
//!   conformance checking and lowering of bodies to IR
//! - **IR** (`ir/`): typed, block-structured intermediate representation
//! - **Driver** (`driver/`): pipeline orchestration and debug dumps
//! - **Common** (`common/`): shared infrastructure (errors, spans)
//! - **Types** (`types/`): IR-level type system

pub mod common;
pub mod types;
pub mod frontend;
pub mod sema;
pub mod driver;
pub mod ir;

// Re-exports for convenience
pub use common::{CompileError, CompileResult, DiagnosticReporter, Diagnostics, Span};
pub use driver::{Compilation, Pipeline};
pub use frontend::{CompileContext, FrontendConfig};

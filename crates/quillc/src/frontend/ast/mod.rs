//! Quill AST definitions

mod expr;
mod item;
mod node;
mod stmt;
mod types;

pub use expr::*;
pub use item::*;
pub use node::{dump_tree, NodeRef};
pub use stmt::*;
pub use types::*;

use crate::common::Span;

/// A complete Quill source file
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub items: Vec<Item>,
    pub span: Span,
}

impl Module {
    pub fn new(items: Vec<Item>, span: Span) -> Self {
        Self { items, span }
    }

    pub fn node(&self) -> NodeRef<'_> {
        NodeRef::Module(self)
    }
}

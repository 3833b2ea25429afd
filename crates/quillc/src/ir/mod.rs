//! Intermediate Representation
//!
//! Typed, block-structured IR produced by semantic lowering.

mod builder;
mod inst;

pub use builder::{verify, FunctionId, IrBuilder};
pub use inst::*;

//! Target-level type system for the IR
//!
//! Language-agnostic types used in the intermediate representation. The
//! analyzer's richer type descriptors live in `sema::types` and wrap these.

mod ir_type;

pub use ir_type::IrType;

//! Semantic analysis and IR generation
//!
//! `analyze` runs the declaration passes over a module, then lowers every
//! function body. Errors abort only the declaration they occur in; they are
//! collected in the returned `Diagnostics`.

mod cast;
mod conformance;
mod generics;
mod lower;
mod pipeline;
mod resolve;
mod scope;
mod types;

#[cfg(test)]
mod tests;

pub use cast::cast;
pub use resolve::{common_type, infer_literal_type};
pub use scope::{
    AliasEntry, FunctionEntry, ScopeId, ScopeKind, ScopeNode, ScopeTree, Storage, TemplateEntry,
    VariableEntry,
};
pub use types::{min_unsigned_width, FnTy, FunctionValue, Ty, TypedValue};

use crate::common::{CompileError, CompileResult, Diagnostics};
use crate::frontend::ast::{ActionDecl, Item, Module};
use crate::ir::{verify, BlockId, IrBuilder, IrModule, Value};
use std::collections::{HashMap, HashSet, VecDeque};

/// Result of analyzing one module
pub struct Analysis<'ast> {
    pub module: IrModule,
    pub diagnostics: Diagnostics,
    pub scopes: ScopeTree<'ast>,
}

impl Analysis<'_> {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Analyze a parsed module and lower it to IR
pub fn analyze<'ast>(module: &'ast Module, name: &str) -> Analysis<'ast> {
    let mut sema = Sema::new(name);
    sema.run(module);
    sema.finish()
}

/// Jump targets of the innermost loop
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopTargets {
    pub header: BlockId,
    pub exit: BlockId,
}

/// State threaded through body lowering
#[derive(Debug, Default)]
pub(crate) struct LowerState {
    /// Evaluate lvalues to their address instead of loading them
    pub reference_mode: bool,
    /// Expected type of the expression being lowered
    pub type_hint: Option<Ty>,
    /// Aggregate an initializer list is writing into
    pub aggregate_base: Option<(Value, Ty)>,
    pub function: Option<FunctionValue>,
    pub loops: Vec<LoopTargets>,
}

/// An item and the scope it was declared in
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeclRecord<'ast> {
    pub item: &'ast Item,
    pub parent: ScopeId,
    /// Node registered for the item in pass 0, if any
    pub node: Option<ScopeId>,
}

/// An action waiting for pass 30, or bound earlier by a constraint check
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingAction<'ast> {
    pub decl: &'ast ActionDecl,
    pub scope: ScopeId,
    pub applied: bool,
}

pub struct Sema<'ast> {
    pub(crate) tree: ScopeTree<'ast>,
    pub(crate) builder: IrBuilder,
    pub(crate) diagnostics: Diagnostics,
    /// Instantiations by (generic, argument types)
    pub(crate) instances: HashMap<(ScopeId, Vec<Ty>), Ty>,
    /// Function nodes whose bodies still need lowering
    pub(crate) bodies: VecDeque<ScopeId>,
    pub(crate) decls: Vec<DeclRecord<'ast>>,
    pub(crate) actions: Vec<PendingAction<'ast>>,
    /// Specs whose function signatures are declared
    pub(crate) declared_specs: HashSet<ScopeId>,
    pub(crate) state: LowerState,
}

impl<'ast> Sema<'ast> {
    pub fn new(module_name: &str) -> Self {
        Self {
            tree: ScopeTree::new(module_name),
            builder: IrBuilder::new(module_name),
            diagnostics: Diagnostics::new(),
            instances: HashMap::new(),
            bodies: VecDeque::new(),
            decls: Vec::new(),
            actions: Vec::new(),
            declared_specs: HashSet::new(),
            state: LowerState::default(),
        }
    }

    pub fn tree(&self) -> &ScopeTree<'ast> {
        &self.tree
    }

    pub fn builder(&self) -> &IrBuilder {
        &self.builder
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Record the error of an aborted declaration
    pub(crate) fn report<T>(&mut self, result: CompileResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.diagnostics.push(error);
                None
            }
        }
    }

    /// Run `f` with the insertion point moved to `scope`
    pub(crate) fn within<T>(
        &mut self,
        scope: ScopeId,
        f: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        let previous = self.tree.enter(scope);
        let result = f(self);
        self.tree.exit(previous);
        result
    }

    pub fn finish(self) -> Analysis<'ast> {
        let mut diagnostics = self.diagnostics;
        let module = self.builder.finish();
        // Aborted declarations leave holes that only matter in a clean module
        if let (true, Err(problems)) = (diagnostics.is_empty(), verify(&module)) {
            for problem in problems {
                diagnostics.push(CompileError::codegen(problem));
            }
        }
        Analysis {
            module,
            diagnostics,
            scopes: self.tree,
        }
    }
}

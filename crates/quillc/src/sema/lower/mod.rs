//! Body lowering: statements and expressions to IR
//!
//! A function with two or more `return` statements gets one shared exit
//! block; every return stores into the return slot and branches there. A
//! single return is emitted in place.

mod expr;
mod init;
mod member;
mod stmt;

use super::scope::{ScopeId, ScopeKind, Storage, VariableEntry};
use super::types::{FunctionValue, Ty};
use super::{LowerState, Sema};
use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::{Block, ElseBranch, FuncDecl, Stmt, StmtKind};
use crate::ir::{FunctionId, Terminator, Value};

impl<'ast> Sema<'ast> {
    /// Emit the body of a declared function
    pub(crate) fn lower_function(&mut self, function: ScopeId) -> CompileResult<()> {
        let ScopeKind::Function(entry) = self.tree.kind(function) else {
            return Ok(());
        };
        let (decl, Some(ir)) = (entry.decl, entry.ir) else {
            return Ok(());
        };
        let Some(body) = &decl.body else {
            return Ok(());
        };
        let _span = tracing::debug_span!("function", name = %entry.ir_name).entered();

        let previous = self.tree.enter(function);
        self.builder.begin_body(ir);
        let result = self.lower_function_body(function, decl, body, ir);
        self.tree.exit(previous);

        match result {
            Ok(()) => {
                self.builder.end_body();
                tracing::debug!("lowered");
                Ok(())
            }
            Err(error) => {
                self.builder.discard_body(ir);
                self.state = LowerState::default();
                Err(error)
            }
        }
    }

    fn lower_function_body(
        &mut self,
        function: ScopeId,
        decl: &'ast FuncDecl,
        body: &'ast Block,
        ir: FunctionId,
    ) -> CompileResult<()> {
        let ty = match self.tree.kind(function) {
            ScopeKind::Function(entry) => entry.ty.clone(),
            _ => return Ok(()),
        };

        let mut param_index = 0;
        if ty.is_member {
            let parent = self.tree.parent(function).unwrap_or(self.tree.root());
            let receiver = self
                .self_type(parent)
                .ok_or_else(|| CompileError::invalid("`self` outside of a template", decl.name_span))?;
            let receiver = Ty::pointer(receiver);
            self.bind_param("self", receiver, true, param_index, decl.name_span)?;
            param_index += 1;
        }
        for (param, param_ty) in decl.params.iter().zip(&ty.params) {
            self.require_storable(param_ty, param.span)?;
            self.bind_param(&param.name, param_ty.clone(), false, param_index, param.span)?;
            param_index += 1;
        }

        let ret = (*ty.ret).clone();
        let returns = count_returns(&body.stmts);
        if returns == 0 && !ret.is_void() {
            return Err(CompileError::no_return(&decl.name, decl.name_span));
        }

        let mut func = FunctionValue {
            id: ir,
            ty,
            ret_slot: None,
            ret_block: None,
            return_count: 0,
            expected_returns: returns,
        };
        if returns >= 2 {
            if !ret.is_void() {
                func.ret_slot = Some(self.builder.build_entry_alloca(ret.ir()));
            }
            func.ret_block = Some(self.builder.append_block("return"));
        }
        self.state.function = Some(func);

        self.lower_block(body)?;
        self.finish_function(decl, &ret)
    }

    /// Give a parameter a stack slot and a name
    fn bind_param(
        &mut self,
        name: &str,
        ty: Ty,
        constant: bool,
        index: usize,
        span: Span,
    ) -> CompileResult<()> {
        let slot = self.builder.build_entry_alloca(ty.ir());
        self.builder.build_store(ty.ir(), slot.clone(), Value::Param(index));
        let entry = VariableEntry { ty, storage: Storage::Local(slot), constant };
        self.tree.add(name, ScopeKind::Variable(entry), span)?;
        Ok(())
    }

    /// Terminate the fall-through path and fill the shared exit block
    fn finish_function(&mut self, decl: &FuncDecl, ret: &Ty) -> CompileResult<()> {
        let Some(func) = self.state.function.take() else {
            return Ok(());
        };
        debug_assert_eq!(func.return_count, func.expected_returns);

        if !self.builder.current_is_terminated() {
            let terminator = match func.ret_block {
                Some(exit) if ret.is_void() => Terminator::Jump(exit),
                None if ret.is_void() => Terminator::Return(None),
                _ => {
                    let reachable = self.builder.current_block().is_some_and(|b| self.builder.is_reachable(b));
                    if reachable {
                        return Err(CompileError::missing_return(&decl.name, decl.name_span));
                    }
                    Terminator::Unreachable
                }
            };
            self.builder.terminate(terminator)?;
        }

        if let Some(exit) = func.ret_block {
            self.builder.position_at_end(exit);
            let value = func.ret_slot.map(|slot| self.builder.build_load(ret.ir(), slot));
            self.builder.terminate(Terminator::Return(value))?;
        }
        Ok(())
    }

    /// Lower a block in its own anonymous scope
    pub(crate) fn lower_block(&mut self, block: &'ast Block) -> CompileResult<()> {
        let name = self.tree.generate_name("block");
        let scope = self.tree.add(&name, ScopeKind::Block, block.span)?;
        let previous = self.tree.enter(scope);
        let result = self.lower_stmts(&block.stmts);
        self.tree.exit(previous);
        result
    }

    fn lower_stmts(&mut self, stmts: &'ast [Stmt]) -> CompileResult<()> {
        for stmt in stmts {
            if self.builder.current_is_terminated() {
                let dead = self.builder.append_block("dead");
                tracing::trace!(?dead, "statement after terminator");
                self.builder.position_at_end(dead);
            }
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    /// Allocate a stack slot in the entry block for a value of `ty`
    pub(crate) fn temporary(&mut self, ty: &Ty) -> Value {
        self.builder.build_entry_alloca(ty.ir())
    }

    pub(crate) fn store_typed(&mut self, ty: &Ty, addr: Value, value: Value) {
        self.builder.build_store(ty.ir(), addr, value);
    }
}

/// Number of `return` statements anywhere in `stmts`
pub(crate) fn count_returns(stmts: &[Stmt]) -> usize {
    stmts
        .iter()
        .map(|stmt| match &stmt.kind {
            StmtKind::Return(_) => 1,
            StmtKind::If { then_block, else_branch, .. } => {
                count_returns(&then_block.stmts)
                    + match else_branch {
                        Some(ElseBranch::Block(block)) => count_returns(&block.stmts),
                        Some(ElseBranch::If(stmt)) => count_returns(std::slice::from_ref(stmt.as_ref())),
                        None => 0,
                    }
            }
            StmtKind::While { body, .. } => count_returns(&body.stmts),
            StmtKind::Block(block) => count_returns(&block.stmts),
            _ => 0,
        })
        .sum()
}

use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::{Block, ElseBranch, Expr, ExprKind, Stmt, StmtKind, TypeExpr};
use crate::ir::{BlockId, Terminator};
use crate::sema::scope::{ScopeKind, Storage, VariableEntry};
use crate::sema::types::TypedValue;
use crate::sema::{cast, LoopTargets, Sema};

impl<'ast> Sema<'ast> {
    pub(crate) fn lower_stmt(&mut self, stmt: &'ast Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Let { name, name_span, ty, init, constant } => {
                self.lower_let(name, *name_span, ty.as_ref(), init.as_ref(), *constant)
            }
            StmtKind::Assign { target, value } => {
                let place = self.lower_place(target)?;
                if let Some(root) = &place.const_root {
                    return Err(CompileError::const_violation(root, target.span));
                }
                self.lower_into(place.addr, &place.ty, value)
            }
            StmtKind::Expr(expr) => self.lower_expr(expr).map(drop),
            StmtKind::Return(value) => self.lower_return(value.as_ref(), stmt.span),
            StmtKind::If { cond, then_block, else_branch } => {
                self.lower_if(cond, then_block, else_branch.as_ref())
            }
            StmtKind::While { cond, body } => self.lower_while(cond, body),
            StmtKind::Break | StmtKind::Continue => {
                let Some(targets) = self.state.loops.last().copied() else {
                    let keyword = if matches!(stmt.kind, StmtKind::Break) { "break" } else { "continue" };
                    return Err(CompileError::invalid(format!("`{}` outside of a loop", keyword), stmt.span));
                };
                let target = if matches!(stmt.kind, StmtKind::Break) { targets.exit } else { targets.header };
                self.builder.terminate(Terminator::Jump(target))
            }
            StmtKind::Block(block) => self.lower_block(block),
        }
    }

    /// The initializer is lowered before the name exists, so `let x = x`
    /// reads an outer `x`
    fn lower_let(
        &mut self,
        name: &str,
        span: Span,
        ty: Option<&TypeExpr>,
        init: Option<&'ast Expr>,
        constant: bool,
    ) -> CompileResult<()> {
        let declared = match ty {
            Some(ty) => Some(self.resolve_type(ty, self.tree.current())?),
            None => None,
        };

        let (ty, slot) = match (declared, init) {
            (None, None) => {
                return Err(CompileError::invalid(
                    format!("`{}` needs a type or an initializer", name),
                    span,
                ));
            }
            (Some(ty), init) => {
                self.require_storable(&ty, span)?;
                let slot = self.temporary(&ty);
                if let Some(init) = init {
                    self.lower_into(slot.clone(), &ty, init)?;
                }
                (ty, slot)
            }
            (None, Some(init)) => {
                if matches!(init.kind, ExprKind::Initializer(_)) {
                    return Err(CompileError::invalid(
                        format!("`{}` needs a type to build an initializer list", name),
                        init.span,
                    ));
                }
                let value = self.lower_expr(init)?;
                self.require_storable(&value.ty, init.span)?;
                let slot = self.temporary(&value.ty);
                self.store_typed(&value.ty, slot.clone(), value.value);
                (value.ty, slot)
            }
        };

        let entry = VariableEntry { ty, storage: Storage::Local(slot), constant };
        self.tree.add(name, ScopeKind::Variable(entry), span)?;
        Ok(())
    }

    fn lower_return(&mut self, value: Option<&'ast Expr>, span: Span) -> CompileResult<()> {
        let Some(func) = &self.state.function else {
            return Err(CompileError::invalid("`return` outside of a function", span));
        };
        let ret = (*func.ty.ret).clone();
        let (slot, exit) = (func.ret_slot.clone(), func.ret_block);

        let value = match value {
            Some(expr) if ret.is_void() => {
                return Err(CompileError::arg_mismatch(
                    "function returning `void` cannot return a value",
                    expr.span,
                ));
            }
            Some(expr) => {
                let value = self.lower_expr_hinted(expr, Some(ret.clone()))?;
                Some(cast(&mut self.builder, value, &ret, true, expr.span)?)
            }
            None if !ret.is_void() => {
                return Err(CompileError::arg_mismatch(format!("expected a `{}` return value", ret), span));
            }
            None => None,
        };

        if let Some(func) = &mut self.state.function {
            func.return_count += 1;
        }
        match exit {
            Some(exit) => {
                if let (Some(slot), Some(value)) = (slot, value) {
                    self.store_typed(&ret, slot, value.value);
                }
                self.builder.terminate(Terminator::Jump(exit))
            }
            None => self.builder.terminate(Terminator::Return(value.map(|v| v.value))),
        }
    }

    /// Evaluate a branch or loop condition, which must be `bool`
    pub(crate) fn lower_condition(&mut self, cond: &'ast Expr) -> CompileResult<TypedValue> {
        let value = self.lower_expr(cond)?;
        if !value.ty.is_bool() {
            return Err(CompileError::not_boolean(&value.ty, cond.span));
        }
        Ok(value)
    }

    fn lower_if(
        &mut self,
        cond: &'ast Expr,
        then_block: &'ast Block,
        else_branch: Option<&'ast ElseBranch>,
    ) -> CompileResult<()> {
        let cond = self.lower_condition(cond)?;

        let else_empty = match else_branch {
            None => true,
            Some(ElseBranch::Block(block)) => block.stmts.is_empty(),
            Some(ElseBranch::If(_)) => false,
        };
        let then_bb = (!then_block.stmts.is_empty()).then(|| self.builder.append_block("then"));
        let else_bb = (!else_empty).then(|| self.builder.append_block("else"));
        let merge = self.builder.append_block("endif");

        self.builder.terminate(Terminator::Branch {
            cond: cond.value,
            then_block: then_bb.unwrap_or(merge),
            else_block: else_bb.unwrap_or(merge),
        })?;

        if let Some(bb) = then_bb {
            self.builder.position_at_end(bb);
            self.lower_block(then_block)?;
            self.close_branch(merge)?;
        }
        if let (Some(bb), Some(branch)) = (else_bb, else_branch) {
            self.builder.position_at_end(bb);
            match branch {
                ElseBranch::Block(block) => self.lower_block(block)?,
                ElseBranch::If(stmt) => self.lower_stmt(stmt)?,
            }
            self.close_branch(merge)?;
        }
        self.builder.position_at_end(merge);
        Ok(())
    }

    fn close_branch(&mut self, merge: BlockId) -> CompileResult<()> {
        if self.builder.current_is_terminated() {
            Ok(())
        } else {
            self.builder.terminate(Terminator::Jump(merge))
        }
    }

    fn lower_while(&mut self, cond: &'ast Expr, body: &'ast Block) -> CompileResult<()> {
        // The entry block cannot be a branch target
        let header = match self.builder.current_block() {
            Some(current)
                if current.0 != 0
                    && self.builder.block_is_empty(current)
                    && !self.builder.is_terminated(current) =>
            {
                current
            }
            _ => {
                let header = self.builder.append_block("while");
                self.builder.terminate(Terminator::Jump(header))?;
                header
            }
        };
        self.builder.position_at_end(header);
        let cond = self.lower_condition(cond)?;

        let body_bb = (!body.stmts.is_empty()).then(|| self.builder.append_block("body"));
        let exit = self.builder.append_block("endwhile");
        self.builder.terminate(Terminator::Branch {
            cond: cond.value,
            then_block: body_bb.unwrap_or(header),
            else_block: exit,
        })?;

        if let Some(bb) = body_bb {
            self.builder.position_at_end(bb);
            self.state.loops.push(LoopTargets { header, exit });
            let result = self.lower_block(body);
            self.state.loops.pop();
            result?;
            self.close_branch(header)?;
        }
        self.builder.position_at_end(exit);
        Ok(())
    }
}

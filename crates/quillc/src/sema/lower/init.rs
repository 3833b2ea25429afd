//! Initializer lists and stores into aggregates

use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::{Expr, ExprKind, InitField};
use crate::ir::Value;
use crate::sema::scope::{ScopeId, Storage};
use crate::sema::types::Ty;
use crate::sema::{cast, Sema};

impl<'ast> Sema<'ast> {
    /// Evaluate `expr` into the storage at `addr`, which holds a `ty`
    pub(crate) fn lower_into(&mut self, addr: Value, ty: &Ty, expr: &'ast Expr) -> CompileResult<()> {
        match (&expr.kind, ty) {
            (ExprKind::Initializer(entries), Ty::Struct { scope, .. }) => {
                self.with_aggregate(addr, ty, |s| s.init_struct(*scope, entries, expr.span))
            }
            (ExprKind::Initializer(entries), Ty::Array { .. }) => {
                if let Some(named) = entries.iter().find(|e| e.name.is_some()) {
                    return Err(CompileError::invalid(
                        "array initializers cannot name their entries",
                        named.span,
                    ));
                }
                let values: Vec<&'ast Expr> = entries.iter().map(|e| &e.value).collect();
                self.store_array(addr, ty, &values, expr.span)
            }
            (ExprKind::ArrayLiteral(items), Ty::Array { .. }) => self.store_entries(addr, ty, items, expr.span),
            (ExprKind::Initializer(_), _) => Err(CompileError::invalid(
                format!("an initializer list cannot build `{}`", ty),
                expr.span,
            )),
            _ => {
                let value = self.lower_expr_hinted(expr, Some(ty.clone()))?;
                let value = cast(&mut self.builder, value, ty, true, expr.span)?;
                self.store_typed(ty, addr, value.value);
                Ok(())
            }
        }
    }

    /// Store array literal entries into the array at `addr`
    pub(crate) fn store_entries(&mut self, addr: Value, ty: &Ty, items: &'ast [Expr], span: Span) -> CompileResult<()> {
        let values: Vec<&'ast Expr> = items.iter().collect();
        self.store_array(addr, ty, &values, span)
    }

    fn store_array(&mut self, addr: Value, ty: &Ty, values: &[&'ast Expr], span: Span) -> CompileResult<()> {
        let Ty::Array { element, len } = ty else {
            return Err(CompileError::invalid(format!("`{}` is not an array", ty), span));
        };
        if values.len() as u64 != *len {
            return Err(CompileError::arg_count(&ty.to_string(), *len as usize, values.len(), span));
        }
        self.with_aggregate(addr, ty, |s| {
            for (index, value) in values.iter().copied().enumerate() {
                let slot = s.entry_addr(index);
                s.lower_into(slot, element, value)?;
            }
            Ok(())
        })
    }

    /// Named entries go to their field; positional ones fill fields in order
    fn init_struct(&mut self, template: ScopeId, entries: &'ast [InitField], span: Span) -> CompileResult<()> {
        let layout: Vec<(String, Ty)> = self
            .tree
            .fields(template)
            .into_iter()
            .filter(|(_, var)| var.storage == Storage::Field)
            .map(|(id, var)| (self.tree.name(id).to_string(), var.ty.clone()))
            .collect();
        if entries.len() > layout.len() {
            return Err(CompileError::arg_count(
                &self.tree.qualified_name(template),
                layout.len(),
                entries.len(),
                span,
            ));
        }

        let mut written = vec![false; layout.len()];
        for (position, entry) in entries.iter().enumerate() {
            let index = match &entry.name {
                Some(name) => layout
                    .iter()
                    .position(|(field, _)| field == name)
                    .ok_or_else(|| CompileError::cannot_find(name, entry.span))?,
                None => position,
            };
            if written[index] {
                return Err(CompileError::already_found(&layout[index].0, entry.span));
            }
            written[index] = true;

            let slot = self.entry_addr(index);
            self.lower_into(slot, &layout[index].1, &entry.value)?;
        }
        Ok(())
    }

    /// Run `f` with `addr` as the aggregate that entries are written into
    fn with_aggregate<T>(
        &mut self,
        addr: Value,
        ty: &Ty,
        f: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        let saved = self.state.aggregate_base.replace((addr, ty.clone()));
        let result = f(self);
        self.state.aggregate_base = saved;
        result
    }

    /// Address of entry `index` of the current aggregate
    fn entry_addr(&mut self, index: usize) -> Value {
        match self.state.aggregate_base.clone() {
            Some((base, Ty::Struct { name, .. })) => self.builder.build_field_addr(&name, base, index),
            Some((base, Ty::Array { element, .. })) => {
                self.builder.build_elem_addr(element.ir(), base, Value::Int(index as i128))
            }
            _ => Value::Undef,
        }
    }
}

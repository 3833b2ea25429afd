//! Declaration passes
//!
//! Pass 0 registers a skeleton for every type-introducing item, pass 1
//! resolves aliases and top-level constants, pass 20 lays out templates and
//! declares their methods, and pass 30 declares free functions and spec
//! methods and binds actions. Bodies are lowered only after all of them.

use super::scope::{AliasEntry, FunctionEntry, ScopeId, ScopeKind, Storage, TemplateEntry, VariableEntry};
use super::types::{FnTy, Ty};
use super::{cast, DeclRecord, PendingAction, Sema};
use crate::common::{CompileError, CompileResult};
use crate::frontend::ast::{ConstDecl, FuncDecl, Item, ItemKind, Module, TemplateDecl};
use crate::ir::{GlobalInit, IrGlobal, Value};
use crate::types::IrType;
use std::collections::HashSet;

impl<'ast> Sema<'ast> {
    /// Run every pass over `module`, then lower all queued bodies
    pub fn run(&mut self, module: &'ast Module) {
        let root = self.tree.root();
        {
            let _pass = tracing::info_span!("pass", n = 0).entered();
            self.register_items(&module.items, root);
        }
        {
            let _pass = tracing::info_span!("pass", n = 1).entered();
            self.resolve_aliases_and_constants();
        }
        {
            let _pass = tracing::info_span!("pass", n = 20).entered();
            self.define_templates();
        }
        {
            let _pass = tracing::info_span!("pass", n = 30).entered();
            self.declare_functions_and_actions();
        }
        {
            let _pass = tracing::info_span!("lower").entered();
            while let Some(function) = self.bodies.pop_front() {
                if self.tree.is_alive(function) {
                    let result = self.lower_function(function);
                    self.report(result);
                }
            }
        }
    }

    // === Pass 0 ===

    fn register_items(&mut self, items: &'ast [Item], parent: ScopeId) {
        for item in items {
            let node = match self.register_item(item, parent) {
                Ok(node) => node,
                Err(error) => {
                    self.diagnostics.push(error);
                    continue;
                }
            };
            if let Some(node) = node {
                self.tree.node_mut(node).exported = item.exported;
            }
            self.decls.push(DeclRecord { item, parent, node });

            if let (ItemKind::Package(package), Some(node)) = (&item.kind, node) {
                self.register_items(&package.items, node);
            }
        }
    }

    fn register_item(&mut self, item: &'ast Item, parent: ScopeId) -> CompileResult<Option<ScopeId>> {
        let node = match &item.kind {
            ItemKind::Template(decl) => {
                let ir_name = self.tree.qualify(parent, &decl.name);
                if decl.generics.is_empty() {
                    self.builder.declare_struct(&ir_name);
                }
                let entry = TemplateEntry {
                    decl,
                    ir_name,
                    instance_of: None,
                    implements: Vec::new(),
                    actions: Vec::new(),
                };
                self.tree.add_child(parent, &decl.name, ScopeKind::Template(entry), item.span)?
            }
            ItemKind::Alias(decl) => {
                let entry = AliasEntry { decl: Some(decl), target: None, resolving: false, instance_of: None };
                self.tree.add_child(parent, &decl.name, ScopeKind::TypeAlias(entry), item.span)?
            }
            ItemKind::Spec(decl) => {
                let node = self.tree.add_child(parent, &decl.name, ScopeKind::Spec(decl), item.span)?;
                for alias in &decl.aliases {
                    let entry = AliasEntry { decl: Some(alias), target: None, resolving: false, instance_of: None };
                    let result = self.tree.add_child(node, &alias.name, ScopeKind::TypeAlias(entry), alias.span);
                    self.report(result);
                }
                node
            }
            ItemKind::Package(decl) => self.tree.add_child(parent, &decl.name, ScopeKind::Package, item.span)?,
            ItemKind::Action(decl) => {
                self.actions.push(PendingAction { decl, scope: parent, applied: false });
                return Ok(None);
            }
            ItemKind::Func(_) | ItemKind::Const(_) => return Ok(None),
        };
        tracing::debug!(name = item.name().unwrap_or_default(), "registered");
        Ok(Some(node))
    }

    // === Pass 1 ===

    fn resolve_aliases_and_constants(&mut self) {
        for record in self.decls.clone() {
            let result = match (&record.item.kind, record.node) {
                (ItemKind::Alias(decl), Some(node)) if decl.generics.is_empty() => {
                    self.alias_target(node, record.item.span).map(drop)
                }
                (ItemKind::Const(decl), _) => self.define_constant(decl, record.parent, record.item.exported),
                _ => Ok(()),
            };
            self.report(result);
        }
    }

    /// Fold a top-level constant and emit it as a global
    fn define_constant(&mut self, decl: &'ast ConstDecl, parent: ScopeId, exported: bool) -> CompileResult<()> {
        if self.tree.find_child(parent, &decl.name).is_some() {
            return Err(CompileError::already_found(&decl.name, decl.span));
        }
        let declared = match &decl.ty {
            Some(ty) => Some(self.resolve_type(ty, parent)?),
            None => None,
        };
        let value = self.within(parent, |s| s.lower_expr_hinted(&decl.value, declared.clone()))?;
        let value = match &declared {
            Some(ty) => cast(&mut self.builder, value, ty, true, decl.value.span)?,
            None => value,
        };
        self.require_storable(&value.ty, decl.span)?;

        let init = match value.value {
            Value::Int(n) => GlobalInit::Int(n),
            Value::Float(x) => GlobalInit::Float(x),
            _ => {
                return Err(CompileError::invalid(
                    format!("initializer of constant `{}` is not a compile-time constant", decl.name),
                    decl.value.span,
                ));
            }
        };
        let global = self.tree.qualify(parent, &decl.name);
        self.builder.add_global(IrGlobal {
            name: global.clone(),
            ty: value.ty.ir(),
            init: Some(init),
            constant: true,
        });
        let entry = VariableEntry {
            ty: value.ty,
            storage: Storage::Constant { global, value: value.value },
            constant: true,
        };
        let node = self.tree.add_child(parent, &decl.name, ScopeKind::Variable(entry), decl.span)?;
        self.tree.node_mut(node).exported = exported;
        Ok(())
    }

    // === Pass 20 ===

    fn define_templates(&mut self) {
        for record in self.decls.clone() {
            if let (ItemKind::Template(decl), Some(node)) = (&record.item.kind, record.node) {
                if decl.generics.is_empty() {
                    let result = self.define_template(node, decl, record.item.exported);
                    self.report(result);
                }
            }
        }
    }

    /// Lay out a template's fields and declare its methods
    pub(crate) fn define_template(
        &mut self,
        template: ScopeId,
        decl: &'ast TemplateDecl,
        exported: bool,
    ) -> CompileResult<()> {
        let mut layout = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            let ty = self.resolve_type(&field.ty, template)?;
            self.require_storable(&ty, field.span)?;
            layout.push(ty.ir());
            let entry = VariableEntry { ty, storage: Storage::Field, constant: false };
            self.tree.add_child(template, &field.name, ScopeKind::Variable(entry), field.span)?;
        }

        // Templates defined earlier are complete, so a cycle closes here
        let mut path = vec![template];
        if self.contains_template(template, template, &mut path, &mut HashSet::new()) {
            let names: Vec<&str> = path.iter().map(|id| self.tree.name(*id)).collect();
            return Err(CompileError::invalid(
                format!(
                    "template `{}` contains itself ({}); use a reference",
                    decl.name,
                    names.join(" -> ")
                ),
                decl.span,
            ));
        }

        let ir_name = match self.tree.kind(template) {
            ScopeKind::Template(entry) => entry.ir_name.clone(),
            _ => self.tree.qualified_name(template),
        };
        self.builder.define_struct(&ir_name, layout);
        tracing::debug!(template = %ir_name, fields = decl.fields.len(), "template defined");

        for method in &decl.methods {
            let result = self.declare_function(template, method, exported);
            self.report(result);
        }
        Ok(())
    }

    /// Whether `current` stores a `target` in its fields or their array
    /// entries, extending `path` with the templates on the way
    fn contains_template(
        &self,
        current: ScopeId,
        target: ScopeId,
        path: &mut Vec<ScopeId>,
        visited: &mut HashSet<ScopeId>,
    ) -> bool {
        for (_, var) in self.tree.fields(current) {
            if var.storage != Storage::Field {
                continue;
            }
            let mut ty = &var.ty;
            while let Ty::Array { element, .. } = ty {
                ty = element;
            }
            let Some(next) = ty.struct_scope() else {
                continue;
            };
            path.push(next);
            if next == target || (visited.insert(next) && self.contains_template(next, target, path, visited)) {
                return true;
            }
            path.pop();
        }
        false
    }

    // === Pass 30 ===

    fn declare_functions_and_actions(&mut self) {
        for record in self.decls.clone() {
            match (&record.item.kind, record.node) {
                (ItemKind::Func(decl), _) => {
                    let result = self.declare_function(record.parent, decl, record.item.exported);
                    self.report(result);
                }
                (ItemKind::Spec(_), Some(node)) => self.declare_spec_functions(node),
                _ => {}
            }
        }

        for index in 0..self.actions.len() {
            if self.actions[index].applied {
                continue;
            }
            self.actions[index].applied = true;
            let pending = self.actions[index];
            let result = self.register_action(pending.decl, pending.scope);
            self.report(result);
        }
    }

    /// Resolve a function signature and declare it under `parent`
    ///
    /// Spec methods only record their signature; everything else also gets
    /// an IR function, and its body is queued for lowering.
    pub(crate) fn declare_function(
        &mut self,
        parent: ScopeId,
        decl: &'ast FuncDecl,
        exported: bool,
    ) -> CompileResult<ScopeId> {
        if self.tree.find_child(parent, &decl.name).is_some() {
            return Err(CompileError::already_found(&decl.name, decl.name_span));
        }

        let receiver = if decl.has_self {
            match self.tree.kind(parent) {
                ScopeKind::Template(entry) => Some(Ty::Struct { name: entry.ir_name.clone(), scope: parent }),
                ScopeKind::Spec(_) => Some(Ty::Trait { name: self.tree.qualified_name(parent), scope: parent }),
                _ => {
                    return Err(CompileError::invalid(
                        format!("`{}` takes `self` but is not declared in a template", decl.name),
                        decl.name_span,
                    ));
                }
            }
        } else {
            None
        };

        let mut params = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            params.push(self.resolve_type(&param.ty, parent)?);
        }
        let ret = match &decl.return_type {
            Some(ty) => self.resolve_type(ty, parent)?,
            None => Ty::void(),
        };
        let ty = FnTy { ret: Box::new(ret), params, is_member: decl.has_self };

        let is_spec = matches!(self.tree.kind(parent), ScopeKind::Spec(_));
        let ir_name = self.tree.qualify(parent, &decl.name);
        let ir = if is_spec {
            None
        } else {
            let mut ir_params: Vec<IrType> = receiver.iter().map(|r| IrType::ptr(r.ir())).collect();
            ir_params.extend(ty.params.iter().map(Ty::ir));
            Some(self.builder.declare_function(&ir_name, ir_params, ty.ret.ir(), exported))
        };

        let entry = FunctionEntry { decl, ty, ir, ir_name };
        let node = self.tree.add_child(parent, &decl.name, ScopeKind::Function(entry), decl.span)?;
        self.tree.node_mut(node).exported = exported;
        if ir.is_some() && decl.body.is_some() {
            self.bodies.push_back(node);
        }
        tracing::debug!(function = %self.tree.qualified_name(node), "function declared");
        Ok(node)
    }
}

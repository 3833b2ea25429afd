//! Action binding and spec conformance

use super::scope::{AliasEntry, ScopeId, ScopeKind};
use super::types::{FnTy, Ty};
use super::Sema;
use crate::common::{CompileError, CompileResult, ErrorKind};
use crate::frontend::ast::{ActionDecl, AliasDecl, FuncDecl, TypeExprKind};

impl<'ast> Sema<'ast> {
    /// Whether `ty` satisfies `spec`
    ///
    /// Built-in scalars satisfy every spec. A template needs an action
    /// binding it to the spec; bindings declared later in the source are
    /// applied on demand.
    pub(crate) fn implements(&mut self, ty: &Ty, spec: ScopeId) -> bool {
        match ty {
            Ty::Scalar { .. } => !ty.is_void(),
            Ty::Struct { scope, .. } => {
                if self.is_bound(*scope, spec) {
                    return true;
                }
                self.bind_pending(*scope, spec);
                self.is_bound(*scope, spec)
            }
            _ => false,
        }
    }

    fn is_bound(&self, template: ScopeId, spec: ScopeId) -> bool {
        matches!(self.tree.kind(template), ScopeKind::Template(e) if e.implements.contains(&spec))
    }

    /// Apply not-yet-processed actions that may bind `template` to `spec`
    fn bind_pending(&mut self, template: ScopeId, spec: ScopeId) {
        let (decl, generic) = match self.tree.kind(template) {
            ScopeKind::Template(entry) => (entry.decl, entry.instance_of),
            _ => return,
        };
        let template_name = decl.name.as_str();
        let spec_name = self.tree.name(spec).to_string();

        let candidates: Vec<usize> = self
            .actions
            .iter()
            .enumerate()
            .filter(|(_, pending)| {
                !pending.applied
                    && last_segment(&pending.decl.target.kind) == Some(template_name)
                    && pending
                        .decl
                        .spec
                        .as_ref()
                        .is_some_and(|s| last_segment(&s.kind) == Some(spec_name.as_str()))
            })
            .map(|(index, _)| index)
            .collect();

        for index in candidates {
            let pending = self.actions[index];
            let Ok(target) = self.action_target(pending.decl, pending.scope) else {
                continue;
            };
            if target != template && Some(target) != generic {
                continue;
            }
            self.actions[index].applied = true;
            let result = self.register_action(pending.decl, pending.scope);
            self.report(result);
        }
    }

    /// Node of the template an action extends
    pub(crate) fn action_target(&mut self, action: &ActionDecl, scope: ScopeId) -> CompileResult<ScopeId> {
        if let TypeExprKind::Named { path, args } = &action.target.kind {
            if args.is_empty() {
                let id = self.lookup_path(path, scope, action.target.span)?;
                if matches!(self.tree.kind(id), ScopeKind::Template(e) if e.is_generic()) {
                    return Ok(id);
                }
            }
        }
        let ty = self.resolve_type(&action.target, scope)?;
        ty.struct_scope().ok_or_else(|| {
            CompileError::invalid(format!("cannot add actions to `{}`", ty), action.target.span)
        })
    }

    /// Bind an action to its template; actions on a generic apply to every instance
    pub(crate) fn register_action(&mut self, action: &'ast ActionDecl, scope: ScopeId) -> CompileResult<()> {
        let target = self.action_target(action, scope)?;
        let generic = matches!(self.tree.kind(target), ScopeKind::Template(e) if e.is_generic());
        if !generic {
            return self.apply_action(target, action, scope);
        }

        if let ScopeKind::Template(entry) = &mut self.tree.node_mut(target).kind {
            entry.actions.push((action, scope));
        }
        for instance in self.instances_of(target) {
            let result = self.apply_action(instance, action, scope);
            self.report(result);
        }
        Ok(())
    }

    /// Declare an action's members on `template` and check its spec
    pub(crate) fn apply_action(
        &mut self,
        template: ScopeId,
        action: &'ast ActionDecl,
        scope: ScopeId,
    ) -> CompileResult<()> {
        let spec = match &action.spec {
            Some(syntax) => match self.resolve_type(syntax, scope)? {
                Ty::Trait { scope: spec, .. } if matches!(self.tree.kind(spec), ScopeKind::Spec(_)) => Some(spec),
                other => {
                    return Err(CompileError::invalid(format!("`{}` is not a spec", other), syntax.span));
                }
            },
            None => None,
        };
        tracing::debug!(
            template = self.tree.name(template),
            spec = spec.map(|s| self.tree.name(s)),
            "binding action"
        );

        for alias in &action.aliases {
            let result = self.define_associated_type(template, alias);
            self.report(result);
        }
        let exported = self.tree.node(template).exported;
        for method in &action.methods {
            let result = self.declare_function(template, method, exported);
            self.report(result);
        }

        match spec {
            Some(spec) => self.check_action(template, spec, action),
            None => Ok(()),
        }
    }

    fn define_associated_type(
        &mut self,
        template: ScopeId,
        alias: &'ast AliasDecl,
    ) -> CompileResult<()> {
        let Some(target) = &alias.target else {
            return Err(CompileError::invalid(
                format!("associated type `{}` needs a definition", alias.name),
                alias.span,
            ));
        };
        let ty = self.resolve_type(target, template)?;
        let entry = AliasEntry {
            decl: Some(alias),
            target: Some(ty),
            resolving: false,
            instance_of: None,
        };
        self.tree.add_child(template, &alias.name, ScopeKind::TypeAlias(entry), alias.span)?;
        Ok(())
    }

    /// Check every obligation of `spec` against the members `action` gave `template`
    ///
    /// Each missing or mismatched member is reported on its own; the binding
    /// then fails with one aggregate error.
    pub(crate) fn check_action(
        &mut self,
        template: ScopeId,
        spec: ScopeId,
        action: &'ast ActionDecl,
    ) -> CompileResult<()> {
        let ScopeKind::Spec(spec_decl) = self.tree.kind(spec) else {
            return Ok(());
        };
        let spec_decl = *spec_decl;
        self.declare_spec_functions(spec);
        let spec_name = self.tree.qualified_name(spec);
        let mut failures = Vec::new();

        for required in &spec_decl.aliases {
            if !action.aliases.iter().any(|a| a.name == required.name) {
                failures.push(
                    CompileError::not_implemented(
                        format!("type `{}` required by `{}` is not implemented", required.name, spec_name),
                        action.span,
                    )
                    .with_note("required here", required.span)
                    .recoverable(),
                );
            }
        }

        for required in &spec_decl.methods {
            let Some(provided) = action.methods.iter().find(|m| m.name == required.name) else {
                failures.push(
                    CompileError::not_implemented(
                        format!("function `{}` required by `{}` is not implemented", required.name, spec_name),
                        action.span,
                    )
                    .with_note("required here", required.name_span)
                    .recoverable(),
                );
                continue;
            };
            let Some(expected) = self.function_type(spec, &required.name) else {
                continue;
            };
            let Some(found) = self.function_type(template, &provided.name) else {
                continue;
            };
            let expected = self.substitute_fn(&expected, spec, template);
            if let Some(problem) = signature_mismatch(provided, &expected, &found, &spec_name) {
                failures.push(
                    CompileError::arg_mismatch(problem, provided.name_span)
                        .with_note("required here", required.name_span)
                        .recoverable(),
                );
            }
        }

        if failures.is_empty() {
            if let ScopeKind::Template(entry) = &mut self.tree.node_mut(template).kind {
                entry.implements.push(spec);
            }
            return Ok(());
        }

        let count = failures.len();
        self.diagnostics.extend(failures);
        Err(CompileError::new(
            ErrorKind::ConformanceFailed,
            format!(
                "`{}` does not satisfy `{}`: {} problem(s)",
                self.tree.qualified_name(template),
                spec_name,
                count
            ),
            action.span,
        ))
    }

    /// Declare the function signatures of `spec` once; an action may be
    /// checked before pass 30 reaches the spec
    pub(crate) fn declare_spec_functions(&mut self, spec: ScopeId) {
        let ScopeKind::Spec(decl) = self.tree.kind(spec) else {
            return;
        };
        let decl = *decl;
        if !self.declared_specs.insert(spec) {
            return;
        }
        for method in &decl.methods {
            let result = self.declare_function(spec, method, false);
            self.report(result);
        }
    }

    fn function_type(&self, parent: ScopeId, name: &str) -> Option<FnTy> {
        let id = self.tree.find_child(parent, name)?;
        match self.tree.kind(id) {
            ScopeKind::Function(entry) => Some(entry.ty.clone()),
            _ => None,
        }
    }

    fn substitute_fn(&self, func: &FnTy, spec: ScopeId, template: ScopeId) -> FnTy {
        FnTy {
            ret: Box::new(self.substitute(&func.ret, spec, template)),
            params: func.params.iter().map(|p| self.substitute(p, spec, template)).collect(),
            is_member: func.is_member,
        }
    }

    /// Replace `Self` and the spec's associated types with the template's choices
    fn substitute(&self, ty: &Ty, spec: ScopeId, template: ScopeId) -> Ty {
        match ty {
            Ty::Trait { scope, .. } if *scope == spec => match self.tree.kind(template) {
                ScopeKind::Template(entry) => Ty::Struct { name: entry.ir_name.clone(), scope: template },
                _ => ty.clone(),
            },
            Ty::Trait { scope, .. } if self.tree.parent(*scope) == Some(spec) => {
                let bound = self.tree.find_child(template, self.tree.name(*scope));
                match bound.map(|id| self.tree.kind(id)) {
                    Some(ScopeKind::TypeAlias(AliasEntry { target: Some(target), .. })) => target.clone(),
                    _ => ty.clone(),
                }
            }
            Ty::Pointer(inner) => Ty::pointer(self.substitute(inner, spec, template)),
            Ty::Array { element, len } => Ty::array(self.substitute(element, spec, template), *len),
            Ty::Function(func) => Ty::Function(self.substitute_fn(func, spec, template)),
            _ => ty.clone(),
        }
    }
}

fn last_segment(kind: &TypeExprKind) -> Option<&str> {
    match kind {
        TypeExprKind::Named { path, .. } => path.last().map(String::as_str),
        _ => None,
    }
}

/// First difference between a provided signature and the required one
fn signature_mismatch(provided: &FuncDecl, expected: &FnTy, found: &FnTy, spec: &str) -> Option<String> {
    let name = &provided.name;
    if expected.is_member != found.is_member {
        let needs = if expected.is_member { "must take" } else { "must not take" };
        return Some(format!("`{}` {} `self` to satisfy `{}`", name, needs, spec));
    }
    if expected.params.len() != found.params.len() {
        return Some(format!(
            "`{}` takes {} parameter(s) but `{}` requires {}",
            name,
            found.params.len(),
            spec,
            expected.params.len()
        ));
    }
    let params = expected.params.iter().zip(&found.params).zip(&provided.params);
    for ((want, have), param) in params {
        if want != have {
            return Some(format!(
                "parameter `{}` of `{}` has type `{}` but `{}` requires `{}`",
                param.name, name, have, spec, want
            ));
        }
    }
    if expected.ret != found.ret {
        return Some(format!(
            "`{}` returns `{}` but `{}` requires `{}`",
            name, found.ret, spec, expected.ret
        ));
    }
    None
}

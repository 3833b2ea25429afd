//! Generic instantiation
//!
//! An instance is a fresh node next to its generic, named after the argument
//! list, whose generic parameters are type aliases bound to the arguments.
//! Its body is then declared exactly like a concrete declaration.

use super::scope::{AliasEntry, ScopeId, ScopeKind, TemplateEntry};
use super::types::Ty;
use super::Sema;
use crate::common::{CompileError, CompileResult, ErrorKind, Span};
use crate::frontend::ast::{AliasDecl, GenericParam, TemplateDecl};

#[derive(Clone, Copy)]
enum Generic<'ast> {
    Template(&'ast TemplateDecl),
    Alias(&'ast AliasDecl),
}

impl<'ast> Generic<'ast> {
    fn name(self) -> &'ast str {
        match self {
            Generic::Template(decl) => &decl.name,
            Generic::Alias(decl) => &decl.name,
        }
    }

    fn params(self) -> &'ast [GenericParam] {
        match self {
            Generic::Template(decl) => &decl.generics,
            Generic::Alias(decl) => &decl.generics,
        }
    }
}

impl<'ast> Sema<'ast> {
    /// Type of `generic<args>`, instantiating it on first use
    pub(crate) fn resolve_generic(&mut self, generic: ScopeId, args: Vec<Ty>, span: Span) -> CompileResult<Ty> {
        let key = (generic, args);
        if let Some(ty) = self.instances.get(&key) {
            return Ok(ty.clone());
        }
        self.instantiate(generic, &key.1, span)
    }

    /// Build a new instance of `generic` for `args`
    pub(crate) fn instantiate(&mut self, generic: ScopeId, args: &[Ty], span: Span) -> CompileResult<Ty> {
        let source = match self.tree.kind(generic) {
            ScopeKind::Template(entry) if entry.is_generic() => Generic::Template(entry.decl),
            ScopeKind::TypeAlias(entry) if entry.is_generic() => match entry.decl {
                Some(decl) => Generic::Alias(decl),
                None => return Err(not_generic(self.tree.name(generic), span)),
            },
            _ => return Err(not_generic(self.tree.name(generic), span)),
        };
        let params = source.params();
        if params.len() != args.len() {
            return Err(CompileError::arg_count(source.name(), params.len(), args.len(), span));
        }

        let parent = self.tree.parent(generic).unwrap_or(self.tree.root());
        self.check_constraints(source.name(), params, args, parent, span)?;

        let listed: Vec<String> = args.iter().map(ToString::to_string).collect();
        let mut name = format!("{}<{}>", source.name(), listed.join(", "));
        if self.tree.find_child(parent, &name).is_some() {
            let mut n = 2;
            while self.tree.find_child(parent, &format!("{}#{}", name, n)).is_some() {
                n += 1;
            }
            name = format!("{}#{}", name, n);
        }

        let ir_name = self.tree.qualify(parent, &name);
        let kind = match source {
            Generic::Template(decl) => ScopeKind::Template(TemplateEntry {
                decl,
                ir_name: ir_name.clone(),
                instance_of: Some(generic),
                implements: Vec::new(),
                actions: Vec::new(),
            }),
            Generic::Alias(decl) => ScopeKind::TypeAlias(AliasEntry {
                decl: Some(decl),
                target: None,
                resolving: false,
                instance_of: Some(generic),
            }),
        };
        let exported = self.tree.node(generic).exported;
        let node = self.tree.add_child(parent, &name, kind, span)?;
        self.tree.node_mut(node).exported = exported;
        tracing::debug!(generic = source.name(), instance = %name, "instantiating generic");

        let key = (generic, args.to_vec());
        let result = self.build_instance(node, source, &ir_name, args, &key, span);
        match result {
            Ok(ty) => {
                self.instances.insert(key, ty.clone());
                Ok(ty)
            }
            Err(error) => {
                self.instances.remove(&key);
                self.tree.remove(node);
                Err(error)
            }
        }
    }

    fn build_instance(
        &mut self,
        node: ScopeId,
        source: Generic<'ast>,
        ir_name: &str,
        args: &[Ty],
        key: &(ScopeId, Vec<Ty>),
        span: Span,
    ) -> CompileResult<Ty> {
        for (param, arg) in source.params().iter().zip(args) {
            let binding = ScopeKind::TypeAlias(AliasEntry {
                decl: None,
                target: Some(arg.clone()),
                resolving: false,
                instance_of: None,
            });
            self.tree.add_child(node, &param.name, binding, param.span)?;
        }

        match source {
            Generic::Template(decl) => {
                let ty = Ty::Struct { name: ir_name.to_string(), scope: node };
                // Registered before the body so self-referencing fields resolve
                self.instances.insert(key.clone(), ty.clone());
                self.builder.declare_struct(ir_name);
                let exported = self.tree.node(node).exported;
                self.define_template(node, decl, exported)?;
                self.replay_actions(key.0, node)?;
                Ok(ty)
            }
            Generic::Alias(_) => self.alias_target(node, span),
        }
    }

    /// Check every constraint of every parameter, reporting each failure
    fn check_constraints(
        &mut self,
        generic: &str,
        params: &[GenericParam],
        args: &[Ty],
        scope: ScopeId,
        span: Span,
    ) -> CompileResult<()> {
        let mut failures = Vec::new();
        let mut first_constraint = None;

        for (param, arg) in params.iter().zip(args) {
            for constraint in &param.constraints {
                let spec = match self.resolve_type(constraint, scope) {
                    Ok(Ty::Trait { scope: spec, .. }) if matches!(self.tree.kind(spec), ScopeKind::Spec(_)) => spec,
                    Ok(other) => {
                        failures.push(
                            CompileError::invalid(format!("`{}` is not a spec", other), constraint.span)
                                .recoverable(),
                        );
                        continue;
                    }
                    Err(error) => {
                        failures.push(error.recoverable());
                        continue;
                    }
                };
                if self.implements(arg, spec) {
                    continue;
                }
                first_constraint.get_or_insert(constraint.span);
                failures.push(
                    CompileError::new(
                        ErrorKind::ConstraintFailed,
                        format!(
                            "`{}` does not implement `{}` required by `{}`",
                            arg,
                            self.tree.qualified_name(spec),
                            param.name
                        ),
                        span,
                    )
                    .with_note("constraint declared here", constraint.span)
                    .recoverable(),
                );
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        let count = failures.len();
        self.diagnostics.extend(failures);
        let mut error = CompileError::new(
            ErrorKind::ConstraintFailed,
            format!("cannot instantiate `{}`: {} constraint(s) not satisfied", generic, count),
            span,
        );
        if let Some(constraint) = first_constraint {
            error = error.with_note("constraint declared here", constraint);
        }
        Err(error)
    }

    /// Apply the actions stored on `generic` to its new instance
    fn replay_actions(&mut self, generic: ScopeId, instance: ScopeId) -> CompileResult<()> {
        let actions = match self.tree.kind(generic) {
            ScopeKind::Template(entry) => entry.actions.clone(),
            _ => return Ok(()),
        };
        for (action, scope) in actions {
            self.apply_action(instance, action, scope)?;
        }
        Ok(())
    }

    /// Live instances created from `generic`
    pub(crate) fn instances_of(&self, generic: ScopeId) -> Vec<ScopeId> {
        let Some(parent) = self.tree.parent(generic) else {
            return Vec::new();
        };
        self.tree
            .children(parent)
            .iter()
            .copied()
            .filter(|id| matches!(self.tree.kind(*id), ScopeKind::Template(e) if e.instance_of == Some(generic)))
            .collect()
    }
}

fn not_generic(name: &str, span: Span) -> CompileError {
    CompileError::invalid(format!("`{}` is not generic", name), span)
}

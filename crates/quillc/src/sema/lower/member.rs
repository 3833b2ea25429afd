//! Names, dot chains and places

use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::{Expr, ExprKind};
use crate::ir::Value;
use crate::sema::scope::{ScopeId, ScopeKind, Storage};
use crate::sema::types::{Ty, TypedValue};
use crate::sema::Sema;

/// An addressable location
#[derive(Debug, Clone)]
pub(crate) struct Place {
    pub addr: Value,
    pub ty: Ty,
    /// Constant the place belongs to; assignments through it are rejected
    pub const_root: Option<String>,
}

impl Place {
    fn new(addr: Value, ty: Ty) -> Self {
        Self { addr, ty, const_root: None }
    }
}

/// What one segment of a dot chain denotes
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    Value(TypedValue),
    Place(Place),
    /// A function; `receiver` is the instance address when reached through one
    Function { scope: ScopeId, receiver: Option<TypedValue> },
    /// A package, template, spec or alias used as a namespace
    Namespace(ScopeId),
}

impl<'ast> Sema<'ast> {
    /// Resolve names, member chains, indexing and dereference without loading
    pub(crate) fn resolve_expr(&mut self, expr: &'ast Expr) -> CompileResult<Resolved> {
        match &expr.kind {
            ExprKind::Identifier(name) => self.resolve_identifier(name, expr.span),
            ExprKind::Member { object, member, member_span } => {
                let base = self.resolve_expr(object)?;
                self.resolve_member(base, member, *member_span)
            }
            ExprKind::Index { base, index } => {
                let base = self.resolve_expr(base)?;
                let base = self.place_of(base, expr.span)?;
                self.lower_index(base, index, expr.span).map(Resolved::Place)
            }
            ExprKind::Deref(inner) => {
                let pointer = self.lower_expr(inner)?;
                let Some(pointee) = pointer.ty.pointee() else {
                    return Err(CompileError::invalid(
                        format!("cannot dereference `{}`", pointer.ty),
                        expr.span,
                    ));
                };
                Ok(Resolved::Place(Place::new(pointer.value, pointee.clone())))
            }
            _ => self.lower_expr(expr).map(Resolved::Value),
        }
    }

    fn resolve_identifier(&mut self, name: &str, span: Span) -> CompileResult<Resolved> {
        let Some(id) = self.tree.find_in_scope(name) else {
            return Err(CompileError::cannot_find(name, span));
        };
        self.resolve_node(id, name, span)
    }

    fn resolve_node(&mut self, id: ScopeId, name: &str, span: Span) -> CompileResult<Resolved> {
        match self.tree.kind(id) {
            ScopeKind::Variable(var) => match &var.storage {
                Storage::Field => Err(CompileError::non_instance(
                    format!("field `{}` needs an instance; use `self.{}`", name, name),
                    span,
                )),
                Storage::Local(slot) => Ok(Resolved::Place(Place {
                    addr: slot.clone(),
                    ty: var.ty.clone(),
                    const_root: var.constant.then(|| name.to_string()),
                })),
                Storage::Constant { global, value } => {
                    if self.state.reference_mode {
                        Ok(Resolved::Place(Place {
                            addr: Value::Global(global.clone()),
                            ty: var.ty.clone(),
                            const_root: Some(name.to_string()),
                        }))
                    } else {
                        Ok(Resolved::Value(TypedValue::new(value.clone(), var.ty.clone())))
                    }
                }
            },
            ScopeKind::Function(_) => Ok(Resolved::Function { scope: id, receiver: None }),
            ScopeKind::Module
            | ScopeKind::Package
            | ScopeKind::Template(_)
            | ScopeKind::Spec(_)
            | ScopeKind::TypeAlias(_) => Ok(Resolved::Namespace(id)),
            ScopeKind::Block => Err(CompileError::cannot_find(name, span)),
        }
    }

    /// One step of a dot chain
    fn resolve_member(&mut self, base: Resolved, member: &str, span: Span) -> CompileResult<Resolved> {
        match base {
            Resolved::Namespace(id) => {
                let namespace = self.namespace_scope(id, span)?;
                let Some(child) = self.tree.find_child(namespace, member) else {
                    return Err(CompileError::cannot_find(member, span));
                };
                self.resolve_node(child, member, span)
            }
            Resolved::Function { scope, .. } => Err(CompileError::invalid(
                format!("function `{}` has no member `{}`", self.tree.name(scope), member),
                span,
            )),
            base => {
                let place = self.place_of(base, span)?;
                self.member_of_place(place, member, span)
            }
        }
    }

    fn member_of_place(&mut self, place: Place, member: &str, span: Span) -> CompileResult<Resolved> {
        let place = self.deref_once(place);
        let Ty::Struct { name, scope } = &place.ty else {
            return Err(CompileError::non_instance(
                format!("`{}` is not a template instance and has no member `{}`", place.ty, member),
                span,
            ));
        };
        let Some(child) = self.tree.find_child(*scope, member) else {
            return Err(CompileError::cannot_find(member, span));
        };

        match self.tree.kind(child) {
            ScopeKind::Variable(var) if var.storage == Storage::Field => {
                let ty = var.ty.clone();
                let index = self
                    .tree
                    .index_of(*scope, member)
                    .ok_or_else(|| CompileError::cannot_find(member, span))?;
                let addr = self.builder.build_field_addr(name, place.addr, index);
                Ok(Resolved::Place(Place { addr, ty, const_root: place.const_root }))
            }
            ScopeKind::Function(_) => {
                let receiver = TypedValue::new(place.addr, Ty::pointer(place.ty.clone()));
                Ok(Resolved::Function { scope: child, receiver: Some(receiver) })
            }
            _ => self.resolve_node(child, member, span),
        }
    }

    /// Follow a pointer-typed place to its pointee
    fn deref_once(&mut self, place: Place) -> Place {
        match &place.ty {
            Ty::Pointer(inner) => {
                let addr = self.builder.build_load(place.ty.ir(), place.addr);
                Place::new(addr, (**inner).clone())
            }
            _ => place,
        }
    }

    /// Address of a resolved expression; values are spilled to a temporary
    pub(crate) fn place_of(&mut self, resolved: Resolved, span: Span) -> CompileResult<Place> {
        match resolved {
            Resolved::Place(place) => Ok(place),
            Resolved::Value(value) => {
                if let Ty::Pointer(inner) = &value.ty {
                    return Ok(Place::new(value.value, (**inner).clone()));
                }
                let slot = self.temporary(&value.ty);
                self.store_typed(&value.ty, slot.clone(), value.value);
                Ok(Place::new(slot, value.ty))
            }
            Resolved::Function { scope, .. } | Resolved::Namespace(scope) => Err(CompileError::invalid(
                format!("`{}` is not a value", self.tree.name(scope)),
                span,
            )),
        }
    }

    /// `base[index]`; constant indices are bounds checked
    fn lower_index(&mut self, base: Place, index: &'ast Expr, span: Span) -> CompileResult<Place> {
        let base = self.deref_once(base);
        let Ty::Array { element, len } = &base.ty else {
            return Err(CompileError::invalid(format!("cannot index into `{}`", base.ty), span));
        };
        let index_value = self.lower_expr(index)?;
        if !index_value.ty.is_integer() {
            return Err(CompileError::invalid(
                format!("array index must be an integer, found `{}`", index_value.ty),
                index.span,
            ));
        }
        if let Value::Int(n) = index_value.value {
            if n < 0 || n >= i128::from(*len) {
                return Err(CompileError::invalid(
                    format!("index {} is out of bounds for `{}`", n, base.ty),
                    index.span,
                ));
            }
        }
        let addr = self.builder.build_elem_addr(element.ir(), base.addr, index_value.value);
        Ok(Place { addr, ty: (**element).clone(), const_root: base.const_root })
    }

    /// Evaluate an lvalue to its address
    pub(crate) fn lower_place(&mut self, expr: &'ast Expr) -> CompileResult<Place> {
        let saved = std::mem::replace(&mut self.state.reference_mode, true);
        let result = self.resolve_expr(expr);
        self.state.reference_mode = saved;
        match result? {
            Resolved::Place(place) => Ok(place),
            _ => Err(CompileError::invalid("expression is not assignable", expr.span)),
        }
    }

    /// Load or otherwise produce the value a resolved expression denotes
    pub(crate) fn rvalue(&mut self, resolved: Resolved, span: Span) -> CompileResult<TypedValue> {
        match resolved {
            Resolved::Value(value) => Ok(value),
            Resolved::Place(place) => {
                let value = self.builder.build_load(place.ty.ir(), place.addr);
                Ok(TypedValue::new(value, place.ty))
            }
            Resolved::Function { scope, receiver } => {
                let ScopeKind::Function(entry) = self.tree.kind(scope) else {
                    return Err(CompileError::non_function(
                        format!("`{}` is not a function", self.tree.name(scope)),
                        span,
                    ));
                };
                if receiver.is_some() || entry.ty.is_member || entry.ir.is_none() {
                    return Err(CompileError::invalid(
                        format!("member function `{}` can only be called", entry.decl.name),
                        span,
                    ));
                }
                Ok(TypedValue::new(
                    Value::Function(entry.ir_name.clone()),
                    Ty::Function(entry.ty.clone()),
                ))
            }
            Resolved::Namespace(id) => Err(CompileError::invalid(
                format!("`{}` is a type or package, not a value", self.tree.name(id)),
                span,
            )),
        }
    }
}

//! Type resolution and literal typing

use super::scope::{AliasEntry, ScopeId, ScopeKind};
use super::types::{min_signed_width, min_unsigned_width, FnTy, Ty};
use super::Sema;
use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::{Expr, ExprKind, PrimitiveType, TypeExpr, TypeExprKind, UnaryOp};

impl<'ast> Sema<'ast> {
    /// Resolve type syntax, looking names up from `scope`
    pub(crate) fn resolve_type(&mut self, expr: &TypeExpr, scope: ScopeId) -> CompileResult<Ty> {
        match &expr.kind {
            TypeExprKind::Primitive(prim) => Ok(primitive(*prim)),
            TypeExprKind::SelfType => {
                self.self_type(scope).ok_or_else(|| CompileError::unknown_type("Self", expr.span))
            }
            TypeExprKind::Reference(inner) => Ok(Ty::pointer(self.resolve_type(inner, scope)?)),
            TypeExprKind::Array { element, len } => {
                let element = self.resolve_type(element, scope)?;
                self.require_storable(&element, expr.span)?;
                Ok(Ty::array(element, *len))
            }
            TypeExprKind::Function { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| self.resolve_type(p, scope))
                    .collect::<CompileResult<Vec<_>>>()?;
                let ret = match ret {
                    Some(ret) => self.resolve_type(ret, scope)?,
                    None => Ty::void(),
                };
                Ok(Ty::Function(FnTy { ret: Box::new(ret), params, is_member: false }))
            }
            TypeExprKind::Named { path, args } => self.resolve_named(path, args, scope, expr.span),
        }
    }

    fn resolve_named(
        &mut self,
        path: &[String],
        args: &[TypeExpr],
        scope: ScopeId,
        span: Span,
    ) -> CompileResult<Ty> {
        let id = self.lookup_path(path, scope, span)?;
        let display = path.join(".");

        let generic = match self.tree.kind(id) {
            ScopeKind::Template(entry) => entry.is_generic(),
            ScopeKind::TypeAlias(entry) => entry.is_generic(),
            ScopeKind::Spec(_) => false,
            _ => return Err(CompileError::unknown_type(&display, span)),
        };
        if generic {
            let args = args
                .iter()
                .map(|a| self.resolve_type(a, scope))
                .collect::<CompileResult<Vec<_>>>()?;
            return self.resolve_generic(id, args, span);
        }
        if !args.is_empty() {
            return Err(CompileError::arg_count(&display, 0, args.len(), span));
        }

        match self.tree.kind(id) {
            ScopeKind::Template(entry) => Ok(Ty::Struct { name: entry.ir_name.clone(), scope: id }),
            ScopeKind::Spec(_) => Ok(Ty::Trait { name: self.tree.qualified_name(id), scope: id }),
            _ => self.alias_target(id, span),
        }
    }

    /// Find a dotted name: the head lexically, the rest as members
    pub(crate) fn lookup_path(&mut self, path: &[String], scope: ScopeId, span: Span) -> CompileResult<ScopeId> {
        let display = path.join(".");
        let Some((head, rest)) = path.split_first() else {
            return Err(CompileError::unknown_type(&display, span));
        };
        let mut id = self
            .tree
            .find_from(scope, head)
            .ok_or_else(|| CompileError::unknown_type(&display, span))?;
        for segment in rest {
            let namespace = self.namespace_scope(id, span)?;
            id = self
                .tree
                .find_child(namespace, segment)
                .ok_or_else(|| CompileError::unknown_type(&display, span))?;
        }
        Ok(id)
    }

    /// Node whose children are reachable through `id.member`
    pub(crate) fn namespace_scope(&mut self, id: ScopeId, span: Span) -> CompileResult<ScopeId> {
        match self.tree.kind(id) {
            ScopeKind::Module | ScopeKind::Package | ScopeKind::Template(_) | ScopeKind::Spec(_) => Ok(id),
            ScopeKind::TypeAlias(_) => {
                let target = self.alias_target(id, span)?;
                target.struct_scope().ok_or_else(|| {
                    CompileError::invalid(format!("`{}` has no members", target), span)
                })
            }
            _ => Err(CompileError::invalid(
                format!("`{}` is not a namespace", self.tree.name(id)),
                span,
            )),
        }
    }

    /// Type an alias stands for, resolving it on first use
    pub(crate) fn alias_target(&mut self, id: ScopeId, span: Span) -> CompileResult<Ty> {
        let ScopeKind::TypeAlias(entry) = self.tree.kind(id) else {
            return Err(CompileError::unknown_type(self.tree.name(id), span));
        };
        if let Some(target) = &entry.target {
            return Ok(target.clone());
        }
        if entry.resolving {
            return Err(CompileError::invalid(
                format!("type alias `{}` refers to itself", self.tree.name(id)),
                span,
            ));
        }
        if entry.is_generic() {
            let expected = entry.decl.map_or(0, |d| d.generics.len());
            return Err(CompileError::arg_count(self.tree.name(id), expected, 0, span));
        }
        let Some(target) = entry.decl.and_then(|d| d.target.as_ref()) else {
            // Associated type of a spec
            return Ok(Ty::Trait { name: self.tree.qualified_name(id), scope: id });
        };

        self.set_alias(id, |entry| entry.resolving = true);
        let result = self.resolve_type(target, id);
        self.set_alias(id, |entry| {
            entry.resolving = false;
            entry.target = result.as_ref().ok().cloned();
        });
        result
    }

    fn set_alias(&mut self, id: ScopeId, f: impl FnOnce(&mut AliasEntry<'ast>)) {
        if let ScopeKind::TypeAlias(entry) = &mut self.tree.node_mut(id).kind {
            f(entry);
        }
    }

    /// `Self` at `scope`: the enclosing template, or the implementor inside a spec
    pub(crate) fn self_type(&self, scope: ScopeId) -> Option<Ty> {
        let id = self
            .tree
            .enclosing(scope, |k| matches!(k, ScopeKind::Template(_) | ScopeKind::Spec(_)))?;
        match self.tree.kind(id) {
            ScopeKind::Template(entry) => Some(Ty::Struct { name: entry.ir_name.clone(), scope: id }),
            _ => Some(Ty::Trait { name: self.tree.qualified_name(id), scope: id }),
        }
    }

    /// Reject types that cannot be stored in a variable or field
    pub(crate) fn require_storable(&self, ty: &Ty, span: Span) -> CompileResult<()> {
        match ty {
            Ty::Trait { name, .. } => Err(CompileError::invalid(
                format!("`{}` is a spec and has no storage", name),
                span,
            )),
            _ if ty.is_void() => Err(CompileError::invalid("`void` has no storage", span)),
            _ => Ok(()),
        }
    }
}

fn primitive(prim: PrimitiveType) -> Ty {
    match prim {
        PrimitiveType::Void => Ty::void(),
        PrimitiveType::Bool => Ty::bool(),
        PrimitiveType::Float | PrimitiveType::Double => Ty::float(prim.bits()),
        _ => Ty::int(prim.bits(), prim.is_signed()),
    }
}

/// Type of a literal expression
///
/// Integers take the narrowest unsigned width holding them (signed when
/// negated), floats are `double`, strings are zero-terminated byte arrays
/// and array literals widen their entries to a common element type.
pub fn infer_literal_type(expr: &Expr) -> CompileResult<Ty> {
    match &expr.kind {
        ExprKind::IntLiteral(n) => Ok(Ty::int(min_unsigned_width(*n), false)),
        ExprKind::FloatLiteral(_) => Ok(Ty::float(64)),
        ExprKind::BoolLiteral(_) => Ok(Ty::bool()),
        ExprKind::StringLiteral(s) => Ok(Ty::array(Ty::int(8, false), s.len() as u64 + 1)),
        ExprKind::Unary { op: UnaryOp::Neg, operand } => match operand.kind {
            ExprKind::IntLiteral(n) => Ok(Ty::int(min_signed_width(-i128::from(n)), true)),
            ExprKind::FloatLiteral(_) => Ok(Ty::float(64)),
            _ => Err(CompileError::invalid("expression is not a literal", expr.span)),
        },
        ExprKind::ArrayLiteral(items) => {
            let Some((first, rest)) = items.split_first() else {
                return Err(CompileError::invalid("cannot infer the type of an empty array", expr.span));
            };
            let mut element = infer_literal_type(first)?;
            for item in rest {
                let ty = infer_literal_type(item)?;
                element = common_type(&element, &ty).ok_or_else(|| {
                    CompileError::arg_mismatch(
                        format!("array entries of type `{}` and `{}` have no common type", element, ty),
                        item.span,
                    )
                })?;
            }
            Ok(Ty::array(element, items.len() as u64))
        }
        _ => Err(CompileError::invalid("expression is not a literal", expr.span)),
    }
}

/// Type both operands of a binary operation are promoted to
pub fn common_type(a: &Ty, b: &Ty) -> Option<Ty> {
    if a == b {
        return Some(a.clone());
    }
    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }
    if a.is_float() || b.is_float() {
        let bits = if a.bits() == 64 || b.bits() == 64 { 64 } else { 32 };
        return Some(Ty::float(bits));
    }
    if a.is_signed() == b.is_signed() {
        return Some(Ty::int(a.bits().max(b.bits()), a.is_signed()));
    }

    let (signed, unsigned) = if a.is_signed() { (a, b) } else { (b, a) };
    let bits = if unsigned.bits() >= signed.bits() {
        (unsigned.bits() * 2).min(64)
    } else {
        signed.bits()
    };
    Some(Ty::int(bits, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;
    use crate::frontend::parser::Parser;

    fn expr(src: &str) -> Expr {
        Parser::new(src).parse_expr().unwrap()
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(infer_literal_type(&expr("200")).unwrap(), Ty::int(8, false));
        assert_eq!(infer_literal_type(&expr("70000")).unwrap(), Ty::int(32, false));
        assert_eq!(infer_literal_type(&expr("-1")).unwrap(), Ty::int(8, true));
        assert_eq!(infer_literal_type(&expr("1.5")).unwrap(), Ty::float(64));
        assert_eq!(
            infer_literal_type(&expr("\"hi\"")).unwrap(),
            Ty::array(Ty::int(8, false), 3)
        );
    }

    #[test]
    fn test_array_literal_widens() {
        let ty = infer_literal_type(&expr("[1, 300, 2]")).unwrap();
        assert_eq!(ty, Ty::array(Ty::int(16, false), 3));

        let ty = infer_literal_type(&expr("[1, 2.5]")).unwrap();
        assert_eq!(ty, Ty::array(Ty::float(64), 2));

        let err = infer_literal_type(&expr("[1, true]")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArgMismatch);
    }

    #[test]
    fn test_common_type() {
        let int = Ty::int(32, true);
        assert_eq!(common_type(&int, &Ty::int(8, false)), Some(int.clone()));
        assert_eq!(common_type(&int, &Ty::int(32, false)), Some(Ty::int(64, true)));
        assert_eq!(common_type(&Ty::float(32), &int), Some(Ty::float(32)));
        assert_eq!(common_type(&Ty::float(32), &Ty::float(64)), Some(Ty::float(64)));
        assert_eq!(common_type(&Ty::bool(), &int), None);
    }
}

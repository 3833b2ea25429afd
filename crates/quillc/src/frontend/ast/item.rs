//! Item (top-level declaration) AST nodes

use super::{Block, Expr, TypeExpr};
use crate::common::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub kind: ItemKind,
    pub exported: bool,
    pub span: Span,
}

impl Item {
    pub fn new(kind: ItemKind, exported: bool, span: Span) -> Self {
        Self { kind, exported, span }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Func(f) => Some(&f.name),
            ItemKind::Template(t) => Some(&t.name),
            ItemKind::Alias(a) => Some(&a.name),
            ItemKind::Spec(s) => Some(&s.name),
            ItemKind::Const(c) => Some(&c.name),
            ItemKind::Package(p) => Some(&p.name),
            ItemKind::Action(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Func(FuncDecl),
    Template(TemplateDecl),
    Alias(AliasDecl),
    Spec(SpecDecl),
    Action(ActionDecl),
    Const(ConstDecl),
    Package(PackageDecl),
}

/// `T: A + B` in a generic parameter list
#[derive(Debug, Clone, PartialEq)]
pub struct GenericParam {
    pub name: String,
    pub constraints: Vec<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

/// Function declaration; no body means an external function
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub name_span: Span,
    /// Takes an implicit leading `self`
    pub has_self: bool,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDecl {
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FuncDecl>,
    pub span: Span,
}

/// `type Name<T> = Target`; inside a spec the target is absent
#[derive(Debug, Clone, PartialEq)]
pub struct AliasDecl {
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub target: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpecDecl {
    pub name: String,
    pub aliases: Vec<AliasDecl>,
    pub methods: Vec<FuncDecl>,
    pub span: Span,
}

/// `action Spec in Target { ... }` or `action Target { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDecl {
    pub spec: Option<TypeExpr>,
    pub target: TypeExpr,
    pub aliases: Vec<AliasDecl>,
    pub methods: Vec<FuncDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageDecl {
    pub name: String,
    pub items: Vec<Item>,
    pub span: Span,
}

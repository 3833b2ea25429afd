//! Scope tree: the symbol table of one module
//!
//! Nodes live in an arena owned by the tree. A node owns its children through
//! a name-keyed map (names are unique per node) and keeps a plain parent id
//! used only for upward lookup.

use super::types::{FnTy, Ty};
use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::{ActionDecl, AliasDecl, FuncDecl, SpecDecl, TemplateDecl};
use crate::ir::{FunctionId, Value};
use std::collections::HashMap;
use std::fmt::Write;
use string_interner::{DefaultStringInterner, DefaultSymbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) u32);

impl ScopeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a variable's value lives
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    /// Field of the enclosing template; addressed through an instance
    Field,
    /// Stack slot address
    Local(Value),
    /// Folded top-level constant, also emitted as a global
    Constant { global: String, value: Value },
}

#[derive(Debug, Clone)]
pub struct VariableEntry {
    pub ty: Ty,
    pub storage: Storage,
    pub constant: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionEntry<'ast> {
    pub decl: &'ast FuncDecl,
    pub ty: FnTy,
    /// IR function; spec methods have none
    pub ir: Option<FunctionId>,
    pub ir_name: String,
}

#[derive(Debug, Clone)]
pub struct TemplateEntry<'ast> {
    pub decl: &'ast TemplateDecl,
    pub ir_name: String,
    /// The generic this node was instantiated from
    pub instance_of: Option<ScopeId>,
    /// Specs bound through `action Spec in Template`
    pub implements: Vec<ScopeId>,
    /// Actions on a generic with their declaring scope, replayed for every instantiation
    pub actions: Vec<(&'ast ActionDecl, ScopeId)>,
}

impl TemplateEntry<'_> {
    pub fn is_generic(&self) -> bool {
        self.instance_of.is_none() && !self.decl.generics.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AliasEntry<'ast> {
    /// None for generic parameter bindings
    pub decl: Option<&'ast AliasDecl>,
    pub target: Option<Ty>,
    /// Set while the target is being resolved, to catch cycles
    pub resolving: bool,
    pub instance_of: Option<ScopeId>,
}

impl AliasEntry<'_> {
    pub fn is_generic(&self) -> bool {
        self.instance_of.is_none() && self.decl.is_some_and(|d| !d.generics.is_empty())
    }
}

#[derive(Debug, Clone)]
pub enum ScopeKind<'ast> {
    Module,
    Package,
    Function(FunctionEntry<'ast>),
    Variable(VariableEntry),
    Template(TemplateEntry<'ast>),
    TypeAlias(AliasEntry<'ast>),
    Block,
    Spec(&'ast SpecDecl),
}

impl ScopeKind<'_> {
    pub fn tag(&self) -> &'static str {
        match self {
            ScopeKind::Module => "Module",
            ScopeKind::Package => "Package",
            ScopeKind::Function(_) => "Function",
            ScopeKind::Variable(_) => "Variable",
            ScopeKind::Template(_) => "Template",
            ScopeKind::TypeAlias(_) => "TypeAlias",
            ScopeKind::Block => "Block",
            ScopeKind::Spec(_) => "Spec",
        }
    }
}

#[derive(Debug)]
pub struct ScopeNode<'ast> {
    name: DefaultSymbol,
    pub kind: ScopeKind<'ast>,
    pub parent: Option<ScopeId>,
    children: HashMap<DefaultSymbol, ScopeId>,
    /// Children in insertion order
    order: Vec<ScopeId>,
    pub exported: bool,
    pub span: Span,
    alive: bool,
}

pub struct ScopeTree<'ast> {
    nodes: Vec<ScopeNode<'ast>>,
    names: DefaultStringInterner,
    current: ScopeId,
    anon_counter: u32,
}

impl<'ast> ScopeTree<'ast> {
    pub fn new(module_name: &str) -> Self {
        let mut names = DefaultStringInterner::default();
        let root = ScopeNode {
            name: names.get_or_intern(module_name),
            kind: ScopeKind::Module,
            parent: None,
            children: HashMap::new(),
            order: Vec::new(),
            exported: true,
            span: Span::default(),
            alive: true,
        };
        Self {
            nodes: vec![root],
            names,
            current: ScopeId(0),
            anon_counter: 0,
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Current insertion point
    pub fn current(&self) -> ScopeId {
        self.current
    }

    /// Move the insertion point, returning the previous one
    pub fn enter(&mut self, id: ScopeId) -> ScopeId {
        std::mem::replace(&mut self.current, id)
    }

    pub fn exit(&mut self, previous: ScopeId) {
        self.current = previous;
    }

    pub fn node(&self, id: ScopeId) -> &ScopeNode<'ast> {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: ScopeId) -> &mut ScopeNode<'ast> {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: ScopeId) -> &ScopeKind<'ast> {
        &self.node(id).kind
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.node(id).parent
    }

    pub fn name(&self, id: ScopeId) -> &str {
        self.names.resolve(self.node(id).name).unwrap_or_default()
    }

    pub fn is_alive(&self, id: ScopeId) -> bool {
        self.node(id).alive
    }

    /// Insert a new child; a name already used in `parent` is rejected
    pub fn add_child(
        &mut self,
        parent: ScopeId,
        name: &str,
        kind: ScopeKind<'ast>,
        span: Span,
    ) -> CompileResult<ScopeId> {
        let symbol = self.names.get_or_intern(name);
        if self.node(parent).children.contains_key(&symbol) {
            return Err(CompileError::already_found(name, span));
        }

        let id = ScopeId(self.nodes.len() as u32);
        tracing::trace!(name, kind = kind.tag(), "scope node added");
        self.nodes.push(ScopeNode {
            name: symbol,
            kind,
            parent: Some(parent),
            children: HashMap::new(),
            order: Vec::new(),
            exported: false,
            span,
            alive: true,
        });
        let parent = self.node_mut(parent);
        parent.children.insert(symbol, id);
        parent.order.push(id);
        Ok(id)
    }

    /// Insert a child at the current insertion point
    pub fn add(&mut self, name: &str, kind: ScopeKind<'ast>, span: Span) -> CompileResult<ScopeId> {
        self.add_child(self.current, name, kind, span)
    }

    pub fn find_child(&self, parent: ScopeId, name: &str) -> Option<ScopeId> {
        let symbol = self.names.get(name)?;
        self.node(parent).children.get(&symbol).copied()
    }

    /// Lexical lookup from the current insertion point; inner names shadow outer ones
    pub fn find_in_scope(&self, name: &str) -> Option<ScopeId> {
        self.find_from(self.current, name)
    }

    pub fn find_from(&self, start: ScopeId, name: &str) -> Option<ScopeId> {
        let symbol = self.names.get(name)?;
        let mut scope = Some(start);
        while let Some(id) = scope {
            let node = self.node(id);
            if let Some(found) = node.children.get(&symbol) {
                return Some(*found);
            }
            scope = node.parent;
        }
        None
    }

    pub fn children(&self, id: ScopeId) -> &[ScopeId] {
        &self.node(id).order
    }

    /// Ordinal of a Variable child among its Variable siblings
    pub fn index_of(&self, parent: ScopeId, name: &str) -> Option<usize> {
        let target = self.find_child(parent, name)?;
        if !matches!(self.kind(target), ScopeKind::Variable(_)) {
            return None;
        }
        self.children(parent)
            .iter()
            .filter(|id| matches!(self.kind(**id), ScopeKind::Variable(_)))
            .position(|id| *id == target)
    }

    /// Variable children in storage order
    pub fn fields(&self, parent: ScopeId) -> Vec<(ScopeId, &VariableEntry)> {
        self.children(parent)
            .iter()
            .filter_map(|id| match self.kind(*id) {
                ScopeKind::Variable(var) => Some((*id, var)),
                _ => None,
            })
            .collect()
    }

    /// Fresh identifier for an anonymous scope
    pub fn generate_name(&mut self, prefix: &str) -> String {
        self.anon_counter += 1;
        format!("{{{}#{}}}", prefix, self.anon_counter)
    }

    /// Detach a node; it and its subtree are dropped from every lookup
    pub fn remove(&mut self, id: ScopeId) {
        if let Some(parent) = self.parent(id) {
            let symbol = self.node(id).name;
            let parent = self.node_mut(parent);
            parent.children.remove(&symbol);
            parent.order.retain(|child| *child != id);
        }

        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let node = self.node_mut(next);
            node.alive = false;
            node.children.clear();
            stack.append(&mut node.order);
        }
        if !self.is_alive(self.current) {
            self.current = self.root();
        }
    }

    /// Nearest enclosing node (including `id`) accepted by `pred`
    pub fn enclosing(&self, id: ScopeId, pred: impl Fn(&ScopeKind<'ast>) -> bool) -> Option<ScopeId> {
        let mut scope = Some(id);
        while let Some(next) = scope {
            if pred(self.kind(next)) {
                return Some(next);
            }
            scope = self.parent(next);
        }
        None
    }

    /// Dotted path from the module root, skipping the root itself
    pub fn qualified_name(&self, id: ScopeId) -> String {
        let mut parts = Vec::new();
        let mut scope = Some(id);
        while let Some(next) = scope {
            if next == self.root() {
                break;
            }
            parts.push(self.name(next));
            scope = self.parent(next);
        }
        parts.reverse();
        parts.join(".")
    }

    /// Qualified name for a new child of `parent`
    pub fn qualify(&self, parent: ScopeId, name: &str) -> String {
        if parent == self.root() {
            name.to_string()
        } else {
            format!("{}.{}", self.qualified_name(parent), name)
        }
    }

    /// Print name, kind, export flag and nesting of every live node
    pub fn dump(&self) -> String {
        fn walk(tree: &ScopeTree<'_>, id: ScopeId, depth: usize, out: &mut String) {
            let node = tree.node(id);
            let _ = write!(out, "{}{} {}", "  ".repeat(depth), tree.name(id), node.kind.tag());
            if let ScopeKind::Variable(var) = &node.kind {
                let _ = write!(out, ": {}", var.ty);
            }
            if node.exported && id != tree.root() {
                let _ = write!(out, " [export]");
            }
            let _ = writeln!(out);
            for child in &node.order {
                walk(tree, *child, depth + 1, out);
            }
        }

        let mut out = String::new();
        walk(self, self.root(), 0, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;

    fn local(ty: Ty) -> ScopeKind<'static> {
        ScopeKind::Variable(VariableEntry {
            ty,
            storage: Storage::Local(Value::Undef),
            constant: false,
        })
    }

    fn field(ty: Ty) -> ScopeKind<'static> {
        ScopeKind::Variable(VariableEntry {
            ty,
            storage: Storage::Field,
            constant: false,
        })
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut tree = ScopeTree::new("m");
        tree.add("x", local(Ty::int(32, true)), Span::default()).unwrap();
        let err = tree.add("x", local(Ty::bool()), Span::new(4, 5)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyFound);
        assert_eq!(err.span, Span::new(4, 5));
    }

    #[test]
    fn test_shadowing_reverts_after_block() {
        let mut tree = ScopeTree::new("m");
        let outer = tree.add("x", local(Ty::int(32, true)), Span::default()).unwrap();

        let name = tree.generate_name("block");
        let block = tree.add(&name, ScopeKind::Block, Span::default()).unwrap();
        let saved = tree.enter(block);
        let inner = tree.add("x", local(Ty::bool()), Span::default()).unwrap();
        assert_eq!(tree.find_in_scope("x"), Some(inner));
        tree.exit(saved);

        assert_eq!(tree.find_in_scope("x"), Some(outer));
    }

    #[test]
    fn test_index_of_counts_variables_only() {
        let mut tree = ScopeTree::new("m");
        let root = tree.root();
        let tpl = tree.add_child(root, "T", ScopeKind::Block, Span::default()).unwrap();
        tree.add_child(tpl, "a", field(Ty::int(8, false)), Span::default()).unwrap();
        tree.add_child(tpl, "Alias", ScopeKind::TypeAlias(AliasEntry {
            decl: None,
            target: Some(Ty::bool()),
            resolving: false,
            instance_of: None,
        }), Span::default()).unwrap();
        tree.add_child(tpl, "b", field(Ty::int(16, false)), Span::default()).unwrap();

        assert_eq!(tree.index_of(tpl, "a"), Some(0));
        assert_eq!(tree.index_of(tpl, "b"), Some(1));
        assert_eq!(tree.index_of(tpl, "Alias"), None);
        assert_eq!(tree.index_of(tpl, "missing"), None);
    }

    #[test]
    fn test_generate_name_is_fresh() {
        let mut tree = ScopeTree::new("m");
        let a = tree.generate_name("block");
        let b = tree.generate_name("block");
        assert_ne!(a, b);
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let mut tree = ScopeTree::new("m");
        let root = tree.root();
        let pkg = tree.add_child(root, "geo", ScopeKind::Package, Span::default()).unwrap();
        let inner = tree.add_child(pkg, "x", local(Ty::bool()), Span::default()).unwrap();
        tree.enter(pkg);
        tree.remove(pkg);

        assert!(tree.find_child(root, "geo").is_none());
        assert!(!tree.is_alive(inner));
        assert_eq!(tree.current(), root);
        // The name is free again
        tree.add_child(root, "geo", ScopeKind::Package, Span::default()).unwrap();
    }

    #[test]
    fn test_qualified_name_and_dump() {
        let mut tree = ScopeTree::new("m");
        let root = tree.root();
        let pkg = tree.add_child(root, "geo", ScopeKind::Package, Span::default()).unwrap();
        tree.node_mut(pkg).exported = true;
        let x = tree.add_child(pkg, "origin", local(Ty::int(32, true)), Span::default()).unwrap();

        assert_eq!(tree.qualified_name(x), "geo.origin");
        assert_eq!(tree.qualify(root, "f"), "f");
        assert_eq!(tree.qualify(pkg, "f"), "geo.f");
        assert_eq!(
            tree.dump(),
            "m Module\n  geo Package [export]\n    origin Variable: int\n"
        );
    }
}
